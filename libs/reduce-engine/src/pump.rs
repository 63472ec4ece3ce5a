use std::collections::HashMap;

use reduce_api::{ChannelId, LogSink, MessageIter};

use crate::error::ReduceError;
use crate::policy::Decimator;
use crate::remap::RemapTable;

/// Counters of one forward pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub read: u64,
    pub written: u64,
    /// Messages on channels that never made it into the output.
    pub unmapped: u64,
}

impl PumpStats {
    pub fn dropped(&self) -> u64 {
        self.read - self.written - self.unmapped
    }
}

/// Drive one pass over `messages` in source order.
///
/// Each message is resolved through `remap` (unmapped ones are dropped),
/// asked of its channel's decimator and, when kept, written with only the
/// channel id rewritten. Nothing is buffered or re-ordered.
pub fn pump<K: LogSink + ?Sized>(
    messages: MessageIter<'_>,
    remap: &RemapTable,
    decimators: &mut HashMap<ChannelId, Decimator>,
    sink: &mut K,
) -> Result<PumpStats, ReduceError> {
    let mut stats = PumpStats::default();

    for message in messages {
        let message = message?;
        stats.read += 1;

        let (Some(output), Some(decimator)) = (
            remap.channel(message.channel_id),
            decimators.get_mut(&message.channel_id),
        ) else {
            stats.unmapped += 1;
            continue;
        };

        if decimator.admit() {
            sink.add_message(&message.on_channel(output))?;
            stats.written += 1;
        }
    }

    Ok(stats)
}
