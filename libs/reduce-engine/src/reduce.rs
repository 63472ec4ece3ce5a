use std::collections::HashMap;

use reduce_api::{ChannelId, LogHeader, LogSink, LogSource};

use crate::error::ReduceError;
use crate::policy::{Decimator, PolicyConfig};
use crate::pump::{pump, PumpStats};
use crate::remap::RemapTable;

#[derive(Debug, Clone)]
pub struct ReduceOptions {
    pub header: LogHeader,
    pub policy: PolicyConfig,
}

/// Outcome of one file's reduction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReduceStats {
    pub channels: usize,
    /// Channels that lose messages under the active policy.
    pub decimated_channels: usize,
    /// Channels left out because their schema could not be mapped.
    pub skipped_channels: usize,
    pub messages: PumpStats,
}

// ═══════════════════════════════════════════════════════════════
//  Reduction: state owned by one file's run
// ═══════════════════════════════════════════════════════════════

/// Remap table plus per-channel decision state of a single reduction.
///
/// Built fresh for every input file and consumed by `run`, so nothing
/// leaks between files of a batch.
#[derive(Debug)]
pub struct Reduction {
    remap: RemapTable,
    decimators: HashMap<ChannelId, Decimator>,
}

impl Reduction {
    /// Copy metadata into `sink` and derive a decimator for every mapped
    /// channel. The sink must already be started.
    pub fn prepare<S, K>(source: &S, sink: &mut K, policy: &PolicyConfig) -> Result<Self, ReduceError>
    where
        S: LogSource + ?Sized,
        K: LogSink + ?Sized,
    {
        let remap = RemapTable::build(sink, source.schemas(), source.channels())?;
        let stats = source.statistics();

        let mut decimators = HashMap::with_capacity(remap.channel_count());
        for channel in source.channels() {
            if remap.channel(channel.id).is_none() {
                continue;
            }
            let count = stats.message_count(channel.id);
            let decimator = Decimator::for_channel(policy, count, stats);
            tracing::debug!(
                channel = channel.id,
                topic = %channel.topic,
                count,
                policy = %policy.kind,
                keep_rate = ?decimator.keep_rate(),
                decimating = decimator.is_decimating(),
                "channel policy"
            );
            decimators.insert(channel.id, decimator);
        }

        Ok(Self { remap, decimators })
    }

    /// Single forward pass over the source.
    pub fn run<S, K>(mut self, source: &S, sink: &mut K) -> Result<ReduceStats, ReduceError>
    where
        S: LogSource + ?Sized,
        K: LogSink + ?Sized,
    {
        let decimated_channels = self.decimators.values().filter(|d| d.is_decimating()).count();
        let messages = pump(source.messages()?, &self.remap, &mut self.decimators, sink)?;
        Ok(ReduceStats {
            channels: self.remap.channel_count(),
            decimated_channels,
            skipped_channels: self.remap.skipped().len(),
            messages,
        })
    }
}

/// Reduce `source` into `sink`: start, copy metadata, pump, finish.
pub fn reduce<S, K>(source: &S, sink: &mut K, options: &ReduceOptions) -> Result<ReduceStats, ReduceError>
where
    S: LogSource + ?Sized,
    K: LogSink + ?Sized,
{
    sink.start(&options.header)?;
    let reduction = Reduction::prepare(source, sink, &options.policy)?;
    let stats = reduction.run(source, sink)?;
    sink.finish()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use reduce_api::{Channel, LogStatistics, MemoryLog, MemorySink};

    use super::*;
    use crate::policy::PolicyKind;

    const SECOND: u64 = 1_000_000_000;

    fn options(kind: PolicyKind) -> ReduceOptions {
        ReduceOptions {
            header: LogHeader {
                library: "mcap-reduce".into(),
                profile: "reducer".into(),
            },
            policy: PolicyConfig {
                kind,
                max_frequency: 50.0,
            },
        }
    }

    /// 1000 messages on `/fast` and 50 on `/slow`, both spread over 10 s.
    fn recording() -> MemoryLog {
        let mut log = MemoryLog::new();
        log.add_schema(3, "Imu", "ros2msg", b"float64 ax");
        log.add_channel_with(Channel {
            id: 4,
            topic: "/fast".into(),
            schema_id: Some(3),
            message_encoding: "cdr".into(),
            metadata: BTreeMap::from([("qos".to_string(), "best_effort".to_string())]),
        });
        log.add_channel(8, "/slow", None);
        for i in 0..1000u64 {
            log.push(4, i * SECOND / 100, &i.to_le_bytes());
            if i % 20 == 0 {
                log.push(8, i * SECOND / 100 + 1, format!("slow {i}").as_bytes());
            }
        }
        log.set_statistics(LogStatistics {
            message_start_time: 0,
            message_end_time: 10 * SECOND,
            channel_message_counts: BTreeMap::from([(4, 1000), (8, 50)]),
        });
        log
    }

    #[test]
    fn modulo_reduction_end_to_end() {
        let log = recording();
        let mut sink = MemorySink::new();
        let stats = reduce(&log, &mut sink, &options(PolicyKind::Modulo)).unwrap();

        assert!(sink.finished);
        assert_eq!(sink.header.as_ref().unwrap().profile, "reducer");
        assert_eq!(stats.channels, 2);
        assert_eq!(stats.decimated_channels, 1);
        assert_eq!(stats.messages.read, 1050);
        assert_eq!(stats.messages.written, 500 + 50);

        // fast: arrivals 0, 2, ..., 998
        let fast: Vec<u64> = sink
            .payloads(1)
            .iter()
            .map(|p| u64::from_le_bytes((*p).try_into().unwrap()))
            .collect();
        assert_eq!(fast.len(), 500);
        assert!(fast.iter().enumerate().all(|(n, i)| *i == 2 * n as u64));

        // slow: byte-identical, only the id changes
        let slow: Vec<Vec<u8>> = log
            .messages()
            .unwrap()
            .map(|m| m.unwrap())
            .filter(|m| m.channel_id == 8)
            .map(|m| m.data.into_owned())
            .collect();
        let written: Vec<&[u8]> = sink.payloads(2);
        assert_eq!(written.len(), 50);
        assert!(slow.iter().zip(&written).all(|(a, b)| a.as_slice() == *b));
        assert_eq!(written[0], b"slow 0");
        assert_eq!(written[49], b"slow 980");

        assert_eq!(sink.channels[0].metadata.get("qos").map(String::as_str), Some("best_effort"));
        assert_eq!(sink.channels[0].schema_id, Some(1));
    }

    #[test]
    fn kept_messages_keep_timestamps_and_sequence() {
        let log = recording();
        let mut sink = MemorySink::new();
        reduce(&log, &mut sink, &options(PolicyKind::Modulo)).unwrap();

        let second = sink.messages.iter().filter(|m| m.channel_id == 1).nth(1).unwrap();
        assert_eq!(second.log_time, 2 * SECOND / 100);
        assert_eq!(second.publish_time, 2 * SECOND / 100);
        assert_eq!(second.sequence, 2);
    }

    #[test]
    fn every_output_message_uses_an_output_channel() {
        let mut log = recording();
        log.push(77, 5, b"unregistered");
        let mut sink = MemorySink::new();
        let stats = reduce(&log, &mut sink, &options(PolicyKind::Modulo)).unwrap();

        assert_eq!(stats.messages.unmapped, 1);
        let outputs: Vec<u16> = sink.channels.iter().map(|c| c.id).collect();
        assert!(sink.messages.iter().all(|m| outputs.contains(&m.channel_id)));
    }

    #[test]
    fn toggle_reduction_keeps_first_of_frequent() {
        let mut log = MemoryLog::new();
        log.add_channel(1, "/burst", None);
        log.add_channel(2, "/quiet", None);
        for i in 0..10u64 {
            log.push(1, i, format!("{i}").as_bytes());
        }
        log.push(2, 3, b"q");
        // over the raw 9 ns span: 10/9 > 1 is frequent, 1/9 is not
        let mut opts = options(PolicyKind::Toggle);
        opts.policy.max_frequency = 1.0;
        let mut sink = MemorySink::new();
        let stats = reduce(&log, &mut sink, &opts).unwrap();

        assert_eq!(sink.payloads(1), vec![b"0".as_slice()]);
        assert_eq!(sink.payloads(2), vec![b"q".as_slice()]);
        assert_eq!(stats.decimated_channels, 1);
    }

    #[test]
    fn skipped_channel_does_not_fail_the_run() {
        let mut log = MemoryLog::new();
        log.add_channel(1, "/ok", None);
        log.add_channel(2, "/orphan", Some(9));
        log.push(1, 0, b"a");
        log.push(2, 1, b"b");

        let mut sink = MemorySink::new();
        let stats = reduce(&log, &mut sink, &options(PolicyKind::Modulo)).unwrap();
        assert_eq!(stats.skipped_channels, 1);
        assert_eq!(stats.messages.unmapped, 1);
        assert_eq!(sink.messages.len(), 1);
    }

    #[test]
    fn state_is_not_shared_between_runs() {
        let log = recording();
        let opts = options(PolicyKind::Modulo);

        let mut first = MemorySink::new();
        let mut second = MemorySink::new();
        let a = reduce(&log, &mut first, &opts).unwrap();
        let b = reduce(&log, &mut second, &opts).unwrap();

        assert_eq!(a, b);
        assert_eq!(first.messages, second.messages);
    }

    #[test]
    fn empty_log_still_finishes() {
        let log = MemoryLog::new();
        let mut sink = MemorySink::new();
        let stats = reduce(&log, &mut sink, &options(PolicyKind::Modulo)).unwrap();
        assert_eq!(stats, ReduceStats::default());
        assert!(sink.finished);
    }
}
