use std::borrow::Cow;
use std::collections::BTreeMap;

/// Schema identifier inside one log. Ids are local to a file: the same
/// schema usually gets a different id in the reduced output.
pub type SchemaId = u16;

/// Channel identifier inside one log.
pub type ChannelId = u16;

// ═══════════════════════════════════════════════════════════════
//  Schema / Channel
// ═══════════════════════════════════════════════════════════════

/// Description of a payload encoding. Copied byte-for-byte between logs,
/// only `id` is renumbered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub id: SchemaId,
    pub name: String,
    pub encoding: String,
    pub data: Vec<u8>,
}

/// Named stream of messages ("topic").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub topic: String,
    /// `None`: channel without schema (schemaless encodings like raw JSON).
    pub schema_id: Option<SchemaId>,
    pub message_encoding: String,
    pub metadata: BTreeMap<String, String>,
}

impl Channel {
    /// Copy of the channel pointing at a different schema. Everything but the
    /// schema reference is preserved; the sink assigns the channel id.
    pub fn with_schema(&self, schema_id: Option<SchemaId>) -> Self {
        Self {
            schema_id,
            ..self.clone()
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Message
// ═══════════════════════════════════════════════════════════════

/// One recorded message. Timestamps are nanoseconds.
///
/// The payload borrows from the source when the container allows it, so a
/// forward pass does not copy every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<'a> {
    pub channel_id: ChannelId,
    pub sequence: u32,
    pub log_time: u64,
    pub publish_time: u64,
    pub data: Cow<'a, [u8]>,
}

impl Message<'_> {
    /// Same message under another channel id. Payload, sequence and
    /// timestamps are untouched.
    pub fn on_channel(&self, channel_id: ChannelId) -> Message<'_> {
        Message {
            channel_id,
            sequence: self.sequence,
            log_time: self.log_time,
            publish_time: self.publish_time,
            data: Cow::Borrowed(&*self.data),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  LogStatistics
// ═══════════════════════════════════════════════════════════════

/// Log-wide aggregates, known before the first message is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogStatistics {
    /// Earliest message log time, ns.
    pub message_start_time: u64,
    /// Latest message log time, ns.
    pub message_end_time: u64,
    pub channel_message_counts: BTreeMap<ChannelId, u64>,
}

impl LogStatistics {
    /// Total message count of a channel; channels without messages are
    /// simply absent from the summary.
    pub fn message_count(&self, channel_id: ChannelId) -> u64 {
        self.channel_message_counts
            .get(&channel_id)
            .copied()
            .unwrap_or(0)
    }

    /// `end - start` in nanoseconds. Negative when the summary is inconsistent.
    pub fn raw_span(&self) -> i128 {
        self.message_end_time as i128 - self.message_start_time as i128
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_count_defaults_to_zero() {
        let stats = LogStatistics {
            message_start_time: 0,
            message_end_time: 10,
            channel_message_counts: BTreeMap::from([(3, 42)]),
        };
        assert_eq!(stats.message_count(3), 42);
        assert_eq!(stats.message_count(4), 0);
    }

    #[test]
    fn raw_span_can_be_negative() {
        let stats = LogStatistics {
            message_start_time: 100,
            message_end_time: 40,
            ..Default::default()
        };
        assert_eq!(stats.raw_span(), -60);
    }

    #[test]
    fn on_channel_only_rewrites_id() {
        let msg = Message {
            channel_id: 7,
            sequence: 11,
            log_time: 1_000,
            publish_time: 999,
            data: Cow::Owned(vec![1, 2, 3]),
        };
        let moved = msg.on_channel(2);
        assert_eq!(moved.channel_id, 2);
        assert_eq!(moved.sequence, 11);
        assert_eq!(moved.log_time, 1_000);
        assert_eq!(moved.publish_time, 999);
        assert_eq!(&*moved.data, &[1, 2, 3]);
    }

    #[test]
    fn with_schema_keeps_metadata() {
        let ch = Channel {
            id: 5,
            topic: "/imu".into(),
            schema_id: Some(1),
            message_encoding: "cdr".into(),
            metadata: BTreeMap::from([("k".to_string(), "v".to_string())]),
        };
        let copy = ch.with_schema(None);
        assert_eq!(copy.schema_id, None);
        assert_eq!(copy.topic, "/imu");
        assert_eq!(copy.metadata, ch.metadata);
    }
}
