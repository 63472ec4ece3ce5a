use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::container::{LogHeader, LogSink, LogSource, MessageIter};
use crate::error::ContainerError;
use crate::record::{Channel, ChannelId, LogStatistics, Message, Schema, SchemaId};

// ═══════════════════════════════════════════════════════════════
//  MemoryLog
// ═══════════════════════════════════════════════════════════════

/// In-memory recording. Statistics are maintained while messages are pushed
/// and can be overridden to model summaries that disagree with the data.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    schemas: Vec<Schema>,
    channels: Vec<Channel>,
    messages: Vec<Message<'static>>,
    stats: LogStatistics,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_schema(&mut self, id: SchemaId, name: &str, encoding: &str, data: &[u8]) {
        self.schemas.push(Schema {
            id,
            name: name.to_string(),
            encoding: encoding.to_string(),
            data: data.to_vec(),
        });
        self.schemas.sort_by_key(|s| s.id);
    }

    pub fn add_channel(&mut self, id: ChannelId, topic: &str, schema_id: Option<SchemaId>) {
        self.add_channel_with(Channel {
            id,
            topic: topic.to_string(),
            schema_id,
            message_encoding: "json".to_string(),
            metadata: BTreeMap::new(),
        });
    }

    pub fn add_channel_with(&mut self, channel: Channel) {
        self.channels.push(channel);
        self.channels.sort_by_key(|c| c.id);
    }

    /// Append a message and fold it into the statistics.
    pub fn push(&mut self, channel_id: ChannelId, log_time: u64, data: &[u8]) {
        let sequence = self.stats.message_count(channel_id) as u32;
        if self.messages.is_empty() {
            self.stats.message_start_time = log_time;
            self.stats.message_end_time = log_time;
        } else {
            self.stats.message_start_time = self.stats.message_start_time.min(log_time);
            self.stats.message_end_time = self.stats.message_end_time.max(log_time);
        }
        *self.stats.channel_message_counts.entry(channel_id).or_insert(0) += 1;
        self.messages.push(Message {
            channel_id,
            sequence,
            log_time,
            publish_time: log_time,
            data: Cow::Owned(data.to_vec()),
        });
    }

    pub fn set_statistics(&mut self, stats: LogStatistics) {
        self.stats = stats;
    }
}

impl LogSource for MemoryLog {
    fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn statistics(&self) -> &LogStatistics {
        &self.stats
    }

    fn messages(&self) -> Result<MessageIter<'_>, ContainerError> {
        // stable: equal log times keep push order
        let mut ordered: Vec<&Message<'static>> = self.messages.iter().collect();
        ordered.sort_by_key(|m| m.log_time);
        Ok(Box::new(ordered.into_iter().map(|m| {
            Ok::<_, ContainerError>(Message {
                channel_id: m.channel_id,
                sequence: m.sequence,
                log_time: m.log_time,
                publish_time: m.publish_time,
                data: Cow::Borrowed(&*m.data),
            })
        })))
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemorySink
// ═══════════════════════════════════════════════════════════════

/// In-memory output. Ids start at 1, the way MCAP writers hand them out.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub header: Option<LogHeader>,
    pub schemas: Vec<Schema>,
    pub channels: Vec<Channel>,
    pub messages: Vec<Message<'static>>,
    pub finished: bool,
    deduplicate: bool,
    fail_after: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the existing id for content already registered, like writers
    /// that de-duplicate schemas and channels.
    pub fn deduplicating() -> Self {
        Self {
            deduplicate: true,
            ..Self::default()
        }
    }

    /// Fail every message write after `n` successful ones.
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// Payloads written to an output channel, in write order.
    pub fn payloads(&self, channel_id: ChannelId) -> Vec<&[u8]> {
        self.messages
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .map(|m| &*m.data)
            .collect()
    }

    fn ensure_open(&self) -> Result<(), ContainerError> {
        if self.header.is_none() {
            return Err(ContainerError::write("sink not started"));
        }
        if self.finished {
            return Err(ContainerError::write("sink already finished"));
        }
        Ok(())
    }
}

impl LogSink for MemorySink {
    fn start(&mut self, header: &LogHeader) -> Result<(), ContainerError> {
        if self.header.is_some() {
            return Err(ContainerError::write("sink already started"));
        }
        self.header = Some(header.clone());
        Ok(())
    }

    fn add_schema(&mut self, schema: &Schema) -> Result<SchemaId, ContainerError> {
        self.ensure_open()?;
        if self.deduplicate {
            let existing = self.schemas.iter().find(|s| {
                s.name == schema.name && s.encoding == schema.encoding && s.data == schema.data
            });
            if let Some(s) = existing {
                return Ok(s.id);
            }
        }
        let id = self.schemas.len() as SchemaId + 1;
        self.schemas.push(Schema { id, ..schema.clone() });
        Ok(id)
    }

    fn add_channel(&mut self, channel: &Channel) -> Result<ChannelId, ContainerError> {
        self.ensure_open()?;
        if let Some(schema_id) = channel.schema_id {
            if !self.schemas.iter().any(|s| s.id == schema_id) {
                return Err(ContainerError::register(format!(
                    "channel '{}' references unknown schema {schema_id}",
                    channel.topic
                )));
            }
        }
        if self.deduplicate {
            let existing = self.channels.iter().find(|c| {
                c.topic == channel.topic
                    && c.schema_id == channel.schema_id
                    && c.message_encoding == channel.message_encoding
                    && c.metadata == channel.metadata
            });
            if let Some(c) = existing {
                return Ok(c.id);
            }
        }
        let id = self.channels.len() as ChannelId + 1;
        self.channels.push(Channel { id, ..channel.clone() });
        Ok(id)
    }

    fn add_message(&mut self, message: &Message<'_>) -> Result<(), ContainerError> {
        self.ensure_open()?;
        if self.fail_after.is_some_and(|n| self.messages.len() >= n) {
            return Err(ContainerError::write("injected write failure"));
        }
        if !self.channels.iter().any(|c| c.id == message.channel_id) {
            return Err(ContainerError::write(format!(
                "unknown channel {}",
                message.channel_id
            )));
        }
        self.messages.push(Message {
            channel_id: message.channel_id,
            sequence: message.sequence,
            log_time: message.log_time,
            publish_time: message.publish_time,
            data: Cow::Owned(message.data.to_vec()),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ContainerError> {
        self.ensure_open()?;
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> LogHeader {
        LogHeader {
            library: "test".into(),
            profile: "".into(),
        }
    }

    #[test]
    fn push_maintains_statistics() {
        let mut log = MemoryLog::new();
        log.add_channel(1, "/a", None);
        log.push(1, 500, b"x");
        log.push(1, 200, b"y");
        log.push(2, 900, b"z");

        let stats = log.statistics();
        assert_eq!(stats.message_start_time, 200);
        assert_eq!(stats.message_end_time, 900);
        assert_eq!(stats.message_count(1), 2);
        assert_eq!(stats.message_count(2), 1);
    }

    #[test]
    fn messages_come_out_in_log_time_order() {
        let mut log = MemoryLog::new();
        log.push(1, 30, b"c");
        log.push(2, 10, b"a");
        log.push(1, 20, b"b");
        log.push(2, 20, b"b2");

        let order: Vec<Vec<u8>> = log
            .messages()
            .unwrap()
            .map(|m| m.unwrap().data.into_owned())
            .collect();
        assert_eq!(order, vec![b"a".to_vec(), b"b".to_vec(), b"b2".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn sink_assigns_ids_from_one() {
        let mut sink = MemorySink::new();
        sink.start(&header()).unwrap();
        let schema = Schema {
            id: 40,
            name: "s".into(),
            encoding: "jsonschema".into(),
            data: b"{}".to_vec(),
        };
        assert_eq!(sink.add_schema(&schema).unwrap(), 1);
        assert_eq!(sink.add_schema(&schema).unwrap(), 2);
    }

    #[test]
    fn deduplicating_sink_reuses_ids() {
        let mut sink = MemorySink::deduplicating();
        sink.start(&header()).unwrap();
        let schema = Schema {
            id: 1,
            name: "s".into(),
            encoding: "jsonschema".into(),
            data: b"{}".to_vec(),
        };
        assert_eq!(sink.add_schema(&schema).unwrap(), 1);
        assert_eq!(sink.add_schema(&schema).unwrap(), 1);
    }

    #[test]
    fn sink_rejects_writes_before_start() {
        let mut sink = MemorySink::new();
        let msg = Message {
            channel_id: 1,
            sequence: 0,
            log_time: 0,
            publish_time: 0,
            data: Cow::Borrowed(b"x"),
        };
        assert!(sink.add_message(&msg).is_err());
    }

    #[test]
    fn sink_rejects_unknown_schema_reference() {
        let mut sink = MemorySink::new();
        sink.start(&header()).unwrap();
        let channel = Channel {
            id: 1,
            topic: "/a".into(),
            schema_id: Some(9),
            message_encoding: "cdr".into(),
            metadata: BTreeMap::new(),
        };
        let err = sink.add_channel(&channel).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Register);
    }
}
