use crate::error::ContainerError;
use crate::record::{Channel, ChannelId, LogStatistics, Message, Schema, SchemaId};

/// Lazy, ordered sequence of messages produced by one forward pass.
pub type MessageIter<'a> = Box<dyn Iterator<Item = Result<Message<'a>, ContainerError>> + 'a>;

// ═══════════════════════════════════════════════════════════════
//  LogSource
// ═══════════════════════════════════════════════════════════════

/// Read side of an indexed, already closed recording.
///
/// Schemas, channels and statistics come from the summary and are available
/// before the first message is read.
pub trait LogSource {
    /// All schemas, ordered by id.
    fn schemas(&self) -> &[Schema];

    /// All channels, ordered by id.
    fn channels(&self) -> &[Channel];

    fn statistics(&self) -> &LogStatistics;

    /// Every message of every channel in non-decreasing log-time order.
    /// Each call starts a fresh pass.
    fn messages(&self) -> Result<MessageIter<'_>, ContainerError>;
}

// ═══════════════════════════════════════════════════════════════
//  LogSink
// ═══════════════════════════════════════════════════════════════

/// Free-form header written at the start of an output log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHeader {
    /// Producer name.
    pub library: String,
    pub profile: String,
}

/// Append-only write side. Ids returned by `add_schema` / `add_channel`
/// belong to the output namespace.
pub trait LogSink {
    fn start(&mut self, header: &LogHeader) -> Result<(), ContainerError>;

    /// Register a schema; `schema.id` is ignored.
    fn add_schema(&mut self, schema: &Schema) -> Result<SchemaId, ContainerError>;

    /// Register a channel. `channel.schema_id` must already be an output id;
    /// `channel.id` is ignored.
    fn add_channel(&mut self, channel: &Channel) -> Result<ChannelId, ContainerError>;

    /// Append a message under an output channel id.
    fn add_message(&mut self, message: &Message<'_>) -> Result<(), ContainerError>;

    /// Flush pending structures (chunks, indexes, summary).
    fn finish(&mut self) -> Result<(), ContainerError>;
}
