use reduce_api::{ChannelId, ContainerError, ErrorKind, SchemaId};

/// Failure while copying schemas/channels into the output namespace.
#[derive(Debug, thiserror::Error)]
pub enum RemapError {
    /// The channel points at a schema the source never declared.
    #[error("channel {channel} ('{topic}') references unknown schema {schema}")]
    UnknownSchema {
        channel: ChannelId,
        topic: String,
        schema: SchemaId,
    },

    /// The sink merged two identical schema records. Merged recordings
    /// often repeat a schema under a second id.
    #[error(
        "schemas {first} and {second} both map to output schema {output}: \
         the output writer merges identical schema records, the input repeats \
         a schema under two ids (merged recording?)"
    )]
    DuplicateSchema {
        first: SchemaId,
        second: SchemaId,
        output: SchemaId,
    },

    #[error(
        "channels {first} and {second} both map to output channel {output}: \
         the output writer merges identical channel records, the input repeats \
         a channel under two ids (merged recording?)"
    )]
    DuplicateChannel {
        first: ChannelId,
        second: ChannelId,
        output: ChannelId,
    },

    #[error(transparent)]
    Sink(#[from] ContainerError),
}

/// Error of a single file's reduction.
#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("register: {0}")]
    Remap(#[from] RemapError),
}

impl ReduceError {
    /// Phase that failed: open, register, write or io.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReduceError::Container(e) => e.kind(),
            ReduceError::Remap(RemapError::Sink(e)) => e.kind(),
            ReduceError::Remap(_) => ErrorKind::Register,
        }
    }
}
