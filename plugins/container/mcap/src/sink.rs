use std::fs::File;
use std::path::Path;

use reduce_api::{
    Channel, ChannelId, ContainerError, LogHeader, LogSink, Message, Schema, SchemaId,
};

use crate::compression::Compression;

/// Writer settings that are not part of the log header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkOptions {
    pub compression: Compression,
    /// Target uncompressed chunk size, bytes. `None`: writer default.
    pub chunk_size: Option<u64>,
}

enum State {
    /// Created, header not written yet.
    Pending(File),
    Open(mcap::Writer<File>),
    Finished,
}

// ════════════════════════════════════════════════════════════════
//  McapSink
// ════════════════════════════════════════════════════════════════

/// Chunked, indexed MCAP output. The writer compresses each chunk with the
/// configured codec and emits the summary (statistics included) on `finish`.
pub struct McapSink {
    state: State,
    options: SinkOptions,
}

impl McapSink {
    pub fn create(path: impl AsRef<Path>, options: SinkOptions) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| ContainerError::io(format!("create {}: {e}", path.display())))?;
        Ok(Self::from_file(file, options))
    }

    /// Write into an already opened, empty file.
    pub fn from_file(file: File, options: SinkOptions) -> Self {
        Self {
            state: State::Pending(file),
            options,
        }
    }

    fn writer(&mut self) -> Result<&mut mcap::Writer<File>, ContainerError> {
        match &mut self.state {
            State::Open(writer) => Ok(writer),
            State::Pending(_) => Err(ContainerError::write("sink not started")),
            State::Finished => Err(ContainerError::write("sink already finished")),
        }
    }
}

impl LogSink for McapSink {
    fn start(&mut self, header: &LogHeader) -> Result<(), ContainerError> {
        let file = match std::mem::replace(&mut self.state, State::Finished) {
            State::Pending(file) => file,
            other => {
                self.state = other;
                return Err(ContainerError::write("sink already started"));
            }
        };

        let writer = mcap::WriteOptions::new()
            .compression(self.options.compression.to_mcap())
            .chunk_size(self.options.chunk_size)
            .profile(header.profile.clone())
            .library(header.library.clone())
            .create(file)
            .map_err(|e| ContainerError::write(format!("write header: {e}")))?;
        self.state = State::Open(writer);
        Ok(())
    }

    fn add_schema(&mut self, schema: &Schema) -> Result<SchemaId, ContainerError> {
        self.writer()?
            .add_schema(&schema.name, &schema.encoding, &schema.data)
            .map_err(|e| ContainerError::register(e.to_string()))
    }

    fn add_channel(&mut self, channel: &Channel) -> Result<ChannelId, ContainerError> {
        // schema id 0 marks a schemaless channel in MCAP
        let schema_id = channel.schema_id.unwrap_or(0);
        self.writer()?
            .add_channel(
                schema_id,
                &channel.topic,
                &channel.message_encoding,
                &channel.metadata,
            )
            .map_err(|e| ContainerError::register(e.to_string()))
    }

    fn add_message(&mut self, message: &Message<'_>) -> Result<(), ContainerError> {
        let header = mcap::records::MessageHeader {
            channel_id: message.channel_id,
            sequence: message.sequence,
            log_time: message.log_time,
            publish_time: message.publish_time,
        };
        self.writer()?
            .write_to_known_channel(&header, &message.data)
            .map_err(|e| ContainerError::write(e.to_string()))
    }

    fn finish(&mut self) -> Result<(), ContainerError> {
        self.writer()?
            .finish()
            .map_err(|e| ContainerError::write(format!("finish: {e}")))?;
        self.state = State::Finished;
        Ok(())
    }
}
