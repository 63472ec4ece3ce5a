pub mod container;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod record;

pub use container::{LogHeader, LogSink, LogSource, MessageIter};
pub use error::{ContainerError, ErrorKind};
#[cfg(any(test, feature = "testing"))]
pub use memory::{MemoryLog, MemorySink};
pub use record::{Channel, ChannelId, LogStatistics, Message, Schema, SchemaId};
