mod compression;
mod sink;
mod source;

pub use compression::Compression;
pub use sink::{McapSink, SinkOptions};
pub use source::McapSource;
