pub mod error;
pub mod policy;
pub mod pump;
pub mod rate;
pub mod reduce;
pub mod remap;

pub use error::{ReduceError, RemapError};
pub use policy::{Decimator, PolicyConfig, PolicyKind, DEFAULT_MAX_FREQUENCY};
pub use pump::PumpStats;
pub use reduce::{reduce, ReduceOptions, ReduceStats, Reduction};
pub use remap::RemapTable;
