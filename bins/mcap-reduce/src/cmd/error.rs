use reduce_api::ContainerError;
use reduce_engine::ReduceError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("{0}")]
    Container(#[from] ContainerError),

    #[error("{0}")]
    Reduce(#[from] ReduceError),

    #[error("output {path}: {source}")]
    Output { path: String, source: std::io::Error },
}

