/// Category of a container error. Lets the caller tell which phase of a
/// file's reduction failed without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source could not be opened or parsed.
    Open,
    /// Schema/channel not accepted by the sink.
    Register,
    /// Message write or finalize failed.
    Write,
    /// Plain file-system failure.
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Open => f.write_str("open"),
            ErrorKind::Register => f.write_str("register"),
            ErrorKind::Write => f.write_str("write"),
            ErrorKind::Io => f.write_str("io"),
        }
    }
}

/// Error returned by `LogSource` / `LogSink` implementations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ContainerError {
    kind: ErrorKind,
    message: String,
}

impl ContainerError {
    pub fn open(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Open, message: msg.into() }
    }

    pub fn register(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Register, message: msg.into() }
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Write, message: msg.into() }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, message: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prepend context, keeping the kind.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl From<std::io::Error> for ContainerError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_kind() {
        let err = ContainerError::register("duplicate schema").with_context("schema 4");
        assert_eq!(err.kind(), ErrorKind::Register);
        assert_eq!(err.message(), "schema 4: duplicate schema");
        assert_eq!(err.to_string(), "register: schema 4: duplicate schema");
    }

    #[test]
    fn io_error_maps_to_io_kind() {
        let err: ContainerError = std::io::Error::other("disk full").into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
