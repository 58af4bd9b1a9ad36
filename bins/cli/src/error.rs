use gdino_entrypoint::DispatchError;
use gdino_shared::{ErrorCode, ErrorEnvelope, ErrorKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Ok = 0,
    Internal = 1,
    InvalidInput = 2,
}

impl ExitCode {
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Process exit byte for a subtask's own status; out-of-range codes map to
    /// `Internal`.
    #[must_use]
    pub fn from_subtask(code: i32) -> u8 {
        match code {
            0 => Self::Ok.as_u8(),
            code => u8::try_from(code).unwrap_or(Self::Internal.as_u8()),
        }
    }
}

#[derive(Debug)]
pub enum CliError {
    InvalidInput(String),
    Envelope(ErrorEnvelope),
    Io(std::io::Error),
    Serialization(String),
}

impl CliError {
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::Envelope(envelope) => match envelope.kind {
                ErrorKind::Expected => ExitCode::InvalidInput,
                ErrorKind::Invariant | ErrorKind::Unexpected => ExitCode::Internal,
            },
            Self::Io(_) | Self::Serialization(_) => ExitCode::Internal,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(formatter, "invalid input: {message}"),
            Self::Envelope(envelope) => {
                write!(formatter, "[{}] {}", envelope.code, envelope.message)?;
                for (key, value) in &envelope.metadata {
                    write!(formatter, "\n  {key}: {value}")?;
                }
                Ok(())
            },
            Self::Io(error) => write!(formatter, "io error: {error}"),
            Self::Serialization(message) => write!(formatter, "serialization error: {message}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ErrorEnvelope> for CliError {
    fn from(error: ErrorEnvelope) -> Self {
        Self::Envelope(error)
    }
}

impl From<DispatchError> for CliError {
    fn from(error: DispatchError) -> Self {
        Self::Envelope(error.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<serde_yaml_ng::Error> for CliError {
    fn from(error: serde_yaml_ng::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<CliError> for ErrorEnvelope {
    fn from(error: CliError) -> Self {
        match error {
            CliError::Envelope(envelope) => envelope,
            CliError::InvalidInput(message) => Self::expected(ErrorCode::usage(), message),
            CliError::Io(error) => error.into(),
            CliError::Serialization(message) => Self::unexpected(ErrorCode::internal(), message),
        }
    }
}
