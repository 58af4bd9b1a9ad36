use gdino_shared::{ErrorCode, ErrorEnvelope};
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Registry assembly failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtaskDiscoveryError {
    /// No subtask was registered.
    Empty {
        /// Registry namespace.
        namespace: String,
    },
    /// Two handlers claim the same name.
    Duplicate {
        /// Registry namespace.
        namespace: String,
        /// Conflicting subtask name.
        name: String,
    },
}

impl SubtaskDiscoveryError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::Empty { .. } => ErrorCode::new("entrypoint", "no_subtasks"),
            Self::Duplicate { .. } => ErrorCode::new("entrypoint", "duplicate_subtask"),
        }
    }
}

impl fmt::Display for SubtaskDiscoveryError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { namespace } => {
                write!(formatter, "no subtasks registered for {namespace}")
            },
            Self::Duplicate { namespace, name } => {
                write!(formatter, "subtask `{name}` registered twice for {namespace}")
            },
        }
    }
}

impl std::error::Error for SubtaskDiscoveryError {}

impl From<SubtaskDiscoveryError> for ErrorEnvelope {
    fn from(error: SubtaskDiscoveryError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let envelope = Self::invariant(code, message);

        match error {
            SubtaskDiscoveryError::Empty { namespace } => {
                envelope.with_metadata("namespace", namespace)
            },
            SubtaskDiscoveryError::Duplicate { namespace, name } => envelope
                .with_metadata("namespace", namespace)
                .with_metadata("subtask", name),
        }
    }
}

/// Command-line parsing failure.
#[derive(Debug)]
pub enum DispatchError {
    /// Top-level arguments rejected by the parser (also covers `--help` and
    /// `--version` displays, which carry a zero exit code).
    Arguments(clap::Error),
    /// No subtask name was given.
    MissingSubtask {
        /// Registered names.
        available: Vec<String>,
    },
    /// The requested subtask is not registered.
    SubtaskNotFound {
        /// Requested name.
        requested: String,
        /// Registered names.
        available: Vec<String>,
    },
}

impl DispatchError {
    /// Registered names, when the error lists them.
    #[must_use]
    pub fn available(&self) -> &[String] {
        match self {
            Self::Arguments(_) => &[],
            Self::MissingSubtask { available } | Self::SubtaskNotFound { available, .. } => {
                available
            },
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arguments(error) => write!(formatter, "{}", error.to_string().trim_end()),
            Self::MissingSubtask { available } => write!(
                formatter,
                "a subtask is required; choose one of: {}",
                available.join(", ")
            ),
            Self::SubtaskNotFound {
                requested,
                available,
            } => write!(
                formatter,
                "unknown subtask `{requested}`; choose one of: {}",
                available.join(", ")
            ),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Arguments(error) => Some(error),
            Self::MissingSubtask { .. } | Self::SubtaskNotFound { .. } => None,
        }
    }
}

impl From<clap::Error> for DispatchError {
    fn from(error: clap::Error) -> Self {
        Self::Arguments(error)
    }
}

impl From<DispatchError> for ErrorEnvelope {
    fn from(error: DispatchError) -> Self {
        let message = error.to_string();
        let envelope = Self::expected(ErrorCode::usage(), message);

        match error {
            DispatchError::Arguments(error) => {
                envelope.with_metadata("clap_kind", error.kind().to_string())
            },
            DispatchError::MissingSubtask { available } => {
                envelope.with_metadata("available", available.join(","))
            },
            DispatchError::SubtaskNotFound {
                requested,
                available,
            } => envelope
                .with_metadata("requested", requested)
                .with_metadata("available", available.join(",")),
        }
    }
}

/// Handler failure while running a subtask.
#[derive(Debug)]
pub enum SubtaskError {
    /// The subtask needs `-e/--experiment_spec_file`.
    MissingSpec {
        /// Subtask name.
        subtask: String,
    },
    /// The spec path has no file name component.
    InvalidSpecPath {
        /// Offending path.
        path: PathBuf,
    },
    /// The runner could not be started.
    Spawn {
        /// Runner program.
        program: PathBuf,
        /// Underlying failure.
        source: io::Error,
    },
    /// The runner was killed by a signal.
    Terminated {
        /// Subtask name.
        subtask: String,
    },
}

impl SubtaskError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingSpec { .. } => ErrorCode::usage(),
            Self::InvalidSpecPath { .. } => ErrorCode::new("entrypoint", "invalid_spec_path"),
            Self::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorCode::new("entrypoint", "runner_not_found")
            },
            Self::Spawn { .. } => ErrorCode::new("entrypoint", "runner_spawn_failed"),
            Self::Terminated { .. } => ErrorCode::new("entrypoint", "subtask_terminated"),
        }
    }
}

impl fmt::Display for SubtaskError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSpec { subtask } => write!(
                formatter,
                "an experiment spec file is required for `{subtask}` (-e/--experiment_spec_file)"
            ),
            Self::InvalidSpecPath { path } => {
                write!(formatter, "experiment spec path {} names no file", path.display())
            },
            Self::Spawn { program, source } => {
                write!(formatter, "failed to start {}: {source}", program.display())
            },
            Self::Terminated { subtask } => {
                write!(formatter, "subtask `{subtask}` was terminated by a signal")
            },
        }
    }
}

impl std::error::Error for SubtaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::MissingSpec { .. } | Self::InvalidSpecPath { .. } | Self::Terminated { .. } => {
                None
            },
        }
    }
}

impl From<SubtaskError> for ErrorEnvelope {
    fn from(error: SubtaskError) -> Self {
        let code = error.error_code();
        let message = error.to_string();

        match error {
            SubtaskError::MissingSpec { subtask } => {
                Self::expected(code, message).with_metadata("subtask", subtask)
            },
            SubtaskError::InvalidSpecPath { path } => {
                Self::expected(code, message).with_metadata("path", path.to_string_lossy())
            },
            SubtaskError::Spawn { program, .. } => {
                Self::unexpected(code, message).with_metadata("program", program.to_string_lossy())
            },
            SubtaskError::Terminated { subtask } => {
                Self::unexpected(code, message).with_metadata("subtask", subtask)
            },
        }
    }
}
