use crate::dispatch::Invocation;
use crate::error::SubtaskError;
use crate::registry::{Subtask, SubtaskOutcome};
use gdino_shared::ErrorEnvelope;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

type Preflight = Box<dyn Fn(&Invocation) -> Result<(), ErrorEnvelope> + Send + Sync>;

/// Split a spec path into its absolute parent directory and file name.
pub fn spec_location(path: &Path) -> Result<(PathBuf, OsString), SubtaskError> {
    let invalid = || SubtaskError::InvalidSpecPath {
        path: path.to_path_buf(),
    };
    let absolute = std::path::absolute(path).map_err(|_| invalid())?;
    let name = absolute.file_name().ok_or_else(invalid)?.to_os_string();
    let dir = absolute.parent().ok_or_else(invalid)?.to_path_buf();
    Ok((dir, name))
}

/// Subtask that runs an external runner program and reports its exit status.
///
/// The runner receives `[base args] [--config-path <dir> --config-name <file>]
/// <forwarded args>`. It is started once and never retried.
pub struct ProcessSubtask {
    name: Box<str>,
    summary: Box<str>,
    program: PathBuf,
    base_args: Vec<OsString>,
    requires_spec: bool,
    preflight: Option<Preflight>,
}

impl ProcessSubtask {
    /// Runner-backed subtask; an experiment spec is required by default.
    pub fn new(
        name: impl Into<Box<str>>,
        summary: impl Into<Box<str>>,
        program: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            program: program.into(),
            base_args: Vec::new(),
            requires_spec: true,
            preflight: None,
        }
    }

    /// Argument placed before the spec location and forwarded args.
    #[must_use]
    pub fn base_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.base_args.push(arg.into());
        self
    }

    /// Allow running without `-e/--experiment_spec_file`.
    #[must_use]
    pub const fn spec_optional(mut self) -> Self {
        self.requires_spec = false;
        self
    }

    /// Check run before the runner starts; an error aborts the launch.
    #[must_use]
    pub fn preflight<F>(mut self, check: F) -> Self
    where
        F: Fn(&Invocation) -> Result<(), ErrorEnvelope> + Send + Sync + 'static,
    {
        self.preflight = Some(Box::new(check));
        self
    }

    /// Runner program.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full runner argument list for `invocation`.
    pub fn runner_args(&self, invocation: &Invocation) -> Result<Vec<OsString>, SubtaskError> {
        let mut args = self.base_args.clone();
        match &invocation.experiment_spec {
            Some(spec) => {
                let (dir, name) = spec_location(spec)?;
                args.push("--config-path".into());
                args.push(dir.into_os_string());
                args.push("--config-name".into());
                args.push(name);
            },
            None if self.requires_spec => {
                return Err(SubtaskError::MissingSpec {
                    subtask: self.name.to_string(),
                });
            },
            None => {},
        }
        args.extend(invocation.forwarded.iter().map(OsString::from));
        Ok(args)
    }
}

impl fmt::Debug for ProcessSubtask {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProcessSubtask")
            .field("name", &self.name)
            .field("program", &self.program)
            .field("base_args", &self.base_args)
            .field("requires_spec", &self.requires_spec)
            .field("preflight", &self.preflight.is_some())
            .finish_non_exhaustive()
    }
}

impl Subtask for ProcessSubtask {
    fn name(&self) -> &str {
        &self.name
    }

    fn summary(&self) -> &str {
        &self.summary
    }

    fn run(&self, invocation: &Invocation) -> Result<SubtaskOutcome, ErrorEnvelope> {
        let args = self.runner_args(invocation)?;
        if let Some(check) = &self.preflight {
            check(invocation)?;
        }

        tracing::debug!(program = %self.program.display(), args = ?args, "spawning runner");
        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|source| SubtaskError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        match status.code() {
            Some(code) => Ok(SubtaskOutcome::exited(code)),
            None => Err(SubtaskError::Terminated {
                subtask: self.name.to_string(),
            }
            .into()),
        }
    }
}
