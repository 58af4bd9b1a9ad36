use crate::error::DispatchError;
use crate::registry::{SubtaskOutcome, SubtaskRegistry};
use clap::{Arg, ArgMatches, Command, value_parser};
use gdino_shared::ErrorEnvelope;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Instant;

const SPEC_ARG: &str = "experiment_spec_file";

/// One parsed command line, ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Network name (registry namespace).
    pub network: String,
    /// Selected subtask.
    pub subtask: String,
    /// `-e/--experiment_spec_file`, when given before the subtask name.
    pub experiment_spec: Option<PathBuf>,
    /// Arguments after the subtask name, verbatim and in order.
    pub forwarded: Vec<String>,
}

/// Parses the command line and launches the selected subtask.
#[derive(Debug)]
pub struct Dispatcher {
    network: &'static str,
    version: Option<&'static str>,
    registry: SubtaskRegistry,
}

impl Dispatcher {
    /// Dispatcher for `network` over a built registry.
    #[must_use]
    pub const fn new(network: &'static str, registry: SubtaskRegistry) -> Self {
        Self {
            network,
            version: None,
            registry,
        }
    }

    /// Version reported by `--version`.
    #[must_use]
    pub const fn with_version(mut self, version: &'static str) -> Self {
        self.version = Some(version);
        self
    }

    /// Registered subtasks.
    #[must_use]
    pub const fn registry(&self) -> &SubtaskRegistry {
        &self.registry
    }

    /// Top-level parser. Subtask arguments are never interpreted here.
    #[must_use]
    pub fn command(&self) -> Command {
        let mut command = Command::new(self.network)
            .about(format!("Entrypoint for the {} subtasks", self.network))
            .arg(
                Arg::new(SPEC_ARG)
                    .short('e')
                    .long(SPEC_ARG)
                    .value_name("SPEC")
                    .value_parser(value_parser!(PathBuf))
                    .help("Experiment spec file (YAML, JSON or TOML)"),
            )
            .subcommand_value_name("SUBTASK")
            .allow_external_subcommands(true)
            .external_subcommand_value_parser(value_parser!(String))
            .disable_help_subcommand(true)
            .after_help(self.subtask_listing());
        if let Some(version) = self.version {
            command = command.version(version);
        }
        command
    }

    /// Parse arguments (without the program name) into an [`Invocation`].
    pub fn parse<I, T>(&self, args: I) -> Result<Invocation, DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let argv =
            std::iter::once(OsString::from(self.network)).chain(args.into_iter().map(Into::into));
        let matches = self.command().try_get_matches_from(argv)?;
        let experiment_spec = matches.get_one::<PathBuf>(SPEC_ARG).cloned();

        let Some((subtask, sub_matches)) = matches.subcommand() else {
            return Err(DispatchError::MissingSubtask {
                available: self.available(),
            });
        };
        if self.registry.get(subtask).is_none() {
            return Err(DispatchError::SubtaskNotFound {
                requested: subtask.to_owned(),
                available: self.available(),
            });
        }

        let invocation = Invocation {
            network: self.network.to_owned(),
            subtask: subtask.to_owned(),
            experiment_spec,
            forwarded: forwarded_args(sub_matches),
        };
        tracing::debug!(
            subtask = %invocation.subtask,
            forwarded = invocation.forwarded.len(),
            "parsed command line"
        );
        Ok(invocation)
    }

    /// Run the selected subtask once, logging elapsed time and final status.
    pub fn launch(&self, invocation: &Invocation) -> Result<SubtaskOutcome, ErrorEnvelope> {
        let subtask = self.registry.get(&invocation.subtask).ok_or_else(|| {
            ErrorEnvelope::from(DispatchError::SubtaskNotFound {
                requested: invocation.subtask.clone(),
                available: self.available(),
            })
        })?;

        tracing::info!(network = %self.network, subtask = %invocation.subtask, "starting subtask");
        let started = Instant::now();
        let result = subtask.run(invocation);
        let elapsed_secs = started.elapsed().as_secs_f64();

        match &result {
            Ok(outcome) if outcome.is_success() => {
                tracing::info!(subtask = %invocation.subtask, elapsed_secs, "Execution status: PASS");
            },
            Ok(outcome) => {
                tracing::warn!(
                    subtask = %invocation.subtask,
                    exit_code = outcome.exit_code,
                    elapsed_secs,
                    "Execution status: FAIL"
                );
            },
            Err(error) => {
                tracing::warn!(
                    subtask = %invocation.subtask,
                    error = %error,
                    elapsed_secs,
                    "Execution status: FAIL"
                );
            },
        }
        result
    }

    fn available(&self) -> Vec<String> {
        self.registry.names().map(str::to_owned).collect()
    }

    fn subtask_listing(&self) -> String {
        let width = self.registry.names().map(str::len).max().unwrap_or(0);
        let entries: String = self
            .registry
            .iter()
            .map(|subtask| format!("  {:<width$}  {}\n", subtask.name(), subtask.summary()))
            .collect();
        format!("Subtasks:\n{entries}")
    }
}

fn forwarded_args(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("")
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FnSubtask;
    use gdino_shared::ErrorCode;
    use std::error::Error;

    fn dispatcher() -> Result<Dispatcher, Box<dyn Error>> {
        let registry = SubtaskRegistry::builder("grounding_dino")
            .register(FnSubtask::new("train", "Train a model", |_| Ok(SubtaskOutcome::SUCCESS)))
            .register(FnSubtask::new("evaluate", "Evaluate a model", |_| {
                Ok(SubtaskOutcome::exited(3))
            }))
            .register(FnSubtask::new("export", "Export a model", |_| {
                Err(ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad export"))
            }))
            .build()?;
        Ok(Dispatcher::new("grounding_dino", registry).with_version("0.1.0"))
    }

    #[test]
    fn selects_subtask_and_forwards_remaining_args() -> Result<(), Box<dyn Error>> {
        let invocation = dispatcher()?.parse(["evaluate", "--epoch", "5"])?;

        assert_eq!(invocation.subtask, "evaluate");
        assert_eq!(invocation.forwarded, ["--epoch", "5"]);
        assert_eq!(invocation.experiment_spec, None);
        Ok(())
    }

    #[test]
    fn spec_flag_is_only_read_before_the_subtask() -> Result<(), Box<dyn Error>> {
        let invocation = dispatcher()?.parse([
            "-e",
            "specs/train.yaml",
            "train",
            "-e",
            "other.yaml",
            "model.num_queries=300",
        ])?;

        assert_eq!(invocation.experiment_spec, Some(PathBuf::from("specs/train.yaml")));
        assert_eq!(invocation.forwarded, ["-e", "other.yaml", "model.num_queries=300"]);
        Ok(())
    }

    #[test]
    fn help_after_the_subtask_is_forwarded() -> Result<(), Box<dyn Error>> {
        let invocation = dispatcher()?.parse(["train", "--help"])?;

        assert_eq!(invocation.forwarded, ["--help"]);
        Ok(())
    }

    #[test]
    fn unknown_subtask_lists_registered_names() -> Result<(), Box<dyn Error>> {
        let error = dispatcher()?.parse(["bogus"]).err();

        assert!(matches!(
            error,
            Some(DispatchError::SubtaskNotFound { ref requested, ref available })
                if requested == "bogus" && *available == ["train", "evaluate", "export"]
        ));
        Ok(())
    }

    #[test]
    fn missing_subtask_is_a_usage_error() -> Result<(), Box<dyn Error>> {
        let error = dispatcher()?.parse(["-e", "spec.yaml"]).err();

        assert!(matches!(error, Some(DispatchError::MissingSubtask { .. })));
        Ok(())
    }

    #[test]
    fn unknown_top_level_flag_is_rejected() -> Result<(), Box<dyn Error>> {
        let error = dispatcher()?.parse(["--epochs", "3", "train"]).err();

        assert!(matches!(error, Some(DispatchError::Arguments(ref error)) if error.exit_code() == 2));
        Ok(())
    }

    #[test]
    fn help_lists_subtasks() -> Result<(), Box<dyn Error>> {
        let help = dispatcher()?.command().render_help().to_string();

        assert!(help.contains("Subtasks:"));
        assert!(help.contains("evaluate  Evaluate a model"));
        Ok(())
    }

    #[test]
    fn subtask_listing_aligns_every_summary() -> Result<(), Box<dyn Error>> {
        let listing = dispatcher()?.subtask_listing();

        assert_eq!(
            listing,
            "Subtasks:\n  train     Train a model\n  evaluate  Evaluate a model\n  export    Export a model\n"
        );
        Ok(())
    }

    #[test]
    fn launch_returns_the_handler_outcome() -> Result<(), Box<dyn Error>> {
        let dispatcher = dispatcher()?;

        let passed = dispatcher.launch(&dispatcher.parse(["train"])?)?;
        assert!(passed.is_success());

        let failed = dispatcher.launch(&dispatcher.parse(["evaluate"])?)?;
        assert_eq!(failed.exit_code, 3);

        let error = dispatcher.launch(&dispatcher.parse(["export"])?).err();
        assert_eq!(error.map(|error| error.message), Some("bad export".to_owned()));
        Ok(())
    }
}
