//! Subtask registry for the `grounding_dino` entrypoint.

use gdino_config::{
    ConfigSchema, MODEL_SECTION, load_model_config_std_env, parse_dotted_overrides,
    shared_model_schema,
};
use gdino_entrypoint::{Dispatcher, FnSubtask, Invocation, ProcessSubtask, SubtaskRegistry};
use gdino_shared::{ErrorEnvelope, ResultExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Network name; also the registry namespace and runner prefix.
pub const NETWORK: &str = "grounding_dino";

/// Directory holding the runner programs; PATH lookup when unset.
pub const RUNNER_DIR_ENV: &str = "GDINO_RUNNER_DIR";

const RUNNERS: [(&str, &str); 4] = [
    ("train", "Train a Grounding DINO model"),
    ("evaluate", "Evaluate a trained model"),
    ("inference", "Run inference on images"),
    ("export", "Export a trained model to ONNX"),
];

/// Build the dispatcher with every subtask registered.
pub fn dispatcher() -> Result<Dispatcher, ErrorEnvelope> {
    let schema = shared_model_schema()?;
    let runner_dir = std::env::var_os(RUNNER_DIR_ENV).map(PathBuf::from);

    let mut builder = SubtaskRegistry::builder(NETWORK);
    for (name, summary) in RUNNERS {
        let schema = Arc::clone(&schema);
        builder = builder.register(
            ProcessSubtask::new(name, summary, runner_program(runner_dir.as_deref(), name))
                .preflight(move |invocation| validate_model(&schema, invocation)),
        );
    }
    let registry = builder
        .register(FnSubtask::new(
            "describe",
            "Describe the model hyperparameters",
            move |invocation| crate::describe::run(&schema, invocation),
        ))
        .build()?;

    Ok(Dispatcher::new(NETWORK, registry).with_version(env!("CARGO_PKG_VERSION")))
}

/// Runner program for `subtask`.
pub fn runner_program(runner_dir: Option<&Path>, subtask: &str) -> PathBuf {
    let program = format!("{NETWORK}-{subtask}");
    runner_dir.map_or_else(|| PathBuf::from(&program), |dir| dir.join(&program))
}

/// Validate the `model` section with dotted overrides and env before launch.
fn validate_model(
    schema: &Arc<ConfigSchema>,
    invocation: &Invocation,
) -> Result<(), ErrorEnvelope> {
    let overrides = parse_dotted_overrides(MODEL_SECTION, &invocation.forwarded)
        .with_metadata("subtask", invocation.subtask.as_str())?;
    let (record, config) = load_model_config_std_env(
        Arc::clone(schema),
        invocation.experiment_spec.as_deref(),
        &overrides,
    )
    .with_metadata("subtask", invocation.subtask.as_str())?;
    tracing::info!(
        subtask = %invocation.subtask,
        fields = record.schema().len(),
        overrides = overrides.len(),
        backbone = %config.backbone,
        "model hyperparameters validated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn registers_runners_and_describe() -> Result<(), Box<dyn Error>> {
        let dispatcher = dispatcher()?;

        let names: Vec<&str> = dispatcher.registry().names().collect();
        assert_eq!(names, ["train", "evaluate", "inference", "export", "describe"]);
        Ok(())
    }

    #[test]
    fn runner_program_uses_the_runner_dir() {
        assert_eq!(
            runner_program(Some(Path::new("/opt/gdino/bin")), "train"),
            PathBuf::from("/opt/gdino/bin/grounding_dino-train")
        );
        assert_eq!(runner_program(None, "export"), PathBuf::from("grounding_dino-export"));
    }

    #[test]
    fn launch_check_rejects_malformed_log_scale() -> Result<(), Box<dyn Error>> {
        let schema = shared_model_schema()?;
        let invocation = Invocation {
            network: NETWORK.to_owned(),
            subtask: "train".to_owned(),
            experiment_spec: None,
            forwarded: vec!["model.log_scale=sometimes".to_owned()],
        };
        let error = validate_model(&schema, &invocation).err();

        assert!(error.as_ref().is_some_and(|error| error.message.contains("log_scale")));
        assert_eq!(
            error.and_then(|error| error.metadata.get("subtask").cloned()),
            Some("train".to_owned())
        );
        Ok(())
    }
}
