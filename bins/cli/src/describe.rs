//! In-process `describe` subtask: prints the model schema, its AutoML search
//! space, the JSON Schema of the typed config, or the effective config for a
//! spec file.

use crate::error::CliError;
use crate::format::OutputFormat;
use clap::Parser;
use gdino_config::{
    ConfigSchema, MODEL_SECTION, load_model_config_std_env, model_json_schema,
    parse_dotted_overrides, search_space, to_pretty_json, to_pretty_yaml,
};
use gdino_entrypoint::{Invocation, SubtaskOutcome};
use gdino_shared::{ErrorCode, ErrorEnvelope};
use std::io::{self, Write};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "describe", about = "Describe the model hyperparameters")]
struct DescribeArgs {
    /// Print only the AutoML search space.
    #[arg(long, conflicts_with_all = ["json_schema", "effective"])]
    automl: bool,
    /// Print the JSON Schema of the typed model config.
    #[arg(long, conflicts_with = "effective")]
    json_schema: bool,
    /// Print the validated model config for `-e`, dotted overrides and env.
    #[arg(long)]
    effective: bool,
    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
    /// `model.<field>=<value>` overrides applied with `--effective`.
    #[arg(requires = "effective")]
    overrides: Vec<String>,
}

/// Run `describe` for `invocation`, printing to stdout.
pub fn run(
    schema: &Arc<ConfigSchema>,
    invocation: &Invocation,
) -> Result<SubtaskOutcome, ErrorEnvelope> {
    let args = std::iter::once(invocation.subtask.as_str())
        .chain(invocation.forwarded.iter().map(String::as_str));
    let args = match DescribeArgs::try_parse_from(args) {
        Ok(args) => args,
        Err(error) if !error.use_stderr() => {
            error.print()?;
            return Ok(SubtaskOutcome::SUCCESS);
        },
        Err(error) => {
            return Err(ErrorEnvelope::expected(
                ErrorCode::usage(),
                error.to_string().trim_end(),
            ));
        },
    };

    let output = render(schema, invocation, &args)?;
    io::stdout().write_all(output.as_bytes())?;
    Ok(SubtaskOutcome::SUCCESS)
}

fn render(
    schema: &Arc<ConfigSchema>,
    invocation: &Invocation,
    args: &DescribeArgs,
) -> Result<String, CliError> {
    if args.automl {
        return args.format.render(&search_space(schema));
    }
    if args.json_schema {
        return args.format.render(&model_json_schema());
    }
    if !args.effective {
        return args.format.render(&**schema);
    }

    let Some(spec) = invocation.experiment_spec.as_deref() else {
        return Err(CliError::InvalidInput(
            "--effective needs -e/--experiment_spec_file before the subtask".to_owned(),
        ));
    };
    let overrides =
        parse_dotted_overrides(MODEL_SECTION, &args.overrides).map_err(ErrorEnvelope::from)?;
    let (record, _) = load_model_config_std_env(Arc::clone(schema), Some(spec), &overrides)?;
    let output = match args.format {
        OutputFormat::Json => to_pretty_json(&record)?,
        OutputFormat::Yaml => to_pretty_yaml(&record)?,
    };
    Ok(output)
}
