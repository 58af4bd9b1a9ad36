//! `grounding_dino` binary: `grounding_dino [-e SPEC] <subtask> [args...]`.

mod describe;
mod error;
mod format;
mod logging;
mod subtasks;

use error::{CliError, ExitCode};
use gdino_entrypoint::DispatchError;
use std::io::{self, Write};

fn main() -> std::process::ExitCode {
    if let Err(error) = logging::init() {
        // The subscriber that is already installed receives this.
        tracing::warn!(%error, "logging setup skipped");
    }

    match run() {
        Ok(code) => std::process::ExitCode::from(code),
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    if let Err(io_error) = write_error(&mut io::stderr().lock(), error) {
        tracing::error!(%error, %io_error, "failed to write error to stderr");
    }
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn write_error(out: &mut impl Write, error: &CliError) -> io::Result<()> {
    writeln!(out, "error: {error}")?;
    out.flush()
}

fn run() -> Result<u8, CliError> {
    let dispatcher = subtasks::dispatcher()?;

    let invocation = match dispatcher.parse(std::env::args_os().skip(1)) {
        Ok(invocation) => invocation,
        Err(DispatchError::Arguments(error)) => {
            // clap renders help, version and usage errors itself.
            if let Err(io_error) = error.print() {
                tracing::warn!(%io_error, "failed to print usage");
            }
            return Ok(ExitCode::from_subtask(error.exit_code()));
        },
        Err(error) => return Err(error.into()),
    };

    let outcome = dispatcher.launch(&invocation)?;
    Ok(ExitCode::from_subtask(outcome.exit_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn errors_are_written_with_a_prefix() -> io::Result<()> {
        let mut out = Vec::new();
        write_error(&mut out, &CliError::InvalidInput("missing spec".to_owned()))?;

        assert_eq!(String::from_utf8_lossy(&out), "error: invalid input: missing spec\n");
        Ok(())
    }

    #[test]
    fn closed_stderr_is_reported_to_the_caller() {
        let error = write_error(&mut ClosedPipe, &CliError::InvalidInput("x".to_owned())).err();

        assert_eq!(error.map(|error| error.kind()), Some(io::ErrorKind::BrokenPipe));
    }
}
