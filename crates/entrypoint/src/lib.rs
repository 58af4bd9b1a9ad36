//! # gdino-entrypoint
//!
//! Single command-line entrypoint for a network's subtasks. A
//! [`SubtaskRegistry`] is assembled once at startup, the [`Dispatcher`]
//! parses `[-e SPEC] <subtask> [args...]` into an [`Invocation`] and launches
//! the selected handler. Arguments after the subtask name are forwarded
//! verbatim.

/// Argument parsing and launch.
pub mod dispatch;
/// Discovery, dispatch and handler errors.
pub mod error;
/// Subprocess-backed subtasks.
pub mod process;
/// Subtask trait and registry.
pub mod registry;

pub use dispatch::{Dispatcher, Invocation};
pub use error::{DispatchError, SubtaskDiscoveryError, SubtaskError};
pub use process::{ProcessSubtask, spec_location};
pub use registry::{FnSubtask, Subtask, SubtaskOutcome, SubtaskRegistry, SubtaskRegistryBuilder};

/// Returns the entrypoint crate version.
#[must_use]
pub const fn entrypoint_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_version_is_set() {
        assert!(!entrypoint_crate_version().is_empty());
    }
}
