//! # gdino-shared
//!
//! Error envelope and result types shared by the schema, entrypoint and CLI
//! crates.
//!
//! Every domain error in the workspace (schema definition, record validation,
//! subtask discovery and dispatch) converts into an [`ErrorEnvelope`] so the
//! CLI boundary renders and classifies failures in one place.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod errors;
pub mod result;

pub use errors::{
    ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata, UnexpectedError,
    normalize_unexpected_error,
};
pub use result::{Result, ResultExt};

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
