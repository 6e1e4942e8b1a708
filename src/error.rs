//! Error types for the conduit CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Soft failures (missing includes, malformed metadata, blocked commands) are
//! not errors; they are reported through structured outcomes instead.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for conduit operations.
#[derive(Error, Debug)]
pub enum ConduitError {
    /// User provided invalid arguments or the project is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// Configuration, ledger or manifest could not be read or parsed.
    #[error("{0}")]
    LoadError(String),

    /// A validation step failed.
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Include resolution could not complete (nesting too deep).
    #[error("Include resolution failed: {0}")]
    IncludeError(String),

    /// An external process failed or could not be started.
    #[error("External process failed: {0}")]
    ProcessError(String),
}

impl ConduitError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConduitError::UserError(_) => exit_codes::USER_ERROR,
            ConduitError::LoadError(_) => exit_codes::LOAD_FAILURE,
            ConduitError::ValidationError(_) => exit_codes::WORKFLOW_FAILURE,
            ConduitError::IncludeError(_) => exit_codes::WORKFLOW_FAILURE,
            ConduitError::ProcessError(_) => exit_codes::PROCESS_FAILURE,
        }
    }
}

/// Result type alias for conduit operations.
pub type Result<T> = std::result::Result<T, ConduitError>;
