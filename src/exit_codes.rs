//! Exit code constants for the conduit CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, missing directories, invalid state)
//! - 2: Workflow or validation failure
//! - 3: Command blocked pending HIL approval
//! - 4: Load failure (config, ledger or manifest unreadable/unparseable)
//! - 5: External process failure

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid state.
pub const USER_ERROR: i32 = 1;

/// A workflow step or pre-execution validation failed.
pub const WORKFLOW_FAILURE: i32 = 2;

/// The HIL gate refused automatic execution.
pub const APPROVAL_REQUIRED: i32 = 3;

/// Configuration, ledger or manifest could not be loaded.
pub const LOAD_FAILURE: i32 = 4;

/// An external process exited non-zero or could not be spawned.
pub const PROCESS_FAILURE: i32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [
            SUCCESS,
            USER_ERROR,
            WORKFLOW_FAILURE,
            APPROVAL_REQUIRED,
            LOAD_FAILURE,
            PROCESS_FAILURE,
        ];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
        assert_eq!(USER_ERROR, 1);
    }
}
