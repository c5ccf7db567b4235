//! Error types for route operations.
//!
//! Only route creation carries typed errors. Teardown and unload paths are
//! deliberately fire-and-forget: a module that is already gone is a benign
//! race with the external server, reported as a boolean at most.

use crate::route::RouteKind;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// Fewer than two devices were supplied to a combine/mix request.
    /// Rejected before any command is issued.
    #[error("need at least 2 devices to combine, got {0}")]
    InsufficientMembers(usize),

    /// A non-orphan route of the same kind with the same member set already
    /// exists; creation is skipped.
    #[error("an equivalent {0} route already exists")]
    DuplicateRoute(RouteKind),

    /// A critical module-load stage failed. For single-command pipelines
    /// nothing was created; for the mixed-input pipeline this is the
    /// null-mixer stage, which aborts before anything is built.
    #[error("failed to load {module}: {detail}")]
    LoadFailed {
        module: &'static str,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            RouteError::InsufficientMembers(1).to_string(),
            "need at least 2 devices to combine, got 1"
        );
        assert_eq!(
            RouteError::DuplicateRoute(RouteKind::Input).to_string(),
            "an equivalent input route already exists"
        );
    }
}
