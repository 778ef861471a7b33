//! Error handling for route resolution
//!
//! Pattern mismatches and guard rejections are not errors: the traverser
//! backtracks silently. `RouterError` covers the cases that are.

use crate::route::GuardId;

/// Error returned by a lazy loader factory.
pub type LoadError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while resolving routes
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// A route names a guard that the registry cannot supply
    #[error("Guard not registered: {id}")]
    GuardNotRegistered { id: GuardId },

    /// A lazy children/index/component loader failed
    #[error("Failed to load {resource}: {source}")]
    Load {
        resource: &'static str,
        #[source]
        source: LoadError,
    },

    /// A route path pattern failed validation
    #[error("Invalid route path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A hook reported a failure on its stream
    #[error("Hook failed: {message}")]
    Hook { message: String },
}

impl RouterError {
    /// Create a hook error with a message
    pub fn hook(message: impl Into<String>) -> Self {
        RouterError::Hook {
            message: message.into(),
        }
    }

    /// Configuration errors abort the whole traversal instead of being
    /// treated as "no match" for the failing branch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RouterError::GuardNotRegistered { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_guard_not_registered_display() {
        let error = RouterError::GuardNotRegistered {
            id: GuardId::from("auth"),
        };
        assert_eq!(error.to_string(), "Guard not registered: auth");
        assert!(error.is_fatal());
    }

    #[test]
    fn test_load_error_keeps_source() {
        let source: LoadError = "connection reset".into();
        let error = RouterError::Load {
            resource: "children",
            source,
        };

        assert_eq!(
            error.to_string(),
            "Failed to load children: connection reset"
        );
        assert!(error.source().is_some());
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_hook_error() {
        let error = RouterError::hook("resolver timed out");
        assert_eq!(error.to_string(), "Hook failed: resolver timed out");
        assert!(!error.is_fatal());
    }
}
