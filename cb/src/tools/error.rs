//! Tool error types

use thiserror::Error;

use crate::backend::BackendError;

/// Failures that abort the turn instead of being reported to the agent
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Remote tool '{name}' failed: {source}")]
    Backend {
        name: String,
        #[source]
        source: BackendError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_message() {
        let err = ToolError::Backend {
            name: "validate_manifest".to_string(),
            source: BackendError::Closed,
        };

        let msg = err.to_string();
        assert!(msg.contains("validate_manifest"));
        assert!(msg.contains("connection closed"));
    }
}
