use thiserror::Error;

/// Canonical error type shared by the gate, the audit store and the API layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A request-scoped value that an upstream layer should have attached is missing.
    #[error("unable to resolve {what} from request context")]
    Context {
        /// Name of the missing context value (e.g. `"credential"`).
        what: &'static str,
    },

    /// A caller-supplied parameter could not be parsed.
    #[error("invalid value \"{value}\" for query param \"{name}\"")]
    InvalidParameter {
        /// Parameter name as it appears on the wire.
        name: &'static str,
        /// The rejected raw value.
        value: String,
    },

    /// An origin pattern could not be compiled into a matcher.
    #[error("invalid origin pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// The pattern as configured on the permission record.
        pattern: String,
        /// Compiler diagnostic.
        message: String,
    },

    /// Entity already exists and cannot be created again.
    #[error("{entity} `{id}` already exists")]
    AlreadyExists {
        /// Entity type name (e.g. `"index"`).
        entity: &'static str,
        /// Identifier that conflicts.
        id: String,
    },

    /// The storage engine rejected or failed an operation.
    #[error("storage error: {0}")]
    StorageError(String),

    /// The storage engine did not answer within the configured deadline.
    #[error("storage request timed out: {0}")]
    Timeout(String),

    /// Serialization error occurred.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error occurred.
    #[error("deserialization error: {0}")]
    DeserializationError(String),

    /// Unexpected internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable details for debugging purposes.
        message: String,
    },
}

impl CoreError {
    /// Creates a `Context` variant.
    #[must_use]
    pub fn context(what: &'static str) -> Self {
        Self::Context { what }
    }

    /// Creates an `InvalidParameter` variant.
    #[must_use]
    pub fn invalid_parameter(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value: value.into(),
        }
    }

    /// Creates an `InvalidPattern` variant.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Creates an `AlreadyExists` variant.
    #[must_use]
    pub fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.into(),
        }
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error was caused by caller input rather than a server fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_eof() || err.is_syntax() || err.is_data() {
            Self::DeserializationError(err.to_string())
        } else {
            Self::SerializationError(err.to_string())
        }
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_names_the_param() {
        let err = CoreError::invalid_parameter("from", "x");
        assert_eq!(err.to_string(), r#"invalid value "x" for query param "from""#);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_context_error_is_not_client_error() {
        let err = CoreError::context("credential");
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("credential"));
    }

    #[test]
    fn test_json_syntax_error_maps_to_deserialization() {
        let err: CoreError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, CoreError::DeserializationError(_)));
    }
}
