use thiserror::Error;

/// Input validation failures raised before a request is sent.
///
/// These are never retried; the caller has to fix the arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// A required string argument was empty or only whitespace.
    #[error("argument '{param}' is empty or whitespace")]
    NullOrWhiteSpace { param: &'static str },

    /// A required request body serialized to nothing.
    #[error("argument '{param}' is a required body but holds no value")]
    MissingBody { param: &'static str },
}

impl ArgumentError {
    /// Fails with [`ArgumentError::NullOrWhiteSpace`] when `value` is blank.
    pub fn check_not_blank(value: &str, param: &'static str) -> Result<(), Self> {
        if value.trim().is_empty() {
            return Err(Self::NullOrWhiteSpace { param });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_rejected() {
        assert_eq!(
            ArgumentError::check_not_blank("", "request_uri"),
            Err(ArgumentError::NullOrWhiteSpace { param: "request_uri" })
        );
        assert!(ArgumentError::check_not_blank(" \t", "request_uri").is_err());
        assert!(ArgumentError::check_not_blank("users", "request_uri").is_ok());
    }
}
