use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StudioError {
    /// Missing or rejected credential. The user has to enter a new key.
    #[error("Authentication error: {0}")]
    AuthConfigError(String),
    #[error("Remote call error: {0}")]
    RemoteCallError(String),
    /// The service answered but produced no image.
    #[error("No image was generated: {0}")]
    EmptyResultWarning(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Staging error: {0}")]
    StagingError(String),
}

impl StudioError {
    pub fn is_warning(&self) -> bool {
        matches!(self, StudioError::EmptyResultWarning(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, StudioError::AuthConfigError(_))
    }
}

impl From<std::io::Error> for StudioError {
    fn from(e: std::io::Error) -> Self {
        StudioError::StagingError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_empty_result_is_a_warning() {
        assert!(StudioError::EmptyResultWarning("x".into()).is_warning());
        assert!(!StudioError::RemoteCallError("x".into()).is_warning());
        assert!(!StudioError::AuthConfigError("x".into()).is_warning());
    }

    #[test]
    fn test_display_carries_message() {
        let err = StudioError::RemoteCallError("connection reset".into());
        assert_eq!(err.to_string(), "Remote call error: connection reset");
    }
}
