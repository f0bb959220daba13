use bridge_traits::synthesis::{SynthesisErrorKind, SynthesisFailure};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CloudTtsError {
    /// No credential has been provided for this session.
    #[error("No API credential set")]
    MissingCredential,

    /// The supplied credential does not look like a service API key.
    #[error("Invalid API credential: {0}")]
    InvalidCredential(String),

    /// Request rejected locally before submission.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The service rejected the credential (401/403).
    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// The service reported quota exhaustion (429).
    #[error("Quota exceeded: {message}")]
    Quota { message: String },

    /// Any other non-success status from the service.
    #[error("Service error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a status (DNS, TLS, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// A success status with a body the client could not use.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CloudTtsError {
    /// Classify a non-success service status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => CloudTtsError::Auth { status, message },
            429 => CloudTtsError::Quota { message },
            _ => CloudTtsError::Api { status, message },
        }
    }
}

impl From<CloudTtsError> for SynthesisFailure {
    fn from(error: CloudTtsError) -> Self {
        let kind = match &error {
            CloudTtsError::Auth { .. }
            | CloudTtsError::MissingCredential
            | CloudTtsError::InvalidCredential(_) => SynthesisErrorKind::Auth,
            CloudTtsError::Quota { .. } => SynthesisErrorKind::Quota,
            CloudTtsError::Network(_) => SynthesisErrorKind::Network,
            _ => SynthesisErrorKind::Other,
        };
        SynthesisFailure::new(kind, error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CloudTtsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            CloudTtsError::from_status(401, "denied"),
            CloudTtsError::Auth { status: 401, .. }
        ));
        assert!(matches!(
            CloudTtsError::from_status(403, "denied"),
            CloudTtsError::Auth { status: 403, .. }
        ));
        assert!(matches!(
            CloudTtsError::from_status(429, "limit"),
            CloudTtsError::Quota { .. }
        ));
        assert!(matches!(
            CloudTtsError::from_status(500, "boom"),
            CloudTtsError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn conversion_to_synthesis_failure_kinds() {
        let auth: SynthesisFailure = CloudTtsError::from_status(403, "x").into();
        assert_eq!(auth.kind, SynthesisErrorKind::Auth);

        let quota: SynthesisFailure = CloudTtsError::from_status(429, "x").into();
        assert_eq!(quota.kind, SynthesisErrorKind::Quota);

        let network: SynthesisFailure = CloudTtsError::Network("refused".to_string()).into();
        assert_eq!(network.kind, SynthesisErrorKind::Network);

        let missing: SynthesisFailure = CloudTtsError::MissingCredential.into();
        assert_eq!(missing.kind, SynthesisErrorKind::Auth);
    }
}
