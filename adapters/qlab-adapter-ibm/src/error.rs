//! Error types for the IBM Quantum adapter.

use qlab_hal::HalError;
use thiserror::Error;

/// Result type for IBM operations.
pub type IbmResult<T> = Result<T, IbmError>;

/// Errors that can occur when talking to the IBM Quantum Platform.
#[derive(Debug, Error)]
pub enum IbmError {
    /// Neither an API key nor a bearer token was configured.
    #[error(
        "IBM Quantum credentials not found. Set IBM_API_KEY or IBM_QUANTUM_TOKEN environment variable."
    )]
    MissingToken,

    /// Token rejected by the service or not usable as a header value.
    #[error("Invalid IBM Quantum API token")]
    InvalidToken,

    /// IAM token exchange failed.
    #[error("IAM token exchange failed: {0}")]
    IamTokenExchange(String),

    /// API key given without the instance CRN.
    #[error("IBM_SERVICE_CRN environment variable is required when using IBM_API_KEY")]
    MissingServiceCrn,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error.
    #[error("IBM Quantum API error: {message}")]
    ApiError {
        /// HTTP status code.
        status: Option<u16>,
        /// Error message.
        message: String,
    },

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Job failed.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// Job was cancelled.
    #[error("Job was cancelled: {0}")]
    JobCancelled(String),

    /// Session could not be opened or closed.
    #[error("Session error: {0}")]
    SessionFailed(String),

    /// Circuit cannot be expressed in OpenQASM 3.
    #[error("Circuit conversion error: {0}")]
    CircuitError(String),

    /// Backend not available.
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    /// No device satisfies the selection filters.
    #[error("No operational device with at least {min_qubits} qubits is available")]
    NoSuitableBackend {
        /// Requested minimum width.
        min_qubits: usize,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Circuit too large for backend.
    #[error("Circuit requires {required} qubits but backend only has {available}")]
    TooManyQubits {
        /// Qubits needed.
        required: usize,
        /// Qubits available.
        available: usize,
    },

    /// Invalid parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<IbmError> for HalError {
    fn from(e: IbmError) -> Self {
        match e {
            IbmError::MissingToken
            | IbmError::InvalidToken
            | IbmError::IamTokenExchange(_)
            | IbmError::MissingServiceCrn => HalError::AuthenticationFailed(e.to_string()),
            IbmError::JobNotFound(id) => HalError::JobNotFound(id),
            IbmError::JobFailed(msg) => HalError::JobFailed(msg),
            IbmError::JobCancelled(_) => HalError::JobCancelled,
            IbmError::BackendUnavailable(msg) => HalError::BackendUnavailable(msg),
            IbmError::NoSuitableBackend { .. } => HalError::BackendUnavailable(e.to_string()),
            IbmError::CircuitError(msg) => HalError::InvalidCircuit(msg),
            IbmError::TooManyQubits { .. } => HalError::CircuitTooLarge(e.to_string()),
            IbmError::InvalidParameter(msg) => HalError::Configuration(msg),
            _ => HalError::Backend(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_display() {
        let err = IbmError::MissingToken;
        assert!(err.to_string().contains("IBM_API_KEY"));
        assert!(err.to_string().contains("IBM_QUANTUM_TOKEN"));
    }

    #[test]
    fn test_api_error_display() {
        let err = IbmError::ApiError {
            status: Some(401),
            message: "Unauthorized".into(),
        };
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[test]
    fn test_no_suitable_backend_display() {
        let err = IbmError::NoSuitableBackend { min_qubits: 64 };
        assert!(err.to_string().contains("64 qubits"));
    }

    #[test]
    fn test_too_many_qubits_display() {
        let err = IbmError::TooManyQubits {
            required: 150,
            available: 133,
        };
        let msg = err.to_string();
        assert!(msg.contains("150"));
        assert!(msg.contains("133"));
    }

    #[test]
    fn test_missing_service_crn_display() {
        assert!(IbmError::MissingServiceCrn.to_string().contains("IBM_SERVICE_CRN"));
    }

    #[test]
    fn test_credential_errors_map_to_auth_failed() {
        for err in [
            IbmError::MissingToken,
            IbmError::InvalidToken,
            IbmError::IamTokenExchange("fail".into()),
            IbmError::MissingServiceCrn,
        ] {
            let hal: HalError = err.into();
            assert!(matches!(hal, HalError::AuthenticationFailed(_)));
        }
    }

    #[test]
    fn test_job_errors_to_hal() {
        let hal: HalError = IbmError::JobNotFound("j1".into()).into();
        assert!(matches!(hal, HalError::JobNotFound(id) if id == "j1"));

        let hal: HalError = IbmError::JobFailed("boom".into()).into();
        assert!(matches!(hal, HalError::JobFailed(msg) if msg == "boom"));

        let hal: HalError = IbmError::JobCancelled("user".into()).into();
        assert!(matches!(hal, HalError::JobCancelled));
    }

    #[test]
    fn test_backend_errors_to_hal() {
        let hal: HalError = IbmError::BackendUnavailable("ibm_kyiv".into()).into();
        assert!(matches!(hal, HalError::BackendUnavailable(msg) if msg == "ibm_kyiv"));

        let hal: HalError = IbmError::NoSuitableBackend { min_qubits: 8 }.into();
        assert!(matches!(hal, HalError::BackendUnavailable(_)));

        let hal: HalError = IbmError::TooManyQubits {
            required: 50,
            available: 27,
        }
        .into();
        assert!(matches!(hal, HalError::CircuitTooLarge(_)));
    }

    #[test]
    fn test_other_errors_to_hal() {
        let hal: HalError = IbmError::CircuitError("initialize".into()).into();
        assert!(matches!(hal, HalError::InvalidCircuit(_)));

        let hal: HalError = IbmError::SessionFailed("closed".into()).into();
        assert!(matches!(hal, HalError::Backend(_)));

        let hal: HalError = IbmError::ApiError {
            status: Some(500),
            message: "server error".into(),
        }
        .into();
        assert!(matches!(hal, HalError::Backend(_)));
    }
}
