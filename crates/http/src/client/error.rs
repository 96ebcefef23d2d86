//! Client error types

use storefront_core::SessionSlot;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The access token expired and could not be refreshed
    #[error("Token refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest(message),
            401 => Self::AuthenticationFailed(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::ServerError {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether the caller should clear the session and send the user to a login surface
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_) | Self::Refresh(_))
    }
}

/// Why a token refresh failed.
///
/// Cloneable so every caller waiting on one refresh observes the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// Nothing to exchange; no network call was made
    #[error("No refresh token stored for the {0} session")]
    NoRefreshToken(SessionSlot),

    /// The refresh endpoint answered with a non-success status
    #[error("Refresh rejected by backend with status {status}")]
    BackendRejected { status: u16 },

    /// The refresh request could not be sent or its response not received
    #[error("Refresh request failed: {0}")]
    Network(String),

    /// The refresh request exceeded the configured bound
    #[error("Refresh request timed out")]
    Timeout,

    /// The backend answered 2xx with an unusable body
    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    /// The new token could not be persisted
    #[error("Failed to persist refreshed token: {0}")]
    Storage(String),
}

impl RefreshError {
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ClientError::from_status(StatusCode::BAD_REQUEST, "x".into()),
            ClientError::BadRequest(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, "x".into()),
            ClientError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::FORBIDDEN, "x".into()),
            ClientError::Forbidden(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::NOT_FOUND, "x".into()),
            ClientError::NotFound(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::BAD_GATEWAY, "x".into()),
            ClientError::ServerError { status: 502, .. }
        ));
    }

    #[test]
    fn test_auth_expired_classification() {
        assert!(ClientError::AuthenticationFailed("expired".into()).is_auth_expired());
        assert!(
            ClientError::Refresh(RefreshError::NoRefreshToken(SessionSlot::Customer))
                .is_auth_expired()
        );
        assert!(!ClientError::NotFound("x".into()).is_auth_expired());
    }

    #[test]
    fn test_refresh_error_display_names_slot() {
        let err = RefreshError::NoRefreshToken(SessionSlot::AdminOrEmployee);
        assert_eq!(
            err.to_string(),
            "No refresh token stored for the admin_or_employee session"
        );
    }
}
