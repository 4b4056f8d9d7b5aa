use aws_sdk_cognitoidentityprovider::error::{ProvideErrorMetadata, SdkError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Signing key not found for kid: {0}")]
    KeyNotFound(String),

    #[error("JWKS fetch failed: {0}")]
    JwksFetch(String),

    #[error("{code}: {message}")]
    Cognito { code: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Short type name reported to callers in `errorType`.
    pub fn error_type(&self) -> &str {
        match self {
            AuthError::Configuration(_) => "ConfigurationError",
            AuthError::MissingParameter(_) => "MissingParameter",
            AuthError::MalformedToken(_) => "MalformedToken",
            AuthError::InvalidToken(_) => "InvalidToken",
            AuthError::KeyNotFound(_) => "KeyNotFound",
            AuthError::JwksFetch(_) => "JwksFetchError",
            AuthError::Cognito { code, .. } => code,
            AuthError::Internal(_) => "InternalError",
        }
    }

    /// Message without the type prefix, for `errorMessage`.
    pub fn message(&self) -> String {
        match self {
            AuthError::Cognito { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Convert an SDK failure into the service error code and message it carries.
    pub fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata,
    {
        let code = err.code().unwrap_or("UnknownError").to_string();
        let message = match err.message() {
            Some(message) => message.to_string(),
            None => match &err {
                SdkError::ConstructionFailure(_) => "request construction failed".to_string(),
                SdkError::TimeoutError(_) => "request timed out".to_string(),
                SdkError::DispatchFailure(_) => "request dispatch failed".to_string(),
                SdkError::ResponseError(_) => "response could not be parsed".to_string(),
                _ => "service error".to_string(),
            },
        };
        AuthError::Cognito { code, message }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => AuthError::MalformedToken(err.to_string()),
            ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::RsaFailedSigning
            | ErrorKind::Crypto(_) => AuthError::Internal(err.to_string()),
            _ => AuthError::InvalidToken(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::JwksFetch(err.to_string())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_uses_cognito_code() {
        let err = AuthError::Cognito {
            code: "UsernameExistsException".to_string(),
            message: "User already exists".to_string(),
        };
        assert_eq!(err.error_type(), "UsernameExistsException");
        assert_eq!(err.message(), "User already exists");
        assert_eq!(err.to_string(), "UsernameExistsException: User already exists");
    }

    #[test]
    fn test_error_type_for_local_errors() {
        assert_eq!(AuthError::InvalidToken("expired".into()).error_type(), "InvalidToken");
        assert_eq!(AuthError::KeyNotFound("abc".into()).error_type(), "KeyNotFound");
        assert_eq!(
            AuthError::MissingParameter("username".into()).message(),
            "Missing parameter: username"
        );
    }

    #[test]
    fn test_jsonwebtoken_errors_are_classified() {
        use jsonwebtoken::errors::ErrorKind;

        let expired: AuthError = jsonwebtoken::errors::Error::from(ErrorKind::ExpiredSignature).into();
        assert!(matches!(expired, AuthError::InvalidToken(_)));

        let issuer: AuthError = jsonwebtoken::errors::Error::from(ErrorKind::InvalidIssuer).into();
        assert!(matches!(issuer, AuthError::InvalidToken(_)));

        let garbage: AuthError = jsonwebtoken::errors::Error::from(ErrorKind::InvalidToken).into();
        assert!(matches!(garbage, AuthError::MalformedToken(_)));
    }
}
