use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::error;

use crate::AuthResult;

/// API Gateway event. Only the headers are read; they carry the parameters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiGatewayRequest {
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

impl ApiGatewayRequest {
    pub fn with_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            headers: Some(
                headers
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Header value by name. API Gateway may lower-case names, so an exact
    /// miss falls back to a case-insensitive match. Empty values count as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        let headers = self.headers.as_ref()?;
        headers
            .get(name)
            .or_else(|| {
                headers
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayResponse {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ApiGatewayResponse {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    /// Serialize `value` as the JSON body
    pub fn json<T: Serialize>(status_code: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => {
                let mut response = Self::new(status_code, body);
                response
                    .headers
                    .insert("Content-Type".to_string(), "application/json".to_string());
                response
            }
            Err(e) => {
                error!("Failed to serialize response body: {}", e);
                Self::new(500, "Failed to serialize response")
            }
        }
    }
}

/// Outcome of one call forwarded to the user pool
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthServiceResult {
    pub successful: bool,
    pub result: Option<Value>,
    pub error_message: Option<String>,
    pub error_type: Option<String>,
}

impl AuthServiceResult {
    pub fn from_result<T: Serialize>(result: AuthResult<T>) -> Self {
        match result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(Value::Null) => Self::success(None),
                Ok(value) => Self::success(Some(value)),
                Err(e) => Self {
                    successful: false,
                    result: None,
                    error_message: Some(format!("Failed to serialize result: {}", e)),
                    error_type: Some("InternalError".to_string()),
                },
            },
            Err(e) => Self {
                successful: false,
                result: None,
                error_message: Some(e.message()),
                error_type: Some(e.error_type().to_string()),
            },
        }
    }

    fn success(result: Option<Value>) -> Self {
        Self {
            successful: true,
            result,
            error_message: None,
            error_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserAttribute {
    pub name: String,
    pub value: String,
}

impl UserAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Where a confirmation code was sent
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeDeliveryDetails {
    pub destination: Option<String>,
    pub delivery_medium: Option<String>,
    pub attribute_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResult {
    pub user_confirmed: bool,
    pub user_sub: String,
    pub code_delivery_details: Option<CodeDeliveryDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationTokens {
    pub access_token: Option<String>,
    pub expires_in: i32,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
}

/// Result of an auth flow: either tokens or the next challenge
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateAuthResult {
    pub authentication_result: Option<AuthenticationTokens>,
    pub challenge_name: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub challenge_parameters: HashMap<String, String>,
    pub session: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub username: String,
    pub user_status: Option<String>,
    pub enabled: bool,
    pub user_attributes: Vec<UserAttribute>,
    /// Seconds since the Unix epoch
    pub user_create_date: Option<i64>,
    pub user_last_modified_date: Option<i64>,
}

/// Claims read from a verified user pool token
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IdTokenClaims {
    pub sub: String,
    pub iss: String,
    #[serde(default)]
    pub aud: Option<String>,
    pub exp: u64,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub token_use: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "cognito:username", default)]
    pub cognito_username: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl IdTokenClaims {
    /// ID tokens carry `cognito:username`, access tokens `username`
    pub fn username(&self) -> Option<&str> {
        self.cognito_username
            .as_deref()
            .or(self.username.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthError;
    use serde_json::json;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = ApiGatewayRequest::with_headers([("idtoken", "abc"), ("Username", "")]);

        assert_eq!(request.header("idToken"), Some("abc"));
        assert_eq!(request.header("idtoken"), Some("abc"));
        assert_eq!(request.header("username"), None);
        assert_eq!(request.header("password"), None);
    }

    #[test]
    fn test_request_deserializes_api_gateway_event() {
        let event = json!({
            "resource": "/signin",
            "httpMethod": "POST",
            "headers": {"username": "jane@example.com", "password": "pw"},
            "body": null
        });
        let request: ApiGatewayRequest = serde_json::from_value(event).unwrap();
        assert_eq!(request.header("username"), Some("jane@example.com"));

        let no_headers: ApiGatewayRequest = serde_json::from_value(json!({"headers": null})).unwrap();
        assert_eq!(no_headers.header("username"), None);
    }

    #[test]
    fn test_response_serialization() {
        let response = ApiGatewayResponse::bad_request("A valid id token is required");
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"statusCode": 400, "body": "A valid id token is required"})
        );

        let response = ApiGatewayResponse::json(200, &true);
        assert_eq!(response.body, "true");
        assert_eq!(response.headers.get("Content-Type").map(String::as_str), Some("application/json"));
    }

    #[test]
    fn test_auth_service_result_wraps_errors() {
        let failed = AuthServiceResult::from_result::<()>(Err(AuthError::Cognito {
            code: "NotAuthorizedException".to_string(),
            message: "Incorrect username or password.".to_string(),
        }));
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({
                "successful": false,
                "result": null,
                "errorMessage": "Incorrect username or password.",
                "errorType": "NotAuthorizedException"
            })
        );

        let empty = AuthServiceResult::from_result(Ok(()));
        assert!(empty.successful);
        assert_eq!(empty.result, None);
    }

    #[test]
    fn test_claims_username_prefers_cognito_username() {
        let claims: IdTokenClaims = serde_json::from_value(json!({
            "sub": "1234",
            "iss": "https://issuer",
            "exp": 1,
            "cognito:username": "jane",
            "username": "other"
        }))
        .unwrap();
        assert_eq!(claims.username(), Some("jane"));

        let access: IdTokenClaims = serde_json::from_value(json!({
            "sub": "1234",
            "iss": "https://issuer",
            "exp": 1,
            "token_use": "access",
            "username": "jane"
        }))
        .unwrap();
        assert_eq!(access.username(), Some("jane"));
    }
}
