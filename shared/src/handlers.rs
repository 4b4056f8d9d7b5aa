//! Request handling for each function.
//!
//! Parameters arrive as request headers. A missing parameter is a 400 with a
//! plain-text body; once a call is forwarded to the user pool the response is
//! a 200 whose JSON body reports the outcome in `successful`. Handlers acting
//! on an account take the username from a verified `idToken`, never from the
//! request itself.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    ApiGatewayRequest, ApiGatewayResponse, AuthError, AuthResult, AuthServiceResult,
    TokenVerifier, UserPool,
};

const ID_TOKEN_REQUIRED: &str = "A valid id token is required";

fn forwarded<T: Serialize>(operation: &str, result: AuthResult<T>) -> ApiGatewayResponse {
    match &result {
        Ok(_) => info!("{} succeeded", operation),
        Err(e) => warn!("{} failed: {}", operation, e),
    }
    ApiGatewayResponse::json(200, &AuthServiceResult::from_result(result))
}

/// Username of a verified token, or the response to send back instead
async fn verified_username(
    verifier: &dyn TokenVerifier,
    id_token: &str,
) -> Result<String, ApiGatewayResponse> {
    match verifier.verify(id_token).await {
        Ok(claims) => match claims.username() {
            Some(username) => Ok(username.to_string()),
            None => {
                warn!("Verified token for sub {} carries no username", claims.sub);
                Err(ApiGatewayResponse::bad_request("The id token carries no username"))
            }
        },
        Err(AuthError::InvalidToken(reason)) => {
            info!("Rejected id token: {}", reason);
            Err(ApiGatewayResponse::unauthorized("The id token is not valid"))
        }
        Err(e) => {
            error!("Couldn't determine whether the id token is valid: {}", e);
            Err(ApiGatewayResponse::bad_request(ID_TOKEN_REQUIRED))
        }
    }
}

pub async fn sign_up(
    pool: &dyn UserPool,
    request: &ApiGatewayRequest,
    auto_confirm_user: bool,
) -> ApiGatewayResponse {
    let (Some(username), Some(password)) = (request.header("username"), request.header("password")) else {
        warn!("Username and password are required");
        return ApiGatewayResponse::bad_request("Username and password are required");
    };

    let mut result = pool.sign_up(username, password).await;

    if auto_confirm_user {
        if let Ok(sign_up) = result.as_mut() {
            match pool.admin_confirm_sign_up(username).await {
                Ok(()) => {
                    sign_up.user_confirmed = true;
                    if let Err(e) = pool.confirm_email_address(username).await {
                        warn!("Failed to mark email verified for {}: {}", username, e);
                    }
                }
                Err(e) => warn!("Failed to auto-confirm {}: {}", username, e),
            }
        }
    }

    forwarded("SignUp", result)
}

pub async fn confirm_sign_up(pool: &dyn UserPool, request: &ApiGatewayRequest) -> ApiGatewayResponse {
    let (Some(username), Some(confirmation_code)) =
        (request.header("username"), request.header("confirmationCode"))
    else {
        return ApiGatewayResponse::bad_request("Username and confirmation code are required");
    };

    forwarded(
        "ConfirmSignUp",
        pool.confirm_sign_up(username, confirmation_code).await,
    )
}

pub async fn sign_in(pool: &dyn UserPool, request: &ApiGatewayRequest) -> ApiGatewayResponse {
    let (Some(username), Some(password)) = (request.header("username"), request.header("password")) else {
        return ApiGatewayResponse::bad_request("Username and password are required");
    };

    forwarded("SignIn", pool.admin_initiate_auth(username, password).await)
}

pub async fn refresh_tokens(pool: &dyn UserPool, request: &ApiGatewayRequest) -> ApiGatewayResponse {
    let Some(refresh_token) = request.header("refreshToken") else {
        return ApiGatewayResponse::bad_request("A refresh token is required");
    };

    forwarded("RefreshTokens", pool.admin_refresh_tokens(refresh_token).await)
}

pub async fn forgot_password(pool: &dyn UserPool, request: &ApiGatewayRequest) -> ApiGatewayResponse {
    let Some(username) = request.header("username") else {
        return ApiGatewayResponse::bad_request("Username is required");
    };

    forwarded("ForgotPassword", pool.forgot_password(username).await)
}

pub async fn confirm_forgot_password(
    pool: &dyn UserPool,
    request: &ApiGatewayRequest,
) -> ApiGatewayResponse {
    let (Some(username), Some(password), Some(confirmation_code)) = (
        request.header("username"),
        request.header("password"),
        request.header("confirmationCode"),
    ) else {
        return ApiGatewayResponse::bad_request(
            "Username, password and confirmation code are required",
        );
    };

    forwarded(
        "ConfirmForgotPassword",
        pool.confirm_forgot_password(username, confirmation_code, password)
            .await,
    )
}

pub async fn resend_confirmation_code(
    pool: &dyn UserPool,
    request: &ApiGatewayRequest,
) -> ApiGatewayResponse {
    let Some(username) = request.header("username") else {
        return ApiGatewayResponse::bad_request("Username is required");
    };

    forwarded(
        "ResendConfirmationCode",
        pool.resend_confirmation_code(username).await,
    )
}

pub async fn reset_password(
    pool: &dyn UserPool,
    verifier: &dyn TokenVerifier,
    request: &ApiGatewayRequest,
) -> ApiGatewayResponse {
    let Some(id_token) = request.header("idToken") else {
        warn!("The id token is required");
        return ApiGatewayResponse::bad_request(ID_TOKEN_REQUIRED);
    };
    let username = match verified_username(verifier, id_token).await {
        Ok(username) => username,
        Err(response) => return response,
    };

    forwarded(
        "AdminResetUserPassword",
        pool.admin_reset_user_password(&username).await,
    )
}

pub async fn get_user(
    pool: &dyn UserPool,
    verifier: &dyn TokenVerifier,
    request: &ApiGatewayRequest,
) -> ApiGatewayResponse {
    let Some(id_token) = request.header("idToken") else {
        return ApiGatewayResponse::bad_request(ID_TOKEN_REQUIRED);
    };
    let username = match verified_username(verifier, id_token).await {
        Ok(username) => username,
        Err(response) => return response,
    };

    forwarded("AdminGetUser", pool.admin_get_user(&username).await)
}

pub async fn update_user_attribute(
    pool: &dyn UserPool,
    verifier: &dyn TokenVerifier,
    request: &ApiGatewayRequest,
) -> ApiGatewayResponse {
    let (Some(id_token), Some(name), Some(value)) = (
        request.header("idToken"),
        request.header("attributeName"),
        request.header("attributeValue"),
    ) else {
        return ApiGatewayResponse::bad_request(
            "A valid id token, attribute name and attribute value are required",
        );
    };
    let username = match verified_username(verifier, id_token).await {
        Ok(username) => username,
        Err(response) => return response,
    };

    forwarded(
        "AdminUpdateUserAttributes",
        pool.update_user_attribute(&username, name, value).await,
    )
}

pub async fn delete_user(
    pool: &dyn UserPool,
    verifier: &dyn TokenVerifier,
    request: &ApiGatewayRequest,
) -> ApiGatewayResponse {
    let Some(id_token) = request.header("idToken") else {
        return ApiGatewayResponse::bad_request(ID_TOKEN_REQUIRED);
    };
    let username = match verified_username(verifier, id_token).await {
        Ok(username) => username,
        Err(response) => return response,
    };

    forwarded("AdminDeleteUser", pool.admin_delete_user(&username).await)
}

/// Body is `true` or `false`; 400 when the token could not be checked at all
pub async fn token_valid(verifier: &dyn TokenVerifier, request: &ApiGatewayRequest) -> ApiGatewayResponse {
    let Some(id_token) = request.header("idToken") else {
        return ApiGatewayResponse::bad_request(ID_TOKEN_REQUIRED);
    };

    match verifier.is_token_valid(id_token).await {
        Ok(valid) => ApiGatewayResponse::json(200, &valid),
        Err(e) => {
            warn!("Token validation failed: {}", e);
            ApiGatewayResponse::json(400, &false)
        }
    }
}
