use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cognitoidentityprovider::config::Region;
use aws_sdk_cognitoidentityprovider::types::{
    AttributeType, AuthFlowType, AuthenticationResultType, CodeDeliveryDetailsType,
};
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use tracing::{error, info};

use crate::{
    AuthError, AuthResult, AuthenticationTokens, CodeDeliveryDetails, CognitoConfig,
    InitiateAuthResult, SignUpResult, UserAttribute, UserDetails,
};

/// Calls the functions forward to the user pool.
///
/// The API is documented at
/// https://docs.aws.amazon.com/cognito-user-identity-pools/latest/APIReference/API_Operations.html
#[async_trait]
pub trait UserPool: Send + Sync {
    /// Register a user; the username doubles as the `email` attribute
    async fn sign_up(&self, username: &str, password: &str) -> AuthResult<SignUpResult>;

    /// Confirm a registration without a code
    async fn admin_confirm_sign_up(&self, username: &str) -> AuthResult<()>;

    /// Confirm a registration with the code the user received
    async fn confirm_sign_up(&self, username: &str, confirmation_code: &str) -> AuthResult<()>;

    /// Sign in with username and password (ADMIN_NO_SRP_AUTH)
    async fn admin_initiate_auth(&self, username: &str, password: &str) -> AuthResult<InitiateAuthResult>;

    /// Exchange a refresh token for fresh ID and access tokens
    async fn admin_refresh_tokens(&self, refresh_token: &str) -> AuthResult<InitiateAuthResult>;

    /// Send a password reset code to the user's verified email or phone
    async fn forgot_password(&self, username: &str) -> AuthResult<CodeDeliveryDetails>;

    async fn confirm_forgot_password(
        &self,
        username: &str,
        confirmation_code: &str,
        password: &str,
    ) -> AuthResult<()>;

    /// Invalidate the user's password; the next sign-in requires a reset
    async fn admin_reset_user_password(&self, username: &str) -> AuthResult<()>;

    async fn admin_delete_user(&self, username: &str) -> AuthResult<()>;

    async fn admin_get_user(&self, username: &str) -> AuthResult<UserDetails>;

    async fn resend_confirmation_code(&self, username: &str) -> AuthResult<CodeDeliveryDetails>;

    /// Custom attributes need the `custom:` prefix
    async fn admin_update_user_attributes(
        &self,
        username: &str,
        attributes: &[UserAttribute],
    ) -> AuthResult<()>;

    async fn update_user_attribute(&self, username: &str, name: &str, value: &str) -> AuthResult<()> {
        self.admin_update_user_attributes(username, &[UserAttribute::new(name, value)])
            .await
    }

    async fn confirm_email_address(&self, username: &str) -> AuthResult<()> {
        self.update_user_attribute(username, "email_verified", "true")
            .await
    }
}

pub struct CognitoService {
    client: CognitoClient,
    user_pool_id: String,
    app_client_id: String,
}

impl CognitoService {
    pub fn new(client: CognitoClient, config: &CognitoConfig) -> Self {
        Self {
            client,
            user_pool_id: config.user_pool_id.clone(),
            app_client_id: config.app_client_id.clone(),
        }
    }

    /// Load AWS credentials from the environment and target the pool's region
    pub async fn from_config(config: &CognitoConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        info!(
            "CognitoService initialized for pool {} in {}",
            config.user_pool_id, config.region
        );
        Self::new(CognitoClient::new(&sdk_config), config)
    }

    async fn initiate_auth(
        &self,
        flow: AuthFlowType,
        parameters: &[(&str, &str)],
    ) -> AuthResult<InitiateAuthResult> {
        let mut request = self
            .client
            .admin_initiate_auth()
            .user_pool_id(&self.user_pool_id)
            .client_id(&self.app_client_id)
            .auth_flow(flow);
        for (key, value) in parameters {
            request = request.auth_parameters(*key, *value);
        }

        let output = request.send().await.map_err(AuthError::from_sdk)?;

        Ok(InitiateAuthResult {
            authentication_result: output.authentication_result().map(authentication_tokens),
            challenge_name: output.challenge_name().map(|c| c.as_str().to_string()),
            challenge_parameters: output.challenge_parameters().cloned().unwrap_or_default(),
            session: output.session().map(str::to_string),
        })
    }
}

#[async_trait]
impl UserPool for CognitoService {
    async fn sign_up(&self, username: &str, password: &str) -> AuthResult<SignUpResult> {
        info!("Signing up user: {}", username);

        let output = self
            .client
            .sign_up()
            .client_id(&self.app_client_id)
            .username(username)
            .password(password)
            .user_attributes(attribute("email", username)?)
            .send()
            .await
            .map_err(|e| {
                error!("Sign up failed for {}: {}", username, e);
                AuthError::from_sdk(e)
            })?;

        Ok(SignUpResult {
            user_confirmed: output.user_confirmed(),
            user_sub: output.user_sub().to_string(),
            code_delivery_details: output.code_delivery_details().map(code_delivery_details),
        })
    }

    async fn admin_confirm_sign_up(&self, username: &str) -> AuthResult<()> {
        info!("Confirming sign up as admin for user: {}", username);

        self.client
            .admin_confirm_sign_up()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(AuthError::from_sdk)?;

        Ok(())
    }

    async fn confirm_sign_up(&self, username: &str, confirmation_code: &str) -> AuthResult<()> {
        info!("Confirming sign up for user: {}", username);

        self.client
            .confirm_sign_up()
            .client_id(&self.app_client_id)
            .username(username)
            .confirmation_code(confirmation_code)
            .send()
            .await
            .map_err(AuthError::from_sdk)?;

        Ok(())
    }

    async fn admin_initiate_auth(&self, username: &str, password: &str) -> AuthResult<InitiateAuthResult> {
        info!("Signing in user: {}", username);

        self.initiate_auth(
            AuthFlowType::AdminNoSrpAuth,
            &[("USERNAME", username), ("PASSWORD", password)],
        )
        .await
    }

    async fn admin_refresh_tokens(&self, refresh_token: &str) -> AuthResult<InitiateAuthResult> {
        info!("Refreshing tokens");

        self.initiate_auth(
            AuthFlowType::RefreshTokenAuth,
            &[("REFRESH_TOKEN", refresh_token)],
        )
        .await
    }

    async fn forgot_password(&self, username: &str) -> AuthResult<CodeDeliveryDetails> {
        info!("Starting forgot password flow for user: {}", username);

        let output = self
            .client
            .forgot_password()
            .client_id(&self.app_client_id)
            .username(username)
            .send()
            .await
            .map_err(AuthError::from_sdk)?;

        Ok(output
            .code_delivery_details()
            .map(code_delivery_details)
            .unwrap_or_default())
    }

    async fn confirm_forgot_password(
        &self,
        username: &str,
        confirmation_code: &str,
        password: &str,
    ) -> AuthResult<()> {
        info!("Confirming forgot password for user: {}", username);

        self.client
            .confirm_forgot_password()
            .client_id(&self.app_client_id)
            .username(username)
            .confirmation_code(confirmation_code)
            .password(password)
            .send()
            .await
            .map_err(AuthError::from_sdk)?;

        Ok(())
    }

    async fn admin_reset_user_password(&self, username: &str) -> AuthResult<()> {
        info!("Resetting password for user: {}", username);

        self.client
            .admin_reset_user_password()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(AuthError::from_sdk)?;

        Ok(())
    }

    async fn admin_delete_user(&self, username: &str) -> AuthResult<()> {
        info!("Deleting user: {}", username);

        self.client
            .admin_delete_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(AuthError::from_sdk)?;

        Ok(())
    }

    async fn admin_get_user(&self, username: &str) -> AuthResult<UserDetails> {
        let output = self
            .client
            .admin_get_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(AuthError::from_sdk)?;

        Ok(UserDetails {
            username: output.username().to_string(),
            user_status: output.user_status().map(|s| s.as_str().to_string()),
            enabled: output.enabled(),
            user_attributes: output
                .user_attributes()
                .iter()
                .map(|a| UserAttribute::new(a.name(), a.value().unwrap_or_default()))
                .collect(),
            user_create_date: output.user_create_date().map(|d| d.secs()),
            user_last_modified_date: output.user_last_modified_date().map(|d| d.secs()),
        })
    }

    async fn resend_confirmation_code(&self, username: &str) -> AuthResult<CodeDeliveryDetails> {
        info!("Resending confirmation code for user: {}", username);

        let output = self
            .client
            .resend_confirmation_code()
            .client_id(&self.app_client_id)
            .username(username)
            .send()
            .await
            .map_err(AuthError::from_sdk)?;

        Ok(output
            .code_delivery_details()
            .map(code_delivery_details)
            .unwrap_or_default())
    }

    async fn admin_update_user_attributes(
        &self,
        username: &str,
        attributes: &[UserAttribute],
    ) -> AuthResult<()> {
        let names: Vec<&str> = attributes.iter().map(|a| a.name.as_str()).collect();
        info!("Updating attributes {:?} for user: {}", names, username);

        let attributes = attributes
            .iter()
            .map(|a| attribute(&a.name, &a.value))
            .collect::<AuthResult<Vec<_>>>()?;

        self.client
            .admin_update_user_attributes()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .set_user_attributes(Some(attributes))
            .send()
            .await
            .map_err(AuthError::from_sdk)?;

        Ok(())
    }
}

fn attribute(name: &str, value: &str) -> AuthResult<AttributeType> {
    AttributeType::builder()
        .name(name)
        .value(value)
        .build()
        .map_err(|e| AuthError::Internal(format!("Failed to build attribute: {}", e)))
}

fn code_delivery_details(details: &CodeDeliveryDetailsType) -> CodeDeliveryDetails {
    CodeDeliveryDetails {
        destination: details.destination().map(str::to_string),
        delivery_medium: details.delivery_medium().map(|m| m.as_str().to_string()),
        attribute_name: details.attribute_name().map(str::to_string),
    }
}

fn authentication_tokens(result: &AuthenticationResultType) -> AuthenticationTokens {
    AuthenticationTokens {
        access_token: result.access_token().map(str::to_string),
        expires_in: result.expires_in(),
        id_token: result.id_token().map(str::to_string),
        refresh_token: result.refresh_token().map(str::to_string),
        token_type: result.token_type().map(str::to_string),
    }
}
