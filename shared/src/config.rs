use std::time::Duration;

use crate::{parse_flag, AuthError};

/// Default lifetime of fetched signing keys: 10 hours.
pub const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 10 * 60 * 60;

/// User pool settings shared by every function
#[derive(Debug, Clone)]
pub struct CognitoConfig {
    pub region: String,
    pub user_pool_id: String,
    pub app_client_id: String,
    pub auto_confirm_user: bool,
    pub jwks_cache_ttl: Duration,
}

impl CognitoConfig {
    /// Create config from the Lambda environment variables set by the deployment template
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| AuthError::Configuration(format!("{} not set", key)))
        };

        // REGION_NAME wins; AWS_REGION is always present inside Lambda
        let region = required("REGION_NAME").or_else(|_| required("AWS_REGION"))?;
        let user_pool_id = required("COGNITO_USER_POOL_ID")?;
        let app_client_id = required("COGNITO_APP_CLIENT_ID")?;

        let auto_confirm_user = match lookup("AUTO_CONFIRM_USER") {
            Some(value) => parse_flag(&value).ok_or_else(|| {
                AuthError::Configuration(format!("AUTO_CONFIRM_USER is not a boolean: {}", value))
            })?,
            None => false,
        };

        let jwks_cache_ttl = match lookup("JWKS_CACHE_TTL_SECS") {
            Some(value) => value.trim().parse::<u64>().map_err(|_| {
                AuthError::Configuration(format!("JWKS_CACHE_TTL_SECS is not a number: {}", value))
            })?,
            None => DEFAULT_JWKS_CACHE_TTL_SECS,
        };

        Ok(Self {
            region,
            user_pool_id,
            app_client_id,
            auto_confirm_user,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl),
        })
    }

    /// Issuer claim expected in every token minted by this pool
    pub fn issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.region, self.user_pool_id
        )
    }

    /// Public signing keys of the pool
    pub fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks.json", self.issuer())
    }
}
