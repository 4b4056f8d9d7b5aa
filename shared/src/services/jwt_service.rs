//! Verification of user pool tokens against the pool's published signing keys.
//!
//! Keys are fetched from `/.well-known/jwks.json`, cached per `kid`, and
//! refetched when stale or when a token names a `kid` the cache has not seen
//! (the pool rotated its keys). The cache lives as long as the Lambda
//! container, so warm invocations skip the fetch entirely.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{AuthError, AuthResult, CognitoConfig, IdTokenClaims};

const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Checks tokens presented to the functions
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify signature, issuer, audience and expiry, returning the claims
    async fn verify(&self, token: &str) -> AuthResult<IdTokenClaims>;

    /// `Ok(false)` when the token fails verification; `Err` when it could not be checked at all
    async fn is_token_valid(&self, token: &str) -> AuthResult<bool> {
        match self.verify(token).await {
            Ok(_) => Ok(true),
            Err(AuthError::InvalidToken(reason)) => {
                info!("Token rejected: {}", reason);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

pub struct JwksCache {
    jwks_url: String,
    http: reqwest::Client,
    ttl: Duration,
    keys: RwLock<Option<CachedKeys>>,
}

impl JwksCache {
    pub fn new(jwks_url: impl Into<String>, ttl: Duration) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(jwks_url, ttl, http))
    }

    pub fn with_client(jwks_url: impl Into<String>, ttl: Duration, http: reqwest::Client) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            http,
            ttl,
            keys: RwLock::new(None),
        }
    }

    /// Decoding key for `kid`, fetching the key set when needed
    pub async fn decoding_key(&self, kid: &str) -> AuthResult<DecodingKey> {
        {
            let guard = self.keys.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    if let Some(key) = cached.keys.get(kid) {
                        return Ok(key.clone());
                    }
                    debug!("kid {} not in cached key set, refetching", kid);
                }
            }
        }

        let mut guard = self.keys.write().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(cached) = guard.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                if let Some(key) = cached.keys.get(kid) {
                    return Ok(key.clone());
                }
            }
        }

        match self.fetch().await {
            Ok(keys) => {
                let key = keys.get(kid).cloned();
                *guard = Some(CachedKeys {
                    keys,
                    fetched_at: Instant::now(),
                });
                key.ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))
            }
            Err(e) => {
                // Keep serving the stale key while the endpoint is unavailable
                match guard.as_ref().and_then(|cached| cached.keys.get(kid)) {
                    Some(key) => {
                        warn!("JWKS refresh failed, using cached key {}: {}", kid, e);
                        Ok(key.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn fetch(&self) -> AuthResult<HashMap<String, DecodingKey>> {
        info!("Fetching JWKS from {}", self.jwks_url);

        let response = self.http.get(&self.jwks_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::JwksFetch(format!(
                "{} returned HTTP {}",
                self.jwks_url, status
            )));
        }

        let jwks: JwkSet = response.json().await?;
        let keys = decoding_keys(&jwks);
        info!("Loaded {} signing keys", keys.len());
        Ok(keys)
    }
}

fn decoding_keys(jwks: &JwkSet) -> HashMap<String, DecodingKey> {
    let mut keys = HashMap::new();
    for jwk in &jwks.keys {
        let Some(kid) = jwk.common.key_id.as_ref() else {
            warn!("Skipping JWK without kid");
            continue;
        };
        match DecodingKey::from_jwk(jwk) {
            Ok(key) => {
                keys.insert(kid.clone(), key);
            }
            Err(e) => warn!("Skipping JWK {}: {}", kid, e),
        }
    }
    keys
}

/// RS256 verifier bound to one user pool and app client
pub struct JwtVerifier {
    cache: JwksCache,
    issuer: String,
    audience: String,
}

impl JwtVerifier {
    pub fn new(config: &CognitoConfig) -> AuthResult<Self> {
        let cache = JwksCache::new(config.jwks_url(), config.jwks_cache_ttl)?;
        Ok(Self::with_cache(cache, config.issuer(), config.app_client_id.clone()))
    }

    pub fn with_cache(cache: JwksCache, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            cache,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        // Access tokens carry client_id instead of aud; aud is only checked when present
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> AuthResult<IdTokenClaims> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::MalformedToken("token header has no kid".to_string()))?;

        let key = self.cache.decoding_key(&kid).await?;
        let data = decode::<IdTokenClaims>(token, &key, &self.validation())?;

        debug!("Verified token for sub {}", data.claims.sub);
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoding_keys_skips_keys_without_kid() {
        let mut jwks: serde_json::Value =
            serde_json::from_str(include_str!("../../tests/fixtures/jwks.json")).unwrap();
        let mut anonymous = jwks["keys"][0].clone();
        anonymous.as_object_mut().unwrap().remove("kid");
        jwks["keys"].as_array_mut().unwrap().push(anonymous);

        let jwks: JwkSet = serde_json::from_value(jwks).unwrap();
        assert_eq!(jwks.keys.len(), 2);

        let keys = decoding_keys(&jwks);
        assert_eq!(keys.len(), 1);
        assert!(keys.contains_key("test-key-1"));
    }

    #[tokio::test]
    async fn test_malformed_token_is_rejected_before_fetching_keys() {
        // Unroutable URL: any fetch attempt would surface as JwksFetch
        let cache = JwksCache::new("http://127.0.0.1:9/.well-known/jwks.json", Duration::from_secs(60)).unwrap();
        let verifier = JwtVerifier::with_cache(cache, "https://issuer", "client");

        let result = verifier.verify("not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));

        let result = verifier.is_token_valid("not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::MalformedToken(_))));
    }
}
