// Token verification against a JWKS served by a local mock server.
// Run with: cargo test -p cognito-shared --test token_verification

use cognito_shared::{AuthError, JwksCache, JwtVerifier, TokenVerifier};
use jsonwebtoken::{encode, get_current_timestamp, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ISSUER: &str = "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_test";
const CLIENT_ID: &str = "client123";
const KID: &str = "test-key-1";
const JWKS_PATH: &str = "/us-east-1_test/.well-known/jwks.json";

fn jwks() -> Value {
    serde_json::from_str(include_str!("fixtures/jwks.json")).unwrap()
}

fn sign(claims: &Value, kid: &str, pem: &[u8]) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &EncodingKey::from_rsa_pem(pem).unwrap()).unwrap()
}

fn signed(claims: &Value) -> String {
    sign(claims, KID, include_bytes!("fixtures/test_rsa_private.pem"))
}

fn id_token_claims() -> Value {
    let now = get_current_timestamp();
    json!({
        "sub": "0b9f8c3e-1111-2222-3333-444455556666",
        "iss": ISSUER,
        "aud": CLIENT_ID,
        "token_use": "id",
        "email": "jane@example.com",
        "cognito:username": "jane",
        "iat": now,
        "exp": now + 3600
    })
}

async fn jwks_server(expected_fetches: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks()))
        .expect(expected_fetches)
        .mount(&server)
        .await;
    server
}

fn verifier(server: &MockServer, ttl: Duration) -> JwtVerifier {
    let cache = JwksCache::new(format!("{}{}", server.uri(), JWKS_PATH), ttl).unwrap();
    JwtVerifier::with_cache(cache, ISSUER, CLIENT_ID)
}

#[tokio::test]
async fn test_valid_id_token_is_verified_and_keys_are_cached() {
    let server = jwks_server(1).await;
    let verifier = verifier(&server, Duration::from_secs(3600));
    let token = signed(&id_token_claims());

    let claims = verifier.verify(&token).await.unwrap();
    assert_eq!(claims.username(), Some("jane"));
    assert_eq!(claims.email.as_deref(), Some("jane@example.com"));
    assert_eq!(claims.iss, ISSUER);

    // Second call is served from the cache
    assert!(verifier.is_token_valid(&token).await.unwrap());
}

#[tokio::test]
async fn test_access_token_without_audience_is_accepted() {
    let server = jwks_server(1).await;
    let verifier = verifier(&server, Duration::from_secs(3600));

    let now = get_current_timestamp();
    let token = signed(&json!({
        "sub": "0b9f8c3e-1111-2222-3333-444455556666",
        "iss": ISSUER,
        "client_id": CLIENT_ID,
        "token_use": "access",
        "username": "jane",
        "iat": now,
        "exp": now + 3600
    }));

    let claims = verifier.verify(&token).await.unwrap();
    assert_eq!(claims.username(), Some("jane"));
    assert_eq!(claims.aud, None);
}

#[tokio::test]
async fn test_tokens_failing_checks_are_invalid() {
    let server = jwks_server(1).await;
    let verifier = verifier(&server, Duration::from_secs(3600));

    let mut wrong_issuer = id_token_claims();
    wrong_issuer["iss"] = json!("https://cognito-idp.us-east-1.amazonaws.com/us-east-1_other");

    let mut wrong_audience = id_token_claims();
    wrong_audience["aud"] = json!("another-client");

    let mut expired = id_token_claims();
    expired["exp"] = json!(get_current_timestamp() - 3600);

    for claims in [wrong_issuer, wrong_audience, expired] {
        let token = signed(&claims);
        assert!(!verifier.is_token_valid(&token).await.unwrap());
        assert!(matches!(verifier.verify(&token).await, Err(AuthError::InvalidToken(_))));
    }
}

#[tokio::test]
async fn test_token_signed_with_another_key_is_invalid() {
    let server = jwks_server(1).await;
    let verifier = verifier(&server, Duration::from_secs(3600));

    let forged = sign(
        &id_token_claims(),
        KID,
        include_bytes!("fixtures/other_rsa_private.pem"),
    );

    assert!(!verifier.is_token_valid(&forged).await.unwrap());
}

#[tokio::test]
async fn test_unknown_kid_triggers_refetch() {
    // One fetch to fill the cache, one more when the unknown kid is seen again
    let server = jwks_server(2).await;
    let verifier = verifier(&server, Duration::from_secs(3600));

    let token = sign(
        &id_token_claims(),
        "rotated-key",
        include_bytes!("fixtures/test_rsa_private.pem"),
    );

    let first = verifier.verify(&token).await;
    assert!(matches!(first, Err(AuthError::KeyNotFound(kid)) if kid == "rotated-key"));

    let second = verifier.is_token_valid(&token).await;
    assert!(matches!(second, Err(AuthError::KeyNotFound(_))));
}

#[tokio::test]
async fn test_malformed_token_never_fetches_keys() {
    let server = jwks_server(0).await;
    let verifier = verifier(&server, Duration::from_secs(3600));

    let result = verifier.verify("definitely.not.a-jwt").await;
    assert!(matches!(result, Err(AuthError::MalformedToken(_))));
}

#[tokio::test]
async fn test_stale_keys_are_refetched() {
    let server = jwks_server(2).await;
    let verifier = verifier(&server, Duration::ZERO);
    let token = signed(&id_token_claims());

    assert!(verifier.is_token_valid(&token).await.unwrap());
    assert!(verifier.is_token_valid(&token).await.unwrap());
}

#[tokio::test]
async fn test_unreachable_jwks_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let verifier = verifier(&server, Duration::from_secs(3600));

    let result = verifier.verify(&signed(&id_token_claims())).await;
    assert!(matches!(result, Err(AuthError::JwksFetch(_))));
}

#[tokio::test]
async fn test_stale_key_is_used_when_refresh_fails() {
    let server = jwks_server(1).await;
    let verifier = verifier(&server, Duration::ZERO);
    let token = signed(&id_token_claims());

    assert!(verifier.is_token_valid(&token).await.unwrap());

    server.reset().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    assert!(verifier.is_token_valid(&token).await.unwrap());
}
