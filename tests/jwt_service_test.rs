// Access token tests without database dependencies

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use localrank_backend::services::jwt::{JwtConfig, JwtError};
use localrank_backend::JwtService;
use std::collections::HashMap;
use uuid::Uuid;

/// Helper to create a JWT config without relying on environment
fn create_test_jwt_config(expiry: u64) -> JwtConfig {
    let secret = b"integration-test-secret-hs256-minimum-32-chars";

    JwtConfig {
        access_token_expiry: expiry,
        algorithm: Algorithm::HS256,
        audience: "test.localrank.app".to_string(),
        issuer: "test.localrank.app".to_string(),
        encoding_key: EncodingKey::from_secret(secret),
        decoding_key: DecodingKey::from_secret(secret),
        key_version: 1,
    }
}

fn role_map(business_id: Uuid, roles: &[&str]) -> HashMap<Uuid, Vec<String>> {
    let mut map = HashMap::new();
    map.insert(business_id, roles.iter().map(|r| r.to_string()).collect());
    map
}

#[test]
fn test_access_token_generation_and_validation() {
    let jwt_service = JwtService::new(create_test_jwt_config(900));

    let user_id = Uuid::new_v4();
    let business_id = Uuid::new_v4();

    let token = jwt_service
        .generate_access_token(
            user_id,
            "owner@example.com",
            role_map(business_id, &["OWNER"]),
        )
        .expect("Failed to generate access token");

    let claims = jwt_service
        .validate_access_token(&token)
        .expect("Failed to validate access token");

    assert_eq!(claims.sub, user_id.to_string());
    assert_eq!(claims.email, "owner@example.com");
    assert_eq!(claims.aud, "test.localrank.app");
    assert_eq!(claims.iss, "test.localrank.app");
    assert_eq!(
        claims.roles.get(&business_id),
        Some(&vec!["OWNER".to_string()])
    );
    assert_eq!(claims.exp - claims.iat, 900);
}

#[test]
fn test_multi_business_role_map_survives_roundtrip() {
    let jwt_service = JwtService::new(create_test_jwt_config(900));

    let owned = Uuid::new_v4();
    let managed = Uuid::new_v4();
    let mut roles = role_map(owned, &["OWNER"]);
    roles.insert(managed, vec!["MANAGER".to_string(), "MEMBER".to_string()]);

    let token = jwt_service
        .generate_access_token(Uuid::new_v4(), "agency@example.com", roles)
        .expect("Failed to generate access token");

    let claims = jwt_service
        .validate_access_token(&token)
        .expect("Failed to validate access token");

    assert_eq!(claims.roles.len(), 2);
    assert_eq!(claims.roles.get(&owned), Some(&vec!["OWNER".to_string()]));
    assert_eq!(
        claims.roles.get(&managed),
        Some(&vec!["MANAGER".to_string(), "MEMBER".to_string()])
    );
}

#[test]
fn test_token_from_different_secret_rejected() {
    let issuing = JwtService::new(create_test_jwt_config(900));

    let other_secret = b"a-second-unrelated-secret-also-32-chars-long";
    let verifying = JwtService::new(JwtConfig {
        access_token_expiry: 900,
        algorithm: Algorithm::HS256,
        audience: "test.localrank.app".to_string(),
        issuer: "test.localrank.app".to_string(),
        encoding_key: EncodingKey::from_secret(other_secret),
        decoding_key: DecodingKey::from_secret(other_secret),
        key_version: 1,
    });

    let token = issuing
        .generate_access_token(Uuid::new_v4(), "user@example.com", HashMap::new())
        .expect("Failed to generate access token");

    assert!(matches!(
        verifying.validate_access_token(&token),
        Err(JwtError::InvalidToken)
    ));
}

#[test]
fn test_expired_token_rejected_with_zero_leeway() {
    let jwt_service = JwtService::new(create_test_jwt_config(0));

    let token = jwt_service
        .generate_access_token(Uuid::new_v4(), "user@example.com", HashMap::new())
        .expect("Failed to generate access token");

    // exp == iat; once the clock ticks past it the token is dead
    std::thread::sleep(std::time::Duration::from_millis(1100));

    assert!(matches!(
        jwt_service.validate_access_token(&token),
        Err(JwtError::TokenExpired)
    ));
}

#[test]
fn test_wrong_audience_rejected() {
    let issuing = JwtService::new(create_test_jwt_config(900));

    let secret = b"integration-test-secret-hs256-minimum-32-chars";
    let verifying = JwtService::new(JwtConfig {
        access_token_expiry: 900,
        algorithm: Algorithm::HS256,
        audience: "api.other-product.example".to_string(),
        issuer: "test.localrank.app".to_string(),
        encoding_key: EncodingKey::from_secret(secret),
        decoding_key: DecodingKey::from_secret(secret),
        key_version: 1,
    });

    let token = issuing
        .generate_access_token(Uuid::new_v4(), "user@example.com", HashMap::new())
        .expect("Failed to generate access token");

    assert!(verifying.validate_access_token(&token).is_err());
}
