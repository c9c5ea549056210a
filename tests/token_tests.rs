//! Session token unit coverage: issue/verify round trips and the full set of
//! rejection cases (malformed, truncated, expired, wrong key).

mod common;

use attendance_portal::auth::{self, Claims, Role};
use common::{TEST_JWT_SECRET, TEST_USER_ID};
use jsonwebtoken::{EncodingKey, Header, encode};

#[test]
fn round_trip_preserves_identity() {
    let token = auth::issue_token(TEST_JWT_SECRET, TEST_USER_ID, "user@example.com", Role::Teacher)
        .unwrap();

    let claims = auth::verify_token(TEST_JWT_SECRET, &token).expect("fresh token should verify");
    assert_eq!(claims.sub, TEST_USER_ID);
    assert_eq!(claims.email, "user@example.com");
    assert_eq!(claims.role, Role::Teacher);
    // Lifetime is seven days.
    assert_eq!(claims.exp - claims.iat, auth::TOKEN_TTL_SECS as usize);
}

#[test]
fn expired_token_is_rejected() {
    // Issued nine days ago with the standard seven-day lifetime.
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: TEST_USER_ID,
        email: "user@example.com".to_string(),
        role: Role::Student,
        iat: (now - 9 * 24 * 60 * 60) as usize,
        exp: (now - 2 * 24 * 60 * 60) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    assert!(auth::verify_token(TEST_JWT_SECRET, &token).is_none());
}

#[test]
fn garbage_and_short_tokens_are_rejected() {
    assert!(auth::verify_token(TEST_JWT_SECRET, "").is_none());
    assert!(auth::verify_token(TEST_JWT_SECRET, "abc").is_none());
    assert!(auth::verify_token(TEST_JWT_SECRET, "not-a-jwt-at-all-but-long-enough").is_none());
}

#[test]
fn truncated_token_is_rejected() {
    let token =
        auth::issue_token(TEST_JWT_SECRET, TEST_USER_ID, "user@example.com", Role::Admin).unwrap();
    let truncated = &token[..token.len() - 10];
    assert!(auth::verify_token(TEST_JWT_SECRET, truncated).is_none());
}

#[test]
fn wrong_key_is_rejected() {
    let token =
        auth::issue_token(TEST_JWT_SECRET, TEST_USER_ID, "user@example.com", Role::Admin).unwrap();
    assert!(auth::verify_token("a-different-secret-entirely", &token).is_none());
}
