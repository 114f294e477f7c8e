use opsgate_auth::domain::types::{ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};
use opsgate_auth::error::AuthServiceError;
use opsgate_auth::usecase::token::{
    CheckTokenUseCase, RefreshTokenUseCase, issue_access_token, issue_refresh_token,
};
use opsgate_auth_types::token::validate_access_token;

use crate::helpers::{MockUserRepo, TEST_JWT_SECRET, test_user};

// ── issue / validate ─────────────────────────────────────────────────────────

#[tokio::test]
async fn should_issue_access_token_that_validates_successfully() {
    let user = test_user();
    let (token, exp) = issue_access_token(&user, TEST_JWT_SECRET, ACCESS_TOKEN_TTL_SECS).unwrap();

    assert!(!token.is_empty());

    let info = validate_access_token(&token, TEST_JWT_SECRET).unwrap();
    assert_eq!(info.user_id, user.id);
    assert_eq!(info.email, user.email);
    assert_eq!(info.phone, user.phone);
    assert_eq!(info.access_token_exp, exp);
}

#[tokio::test]
async fn should_reject_token_signed_with_wrong_secret() {
    let user = test_user();
    let (token, _) = issue_access_token(&user, TEST_JWT_SECRET, ACCESS_TOKEN_TTL_SECS).unwrap();

    assert!(validate_access_token(&token, "wrong-secret").is_err());
}

// ── CheckTokenUseCase ────────────────────────────────────────────────────────

#[tokio::test]
async fn should_resolve_token_subject_to_live_user() {
    let user = test_user();
    let (token, exp) = issue_access_token(&user, TEST_JWT_SECRET, ACCESS_TOKEN_TTL_SECS).unwrap();

    let usecase = CheckTokenUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    };

    let checked = usecase.execute(&token).await.unwrap();
    assert_eq!(checked.user.id, user.id);
    assert_eq!(checked.access_token_exp, exp);
}

#[tokio::test]
async fn should_reject_valid_signature_over_deleted_user() {
    let user = test_user();
    let (token, _) = issue_access_token(&user, TEST_JWT_SECRET, ACCESS_TOKEN_TTL_SECS).unwrap();

    let usecase = CheckTokenUseCase {
        users: MockUserRepo::empty(),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    };

    let result = usecase.execute(&token).await;
    assert!(matches!(result, Err(AuthServiceError::UserNotFound)));
}

#[tokio::test]
async fn should_reject_malformed_token() {
    let usecase = CheckTokenUseCase {
        users: MockUserRepo::empty(),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    };

    let result = usecase.execute("not-a-jwt").await;
    assert!(matches!(result, Err(AuthServiceError::InvalidToken)));
}

// ── RefreshTokenUseCase ──────────────────────────────────────────────────────

#[tokio::test]
async fn should_reissue_access_token_without_rotating_refresh() {
    let user = test_user();
    let (refresh, refresh_exp) =
        issue_refresh_token(&user, TEST_JWT_SECRET, REFRESH_TOKEN_TTL_SECS).unwrap();

    let usecase = RefreshTokenUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
        access_ttl_secs: ACCESS_TOKEN_TTL_SECS,
    };

    let out = usecase.execute(&refresh).await.unwrap();

    // Presented refresh token comes back untouched, original expiry intact.
    assert_eq!(out.refresh_token, refresh);
    assert_eq!(out.refresh_token_exp, refresh_exp);

    let info = validate_access_token(&out.access_token, TEST_JWT_SECRET).unwrap();
    assert_eq!(info.user_id, user.id);
}

#[tokio::test]
async fn should_reject_refresh_for_deleted_user() {
    let user = test_user();
    let (refresh, _) = issue_refresh_token(&user, TEST_JWT_SECRET, REFRESH_TOKEN_TTL_SECS).unwrap();

    let usecase = RefreshTokenUseCase {
        users: MockUserRepo::empty(),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
        access_ttl_secs: ACCESS_TOKEN_TTL_SECS,
    };

    let result = usecase.execute(&refresh).await;
    assert!(matches!(result, Err(AuthServiceError::AuthenticationFailed)));
}

#[tokio::test]
async fn should_reject_garbage_refresh_token() {
    let usecase = RefreshTokenUseCase {
        users: MockUserRepo::empty(),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
        access_ttl_secs: ACCESS_TOKEN_TTL_SECS,
    };

    let result = usecase.execute("garbage").await;
    assert!(matches!(result, Err(AuthServiceError::InvalidToken)));
}
