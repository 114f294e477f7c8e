use std::sync::Arc;

use opsgate_auth::domain::registry::OtpRegistry;
use chrono::Utc;
use uuid::Uuid;

use opsgate_auth::domain::types::{
    ACCESS_TOKEN_TTL_SECS, BRIDGE_TOKEN_LEN, BRIDGE_TOKEN_TTL_SECS, OtpMethod,
    REFRESH_TOKEN_TTL_SECS, TrustedDevice,
};
use opsgate_auth::error::AuthServiceError;
use opsgate_auth::usecase::login::{LoginInput, LoginOutcome, LoginUseCase};
use opsgate_core::audit::{AuditLog, TracingAuditSink};

use crate::helpers::{
    MockBridgeTokenRepo, MockOtpDeviceRepo, MockOutbox, MockRateLimiter, MockTrustedDeviceRepo,
    MockUserRepo, TEST_JWT_SECRET, TEST_PASSWORD, test_otp_device, test_user, test_user_with_2fa,
};

const UA: &str = "Mozilla/5.0";
const IP: &str = "203.0.113.7";

fn login_input(identifier: &str, password: &str) -> LoginInput {
    LoginInput {
        identifier: identifier.to_owned(),
        password: password.to_owned(),
        user_agent: UA.to_owned(),
        ip_address: IP.to_owned(),
    }
}

fn usecase(
    users: MockUserRepo,
    trusted_devices: MockTrustedDeviceRepo,
    bridge_tokens: MockBridgeTokenRepo,
    otp_devices: MockOtpDeviceRepo,
    outbox: MockOutbox,
    limiter: MockRateLimiter,
) -> LoginUseCase<
    MockUserRepo,
    MockTrustedDeviceRepo,
    MockBridgeTokenRepo,
    MockOtpDeviceRepo,
    MockOutbox,
    MockRateLimiter,
> {
    LoginUseCase {
        users,
        trusted_devices,
        bridge_tokens,
        otp_devices,
        outbox,
        limiter,
        registry: Arc::new(OtpRegistry::from_config("email,sms,totp")),
        audit: AuditLog::new(Arc::new(TracingAuditSink)),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
        access_ttl_secs: ACCESS_TOKEN_TTL_SECS,
        refresh_ttl_secs: REFRESH_TOKEN_TTL_SECS,
        bridge_ttl_secs: BRIDGE_TOKEN_TTL_SECS,
    }
}

#[tokio::test]
async fn should_complete_login_without_two_factor() {
    let user = test_user();
    let users = MockUserRepo::new(vec![user.clone()]);
    let users_handle = users.handle();
    let devices = MockTrustedDeviceRepo::empty();
    let devices_handle = devices.handle();
    let outbox = MockOutbox::empty();
    let events = outbox.handle();

    let usecase = usecase(
        users,
        devices,
        MockBridgeTokenRepo::empty(),
        MockOtpDeviceRepo::empty(),
        outbox,
        MockRateLimiter::permissive(),
    );

    let outcome = usecase
        .execute(login_input(&user.email, TEST_PASSWORD))
        .await
        .unwrap();

    let bundle = match outcome {
        LoginOutcome::Complete(bundle) => bundle,
        other => panic!("expected Complete, got {other:?}"),
    };
    assert_eq!(bundle.user.id, user.id);
    assert!(!bundle.access_token.is_empty());
    assert!(!bundle.refresh_token.is_empty());
    // The freshly recorded device is untrusted, so its id is surfaced.
    assert!(bundle.user_device_id.is_some());

    // last_login touched, device row recorded, new-device event enqueued.
    assert!(users_handle.lock().unwrap()[0].last_login.is_some());
    assert_eq!(devices_handle.lock().unwrap().len(), 1);
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "device_login");
    assert_eq!(events[0].payload["email"], user.email.as_str());
}

#[tokio::test]
async fn should_login_by_phone_number() {
    let user = test_user();
    let usecase = usecase(
        MockUserRepo::new(vec![user.clone()]),
        MockTrustedDeviceRepo::empty(),
        MockBridgeTokenRepo::empty(),
        MockOtpDeviceRepo::empty(),
        MockOutbox::empty(),
        MockRateLimiter::permissive(),
    );

    let outcome = usecase
        .execute(login_input(&user.phone, TEST_PASSWORD))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Complete(_)));
}

#[tokio::test]
async fn should_not_notify_for_known_device() {
    let user = test_user();
    let devices = MockTrustedDeviceRepo::empty();
    let outbox = MockOutbox::empty();
    let events = outbox.handle();

    let usecase = usecase(
        MockUserRepo::new(vec![user.clone()]),
        devices,
        MockBridgeTokenRepo::empty(),
        MockOtpDeviceRepo::empty(),
        outbox,
        MockRateLimiter::permissive(),
    );

    usecase
        .execute(login_input(&user.email, TEST_PASSWORD))
        .await
        .unwrap();
    usecase
        .execute(login_input(&user.email, TEST_PASSWORD))
        .await
        .unwrap();

    // One event for the first sighting only.
    assert_eq!(events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_not_bump_last_login_for_known_device() {
    let user = test_user();
    let known = TrustedDevice {
        id: Uuid::new_v4(),
        user_id: user.id,
        user_agent: UA.to_owned(),
        ip_address: IP.to_owned(),
        last_seen: Utc::now(),
        trusted: false,
    };
    let users = MockUserRepo::new(vec![user.clone()]);
    let users_handle = users.handle();

    let usecase = usecase(
        users,
        MockTrustedDeviceRepo::new(vec![known]),
        MockBridgeTokenRepo::empty(),
        MockOtpDeviceRepo::empty(),
        MockOutbox::empty(),
        MockRateLimiter::permissive(),
    );

    let outcome = usecase
        .execute(login_input(&user.email, TEST_PASSWORD))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Complete(_)));

    // The device triple was already in the ledger, so the login leaves
    // last_login untouched.
    assert!(users_handle.lock().unwrap()[0].last_login.is_none());
}

#[tokio::test]
async fn should_reject_wrong_password_without_recording_device() {
    let user = test_user();
    let devices = MockTrustedDeviceRepo::empty();
    let devices_handle = devices.handle();

    let usecase = usecase(
        MockUserRepo::new(vec![user.clone()]),
        devices,
        MockBridgeTokenRepo::empty(),
        MockOtpDeviceRepo::empty(),
        MockOutbox::empty(),
        MockRateLimiter::permissive(),
    );

    let result = usecase.execute(login_input(&user.email, "wrong")).await;
    assert!(matches!(result, Err(AuthServiceError::InvalidCredentials)));
    assert!(devices_handle.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_reject_unknown_identifier() {
    let usecase = usecase(
        MockUserRepo::empty(),
        MockTrustedDeviceRepo::empty(),
        MockBridgeTokenRepo::empty(),
        MockOtpDeviceRepo::empty(),
        MockOutbox::empty(),
        MockRateLimiter::permissive(),
    );

    let result = usecase
        .execute(login_input("nobody@example.com", TEST_PASSWORD))
        .await;
    assert!(matches!(result, Err(AuthServiceError::InvalidCredentials)));
}

#[tokio::test]
async fn should_require_challenge_for_untrusted_device() {
    let user = test_user_with_2fa("email");
    let email_device = test_otp_device(user.id, OtpMethod::Email, true);
    let unconfirmed_totp = test_otp_device(user.id, OtpMethod::Totp, false);

    let bridge_tokens = MockBridgeTokenRepo::empty();
    let bridge_handle = bridge_tokens.handle();

    let usecase = usecase(
        MockUserRepo::new(vec![user.clone()]),
        MockTrustedDeviceRepo::empty(),
        bridge_tokens,
        MockOtpDeviceRepo::new(vec![email_device.clone(), unconfirmed_totp]),
        MockOutbox::empty(),
        MockRateLimiter::permissive(),
    );

    let outcome = usecase
        .execute(login_input(&user.email, TEST_PASSWORD))
        .await
        .unwrap();

    let prompt = match outcome {
        LoginOutcome::ChallengeRequired(prompt) => prompt,
        other => panic!("expected ChallengeRequired, got {other:?}"),
    };
    assert_eq!(prompt.default, "email");
    assert_eq!(prompt.token.len(), BRIDGE_TOKEN_LEN);
    // Only confirmed devices are offered.
    assert_eq!(prompt.devices.len(), 1);
    assert_eq!(prompt.devices["email"], email_device.id);

    let tokens = bridge_handle.lock().unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].key, prompt.token);
    assert_eq!(tokens[0].user_id, user.id);
}

#[tokio::test]
async fn should_skip_challenge_for_trusted_device() {
    let user = test_user_with_2fa("email");

    let usecase = usecase(
        MockUserRepo::new(vec![user.clone()]),
        MockTrustedDeviceRepo::trusted(user.id, UA, IP),
        MockBridgeTokenRepo::empty(),
        MockOtpDeviceRepo::new(vec![test_otp_device(user.id, OtpMethod::Email, true)]),
        MockOutbox::empty(),
        MockRateLimiter::permissive(),
    );

    let outcome = usecase
        .execute(login_input(&user.email, TEST_PASSWORD))
        .await
        .unwrap();
    assert!(matches!(outcome, LoginOutcome::Complete(_)));
}

#[tokio::test]
async fn should_keep_one_live_bridge_token_per_user() {
    let user = test_user_with_2fa("email");
    let bridge_tokens = MockBridgeTokenRepo::empty();
    let bridge_handle = bridge_tokens.handle();

    let usecase = usecase(
        MockUserRepo::new(vec![user.clone()]),
        MockTrustedDeviceRepo::empty(),
        bridge_tokens,
        MockOtpDeviceRepo::new(vec![test_otp_device(user.id, OtpMethod::Email, true)]),
        MockOutbox::empty(),
        MockRateLimiter::permissive(),
    );

    let first = usecase
        .execute(login_input(&user.email, TEST_PASSWORD))
        .await
        .unwrap();
    let second = usecase
        .execute(login_input(&user.email, TEST_PASSWORD))
        .await
        .unwrap();

    let (LoginOutcome::ChallengeRequired(first), LoginOutcome::ChallengeRequired(second)) =
        (first, second)
    else {
        panic!("expected two challenges");
    };
    assert_ne!(first.token, second.token);

    // The first token was displaced; only the second remains.
    let tokens = bridge_handle.lock().unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].key, second.token);
}

#[tokio::test]
async fn should_rate_limit_repeated_attempts() {
    let user = test_user();

    let usecase = usecase(
        MockUserRepo::new(vec![user.clone()]),
        MockTrustedDeviceRepo::empty(),
        MockBridgeTokenRepo::empty(),
        MockOtpDeviceRepo::empty(),
        MockOutbox::empty(),
        MockRateLimiter::with_limit(2),
    );

    // Failed attempts count too.
    let _ = usecase.execute(login_input(&user.email, "wrong")).await;
    let _ = usecase.execute(login_input(&user.email, "wrong")).await;

    let result = usecase
        .execute(login_input(&user.email, TEST_PASSWORD))
        .await;
    assert!(matches!(result, Err(AuthServiceError::RateLimited)));
}
