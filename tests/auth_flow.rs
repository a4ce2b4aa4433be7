mod common;

use std::sync::Arc;

use developer_portal_server::{
    config::SecuritySettings,
    error::AppError,
    models::{
        status::AuthProvider,
        user::{LoginRequest, RegisterRequest, UpdateProfileRequest},
    },
    services::token_service::TokenType,
    state::{AppState, StateError},
    store::{UserStore, memory::MemoryStore},
};

#[tokio::test]
async fn register_then_refresh_yields_new_token_for_same_subject() {
    let (state, _store) = common::test_state();

    let registered = state
        .auth
        .register(RegisterRequest {
            email: "a@b.com".to_string(),
            password: "password123".to_string(),
            full_name: "A B".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(registered.user.email, "a@b.com");
    assert_eq!(registered.user.full_name, "A B");
    assert_eq!(registered.expires_in, 24 * 3600);

    let profile = serde_json::to_value(&registered.user).unwrap();
    assert!(profile.get("passwordHash").is_none());
    assert!(profile.get("providerId").is_none());

    let refreshed = state.auth.refresh(&registered.refresh_token).await.unwrap();
    assert_ne!(refreshed.access_token, registered.access_token);

    let original = state
        .tokens
        .verify(&registered.access_token, TokenType::Access)
        .unwrap();
    let renewed = state
        .tokens
        .verify(&refreshed.access_token, TokenType::Access)
        .unwrap();
    assert_eq!(renewed.user_id, original.user_id);
    assert_eq!(renewed.user_id, registered.user.id);
}

#[tokio::test]
async fn old_refresh_token_stays_valid_after_refresh() {
    let (state, _store) = common::test_state();
    let registered = common::register(&state, "dev@example.com").await;

    state.auth.refresh(&registered.refresh_token).await.unwrap();
    assert!(state.auth.refresh(&registered.refresh_token).await.is_ok());
}

#[tokio::test]
async fn access_token_cannot_refresh() {
    let (state, _store) = common::test_state();
    let registered = common::register(&state, "dev@example.com").await;

    let err = state
        .auth
        .refresh(&registered.access_token)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[tokio::test]
async fn registration_validation() {
    let (state, _store) = common::test_state();

    let cases = [
        ("not-an-email", "password123", "A B"),
        ("a@b.com", "short", "A B"),
        ("a@b.com", "password123", " A "),
    ];

    for (email, password, full_name) in cases {
        let err = state
            .auth
            .register(RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
                full_name: full_name.to_string(),
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::InvalidRequest(_)),
            "accepted {email:?} / {password:?} / {full_name:?}"
        );
    }
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() {
    let (state, _store) = common::test_state();
    common::register(&state, "dev@example.com").await;

    let err = state
        .auth
        .register(RegisterRequest {
            email: "Dev@Example.com".to_string(),
            password: "password123".to_string(),
            full_name: "Someone Else".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmailExists));
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let (state, _store) = common::test_state();
    common::register(&state, "dev@example.com").await;
    state
        .auth
        .federated_login("google-only@example.com", "Google User", "google-sub-1")
        .await
        .unwrap();

    let attempts = [
        ("nobody@example.com", common::PASSWORD),
        ("dev@example.com", "wrong-password"),
        ("google-only@example.com", common::PASSWORD),
    ];

    for (email, password) in attempts {
        let err = state
            .auth
            .login(LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials), "{email}");
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    let ok = state
        .auth
        .login(LoginRequest {
            email: "dev@example.com".to_string(),
            password: common::PASSWORD.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(ok.user.email, "dev@example.com");
}

#[tokio::test]
async fn federated_login_links_existing_account() {
    let (state, _store) = common::test_state();
    let local = common::register(&state, "dev@example.com").await;

    let linked = state
        .auth
        .federated_login("dev@example.com", "Dev", "google-sub-42")
        .await
        .unwrap();
    assert_eq!(linked.user.id, local.user.id);
    assert_eq!(linked.user.provider, AuthProvider::Google);
    assert!(linked.user.is_verified);

    // Second sign-in resolves by provider ID
    let again = state
        .auth
        .federated_login("dev@example.com", "Dev", "google-sub-42")
        .await
        .unwrap();
    assert_eq!(again.user.id, local.user.id);

    // Password login keeps working for the linked account
    assert!(
        state
            .auth
            .login(LoginRequest {
                email: "dev@example.com".to_string(),
                password: common::PASSWORD.to_string(),
            })
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn federated_login_creates_verified_account() {
    let (state, _store) = common::test_state();

    let created = state
        .auth
        .federated_login("new@example.com", "New Person", "google-sub-7")
        .await
        .unwrap();

    assert_eq!(created.user.provider, AuthProvider::Google);
    assert!(created.user.is_verified);
    assert_eq!(created.user.full_name, "New Person");
}

#[tokio::test]
async fn profile_update_applies_non_empty_fields() {
    let (state, _store) = common::test_state();
    let registered = common::register(&state, "dev@example.com").await;

    let updated = state
        .users
        .update_profile(
            registered.user.id,
            UpdateProfileRequest {
                company: Some("Acme".to_string()),
                job_title: Some("   ".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.company.as_deref(), Some("Acme"));
    assert_eq!(updated.job_title, None);
    assert_eq!(updated.full_name, "Test Developer");
}

#[test]
fn oversized_token_lifetime_is_refused_at_startup() {
    let settings = SecuritySettings {
        jwt_expiry_hours: 10_000_000_000,
        ..common::settings()
    };

    let result = AppState::new(Arc::new(MemoryStore::new()), &settings);
    assert!(matches!(result, Err(StateError::Token(_))));
}

#[tokio::test]
async fn debug_output_hides_password_material() {
    let (state, store) = common::test_state();
    let registered = common::register(&state, "a@b.com").await;

    let rendered = format!("{registered:?}");
    assert!(!rendered.contains(&registered.access_token));
    assert!(!rendered.contains(&registered.refresh_token));

    let user = store.find_by_email("a@b.com").await.unwrap().unwrap();
    let password_hash = user.password_hash.clone().unwrap();
    let rendered = format!("{user:?}");
    assert!(rendered.contains("a@b.com"));
    assert!(!rendered.contains(&password_hash));
}
