mod common;

use developer_portal_server::{
    error::AppError,
    models::{api_key::CreateApiKeyRequest, status::Environment},
};

fn key_request(name: &str) -> CreateApiKeyRequest {
    CreateApiKeyRequest {
        name: name.to_string(),
        environment: Environment::Sandbox,
        expires_in_days: None,
    }
}

#[tokio::test]
async fn issued_key_validates_and_is_stored_hashed() {
    let (state, store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let created = state
        .api_keys
        .create(user.id, key_request("CI"))
        .await
        .unwrap();

    assert!(created.key.starts_with("bas_"));
    assert_eq!(created.key.len(), 4 + 64);
    assert_eq!(created.api_key.key_prefix, &created.key[..12]);

    let stored = store.api_key(created.api_key.id).unwrap();
    assert_ne!(stored.key_hash, created.key);
    assert!(stored.key_hash.starts_with("$argon2id$"));
    assert_eq!(stored.lookup_hash.len(), 64);

    let rendered = format!("{stored:?}");
    assert!(!rendered.contains(&stored.key_hash));
    assert!(!rendered.contains(&stored.lookup_hash));
    assert!(!format!("{created:?}").contains(&created.key));

    let resolved = state.api_keys.validate_key(&created.key).await.unwrap();
    assert_eq!(resolved.unwrap().id, created.api_key.id);

    assert!(
        common::eventually(|| {
            store
                .api_key(created.api_key.id)
                .is_some_and(|k| k.last_used_at.is_some())
        })
        .await
    );
}

#[tokio::test]
async fn unknown_and_malformed_keys_do_not_validate() {
    let (state, _store) = common::test_state();

    let unknown = format!("bas_{}", "0".repeat(64));
    let missing_separator = format!("bas{}", "0".repeat(64));
    for presented in [
        "",
        "nope",
        unknown.as_str(),
        missing_separator.as_str(),
    ] {
        assert!(
            state
                .api_keys
                .validate_key(presented)
                .await
                .unwrap()
                .is_none()
        );
    }
}

#[tokio::test]
async fn revoked_key_stops_validating() {
    let (state, _store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let created = state
        .api_keys
        .create(user.id, key_request("CI"))
        .await
        .unwrap();
    state
        .api_keys
        .revoke(user.id, created.api_key.id)
        .await
        .unwrap();

    assert!(
        state
            .api_keys
            .validate_key(&created.key)
            .await
            .unwrap()
            .is_none()
    );
    assert!(state.api_keys.list(user.id).await.unwrap().is_empty());

    let err = state
        .api_keys
        .revoke(user.id, created.api_key.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ApiKeyNotFound));
}

#[tokio::test]
async fn eleventh_key_hits_quota() {
    let (state, _store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let mut ids = Vec::new();
    for i in 0..10 {
        let created = state
            .api_keys
            .create(user.id, key_request(&format!("key {i}")))
            .await
            .unwrap();
        ids.push(created.api_key.id);
    }

    let err = state
        .api_keys
        .create(user.id, key_request("one too many"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::QuotaExceeded { ceiling: 10, .. }));

    state.api_keys.revoke(user.id, ids[3]).await.unwrap();
    assert!(
        state
            .api_keys
            .create(user.id, key_request("replacement"))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn request_validation() {
    let (state, _store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    for request in [
        key_request("   "),
        key_request(&"n".repeat(101)),
        CreateApiKeyRequest {
            expires_in_days: Some(0),
            ..key_request("CI")
        },
        CreateApiKeyRequest {
            expires_in_days: Some(366),
            ..key_request("CI")
        },
    ] {
        assert!(matches!(
            state.api_keys.create(user.id, request).await,
            Err(AppError::InvalidRequest(_))
        ));
    }

    let with_expiry = state
        .api_keys
        .create(
            user.id,
            CreateApiKeyRequest {
                expires_in_days: Some(30),
                ..key_request("CI")
            },
        )
        .await
        .unwrap();
    assert!(with_expiry.api_key.expires_at.is_some());
}

#[tokio::test]
async fn keys_are_scoped_to_owner() {
    let (state, _store) = common::test_state();
    let owner = common::register(&state, "owner@example.com").await.user;
    let stranger = common::register(&state, "stranger@example.com").await.user;

    let created = state
        .api_keys
        .create(owner.id, key_request("CI"))
        .await
        .unwrap();

    assert!(matches!(
        state.api_keys.get(stranger.id, created.api_key.id).await,
        Err(AppError::ApiKeyNotFound)
    ));
    assert!(matches!(
        state.api_keys.revoke(stranger.id, created.api_key.id).await,
        Err(AppError::ApiKeyNotFound)
    ));
    assert!(state.api_keys.list(stranger.id).await.unwrap().is_empty());
}
