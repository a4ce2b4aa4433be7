mod common;

use developer_portal_server::{
    error::AppError,
    models::{
        partner_credential::{UpdatePartnerCredentialRequest, UpdatePublicKeyRequest},
        status::{Environment, RecordStatus},
    },
    utils::secrets::CLIENT_ID_LENGTH,
};

#[tokio::test]
async fn sixth_credential_fails_until_one_is_deleted() {
    let (state, _store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let mut created = Vec::new();
    for i in 0..5 {
        let credential = state
            .partner_credentials
            .create(user.id, common::partner_request(&format!("Partner {i}")))
            .await
            .unwrap();
        created.push(credential);
    }

    let err = state
        .partner_credentials
        .create(user.id, common::partner_request("Partner 6"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::QuotaExceeded { ceiling: 5, .. }));

    state
        .partner_credentials
        .delete(user.id, created[0].credential.id)
        .await
        .unwrap();

    assert!(
        state
            .partner_credentials
            .create(user.id, common::partner_request("Partner 6"))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn quota_is_per_account() {
    let (state, _store) = common::test_state();
    let first = common::register(&state, "first@example.com").await.user;
    let second = common::register(&state, "second@example.com").await.user;

    for i in 0..5 {
        state
            .partner_credentials
            .create(first.id, common::partner_request(&format!("Partner {i}")))
            .await
            .unwrap();
    }

    assert!(
        state
            .partner_credentials
            .create(second.id, common::partner_request("Other"))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn created_credential_has_expected_shape() {
    let (state, _store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let created = state
        .partner_credentials
        .create(user.id, common::partner_request("Acme"))
        .await
        .unwrap();

    assert_eq!(created.credential.client_id.len(), CLIENT_ID_LENGTH);
    assert!(created.credential.client_id.starts_with("BAS"));
    assert_eq!(created.client_secret.len(), 64);
    assert_eq!(
        created.credential.client_secret_prefix,
        format!("{}...", &created.client_secret[..8])
    );
    assert!(created.credential.channel_id.starts_with("CH"));
    assert!(created.credential.is_active);

    assert!(!format!("{created:?}").contains(&created.client_secret));

    // Listings never carry the secret
    let listed = state.partner_credentials.list(user.id).await.unwrap();
    let json = serde_json::to_string(&listed).unwrap();
    assert!(!json.contains(&created.client_secret));
}

#[tokio::test]
async fn rotation_invalidates_old_secret() {
    let (state, _store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let created = state
        .partner_credentials
        .create(user.id, common::partner_request("Acme"))
        .await
        .unwrap();
    let client_id = created.credential.client_id.clone();

    let rotated = state
        .partner_credentials
        .regenerate_secret(user.id, created.credential.id)
        .await
        .unwrap();

    assert_eq!(rotated.credential.id, created.credential.id);
    assert_eq!(rotated.credential.client_id, client_id);
    assert_ne!(rotated.client_secret, created.client_secret);

    let old = state
        .partner_credentials
        .validate_credential(&client_id, &created.client_secret)
        .await
        .unwrap();
    assert!(old.is_none());

    let new = state
        .partner_credentials
        .validate_credential(&client_id, &rotated.client_secret)
        .await
        .unwrap();
    assert_eq!(new.unwrap().id, created.credential.id);
}

#[tokio::test]
async fn unknown_client_id_is_rejected_like_wrong_secret() {
    let (state, store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let created = state
        .partner_credentials
        .create(user.id, common::partner_request("Acme"))
        .await
        .unwrap();

    let stored = store.partner_credential(created.credential.id).unwrap();
    assert!(!format!("{stored:?}").contains(&created.client_secret));

    let unknown = state
        .partner_credentials
        .validate_credential("BAS00000000000000000000000000000", &created.client_secret)
        .await
        .unwrap();
    let wrong_secret = state
        .partner_credentials
        .validate_credential(&created.credential.client_id, &"0".repeat(64))
        .await
        .unwrap();

    assert!(unknown.is_none());
    assert!(wrong_secret.is_none());
}

#[tokio::test]
async fn public_key_wrapped_at_76_columns_is_accepted() {
    let (state, store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let body: String = common::SPKI_PEM
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let wrapped: Vec<&str> = body
        .as_bytes()
        .chunks(76)
        .map(|chunk| std::str::from_utf8(chunk).unwrap())
        .collect();
    let pem = format!(
        "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----\n",
        wrapped.join("\n")
    );

    let mut request = common::partner_request("Acme");
    request.public_key = Some(pem);
    let created = state
        .partner_credentials
        .create(user.id, request)
        .await
        .unwrap();

    let stored = store.partner_credential(created.credential.id).unwrap();
    assert_eq!(
        stored.public_key_fingerprint.as_deref(),
        Some(common::SPKI_FINGERPRINT)
    );
}

#[tokio::test]
async fn validation_updates_last_used_in_background() {
    let (state, store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let created = state
        .partner_credentials
        .create(user.id, common::partner_request("Acme"))
        .await
        .unwrap();
    let credential_id = created.credential.id;

    state
        .partner_credentials
        .validate_credential(&created.credential.client_id, &created.client_secret)
        .await
        .unwrap()
        .unwrap();

    assert!(
        common::eventually(|| {
            store
                .partner_credential(credential_id)
                .is_some_and(|c| c.last_used_at.is_some())
        })
        .await
    );
}

#[tokio::test]
async fn last_used_failure_does_not_block_authentication() {
    let (state, store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let created = state
        .partner_credentials
        .create(user.id, common::partner_request("Acme"))
        .await
        .unwrap();

    store.set_fail_touch_last_used(true);

    let resolved = state
        .partner_credentials
        .validate_credential(&created.credential.client_id, &created.client_secret)
        .await
        .unwrap();
    assert!(resolved.is_some());
}

#[tokio::test]
async fn deleted_credential_is_kept_but_stops_authenticating() {
    let (state, store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let created = state
        .partner_credentials
        .create(user.id, common::partner_request("Acme"))
        .await
        .unwrap();

    state
        .partner_credentials
        .delete(user.id, created.credential.id)
        .await
        .unwrap();

    let resolved = state
        .partner_credentials
        .validate_credential(&created.credential.client_id, &created.client_secret)
        .await
        .unwrap();
    assert!(resolved.is_none());

    let row = store.partner_credential(created.credential.id).unwrap();
    assert_eq!(row.status, RecordStatus::Deleted);

    let err = state
        .partner_credentials
        .delete(user.id, created.credential.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CredentialNotFound));
}

#[tokio::test]
async fn other_accounts_see_not_found() {
    let (state, _store) = common::test_state();
    let owner = common::register(&state, "owner@example.com").await.user;
    let stranger = common::register(&state, "stranger@example.com").await.user;

    let created = state
        .partner_credentials
        .create(owner.id, common::partner_request("Acme"))
        .await
        .unwrap();
    let id = created.credential.id;

    assert!(matches!(
        state.partner_credentials.get(stranger.id, id).await,
        Err(AppError::CredentialNotFound)
    ));
    assert!(matches!(
        state
            .partner_credentials
            .regenerate_secret(stranger.id, id)
            .await,
        Err(AppError::CredentialNotFound)
    ));
    assert!(matches!(
        state.partner_credentials.delete(stranger.id, id).await,
        Err(AppError::CredentialNotFound)
    ));
}

#[tokio::test]
async fn public_key_is_fingerprinted_and_masked() {
    let (state, store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let mut request = common::partner_request("Acme");
    request.public_key = Some(common::SPKI_PEM.to_string());
    let created = state
        .partner_credentials
        .create(user.id, request)
        .await
        .unwrap();

    assert_eq!(
        created.credential.public_key_fingerprint.as_deref(),
        Some("db:27:46:66:bb:89:83:93...")
    );
    let stored = store.partner_credential(created.credential.id).unwrap();
    assert_eq!(
        stored.public_key_fingerprint.as_deref(),
        Some(common::SPKI_FINGERPRINT)
    );
    assert!(stored.public_key_added_at.is_some());

    let detail = state
        .partner_credentials
        .get(user.id, created.credential.id)
        .await
        .unwrap();
    let masked = detail.public_key.unwrap();
    assert!(masked.starts_with("-----BEGIN PUBLIC KEY-----\nMIIBIjAN..."));
    assert!(masked.ends_with("tQIDAQAB\n-----END PUBLIC KEY-----"));
}

#[tokio::test]
async fn public_key_can_be_replaced_and_cleared() {
    let (state, store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let created = state
        .partner_credentials
        .create(user.id, common::partner_request("Acme"))
        .await
        .unwrap();
    let id = created.credential.id;

    let err = state
        .partner_credentials
        .update_public_key(
            user.id,
            id,
            UpdatePublicKeyRequest {
                public_key: "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----"
                    .to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidPublicKey(_)));

    state
        .partner_credentials
        .update_public_key(
            user.id,
            id,
            UpdatePublicKeyRequest {
                public_key: common::SPKI_PEM.to_string(),
            },
        )
        .await
        .unwrap();
    let with_key = store.partner_credential(id).unwrap();
    assert_eq!(
        with_key.public_key_fingerprint.as_deref(),
        Some(common::SPKI_FINGERPRINT)
    );
    // Secret untouched by key replacement
    assert_eq!(with_key.client_secret, created.client_secret);

    state
        .partner_credentials
        .update_public_key(
            user.id,
            id,
            UpdatePublicKeyRequest {
                public_key: String::new(),
            },
        )
        .await
        .unwrap();
    let cleared = store.partner_credential(id).unwrap();
    assert!(cleared.public_key.is_none());
    assert!(cleared.public_key_fingerprint.is_none());
    assert!(cleared.public_key_added_at.is_none());
}

#[tokio::test]
async fn metadata_update_keeps_omitted_fields() {
    let (state, _store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let created = state
        .partner_credentials
        .create(user.id, common::partner_request("Acme"))
        .await
        .unwrap();

    let updated = state
        .partner_credentials
        .update(
            user.id,
            created.credential.id,
            UpdatePartnerCredentialRequest {
                partner_name: None,
                environment: Some(Environment::Production),
                callback_url: Some("https://acme.example/snap".to_string()),
                ip_whitelist: vec!["203.0.113.10".to_string()],
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.partner_name, "Acme");
    assert_eq!(updated.environment, Environment::Production);
    assert_eq!(
        updated.callback_url.as_deref(),
        Some("https://acme.example/snap")
    );
    assert_eq!(updated.ip_whitelist, vec!["203.0.113.10"]);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_issuing() {
    let (state, _store) = common::test_state();
    let user = common::register(&state, "dev@example.com").await.user;

    let mut bad_url = common::partner_request("Acme");
    bad_url.callback_url = Some("javascript:alert(1)".to_string());
    assert!(matches!(
        state.partner_credentials.create(user.id, bad_url).await,
        Err(AppError::InvalidRequest(_))
    ));

    let mut bad_ip = common::partner_request("Acme");
    bad_ip.ip_whitelist = vec!["999.1.1.1".to_string()];
    assert!(matches!(
        state.partner_credentials.create(user.id, bad_ip).await,
        Err(AppError::InvalidRequest(_))
    ));

    let mut bad_key = common::partner_request("Acme");
    bad_key.public_key = Some("not a pem".to_string());
    assert!(matches!(
        state.partner_credentials.create(user.id, bad_key).await,
        Err(AppError::InvalidPublicKey(_))
    ));

    assert!(state.partner_credentials.list(user.id).await.unwrap().is_empty());
}
