//! Shared application state handed to every handler and middleware.

use std::sync::Arc;

use crate::{
    config::SecuritySettings,
    services::{
        api_key_service::ApiKeyService,
        auth_service::AuthService,
        gateway::{
            ApiKeyAuthenticator, Authenticator, BearerTokenAuthenticator,
            ClientCredentialAuthenticator,
        },
        partner_credential_service::PartnerCredentialService,
        quota::QuotaPolicy,
        token_service::{TokenError, TokenService},
        user_service::UserService,
    },
    store::{ApiKeyStore, HealthProbe, PartnerCredentialStore, UserStore},
    utils::hashing::{HashError, LookupHasher, SecretHasher},
};

/// The security settings could not be turned into services.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Hashing(#[from] HashError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub users: UserService,
    pub api_keys: ApiKeyService,
    pub partner_credentials: PartnerCredentialService,
    pub tokens: Arc<TokenService>,

    /// `Authorization: Bearer` access tokens
    pub bearer: Arc<dyn Authenticator>,
    /// `X-Client-Id` / `X-Client-Secret`
    pub client_credentials: Arc<dyn Authenticator>,
    /// `X-API-Key`
    pub api_key_auth: Arc<dyn Authenticator>,

    pub health: Arc<dyn HealthProbe>,
}

impl AppState {
    /// Wire every service over one store.
    ///
    /// # Errors
    ///
    /// - [`StateError::Hashing`] if the configured Argon2 work factor is rejected
    /// - [`StateError::Token`] if the access token lifetime is out of range
    pub fn new<S>(store: Arc<S>, settings: &SecuritySettings) -> Result<Self, StateError>
    where
        S: UserStore + ApiKeyStore + PartnerCredentialStore + HealthProbe + 'static,
    {
        let hasher = SecretHasher::new(settings.hash_params)?;
        let tokens = Arc::new(TokenService::new(
            &settings.jwt_secret,
            settings.jwt_expiry_hours,
        )?);
        let quota = QuotaPolicy::default();

        let user_store: Arc<dyn UserStore> = store.clone();
        let api_key_store: Arc<dyn ApiKeyStore> = store.clone();
        let partner_store: Arc<dyn PartnerCredentialStore> = store.clone();
        let health: Arc<dyn HealthProbe> = store;

        let auth = AuthService::new(user_store.clone(), hasher.clone(), Arc::clone(&tokens));
        let users = UserService::new(user_store);
        let api_keys = ApiKeyService::new(
            api_key_store,
            hasher,
            LookupHasher::new(settings.api_key_pepper.clone()),
            quota,
        );
        let partner_credentials = PartnerCredentialService::new(partner_store, quota);

        Ok(Self {
            bearer: Arc::new(BearerTokenAuthenticator::new(Arc::clone(&tokens))),
            client_credentials: Arc::new(ClientCredentialAuthenticator::new(
                partner_credentials.clone(),
            )),
            api_key_auth: Arc::new(ApiKeyAuthenticator::new(api_keys.clone())),
            auth,
            users,
            api_keys,
            partner_credentials,
            tokens,
            health,
        })
    }
}
