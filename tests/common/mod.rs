#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use developer_portal_server::{
    config::SecuritySettings,
    models::{
        partner_credential::CreatePartnerCredentialRequest,
        status::Environment,
        user::{AuthResponse, RegisterRequest},
    },
    state::AppState,
    store::memory::MemoryStore,
    utils::hashing::HashParams,
};

pub const JWT_SECRET: &[u8] = b"integration-test-signing-secret-0123456789";
pub const API_KEY_PEPPER: &[u8] = b"integration-test-api-key-pepper-0123456789";
pub const PASSWORD: &str = "password123";

/// 2048-bit RSA key in SubjectPublicKeyInfo form.
pub const SPKI_PEM: &str = "-----BEGIN PUBLIC KEY-----
MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEAr7hOA55al7uR7SHCtuak
S8M/+lIfcugpJdX1Mdfi+ioVaEvuuGCGVgO4sdabMnOG3KjHmSAWA2mF4pmsGAcO
pzj6CXQSHZBceXfZY02+JNL/FtFO7gi5D8YLYoRgaDS274dwAyI+/qiafR6lCxdz
9/16V681V/9flemMKArPCH+UmcY1il/bjH0tzLOmvSKJpoeAdho4bKu/0WLxar7f
6AFozM9M3gvseJ3TNHIydSJCJtrByA9sibWbkGtcpuppH4mYFSMknDW62dnUEIja
wNEOclz/fp/VuYXEiunWXBHm1t2ldOW0E+0GRfMT9x6kyNHP8UeyM5kg9PHC9m1M
tQIDAQAB
-----END PUBLIC KEY-----
";

pub const SPKI_FINGERPRINT: &str =
    "db274666bb89839314138cfcf9ef007ddef037c48dc3ca562997da2dc91dc1bb";

pub fn settings() -> SecuritySettings {
    SecuritySettings {
        jwt_secret: JWT_SECRET.to_vec(),
        jwt_expiry_hours: 24,
        api_key_pepper: API_KEY_PEPPER.to_vec(),
        // Cheap work factor so tests stay fast
        hash_params: HashParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
    }
}

pub fn test_state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(Arc::clone(&store), &settings()).unwrap();
    (state, store)
}

pub async fn register(state: &AppState, email: &str) -> AuthResponse {
    state
        .auth
        .register(RegisterRequest {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            full_name: "Test Developer".to_string(),
        })
        .await
        .unwrap()
}

pub fn partner_request(name: &str) -> CreatePartnerCredentialRequest {
    CreatePartnerCredentialRequest {
        partner_name: name.to_string(),
        environment: Environment::Sandbox,
        callback_url: None,
        ip_whitelist: Vec::new(),
        public_key: None,
    }
}

/// Poll `check` until it holds or about a second has passed.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
