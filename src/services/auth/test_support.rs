//! Shared helpers for auth tests: RSA keypairs, token minting, and an
//! in-memory key source with a fetch counter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, EncodingKey, Header};

use crate::services::auth::jwks::{KeySetError, KeySetResult, KeySource};

/// An RSA keypair that signs test tokens and publishes its public JWK.
pub struct SigningKey {
    pub kid: String,
    encoding_key: EncodingKey,
    jwk: serde_json::Value,
}

impl SigningKey {
    pub fn generate(kid: &str) -> Self {
        let rsa = openssl::rsa::Rsa::generate(2048).unwrap();

        let jwk = serde_json::json!({
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": kid,
            "n": URL_SAFE_NO_PAD.encode(rsa.n().to_vec()),
            "e": URL_SAFE_NO_PAD.encode(rsa.e().to_vec()),
        });

        let encoding_key = EncodingKey::from_rsa_der(&rsa.private_key_to_der().unwrap());

        Self {
            kid: kid.to_string(),
            encoding_key,
            jwk,
        }
    }

    pub fn jwk_set_json(keys: &[&SigningKey]) -> serde_json::Value {
        serde_json::json!({
            "keys": keys.iter().map(|k| k.jwk.clone()).collect::<Vec<_>>(),
        })
    }

    pub fn jwk_set(keys: &[&SigningKey]) -> JwkSet {
        serde_json::from_value(Self::jwk_set_json(keys)).unwrap()
    }

    pub fn sign(&self, claims: &serde_json::Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        jsonwebtoken::encode(&header, claims, &self.encoding_key).unwrap()
    }
}

pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Baseline claims for a token that should validate.
pub fn claims_for(audience: &str, exp: u64) -> serde_json::Value {
    serde_json::json!({
        "aud": audience,
        "exp": exp,
        "sub": "user-1",
        "preferred_username": "ana@example.com",
    })
}

/// In-memory [`KeySource`] with a fetch counter.
///
/// `failing()` builds a source whose every fetch errors, standing in for an
/// unreachable provider.
pub struct StaticKeySource {
    set: Mutex<Option<JwkSet>>,
    fetches: AtomicUsize,
}

impl StaticKeySource {
    pub fn new(set: JwkSet) -> Arc<Self> {
        Arc::new(Self {
            set: Mutex::new(Some(set)),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            set: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn replace(&self, set: JwkSet) {
        *self.set.lock().unwrap() = Some(set);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> KeySetResult<JwkSet> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.set
            .lock()
            .unwrap()
            .clone()
            .ok_or(KeySetError::Status(503))
    }
}
