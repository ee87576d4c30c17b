/// Factory: build the `TokenVerifier` from application `Config`.
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::AppError;
use crate::services::auth::jwks::{HttpKeySource, JwksCache};
use crate::services::auth::verifier::TokenVerifier;

pub fn build_token_verifier(config: &Config) -> Result<Arc<TokenVerifier>, AppError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.jwks_http_timeout_seconds))
        .build()
        .map_err(|e| {
            tracing::error!(error = %e, "failed to build the JWKS HTTP client");
            AppError::Internal
        })?;

    let source = Arc::new(HttpKeySource::new(client, config.jwks_url.clone()));
    let jwks = JwksCache::new(
        source,
        Duration::from_secs(config.jwks_cache_ttl_seconds),
    );

    Ok(Arc::new(TokenVerifier::new(
        jwks,
        config.expected_audience.clone(),
        config.expected_issuer.clone(),
        config.allowed_algorithms.clone(),
        config.token_leeway_seconds,
    )))
}
