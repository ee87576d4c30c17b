//! Bearer token（Azure AD JWT）検証 → AuthCtx を extensions に入れる
//!
//! - `Authorization: Bearer <jwt>` を受け取り、TokenVerifier で検証する
//! - ヘッダなし（MissingCredentials）と不正トークンは別の失敗として扱う
//! - 署名検証 + kid/aud/exp/nbf のチェックは services/auth 側の責務

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::error::AuthError;
use crate::state::AppState;

/// 保護対象の Router に認証を掛けるための middleware を適用する。
///
/// 例：
/// ```ignore
/// let protected = Router::new().route("/processes/number", get(get_process_number));
/// let protected = middleware::auth::access::apply(protected, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // ヘッダ自体が無い・Bearer 以外のスキームは MissingCredentials として扱う
    let token = bearer_token(&req).ok_or(AuthError::MissingCredentials)?;

    let identity = match state.verifier.validate(token).await {
        Ok(identity) => identity,
        Err(err) => {
            // The precise failure kind stays in the logs; the client only
            // ever sees the uniform AppError bodies. The fingerprint lets
            // operators correlate retries without the token itself landing
            // in the log stream.
            tracing::warn!(
                error = ?err,
                token_fp = %token_fingerprint(token),
                "bearer token rejected"
            );
            return Err(err.into());
        }
    };

    tracing::debug!(user = %identity.user_email, "bearer token accepted");

    let auth_ctx = AuthCtx {
        user_email: identity.user_email,
        subject: identity.subject,
        name: identity.name,
    };

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(auth_ctx);

    Ok(next.run(req).await)
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;

    value.strip_prefix("Bearer ")
}

// SHA-256 over the raw token, truncated. Enough to correlate log lines,
// useless for replaying the credential.
fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{Router, routing::get};
    use jsonwebtoken::Algorithm;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::v1::extractors::AuthCtxExtractor;
    use crate::services::auth::jwks::{HttpKeySource, JwksCache};
    use crate::services::auth::test_support::{SigningKey, claims_for, now_unix};
    use crate::services::auth::verifier::TokenVerifier;
    use crate::services::documents::DocumentStore;
    use crate::state::AppState;

    const AUDIENCE: &str = "api://client-123";

    async fn whoami(AuthCtxExtractor(auth): AuthCtxExtractor) -> String {
        auth.user_email
    }

    async fn mock_jwks_server(body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/discovery/v2.0/keys"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    async fn failing_jwks_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/discovery/v2.0/keys"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        server
    }

    async fn spawn_app(jwks_base: &str) -> SocketAddr {
        let url = format!("{jwks_base}/discovery/v2.0/keys")
            .parse()
            .unwrap();
        let source = Arc::new(HttpKeySource::new(reqwest::Client::new(), url));
        let jwks = JwksCache::new(source, Duration::from_secs(300));
        let verifier = Arc::new(TokenVerifier::new(
            jwks,
            AUDIENCE.to_string(),
            None,
            vec![Algorithm::RS256],
            0,
        ));

        // Lazy pool: the auth path never touches the database.
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/process_api_test")
            .unwrap();
        let documents = Arc::new(DocumentStore::new("pdfs/processo.pdf".into()));
        let state = AppState::new(db, verifier, documents);

        let protected = Router::new().route("/whoami", get(whoami));
        let app = apply(protected, state.clone()).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        addr
    }

    #[tokio::test]
    async fn missing_header_is_401_not_authenticated() {
        let server = failing_jwks_server().await;
        let addr = spawn_app(&server.uri()).await;

        let response = reqwest::get(format!("http://{addr}/whoami")).await.unwrap();

        assert_eq!(response.status(), 401);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body, serde_json::json!({ "detail": "Not authenticated" }));
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_401_not_authenticated() {
        let server = failing_jwks_server().await;
        let addr = spawn_app(&server.uri()).await;

        let response = reqwest::Client::new()
            .get(format!("http://{addr}/whoami"))
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 401);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Not authenticated");
    }

    #[tokio::test]
    async fn garbage_token_is_401_invalid_credentials() {
        let server = failing_jwks_server().await;
        let addr = spawn_app(&server.uri()).await;

        let response = reqwest::Client::new()
            .get(format!("http://{addr}/whoami"))
            .bearer_auth("definitely-not-a-jwt")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 401);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Invalid credentials");
    }

    #[tokio::test]
    async fn valid_token_reaches_the_handler_with_its_identity() {
        let key = SigningKey::generate("abc");
        let server = mock_jwks_server(SigningKey::jwk_set_json(&[&key])).await;
        let addr = spawn_app(&server.uri()).await;

        let token = key.sign(&claims_for(AUDIENCE, now_unix() + 3600));

        let response = reqwest::Client::new()
            .get(format!("http://{addr}/whoami"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "ana@example.com");
    }

    #[tokio::test]
    async fn jwks_outage_surfaces_as_503_not_401() {
        let key = SigningKey::generate("abc");
        let server = failing_jwks_server().await;
        let addr = spawn_app(&server.uri()).await;

        // Structurally fine token; only the key fetch fails.
        let token = key.sign(&claims_for(AUDIENCE, now_unix() + 3600));

        let response = reqwest::Client::new()
            .get(format!("http://{addr}/whoami"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 503);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Signing keys unavailable");
    }
}
