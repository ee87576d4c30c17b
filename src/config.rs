/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, Azure AD テナント設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::{env, fmt};

use jsonwebtoken::Algorithm;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    // Azure AD tenant / app registration
    pub tenant_id: String,
    pub client_id: String,
    pub authority: String,
    pub jwks_url: Url,

    // Token validation policy
    pub expected_audience: String,
    pub expected_issuer: Option<String>,
    pub allowed_algorithms: Vec<Algorithm>,
    pub token_leeway_seconds: u64,

    // JWKS retrieval
    pub jwks_cache_ttl_seconds: u64,
    pub jwks_http_timeout_seconds: u64,

    pub process_pdf_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let tenant_id =
            env::var("AUTH_TENANT_ID").map_err(|_| ConfigError::Missing("AUTH_TENANT_ID"))?;
        let client_id =
            env::var("AUTH_CLIENT_ID").map_err(|_| ConfigError::Missing("AUTH_CLIENT_ID"))?;

        let authority = env::var("AUTH_AUTHORITY")
            .unwrap_or_else(|_| format!("https://login.microsoftonline.com/{}", tenant_id));

        // Discovery endpoint for the tenant's signing keys.
        let jwks_url = env::var("AUTH_JWKS_URL")
            .unwrap_or_else(|_| format!("{}/discovery/v2.0/keys", authority));
        let jwks_url = Url::parse(&jwks_url).map_err(|_| ConfigError::Invalid("AUTH_JWKS_URL"))?;

        // Tokens requested for this API carry the URI-qualified client id as
        // audience. The comparison later is a single exact string match, so
        // the full form is fixed here once.
        let expected_audience =
            env::var("AUTH_AUDIENCE").unwrap_or_else(|_| format!("api://{}", client_id));

        // Issuer verification is opt-in: the tutorial flow never checked it,
        // and multi-tenant registrations have more than one valid issuer.
        let expected_issuer = env::var("AUTH_ISSUER").ok().filter(|s| !s.is_empty());

        let allowed_algorithms = env::var("AUTH_ALLOWED_ALGS")
            .unwrap_or_else(|_| "RS256".to_string())
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(Algorithm::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigError::Invalid("AUTH_ALLOWED_ALGS"))?;

        if allowed_algorithms.is_empty() {
            return Err(ConfigError::Invalid("AUTH_ALLOWED_ALGS"));
        }

        let token_leeway_seconds = env::var("AUTH_TOKEN_LEEWAY_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let jwks_cache_ttl_seconds = env::var("JWKS_CACHE_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(300);

        let jwks_http_timeout_seconds = env::var("JWKS_HTTP_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10);

        let process_pdf_path = env::var("PROCESS_PDF_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("pdfs/processo.pdf"));

        Ok(Self {
            addr,
            database_url,
            app_env,
            cors_allowed_origins,
            tenant_id,
            client_id,
            authority,
            jwks_url,
            expected_audience,
            expected_issuer,
            allowed_algorithms,
            token_leeway_seconds,
            jwks_cache_ttl_seconds,
            jwks_http_timeout_seconds,
            process_pdf_path,
        })
    }
}
