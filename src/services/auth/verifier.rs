//! Bearer token verification against the tenant's published signing keys.
//!
//! The pipeline is linear and per-call stateless:
//! header decode → key resolution (cached JWKS) → signature + claims
//! verification → identity extraction. No claim value is trusted until the
//! signature has verified and audience/expiry/not-before are within policy.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;

use crate::services::auth::error::{AuthError, ClaimsError};
use crate::services::auth::jwks::{JwksCache, KeySetError};

/// Sentinel identity for tokens that validated but carry no username claim.
pub const UNKNOWN_USER: &str = "unknown";

/// Raw claims, deserialized only after the signature verified.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenClaims {
    // String or array; jsonwebtoken compares against the expected audience.
    #[serde(default)]
    pub aud: serde_json::Value,

    pub exp: u64,

    #[serde(default)]
    pub nbf: Option<u64>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,

    // v2.0 tokens carry `preferred_username`, v1.0 tokens `upn`.
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub upn: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

/// The subset of verified claims handlers are allowed to see.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub user_email: String,
    pub subject: Option<String>,
    pub name: Option<String>,
}

impl AuthenticatedIdentity {
    /// Username claim order: `preferred_username`, then `upn`, then the
    /// `"unknown"` sentinel. A token without a display claim already passed
    /// every security check, so it never fails validation here.
    fn from_claims(claims: AccessTokenClaims) -> Self {
        let user_email = claims
            .preferred_username
            .or(claims.upn)
            .unwrap_or_else(|| UNKNOWN_USER.to_string());

        Self {
            user_email,
            subject: claims.sub,
            name: claims.name,
        }
    }
}

/// Verifies bearer tokens for one audience.
///
/// Stateless apart from the shared key-set cache; safe to share across
/// concurrent requests behind an `Arc`.
pub struct TokenVerifier {
    jwks: JwksCache,
    expected_audience: String,
    expected_issuer: Option<String>,
    allowed_algorithms: Vec<Algorithm>,
    leeway_seconds: u64,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("expected_audience", &self.expected_audience)
            .field("expected_issuer", &self.expected_issuer)
            .field("allowed_algorithms", &self.allowed_algorithms)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(
        jwks: JwksCache,
        expected_audience: String,
        expected_issuer: Option<String>,
        allowed_algorithms: Vec<Algorithm>,
        leeway_seconds: u64,
    ) -> Self {
        Self {
            jwks,
            expected_audience,
            expected_issuer,
            allowed_algorithms,
            leeway_seconds,
        }
    }

    /// Validate a bearer token and extract the caller's identity.
    ///
    /// Every failure before the final claims check is reported through the
    /// [`AuthError`] taxonomy; no network access happens for tokens that do
    /// not even parse.
    pub async fn validate(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        // The header is untrusted input: only `alg` and `kid` are read from
        // it, and both get cross-checked below.
        let header = decode_header(token).map_err(AuthError::MalformedToken)?;

        // Allow-list gate before any key fetch. "none" never parses into
        // `Algorithm`, so it is rejected one step earlier as malformed.
        if !self.allowed_algorithms.contains(&header.alg) {
            return Err(AuthError::AlgorithmNotAllowed {
                alg: format!("{:?}", header.alg),
            });
        }

        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        let jwk = self
            .jwks
            .find(&kid)
            .await?
            .ok_or_else(|| AuthError::UnknownSigningKey { kid: kid.clone() })?;

        let decoding_key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| AuthError::KeyRetrieval(KeySetError::InvalidKey(e.to_string())))?;

        let data = decode::<AccessTokenClaims>(token, &decoding_key, &self.validation(header.alg))
            .map_err(classify_decode_error)?;

        Ok(AuthenticatedIdentity::from_claims(data.claims))
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);

        // Exact string comparison against the full `api://<client-id>` form.
        // jsonwebtoken accepts both string and array `aud` claims but never
        // does prefix or substring matching.
        validation.set_audience(&[self.expected_audience.as_str()]);

        let mut required = vec!["exp", "aud"];
        if let Some(issuer) = &self.expected_issuer {
            validation.set_issuer(&[issuer.as_str()]);
            required.push("iss");
        }
        validation.set_required_spec_claims(&required);

        validation.validate_nbf = true;
        validation.leeway = self.leeway_seconds;

        validation
    }
}

/// Fold `jsonwebtoken`'s error kinds into the verifier taxonomy.
fn classify_decode_error(err: jsonwebtoken::errors::Error) -> AuthError {
    enum Class {
        Expired,
        NotYetValid,
        WrongAudience,
        WrongIssuer,
        Signature,
        Malformed,
    }

    let class = match err.kind() {
        ErrorKind::ExpiredSignature => Class::Expired,
        ErrorKind::ImmatureSignature => Class::NotYetValid,
        ErrorKind::InvalidAudience => Class::WrongAudience,
        ErrorKind::InvalidIssuer => Class::WrongIssuer,
        ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
            "aud" => Class::WrongAudience,
            "exp" => Class::Expired,
            "iss" => Class::WrongIssuer,
            _ => Class::Signature,
        },
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => Class::Malformed,
        // Anything else is some flavor of failed cryptographic verification.
        _ => Class::Signature,
    };

    match class {
        Class::Expired => AuthError::ClaimsInvalid(ClaimsError::Expired),
        Class::NotYetValid => AuthError::ClaimsInvalid(ClaimsError::NotYetValid),
        Class::WrongAudience => AuthError::ClaimsInvalid(ClaimsError::WrongAudience),
        Class::WrongIssuer => AuthError::ClaimsInvalid(ClaimsError::WrongIssuer),
        Class::Signature => AuthError::SignatureInvalid(err),
        Class::Malformed => AuthError::MalformedToken(err),
    }
}
