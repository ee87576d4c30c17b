use thiserror::Error;

use crate::services::auth::jwks::KeySetError;

/// Why a bearer token was rejected.
///
/// The split matters for operators: [`AuthError::KeyRetrieval`] is an
/// infrastructure fault (provider unreachable or publishing garbage) and must
/// not be reported to the client as an authentication failure. Everything
/// else is a caller fault and collapses into a uniform 401 at the HTTP edge,
/// while the precise variant stays available for logging.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization: Bearer` credentials were presented at all.
    /// Raised by the HTTP layer, never by `validate()` itself.
    #[error("no bearer credentials presented")]
    MissingCredentials,

    /// Not three base64url segments, or the header/payload is not valid
    /// structured data. Detected before any key lookup happens.
    #[error("malformed token")]
    MalformedToken(#[source] jsonwebtoken::errors::Error),

    /// The token header carries no `kid`, so no published key can be selected.
    #[error("token header carries no kid")]
    MissingKeyId,

    /// The key set could not be fetched or decoded.
    #[error("key set retrieval failed")]
    KeyRetrieval(#[from] KeySetError),

    /// No published key matches the token's `kid`, even after a refetch.
    #[error("no signing key published for kid {kid:?}")]
    UnknownSigningKey { kid: String },

    /// The header declares an algorithm outside the configured allow-list
    /// (includes "none"). Checked before any signature work.
    #[error("algorithm {alg:?} is not allowed")]
    AlgorithmNotAllowed { alg: String },

    /// The signature does not verify against the selected key.
    #[error("signature verification failed")]
    SignatureInvalid(#[source] jsonwebtoken::errors::Error),

    /// Signature fine, claims out of policy.
    #[error("claims rejected: {0}")]
    ClaimsInvalid(ClaimsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClaimsError {
    #[error("token expired")]
    Expired,

    #[error("audience mismatch")]
    WrongAudience,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("issuer mismatch")]
    WrongIssuer,
}
