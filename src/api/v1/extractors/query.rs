/*
 * Responsibility
 * - Query string を DTO として受け、検証済みパラメータ型へ変換する
 * - 失敗時は 422 + {"detail": [{loc, msg, type}]} へ変換
 * - handler は検証済みの型だけを受け取る
 */
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::error::{AppError, ValidationIssue};

/// Raw query DTO → validated parameter type.
///
/// `Raw` is the lenient shape (every field optional) so that missing or empty
/// values surface as per-field issues instead of one opaque deserialization
/// error.
pub trait QueryParams: Sized {
    type Raw: DeserializeOwned;

    fn from_raw(raw: Self::Raw) -> Result<Self, Vec<ValidationIssue>>;
}

pub struct ValidatedQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: QueryParams,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(raw) = Query::<T::Raw>::try_from_uri(&parts.uri).map_err(|e| {
            AppError::validation(vec![ValidationIssue::new(
                vec!["query".to_string()],
                e.body_text(),
                "parse_error",
            )])
        })?;

        let params = T::from_raw(raw).map_err(AppError::validation)?;
        Ok(Self(params))
    }
}
