/*
 * Responsibility
 * - /processes 系 handler
 * - query は extractor で検証済みの型として受け取る
 * - 認証済みユーザーは AuthCtxExtractor 経由で参照する
 */
use axum::{Json, extract::State};

use crate::{
    api::v1::{
        dto::processes::{ProcessDetailsResponse, ProcessNumberParams, ProcessNumberResponse},
        extractors::{AuthCtxExtractor, ValidatedQuery},
    },
    error::AppError,
    repos::process_repo,
    state::AppState,
};

pub async fn get_process_number(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
    ValidatedQuery(params): ValidatedQuery<ProcessNumberParams>,
) -> Result<Json<ProcessNumberResponse>, AppError> {
    let row = process_repo::get_by_protocol(&state.db, &params.protocol)
        .await?
        .ok_or_else(|| AppError::not_found("process"))?;

    tracing::debug!(
        user = %auth.user_email,
        protocol = %params.protocol,
        "process number lookup"
    );

    Ok(Json(ProcessNumberResponse {
        process_number: row.process_number,
        user_email: auth.user_email,
    }))
}

pub async fn get_process_details(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
) -> Result<Json<ProcessDetailsResponse>, AppError> {
    let text = state.documents.process_text().await.map_err(|err| {
        tracing::error!(error = %err, "failed to extract process pdf");
        AppError::from(err)
    })?;

    tracing::debug!(user = %auth.user_email, "process details requested");

    Ok(Json(ProcessDetailsResponse { text }))
}
