/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - ex: db: PgPool, verifier: TokenVerifier, documents: DocumentStore
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::{auth::TokenVerifier, documents::DocumentStore};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub verifier: Arc<TokenVerifier>,
    pub documents: Arc<DocumentStore>,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, verifier: Arc<TokenVerifier>, documents: Arc<DocumentStore>) -> Self {
        Self {
            db,
            verifier,
            documents,
        }
    }
}
