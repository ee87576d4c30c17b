/*
 * Responsibility
 * - processes テーブル向け SQLx 操作
 * - PgPool を受け取り protocol → process number の参照を提供
 * - DB エラーは RepoError/AppError に変換しやすい形で返す
 */
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::RepoError;

#[derive(Debug, FromRow)]
pub struct ProcessRow {
    #[sqlx(rename = "processId")]
    pub id: Uuid,
    pub protocol: String,
    #[sqlx(rename = "processNumber")]
    pub process_number: String,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

pub async fn get_by_protocol(db: &PgPool, protocol: &str) -> Result<Option<ProcessRow>, RepoError> {
    let row = sqlx::query_as::<_, ProcessRow>(
        r#"
        SELECT "processId", "protocol", "processNumber", "createdAt"
        FROM processes
        WHERE "protocol" = $1
        "#,
    )
    .bind(protocol)
    .fetch_optional(db)
    .await?;

    Ok(row)
}
