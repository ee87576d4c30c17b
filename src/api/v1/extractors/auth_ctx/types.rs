/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - JWT の署名・claims 検証は middleware/services 側の責務
 * - ここは「型（契約）」として固定化する
 */

/// 認証済みのリクエストに付与されるコンテキスト
///
/// - `user_email` は検証済みトークンの `preferred_username`（なければ `upn`、
///   どちらも無ければ "unknown"）
/// - `subject` / `name` は監査・ログ相関用（必須ではない）
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub user_email: String,
    pub subject: Option<String>,
    pub name: Option<String>,
}
