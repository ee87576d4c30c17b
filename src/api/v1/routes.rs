// Responsibility
// - v1 の URL 構造を定義
// - /health は公開、/processes/* は Bearer 必須
// - Bearer が必要な範囲は middleware::auth::access::apply で決める
use axum::{Router, routing::get};

use crate::middleware;
use crate::state::AppState;

use crate::api::v1::handlers::{
    health::health,
    processes::{get_process_details, get_process_number},
};

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/processes/number", get(get_process_number))
        .route("/processes/details", get(get_process_details));
    let protected = middleware::auth::access::apply(protected, state);

    Router::new()
        .route("/health", get(health))
        .merge(protected)
}
