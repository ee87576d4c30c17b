pub mod auth_ctx;
pub mod query;

pub use auth_ctx::{AuthCtx, AuthCtxExtractor};
pub use query::ValidatedQuery;
