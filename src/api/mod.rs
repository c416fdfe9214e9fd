pub mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;

use crate::service::Matcher;

pub use handlers::ApiError;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub matcher: Arc<Matcher>,
}

impl AppState {
    pub fn new(matcher: Matcher) -> Self {
        Self {
            matcher: Arc::new(matcher),
        }
    }
}

/// 构建路由
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/coretax/reconcile", post(handlers::reconcile_upload))
        .route("/api/coretax/chains", post(handlers::chains_upload))
        .route("/api/chains", post(handlers::chains_from_relations))
        .route("/api/chains/export", post(handlers::export_chains))
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(max_upload_bytes)))
        .with_state(state)
}
