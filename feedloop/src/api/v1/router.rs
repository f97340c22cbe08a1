use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router(state: &AppState) -> Router<AppState> {
    let max_upload_bytes = state.config.processing.max_upload_bytes;

    let feedback = Router::new().route(
        "/",
        get(handlers::feedback::list_feedback).post(handlers::feedback::create_feedback),
    );

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router())
        .route("/chat", post(handlers::chat::chat))
        .nest("/feedback", feedback)
        .route("/documents", post(handlers::documents::create_documents))
        .route(
            "/documents:upload",
            post(handlers::documents::upload_documents)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}
