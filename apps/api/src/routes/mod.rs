pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::posting::handlers as posting;
use crate::state::AppState;
use crate::tailoring::handlers as tailoring;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Posting intake
        .route(
            "/api/v1/postings/keywords",
            post(posting::handle_extract_keywords),
        )
        .route(
            "/api/v1/postings/extract/pdf",
            post(posting::handle_extract_pdf),
        )
        .route(
            "/api/v1/postings/extract/url",
            post(posting::handle_extract_url),
        )
        // Analysis
        .route("/api/v1/analyses", post(tailoring::handle_analyze))
        .route(
            "/api/v1/analyses/batch",
            post(tailoring::handle_analyze_batch),
        )
        .route("/api/v1/analyses/:id", get(tailoring::handle_get_analysis))
        .with_state(state)
}
