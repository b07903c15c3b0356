//! Axum route handlers for posting intake and keyword preview.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::posting::intake::PostingText;
use crate::posting::pdf;
use crate::state::AppState;
use crate::tailoring::keyword_extractor::RequirementPhrase;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct KeywordsRequest {
    pub posting_text: String,
}

#[derive(Debug, Serialize)]
pub struct KeywordsResponse {
    pub requirements: Vec<RequirementPhrase>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractUrlRequest {
    pub url: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/postings/keywords
///
/// Runs the keyword extractor only. Empty text yields an empty list.
pub async fn handle_extract_keywords(
    State(state): State<AppState>,
    Json(request): Json<KeywordsRequest>,
) -> Result<Json<KeywordsResponse>, AppError> {
    let requirements = state.analyzer.extract(&request.posting_text);
    Ok(Json(KeywordsResponse { requirements }))
}

/// POST /api/v1/postings/extract/pdf
///
/// Multipart upload with a `file` field holding the posting PDF.
pub async fn handle_extract_pdf(mut multipart: Multipart) -> Result<Json<PostingText>, AppError> {
    let mut upload: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
            upload = Some(data);
            break;
        }
    }
    let upload =
        upload.ok_or_else(|| AppError::Validation("multipart field 'file' is required".to_string()))?;

    // PDF parsing is CPU-bound; keep it off the async executor.
    let text = tokio::task::spawn_blocking(move || pdf::extract_text(&upload))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in PDF extraction: {e}")))??;

    Ok(Json(PostingText::from_raw(&text)?))
}

/// POST /api/v1/postings/extract/url
pub async fn handle_extract_url(
    State(state): State<AppState>,
    Json(request): Json<ExtractUrlRequest>,
) -> Result<Json<PostingText>, AppError> {
    let text = state.fetcher.fetch_text(&request.url).await?;
    Ok(Json(PostingText::from_raw(&text)?))
}
