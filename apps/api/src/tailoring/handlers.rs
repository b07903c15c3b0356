//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::inventory::{ExperienceEntry, Inventory};
use crate::posting::intake::{detect_company, detect_position};
use crate::state::AppState;
use crate::storage::StoredAnalysis;
use crate::tailoring::pipeline::Analysis;
use crate::tailoring::report::AnalysisReport;
use crate::tailoring::resume::ResumeLine;

const MAX_BATCH_POSTINGS: usize = 50;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub posting_text: String,
    pub inventory: Vec<ExperienceEntry>,
    /// Overrides detection from the posting text.
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchAnalyzeRequest {
    pub postings: Vec<String>,
    pub inventory: Vec<ExperienceEntry>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis_id: Uuid,
    pub resume_lines: Vec<ResumeLine>,
    pub resume_text: String,
    pub report: AnalysisReport,
}

#[derive(Debug, Serialize)]
pub struct BatchAnalyzeResponse {
    pub analyses: Vec<AnalyzeResponse>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyses
///
/// Full pipeline for one posting: extract → match → rewrite → integrity check
/// → report. The report is persisted; empty posting text is not an error.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let inventory = Inventory::new(request.inventory)?;
    let company = request.company.or_else(|| detect_company(&request.posting_text));
    let position = request
        .position
        .or_else(|| detect_position(&request.posting_text));

    let analyzer = state.analyzer.clone();
    let posting_text = request.posting_text;
    let analysis = tokio::task::spawn_blocking(move || analyzer.analyze(&posting_text, &inventory))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in analysis: {e}")))?;

    let response = persist(&state, analysis, company, position).await?;
    Ok(Json(response))
}

/// POST /api/v1/analyses/batch
///
/// Several postings against one inventory. Runs in parallel; results keep
/// posting order.
pub async fn handle_analyze_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchAnalyzeRequest>,
) -> Result<Json<BatchAnalyzeResponse>, AppError> {
    if request.postings.is_empty() {
        return Err(AppError::Validation("postings cannot be empty".to_string()));
    }
    if request.postings.len() > MAX_BATCH_POSTINGS {
        return Err(AppError::UnprocessableEntity(format!(
            "batch of {} postings exceeds the limit of {MAX_BATCH_POSTINGS}",
            request.postings.len()
        )));
    }
    let inventory = Inventory::new(request.inventory)?;

    let analyzer = state.analyzer.clone();
    let postings = request.postings;
    let (postings, analyses) = tokio::task::spawn_blocking(move || {
        let analyses = analyzer.analyze_batch(&postings, &inventory);
        (postings, analyses)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in batch analysis: {e}")))?;

    let mut responses = Vec::with_capacity(analyses.len());
    for (posting, analysis) in postings.iter().zip(analyses) {
        let response =
            persist(&state, analysis, detect_company(posting), detect_position(posting)).await?;
        responses.push(response);
    }

    Ok(Json(BatchAnalyzeResponse {
        analyses: responses,
    }))
}

/// GET /api/v1/analyses/:id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<Uuid>,
) -> Result<Json<StoredAnalysis>, AppError> {
    state
        .report_store
        .load(analysis_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Analysis {analysis_id} not found")))
}

async fn persist(
    state: &AppState,
    analysis: Analysis,
    company: Option<String>,
    position: Option<String>,
) -> Result<AnalyzeResponse, AppError> {
    let record = StoredAnalysis::new(&analysis, company, position);
    state.report_store.save(&record).await?;

    Ok(AnalyzeResponse {
        analysis_id: record.analysis_id,
        resume_lines: analysis.resume_lines,
        resume_text: analysis.resume_text,
        report: analysis.report,
    })
}
