use std::sync::Arc;

use crate::posting::web::PostingFetcher;
use crate::storage::ReportStore;
use crate::tailoring::pipeline::Analyzer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Ruleset and similarity strategy, validated once at startup and shared read-only.
    pub analyzer: Analyzer,
    /// Pluggable report persistence. Default: FileReportStore under REPORT_DIR.
    pub report_store: Arc<dyn ReportStore>,
    pub fetcher: PostingFetcher,
}
