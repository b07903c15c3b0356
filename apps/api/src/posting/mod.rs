//! Posting intake — thin wrappers that turn PDFs, web pages and pasted text
//! into the plain posting text the tailoring pipeline consumes.

pub mod handlers;
pub mod intake;
pub mod pdf;
pub mod web;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("invalid posting url '{0}'")]
    InvalidUrl(String),

    #[error("failed to fetch posting: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("posting page returned HTTP {0}")]
    Status(u16),

    #[error("failed to read PDF: {0}")]
    Pdf(String),

    #[error("no text could be extracted from the posting")]
    Empty,
}
