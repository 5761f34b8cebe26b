pub mod pdf;
pub mod wiki;

use thiserror::Error;

/// Failures while turning an uploaded document or article reference into
/// normalized text.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to extract text from PDF: {0}")]
    Pdf(String),
    #[error("document contained no extractable text")]
    EmptyDocument,
    #[error("article fetch failed: {0}")]
    ArticleFetch(String),
    #[error("article not found: {0}")]
    ArticleNotFound(String),
}
