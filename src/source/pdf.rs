use crate::pipeline::normalize::normalize;
use crate::source::ExtractError;

/// Extract the text layer of a PDF held in memory and normalize it.
///
/// Extraction quality varies by PDF (text layer vs scanned images); a
/// scanned document with no text layer surfaces as `EmptyDocument` rather
/// than an empty success.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| ExtractError::Pdf(err.to_string()))?;
    let cleaned = normalize(&raw);
    if cleaned.is_empty() {
        return Err(ExtractError::EmptyDocument);
    }
    Ok(cleaned)
}

/// Run [`extract_text`] on the blocking thread pool; PDF parsing is
/// CPU-bound and must not stall the request executor.
pub async fn extract_text_async(bytes: Vec<u8>) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || extract_text(&bytes))
        .await
        .map_err(|err| ExtractError::Pdf(format!("extraction task failed: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::extract_text;
    use crate::source::ExtractError;

    #[test]
    fn garbage_bytes_are_a_pdf_error_not_a_panic() {
        let result = extract_text(b"not a pdf at all");
        assert!(matches!(result, Err(ExtractError::Pdf(_))));
    }
}
