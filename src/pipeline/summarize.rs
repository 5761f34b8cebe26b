use crate::pipeline::chunk;
use crate::pipeline::completion::{ChatMessage, CompletionBackend, CompletionError};
use crate::pipeline::language::Language;
use futures::stream;
use futures::{StreamExt, TryStreamExt};

pub const DEFAULT_CONCURRENCY_CAP: usize = 8;

/// Separator between per-chunk summaries in the joined result.
pub const CHUNK_SUMMARY_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
pub struct DocumentSummary {
    pub summary: String,
    pub num_chunks: usize,
}

/// Summarize every chunk through `backend` and join the partial summaries
/// in chunk order.
///
/// Requests fan out with at most `min(chunk_count, concurrency_cap)` in
/// flight. Each request is tagged with its chunk index and the results are
/// joined by that index, never by arrival order. Any chunk failure fails
/// the whole call; in-flight requests are dropped when the caller is
/// cancelled.
pub async fn summarize_chunks(
    backend: &dyn CompletionBackend,
    chunks: &[String],
    language: Language,
    concurrency_cap: usize,
) -> Result<String, CompletionError> {
    if chunks.is_empty() {
        return Ok(String::new());
    }

    let cap = concurrency_cap.max(1).min(chunks.len());
    let requests = chunks.iter().enumerate().map(|(index, chunk_text)| {
        let messages = vec![ChatMessage::user(format!(
            "{}\n\n{}",
            language.summarize_prefix(),
            chunk_text
        ))];
        async move {
            tracing::debug!(chunk_index = index, "summarizing chunk");
            let summary = backend.complete(&messages, language).await?;
            Ok::<(usize, String), CompletionError>((index, summary))
        }
    });

    // try_collect short-circuits on the first error and drops the
    // remaining in-flight requests.
    let mut tagged: Vec<(usize, String)> = stream::iter(requests)
        .buffer_unordered(cap)
        .try_collect()
        .await?;
    tagged.sort_by_key(|(index, _)| *index);

    let joined = tagged
        .into_iter()
        .map(|(_, summary)| summary)
        .collect::<Vec<_>>()
        .join(CHUNK_SUMMARY_SEPARATOR);
    Ok(joined)
}

/// Full summarize flow for one normalized document: split into chunks
/// under `chunk_budget_words`, batch-summarize, report the chunk count.
pub async fn summarize_document(
    backend: &dyn CompletionBackend,
    normalized_text: &str,
    chunk_budget_words: usize,
    language: Language,
    concurrency_cap: usize,
) -> Result<DocumentSummary, CompletionError> {
    let chunks = chunk::split(normalized_text, chunk_budget_words);
    let num_chunks = chunks.len();
    tracing::info!(num_chunks, chunk_budget_words, "summarizing document");
    let summary = summarize_chunks(backend, &chunks, language, concurrency_cap).await?;
    Ok(DocumentSummary {
        summary,
        num_chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::{CHUNK_SUMMARY_SEPARATOR, summarize_chunks, summarize_document};
    use crate::pipeline::completion::{ChatMessage, CompletionBackend, CompletionError};
    use crate::pipeline::language::Language;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes `S(<chunk>)`, sleeping longer for earlier chunks so that
    /// completions resolve in reverse order.
    struct ReversedEchoBackend;

    fn chunk_payload(messages: &[ChatMessage]) -> String {
        let content = &messages.last().expect("one message").content;
        content
            .rsplit_once("\n\n")
            .map(|(_, chunk_text)| chunk_text.to_string())
            .unwrap_or_else(|| content.clone())
    }

    #[async_trait]
    impl CompletionBackend for ReversedEchoBackend {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _language: Language,
        ) -> Result<String, CompletionError> {
            let chunk_text = chunk_payload(messages);
            let delay_ms = match chunk_text.as_str() {
                "c0" => 60,
                "c1" => 30,
                _ => 1,
            };
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok(format!("S({chunk_text})"))
        }
    }

    struct FailSecondChunkBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionBackend for FailSecondChunkBackend {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _language: Language,
        ) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let chunk_text = chunk_payload(messages);
            if chunk_text == "c1" {
                return Err(CompletionError::Upstream {
                    status: 400,
                    detail: "bad request".to_string(),
                });
            }
            Ok(format!("S({chunk_text})"))
        }
    }

    #[tokio::test]
    async fn summaries_are_joined_in_chunk_order_not_arrival_order() {
        let chunks = vec!["c0".to_string(), "c1".to_string(), "c2".to_string()];
        let joined = summarize_chunks(&ReversedEchoBackend, &chunks, Language::En, 8)
            .await
            .expect("summarize should succeed");
        assert_eq!(joined, "S(c0)\n\nS(c1)\n\nS(c2)");
    }

    #[tokio::test]
    async fn ordering_holds_when_concurrency_is_capped_below_chunk_count() {
        let chunks = vec!["c0".to_string(), "c1".to_string(), "c2".to_string()];
        let joined = summarize_chunks(&ReversedEchoBackend, &chunks, Language::En, 2)
            .await
            .expect("summarize should succeed");
        assert_eq!(
            joined,
            ["S(c0)", "S(c1)", "S(c2)"].join(CHUNK_SUMMARY_SEPARATOR)
        );
    }

    #[tokio::test]
    async fn any_chunk_failure_fails_the_whole_summarization() {
        let backend = FailSecondChunkBackend {
            calls: AtomicUsize::new(0),
        };
        let chunks = vec!["c0".to_string(), "c1".to_string(), "c2".to_string()];
        let result = summarize_chunks(&backend, &chunks, Language::En, 8).await;
        assert!(matches!(
            result,
            Err(CompletionError::Upstream { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn empty_chunk_list_yields_an_empty_summary_without_requests() {
        let backend = FailSecondChunkBackend {
            calls: AtomicUsize::new(0),
        };
        let joined = summarize_chunks(&backend, &[], Language::En, 8)
            .await
            .expect("empty input should succeed");
        assert!(joined.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn summarize_document_reports_the_chunk_count() {
        let text = (0..120).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let out = summarize_document(&ReversedEchoBackend, &text, 50, Language::En, 4)
            .await
            .expect("summarize should succeed");
        assert!(out.num_chunks > 1);
        assert!(!out.summary.is_empty());
    }
}
