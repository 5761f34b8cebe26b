use crate::error::ApiError;
use crate::pipeline::completion::{ChatMessage, CompletionBackend};
use crate::pipeline::language::Language;
use crate::pipeline::normalize::normalize;
use crate::pipeline::{prompt, summarize, tokens};
use crate::server::AppState;
use crate::session::{Session, SourceKind};
use crate::source::{pdf, wiki};
use crate::util::now_epoch_secs;
use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Default)]
struct SummarizeForm {
    input_type: Option<String>,
    user_text: Option<String>,
    pdf_file: Option<Vec<u8>>,
    wiki_url: Option<String>,
    session_id: Option<String>,
    language: Option<String>,
}

async fn text_field(field: Field<'_>, name: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|err| ApiError::Validation(format!("invalid `{name}` field: {err}")))
}

async fn read_summarize_form(multipart: &mut Multipart) -> Result<SummarizeForm, ApiError> {
    let mut form = SummarizeForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::Validation(format!("invalid multipart payload: {err}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "input_type" => form.input_type = Some(text_field(field, "input_type").await?),
            "user_text" => form.user_text = Some(text_field(field, "user_text").await?),
            "pdf_file" => {
                let bytes = field.bytes().await.map_err(|err| {
                    ApiError::Validation(format!("invalid `pdf_file` upload: {err}"))
                })?;
                form.pdf_file = Some(bytes.to_vec());
            }
            "wiki_url" => form.wiki_url = Some(text_field(field, "wiki_url").await?),
            "session_id" => form.session_id = Some(text_field(field, "session_id").await?),
            "language" => form.language = Some(text_field(field, "language").await?),
            _ => {}
        }
    }
    Ok(form)
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub session_id: String,
    pub summary: String,
    pub toc: Vec<String>,
    pub num_chunks: usize,
}

pub async fn summarize(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let form = read_summarize_form(&mut multipart).await?;

    let input_type = form
        .input_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Validation("`input_type` is required".to_string()))?;
    let language = match form
        .language
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        Some(raw) => Language::parse(raw).ok_or_else(|| {
            ApiError::Validation(format!("unknown `language` value `{raw}`; use th or en"))
        })?,
        None => Language::default(),
    };

    let (source, context, toc) = match input_type {
        "text" => {
            let user_text = form.user_text.ok_or_else(|| {
                ApiError::Validation("`user_text` is required for text input".to_string())
            })?;
            (SourceKind::Text, normalize(&user_text), Vec::new())
        }
        "pdf" => {
            let bytes = form.pdf_file.ok_or_else(|| {
                ApiError::Validation("`pdf_file` is required for pdf input".to_string())
            })?;
            let text = pdf::extract_text_async(bytes).await?;
            (SourceKind::Pdf, text, Vec::new())
        }
        "wiki" => {
            let url = form.wiki_url.ok_or_else(|| {
                ApiError::Validation("`wiki_url` is required for wiki input".to_string())
            })?;
            let article = wiki::parse_article_url(&url).ok_or_else(|| {
                ApiError::Validation(
                    "`wiki_url` must look like https://<lang>.wikipedia.org/wiki/<title>"
                        .to_string(),
                )
            })?;
            // Box the future as an opaque `Send` future so its `Send`-ness is
            // checked here in isolation (where it holds) rather than folded
            // into the surrounding handler future, which otherwise trips
            // rustc's "implementation of Send is not general enough".
            let fetch: std::pin::Pin<
                Box<dyn std::future::Future<Output = _> + Send>,
            > = Box::pin(wiki::fetch_article(&state.http, &article));
            let fetched = fetch.await?;
            (SourceKind::Article, normalize(&fetched.text), fetched.toc)
        }
        other => {
            return Err(ApiError::Validation(format!(
                "unknown `input_type` `{other}`; use text, pdf, or wiki"
            )));
        }
    };

    if context.is_empty() {
        return Err(ApiError::Validation(
            "document contained no text after extraction".to_string(),
        ));
    }

    // Box as an opaque `Send` future (see the `fetch_article` call above) to
    // keep the surrounding handler future provably `Send`.
    let summarize_fut: std::pin::Pin<Box<dyn std::future::Future<Output = _> + Send>> =
        Box::pin(summarize::summarize_document(
            state.completion.as_ref(),
            &context,
            state.config.budgets.chunk_words,
            language,
            state.config.budgets.concurrency_cap,
        ));
    let result = summarize_fut.await?;

    let session_id = form
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| state.sessions.create_id());
    let now = now_epoch_secs()?;
    let created_at = state
        .sessions
        .get(&session_id)
        .map(|existing| existing.created_at_epoch_secs)
        .unwrap_or(now);
    state.sessions.put(
        &session_id,
        Session {
            source,
            context,
            summary: Some(result.summary.clone()),
            language,
            toc: toc.clone(),
            created_at_epoch_secs: created_at,
            updated_at_epoch_secs: now,
        },
    );
    tracing::info!(
        %session_id,
        num_chunks = result.num_chunks,
        source = ?source,
        "document summarized"
    );

    Ok(Json(SummarizeResponse {
        session_id,
        summary: result.summary,
        toc,
        num_chunks: result.num_chunks,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub question: String,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub answer: String,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::Validation(
            "`question` must not be empty".to_string(),
        ));
    }

    let session = state.sessions.get(&request.session_id).ok_or_else(|| {
        ApiError::UnknownSession(format!(
            "unknown session `{}`; summarize a document first",
            request.session_id
        ))
    })?;
    if session.context.is_empty() {
        return Err(ApiError::UnknownSession(format!(
            "session `{}` has no stored document context",
            request.session_id
        )));
    }

    let grounding = match request
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|topic| !topic.is_empty())
    {
        Some(topic) => wiki::section_for_topic(&session.context, topic).ok_or_else(|| {
            ApiError::NotFound(format!(
                "topic `{topic}` not found in the document headings"
            ))
        })?,
        None => session.context.clone(),
    };

    let language = request.language.unwrap_or(session.language);
    let summary = session.summary.clone().unwrap_or_default();
    let rendered = prompt::build_answer_prompt(
        &grounding,
        &summary,
        request.question.trim(),
        state.config.budgets.answer_prompt_words,
    );
    let answer = state
        .completion
        .complete(&[ChatMessage::user(rendered)], language)
        .await?;

    Ok(Json(ChatResponse {
        session_id: request.session_id,
        answer,
    }))
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub source: SourceKind,
    pub language: Language,
    pub summary: Option<String>,
    pub toc: Vec<String>,
    pub context_words: usize,
    pub created_at_epoch_secs: u64,
    pub updated_at_epoch_secs: u64,
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown session `{id}`")))?;

    Ok(Json(SessionResponse {
        session_id: id,
        source: session.source,
        language: session.language,
        summary: session.summary,
        toc: session.toc,
        context_words: tokens::measure(&session.context),
        created_at_epoch_secs: session.created_at_epoch_secs,
        updated_at_epoch_secs: session.updated_at_epoch_secs,
    }))
}
