//! Wikipedia article fetching over the MediaWiki action API.

use crate::source::ExtractError;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const GENERIC_SUBDOMAIN: &str = "www";
const DEFAULT_ARTICLE_LANGUAGE: &str = "en";

static ARTICLE_URL_RE: OnceLock<Regex> = OnceLock::new();
static HEADING_RE: OnceLock<Regex> = OnceLock::new();

fn article_url_re() -> &'static Regex {
    ARTICLE_URL_RE.get_or_init(|| {
        Regex::new(r"^https?://(?:([a-z][a-z0-9-]*)\.)?wikipedia\.org/wiki/([^?#]+)$")
            .expect("article url regex is valid")
    })
}

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| {
        Regex::new(r"(={2,6})\s*([^=]+?)\s*(={2,6})").expect("heading regex is valid")
    })
}

/// A validated reference to one encyclopedia article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRef {
    pub language: String,
    pub title: String,
}

/// Validate an article URL of the form `https://<lang>.wikipedia.org/wiki/<title>`.
///
/// The language code comes from the subdomain; the generic `www` subdomain
/// (or none at all) defaults to English. The title is percent-decoded and
/// underscore-normalized. Returns `None` for anything outside the expected
/// pattern.
pub fn parse_article_url(url: &str) -> Option<ArticleRef> {
    let captures = article_url_re().captures(url.trim())?;
    let subdomain = captures.get(1).map(|m| m.as_str());
    let language = match subdomain {
        None | Some(GENERIC_SUBDOMAIN) => DEFAULT_ARTICLE_LANGUAGE.to_string(),
        Some(code) => code.to_string(),
    };

    let raw_title = captures.get(2)?.as_str();
    let decoded = urlencoding::decode(raw_title).ok()?;
    let title = decoded.replace('_', " ").trim().to_string();
    if title.is_empty() {
        return None;
    }

    Some(ArticleRef { language, title })
}

/// Article content as extracted by the fetcher.
#[derive(Debug, Clone)]
pub struct WikiArticle {
    pub title: String,
    pub language: String,
    /// Plain-text body with wiki-style `== Heading ==` markers retained.
    pub text: String,
    /// Ordered section headings.
    pub toc: Vec<String>,
}

/// Fetch the plain-text extract and section list for `article`.
pub async fn fetch_article(
    http: &reqwest::Client,
    article: &ArticleRef,
) -> Result<WikiArticle, ExtractError> {
    let api_url = format!("https://{}.wikipedia.org/w/api.php", article.language);

    let extract_json = api_get(
        http,
        &api_url,
        &[
            ("action", "query"),
            ("format", "json"),
            ("prop", "extracts"),
            ("explaintext", "1"),
            ("exsectionformat", "wiki"),
            ("redirects", "1"),
            ("titles", &article.title),
        ],
    )
    .await?;
    let (title, text) = parse_extract_response(&extract_json, &article.title)?;

    let sections_json = api_get(
        http,
        &api_url,
        &[
            ("action", "parse"),
            ("format", "json"),
            ("prop", "sections"),
            ("redirects", "1"),
            ("page", &article.title),
        ],
    )
    .await?;
    let toc = parse_sections_response(&sections_json)?;

    Ok(WikiArticle {
        title,
        language: article.language.clone(),
        text,
        toc,
    })
}

async fn api_get(
    http: &reqwest::Client,
    api_url: &str,
    query: &[(&str, &str)],
) -> Result<Value, ExtractError> {
    let response = http
        .get(api_url)
        .query(query)
        .send()
        .await
        .map_err(|err| ExtractError::ArticleFetch(err.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ExtractError::ArticleFetch(format!(
            "{api_url} returned HTTP {status}"
        )));
    }
    response
        .json()
        .await
        .map_err(|err| ExtractError::ArticleFetch(format!("invalid API response: {err}")))
}

fn parse_extract_response(json: &Value, requested_title: &str) -> Result<(String, String), ExtractError> {
    let pages = json
        .get("query")
        .and_then(|query| query.get("pages"))
        .and_then(Value::as_object)
        .ok_or_else(|| {
            ExtractError::ArticleFetch("extract response missing `query.pages`".to_string())
        })?;
    let page = pages.values().next().ok_or_else(|| {
        ExtractError::ArticleFetch("extract response has no pages".to_string())
    })?;

    if page.get("missing").is_some() || page.get("pageid").is_none() {
        return Err(ExtractError::ArticleNotFound(requested_title.to_string()));
    }

    let title = page
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(requested_title)
        .to_string();
    let text = page
        .get("extract")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ExtractError::ArticleFetch("extract response missing page text".to_string())
        })?
        .to_string();
    Ok((title, text))
}

fn parse_sections_response(json: &Value) -> Result<Vec<String>, ExtractError> {
    if let Some(info) = json
        .get("error")
        .and_then(|error| error.get("info"))
        .and_then(Value::as_str)
    {
        return Err(ExtractError::ArticleFetch(format!("sections query: {info}")));
    }

    let sections = json
        .get("parse")
        .and_then(|parse| parse.get("sections"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ExtractError::ArticleFetch("sections response missing `parse.sections`".to_string())
        })?;

    Ok(sections
        .iter()
        .filter_map(|section| section.get("line").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

/// Slice the stored context down to the section titled `topic`.
///
/// Headings are the `== Heading ==` markers that survive normalization; a
/// section runs until the next heading of the same or a shallower level.
/// Matching is case-insensitive. Returns `None` when no heading matches.
pub fn section_for_topic(context: &str, topic: &str) -> Option<String> {
    let wanted = topic.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    let headings: Vec<(usize, usize, usize, String)> = heading_re()
        .captures_iter(context)
        .filter_map(|captures| {
            let all = captures.get(0)?;
            let level = captures.get(1)?.as_str().len();
            let title = captures.get(2)?.as_str().trim().to_lowercase();
            Some((all.start(), all.end(), level, title))
        })
        .collect();

    let (position, &(_, body_start, level, _)) = headings
        .iter()
        .enumerate()
        .find(|(_, (_, _, _, title))| *title == wanted)?;

    let body_end = headings[position + 1..]
        .iter()
        .find(|(_, _, next_level, _)| *next_level <= level)
        .map(|(start, _, _, _)| *start)
        .unwrap_or(context.len());

    Some(context[body_start..body_end].trim().to_string())
}
