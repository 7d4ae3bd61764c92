//! Article fetching and main-text extraction.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::FetchSettings;
use crate::error::{NewsMapError, Result};
use crate::models::ArticleInput;
use crate::utils::collapse_whitespace;

static LD_JSON: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script[type='application/ld+json']").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

/// Elements whose paragraphs are navigation, promos or page chrome.
const BOILERPLATE: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "form",
    "figcaption",
];

/// Elements whose text is never visible.
const INVISIBLE: &[&str] = &["script", "style", "noscript", "template"];

/// Paragraphs shorter than this are bylines, captions or buttons.
const MIN_PARAGRAPH_CHARS: usize = 25;

/// Resolve a submission to article text.
#[instrument(level = "info", skip_all, fields(input = input.kind()))]
pub async fn resolve(client: &Client, input: &ArticleInput, fetch: &FetchSettings) -> Result<String> {
    match input {
        ArticleInput::Text(text) => Ok(text.trim().to_string()),
        ArticleInput::Url(url) => fetch_article_text(client, url, fetch).await,
    }
}

/// Download a page and extract its main article text.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch_article_text(client: &Client, url: &str, fetch: &FetchSettings) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| NewsMapError::Fetch(format!("invalid URL {url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(NewsMapError::Fetch(format!(
            "unsupported URL scheme '{}'",
            parsed.scheme()
        )));
    }

    let response = client
        .get(parsed)
        .timeout(fetch.timeout())
        .send()
        .await
        .map_err(|e| NewsMapError::Fetch(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        warn!(%status, "Article request was not successful");
        return Err(NewsMapError::Fetch(format!("{url} returned HTTP {status}")));
    }

    let html = response
        .text()
        .await
        .map_err(|e| NewsMapError::Fetch(e.to_string()))?;
    debug!(bytes = html.len(), "Downloaded article HTML");

    let text = extract_article_text(&html)
        .ok_or_else(|| NewsMapError::Fetch(format!("no extractable text at {url}")))?;
    info!(bytes = text.len(), "Extracted article text");
    Ok(text)
}

/// Extract the readable article body from an HTML document.
pub fn extract_article_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Some(body) = json_ld_article_body(&document) {
        debug!("Using JSON-LD articleBody");
        return Some(body);
    }
    if let Some(text) = main_content(&document) {
        debug!("Using main-content paragraphs");
        return Some(text);
    }

    warn!("No article paragraphs found; falling back to visible page text");
    visible_text(&document)
}

fn json_ld_article_body(document: &Html) -> Option<String> {
    document.select(&LD_JSON).find_map(|script| {
        let json = serde_json::from_str::<Value>(script.text().collect::<String>().trim()).ok()?;
        find_article_body(&json).map(|body| body.trim().to_string())
    })
}

// JSON-LD may be a single object, an array, or an object with an @graph.
fn find_article_body(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => map
            .get("articleBody")
            .and_then(Value::as_str)
            .filter(|body| !body.trim().is_empty())
            .or_else(|| map.get("@graph").and_then(find_article_body)),
        Value::Array(items) => items.iter().find_map(find_article_body),
        _ => None,
    }
}

fn in_boilerplate(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| BOILERPLATE.contains(&ancestor.value().name()))
}

/// Pick the container holding the most paragraph text.
///
/// When the article's paragraphs are scattered over many small wrappers and
/// no single container holds at least half of the text, every surviving
/// paragraph is used in document order instead.
fn main_content(document: &Html) -> Option<String> {
    let mut all = Vec::new();
    let mut containers: Vec<(_, Vec<String>)> = Vec::new();

    for paragraph in document.select(&PARAGRAPH) {
        if in_boilerplate(&paragraph) {
            continue;
        }
        let text = collapse_whitespace(&paragraph.text().collect::<String>());
        if text.chars().count() < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let Some(parent) = paragraph.parent() else {
            continue;
        };

        all.push(text.clone());
        match containers.iter_mut().find(|(id, _)| *id == parent.id()) {
            Some((_, texts)) => texts.push(text),
            None => containers.push((parent.id(), vec![text])),
        }
    }

    let total: usize = all.iter().map(String::len).sum();
    if total == 0 {
        return None;
    }

    let (_, best) = containers
        .into_iter()
        .rev()
        .max_by_key(|(_, texts)| texts.iter().map(String::len).sum::<usize>())?;
    let best_len: usize = best.iter().map(String::len).sum();

    let paragraphs = if best_len * 2 >= total { best } else { all };
    Some(paragraphs.join("\n\n"))
}

fn visible_text(document: &Html) -> Option<String> {
    let root = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|el| el.name()))
            .is_some_and(|name| INVISIBLE.contains(&name));
        if !hidden {
            raw.push_str(text);
            raw.push(' ');
        }
    }

    let text = collapse_whitespace(&raw);
    (!text.is_empty()).then_some(text)
}
