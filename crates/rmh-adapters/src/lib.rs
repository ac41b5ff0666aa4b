//! Per-source extraction adapters producing `NormalizedMeeting` records.
//!
//! Each adapter owns its fixed source URL(s) and knows that origin's page or
//! JSON shape. Fetches are strictly sequential; a violated structural
//! assumption fails the whole adapter rather than emitting partial records.

pub mod bmlt;
pub mod na_text;
pub mod tsml;

use async_trait::async_trait;
use rmh_core::{NormalizedMeeting, Source};
use rmh_storage::{FetchError, HttpFetcher};
use scraper::{ElementRef, Selector};
use thiserror::Error;
use uuid::Uuid;

pub use bmlt::{nerna, BmltAdapter};
pub use na_text::{na_org, NaTextAdapter};
pub use tsml::{aa_boston, indy_aa, TsmlAdapter};

pub const CRATE_NAME: &str = "rmh-adapters";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Network(#[from] FetchError),
    #[error("{0}")]
    Parse(String),
}

impl AdapterError {
    fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    /// Runs the adapter's full fetch+extract cycle. An empty result is a
    /// valid success; any error aborts the enclosing dataset.
    async fn scrape(
        &self,
        http: &HttpFetcher,
        run_id: Uuid,
    ) -> Result<Vec<NormalizedMeeting>, AdapterError>;
}

fn parse_selector(selector: &str) -> Result<Selector, AdapterError> {
    Selector::parse(selector).map_err(|e| AdapterError::Parse(e.to_string()))
}

/// Text of the first match, empty when the origin omits the element.
fn select_first_text(scope: ElementRef<'_>, selector: &str) -> Result<String, AdapterError> {
    let sel = parse_selector(selector)?;
    Ok(scope
        .select(&sel)
        .next()
        .map(|node| node.text().collect::<String>())
        .unwrap_or_default())
}

fn select_all_texts(scope: ElementRef<'_>, selector: &str) -> Result<Vec<String>, AdapterError> {
    let sel = parse_selector(selector)?;
    Ok(scope
        .select(&sel)
        .map(|node| node.text().collect::<String>().trim().to_string())
        .collect())
}

fn select_first_attr(
    scope: ElementRef<'_>,
    selector: &str,
    attr: &str,
) -> Result<Option<String>, AdapterError> {
    let sel = parse_selector(selector)?;
    Ok(scope
        .select(&sel)
        .next()
        .and_then(|node| node.value().attr(attr))
        .map(ToString::to_string))
}

/// Raw inner markup of the first match; some sources encode data after a
/// `<br>` that plain text extraction would flatten away.
fn select_first_inner_html(
    scope: ElementRef<'_>,
    selector: &str,
) -> Result<Option<String>, AdapterError> {
    let sel = parse_selector(selector)?;
    Ok(scope.select(&sel).next().map(|node| node.inner_html()))
}
