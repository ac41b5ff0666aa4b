//! Listing-only adapter for the na.org text search results table.
//!
//! There are no detail pages: each data row carries its meeting metadata in
//! hidden form fields, plus an address line embedded after a `<br>` inside
//! the first visible cell's raw markup. The municipality comes from a
//! Massachusetts-format address heuristic kept behind `extract_municipality`
//! so a future non-MA source can swap in its own strategy.

use async_trait::async_trait;
use rmh_core::{NormalizedMeeting, Source};
use rmh_storage::HttpFetcher;
use scraper::{ElementRef, Html};
use tracing::debug;
use uuid::Uuid;

use crate::{parse_selector, select_first_inner_html, AdapterError, SourceAdapter};

const NA_SEARCH_URL: &str = "https://www.na.org/meetingsearch/text-results.php?country=USA&state=Massachusetts&city=Boston&zip=&street=&within=20&day=0&lang=&orderby=datetime";

const VENUE_CLOSED_MARKER: &str = "(VENUE CLOSED)";

pub struct NaTextAdapter {
    source: Source,
    search_url: String,
}

pub fn na_org() -> NaTextAdapter {
    NaTextAdapter::new(Source::NaOrg, NA_SEARCH_URL)
}

impl NaTextAdapter {
    pub fn new(source: Source, search_url: impl Into<String>) -> Self {
        Self {
            source,
            search_url: search_url.into(),
        }
    }
}

fn strip_venue_closed(value: &str) -> String {
    value.replace(VENUE_CLOSED_MARKER, "").trim().to_string()
}

/// Takes the token immediately preceding `MA` in the whitespace-split
/// address, with any trailing comma removed. Massachusetts-format addresses
/// only; a missing `MA` token fails the adapter.
fn extract_municipality(full_address: &str) -> Result<String, AdapterError> {
    let tokens: Vec<&str> = full_address.split_whitespace().collect();
    let state_pos = tokens
        .iter()
        .position(|token| *token == "MA")
        .ok_or_else(|| {
            AdapterError::parse(format!("no MA token in address `{full_address}`"))
        })?;
    if state_pos == 0 {
        return Err(AdapterError::parse(format!(
            "MA token has no preceding town in `{full_address}`"
        )));
    }
    Ok(tokens[state_pos - 1].trim_end_matches(',').to_string())
}

/// The street line hides after the `<br>` in the first cell's raw markup.
fn address_after_break(row: ElementRef<'_>, source: Source) -> Result<String, AdapterError> {
    let raw = select_first_inner_html(row, "td")?
        .ok_or_else(|| AdapterError::parse(format!("{source}: result row without cells")))?;
    raw.split("<br>")
        .nth(1)
        .map(ToString::to_string)
        .ok_or_else(|| {
            AdapterError::parse(format!("{source}: address cell missing its line break"))
        })
}

fn hidden_field(form: ElementRef<'_>, id: &str, source: Source) -> Result<String, AdapterError> {
    let sel = parse_selector(&format!("#{id}"))?;
    let input = form.select(&sel).next().ok_or_else(|| {
        AdapterError::parse(format!("{source}: missing hidden field #{id}"))
    })?;
    Ok(input.value().attr("value").unwrap_or_default().to_string())
}

fn parse_results(html: &str, source: Source) -> Result<Vec<NormalizedMeeting>, AdapterError> {
    let document = Html::parse_document(html);
    let row_sel = parse_selector(".result_table tr")?;
    let form_sel = parse_selector(r#"form[action="email-update.php"]"#)?;

    let mut meetings = Vec::new();
    // The first row is the column header and carries no hidden fields.
    for row in document.select(&row_sel).skip(1) {
        let form = row.select(&form_sel).next().ok_or_else(|| {
            AdapterError::parse(format!("{source}: result row without its update form"))
        })?;

        let code = hidden_field(form, "hdnGroupId", source)?;
        let location = strip_venue_closed(&hidden_field(form, "hdnLocation", source)?);
        let full_address = strip_venue_closed(&hidden_field(form, "hdnAddress", source)?);
        let address = address_after_break(row, source)?;
        let town = extract_municipality(&full_address)?;
        let day = hidden_field(form, "hdnMtgDay", source)?;
        let time = hidden_field(form, "hdnMtgTime", source)?;
        let types = hidden_field(form, "hdnFormats", source)?
            .split(',')
            .map(|label| label.trim().to_string())
            .collect();
        let notes = hidden_field(form, "hdnRoom", source)?;

        meetings.push(NormalizedMeeting {
            code,
            datetime: format!("{day}, {time}"),
            town,
            name: None,
            location,
            address,
            city: None,
            state: None,
            zip: None,
            types,
            type_description: None,
            last_updated: None,
            notes: Some(notes),
            contact: None,
            source,
        });
    }
    Ok(meetings)
}

#[async_trait]
impl SourceAdapter for NaTextAdapter {
    fn source(&self) -> Source {
        self.source
    }

    async fn scrape(
        &self,
        http: &HttpFetcher,
        run_id: Uuid,
    ) -> Result<Vec<NormalizedMeeting>, AdapterError> {
        let html = http
            .fetch_text(run_id, self.source.as_str(), &self.search_url)
            .await?;
        let meetings = parse_results(&html, self.source)?;
        debug!(source = self.source.as_str(), rows = meetings.len(), "parsed results table");
        Ok(meetings)
    }
}
