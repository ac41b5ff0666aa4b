//! Listing+detail adapters for TSML-style meeting sites.
//!
//! Both sources render the same 12-step meeting guide markup: a listing table
//! whose rows link to per-meeting detail pages. The listing supplies the
//! provisional record; the detail page supplies schedule, type labels, notes
//! and contacts. Detail pages are fetched one at a time, in listing order,
//! because each fetch depends on the link discovered in the listing and the
//! origin sites should not see bursts of simultaneous requests.

use async_trait::async_trait;
use rmh_core::{NormalizedMeeting, Source};
use rmh_storage::HttpFetcher;
use scraper::{ElementRef, Html};
use tracing::debug;
use uuid::Uuid;

use crate::{
    parse_selector, select_all_texts, select_first_attr, select_first_inner_html,
    select_first_text, AdapterError, SourceAdapter,
};

const AA_BOSTON_LISTING_URL: &str = "https://aaboston.org/meetings?tsml-day=any";
const INDY_AA_LISTING_URL: &str = "https://indyaa.org/meetings/?tsml-day=any";

pub struct TsmlAdapter {
    source: Source,
    listing_url: String,
    /// Whether the detail page's `.location-address` markup is decomposed
    /// into city/state/zip. Only the Indianapolis site exposes it.
    decompose_address: bool,
}

pub fn aa_boston() -> TsmlAdapter {
    TsmlAdapter::new(Source::AaBoston, AA_BOSTON_LISTING_URL, false)
}

pub fn indy_aa() -> TsmlAdapter {
    TsmlAdapter::new(Source::IndyAa, INDY_AA_LISTING_URL, true)
}

impl TsmlAdapter {
    pub fn new(source: Source, listing_url: impl Into<String>, decompose_address: bool) -> Self {
        Self {
            source,
            listing_url: listing_url.into(),
            decompose_address,
        }
    }
}

/// Partial data captured from a listing row, pending detail-page enrichment.
#[derive(Debug, Clone, PartialEq)]
struct ProvisionalMeeting {
    link: String,
    code: String,
    town: String,
    name: String,
    location: String,
    address: String,
}

fn parse_listing(html: &str, source: Source) -> Result<Vec<ProvisionalMeeting>, AdapterError> {
    let document = Html::parse_document(html);
    let row_sel = parse_selector("#meetings_tbody tr")?;

    let mut rows = Vec::new();
    for row in document.select(&row_sel) {
        let link = select_first_attr(row, ".name a", "href")?.ok_or_else(|| {
            AdapterError::parse(format!("{source}: listing row without a detail link"))
        })?;
        rows.push(ProvisionalMeeting {
            link,
            code: select_first_text(row, ".types")?,
            town: select_first_text(row, ".region")?,
            name: select_first_text(row, ".name a")?,
            location: select_first_text(row, ".location")?.trim().to_string(),
            address: select_first_text(row, ".address")?,
        });
    }
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq)]
struct DetailFields {
    datetime: String,
    types: Vec<String>,
    type_description: String,
    last_updated: String,
    notes: String,
    contact: Vec<String>,
    city_state_zip: Option<(String, String, String)>,
}

fn parse_detail(
    html: &str,
    source: Source,
    decompose_address: bool,
) -> Result<DetailFields, AdapterError> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let city_state_zip = if decompose_address {
        let raw = select_first_inner_html(root, ".location-address")?.ok_or_else(|| {
            AdapterError::parse(format!("{source}: detail page missing .location-address"))
        })?;
        Some(decompose_location_address(&raw))
    } else {
        None
    };

    Ok(DetailFields {
        datetime: select_first_text(root, ".meeting-time")?.trim().to_string(),
        types: select_all_texts(root, ".meeting-types li")?,
        type_description: select_first_text(root, ".meeting-type-description")?,
        last_updated: select_first_text(root, ".list-group-item-updated")?
            .replace("Updated", "")
            .trim()
            .to_string(),
        notes: select_first_text(root, ".meeting-notes")?,
        contact: contact_emails(root, source)?,
        city_state_zip,
    })
}

/// `"12 Oak St<br>Carmel, IN 46032"` -> `("Carmel", "IN", "46032")`.
/// Markup without a `<br>` yields empty strings, the site simply does not
/// decompose that address.
fn decompose_location_address(raw: &str) -> (String, String, String) {
    match raw.split_once("<br>") {
        Some((_, tail)) => {
            let mut parts = tail.split(' ');
            let city = parts
                .next()
                .unwrap_or_default()
                .trim_end_matches(',')
                .to_string();
            let state = parts.next().unwrap_or_default().to_string();
            let zip = parts.next().unwrap_or_default().to_string();
            (city, state, zip)
        }
        None => (String::new(), String::new(), String::new()),
    }
}

fn contact_emails(root: ElementRef<'_>, source: Source) -> Result<Vec<String>, AdapterError> {
    let sel = parse_selector(".list-group-item-group a")?;
    let mut emails = Vec::new();
    for anchor in root.select(&sel) {
        let href = anchor.value().attr("href").ok_or_else(|| {
            AdapterError::parse(format!("{source}: contact link without an href"))
        })?;
        emails.push(href.trim_start_matches("mailto:").to_string());
    }
    Ok(emails)
}

#[async_trait]
impl SourceAdapter for TsmlAdapter {
    fn source(&self) -> Source {
        self.source
    }

    async fn scrape(
        &self,
        http: &HttpFetcher,
        run_id: Uuid,
    ) -> Result<Vec<NormalizedMeeting>, AdapterError> {
        let listing_html = http
            .fetch_text(run_id, self.source.as_str(), &self.listing_url)
            .await?;
        let provisionals = parse_listing(&listing_html, self.source)?;
        debug!(source = self.source.as_str(), rows = provisionals.len(), "parsed listing");

        let mut meetings = Vec::with_capacity(provisionals.len());
        for provisional in provisionals {
            let detail_html = http
                .fetch_text(run_id, self.source.as_str(), &provisional.link)
                .await?;
            let detail = parse_detail(&detail_html, self.source, self.decompose_address)?;

            let (city, state, zip) = match detail.city_state_zip {
                Some((city, state, zip)) => (Some(city), Some(state), Some(zip)),
                None => (None, None, None),
            };

            meetings.push(NormalizedMeeting {
                code: provisional.code,
                datetime: detail.datetime,
                town: provisional.town,
                name: Some(provisional.name),
                location: provisional.location,
                address: provisional.address,
                city,
                state,
                zip,
                types: detail.types,
                type_description: Some(detail.type_description),
                last_updated: Some(detail.last_updated),
                notes: Some(detail.notes),
                contact: Some(detail.contact),
                source: self.source,
            });
        }
        Ok(meetings)
    }
}
