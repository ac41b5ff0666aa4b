//! Single-request adapter for BMLT-style JSONP search endpoints.
//!
//! The server answers with the JSON object wrapped in callback padding, so
//! exactly one leading and two trailing characters are stripped before
//! parsing. Every field in the payload is serialized as a string by the
//! server, including numeric ones like the weekday index.

use async_trait::async_trait;
use rmh_core::{weekday_name, NormalizedMeeting, Source};
use rmh_storage::HttpFetcher;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::{AdapterError, SourceAdapter};

const NERNA_QUERY_URL: &str = "https://nerna.org/main_server/client_interface/jsonp/?switcher=GetSearchResults&get_used_formats&lang_enum=en&data_field_key=id_bigint,longitude,latitude,formats,location_postal_code_1,duration_time,start_time,time_zone,weekday_tinyint,location_province,location_municipality,location_street,location_info,location_text,comments,meeting_name,virtual_meeting_additional_info,virtual_meeting_link,phone_meeting_number&services[]=2&recursive=1&sort_keys=start_time";

pub struct BmltAdapter {
    source: Source,
    query_url: String,
}

pub fn nerna() -> BmltAdapter {
    BmltAdapter::new(Source::Nerna, NERNA_QUERY_URL)
}

impl BmltAdapter {
    pub fn new(source: Source, query_url: impl Into<String>) -> Self {
        Self {
            source,
            query_url: query_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    meetings: Vec<BmltMeeting>,
    formats: Vec<BmltFormat>,
}

#[derive(Debug, Deserialize)]
struct BmltMeeting {
    id_bigint: String,
    weekday_tinyint: String,
    start_time: String,
    meeting_name: String,
    latitude: String,
    longitude: String,
    #[serde(default)]
    location_municipality: String,
    #[serde(default)]
    location_street: String,
    #[serde(default)]
    formats: String,
    #[serde(default)]
    virtual_meeting_link: String,
    #[serde(default)]
    virtual_meeting_additional_info: String,
}

#[derive(Debug, Deserialize)]
struct BmltFormat {
    key_string: String,
    name_string: String,
    #[serde(default)]
    description_string: String,
}

/// Strips one leading and two trailing wrapper characters from the padded
/// payload, leaving the bare JSON object.
fn strip_jsonp(raw: &str) -> Result<&str, AdapterError> {
    raw.get(1..raw.len().saturating_sub(2))
        .ok_or_else(|| AdapterError::parse("JSONP payload shorter than its wrapper"))
}

/// Resolves comma-separated format codes against the response's format
/// lookup. Any code without an exact `key_string` match is fatal; the API is
/// assumed self-consistent. Returns the resolved names plus the description
/// of the first code's format.
fn resolve_types(
    codes: &str,
    formats: &[BmltFormat],
) -> Result<(Vec<String>, String), AdapterError> {
    if codes.is_empty() {
        return Ok((Vec::new(), String::new()));
    }

    let mut types = Vec::new();
    for code in codes.split(',') {
        let format = formats
            .iter()
            .find(|f| f.key_string == code)
            .ok_or_else(|| AdapterError::parse(format!("unknown format code `{code}`")))?;
        types.push(format.name_string.clone());
    }

    let description = codes
        .split(',')
        .next()
        .and_then(|first| formats.iter().find(|f| f.key_string == first))
        .map(|f| f.description_string.clone())
        .unwrap_or_default();

    Ok((types, description))
}

fn synthesize_datetime(weekday_field: &str, start_time: &str) -> Result<String, AdapterError> {
    let index: usize = weekday_field
        .parse()
        .map_err(|_| AdapterError::parse(format!("non-numeric weekday `{weekday_field}`")))?;
    let day = weekday_name(index)
        .ok_or_else(|| AdapterError::parse(format!("weekday index {index} out of range")))?;
    Ok(format!("{day}, {start_time}"))
}

fn to_meeting(
    meeting: &BmltMeeting,
    formats: &[BmltFormat],
    source: Source,
) -> Result<NormalizedMeeting, AdapterError> {
    let (types, type_description) = resolve_types(&meeting.formats, formats)?;
    let datetime = synthesize_datetime(&meeting.weekday_tinyint, &meeting.start_time)?;

    let notes = if meeting.virtual_meeting_link.is_empty() {
        String::new()
    } else {
        format!(
            "{}, {}",
            meeting.virtual_meeting_link, meeting.virtual_meeting_additional_info
        )
    };

    Ok(NormalizedMeeting {
        code: meeting.id_bigint.clone(),
        datetime,
        town: meeting.location_municipality.clone(),
        name: Some(meeting.meeting_name.clone()),
        location: format!("{}, {}", meeting.latitude, meeting.longitude),
        address: meeting.location_street.clone(),
        city: None,
        state: None,
        zip: None,
        types,
        type_description: Some(type_description),
        last_updated: None,
        notes: Some(notes),
        contact: None,
        source,
    })
}

#[async_trait]
impl SourceAdapter for BmltAdapter {
    fn source(&self) -> Source {
        self.source
    }

    async fn scrape(
        &self,
        http: &HttpFetcher,
        run_id: Uuid,
    ) -> Result<Vec<NormalizedMeeting>, AdapterError> {
        let raw = http
            .fetch_text(run_id, self.source.as_str(), &self.query_url)
            .await?;
        let payload = strip_jsonp(&raw)?;
        let response: SearchResponse = serde_json::from_str(payload)
            .map_err(|e| AdapterError::parse(format!("invalid BMLT response: {e}")))?;
        debug!(
            source = self.source.as_str(),
            meetings = response.meetings.len(),
            "parsed search response"
        );

        response
            .meetings
            .iter()
            .map(|meeting| to_meeting(meeting, &response.formats, self.source))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(key: &str, name: &str, description: &str) -> BmltFormat {
        BmltFormat {
            key_string: key.to_string(),
            name_string: name.to_string(),
            description_string: description.to_string(),
        }
    }

    #[test]
    fn jsonp_strip_removes_one_leading_and_two_trailing_characters() {
        let wrapped = r#"X{"meetings":[],"formats":[]}XY"#;
        assert_eq!(strip_jsonp(wrapped).unwrap(), r#"{"meetings":[],"formats":[]}"#);
    }

    #[test]
    fn jsonp_strip_rejects_payloads_shorter_than_the_wrapper() {
        assert!(matches!(strip_jsonp("XY"), Err(AdapterError::Parse(_))));
    }

    #[test]
    fn format_codes_resolve_by_exact_key_match() {
        let formats = vec![
            format("O", "Open", "Anyone may attend"),
            format("D", "Discussion", ""),
        ];
        let (types, description) = resolve_types("O,D", &formats).unwrap();
        assert_eq!(types, vec!["Open", "Discussion"]);
        assert_eq!(description, "Anyone may attend");
    }

    #[test]
    fn unknown_format_code_is_fatal() {
        let formats = vec![format("O", "Open", "")];
        let err = resolve_types("O,ZZ", &formats).unwrap_err();
        assert!(matches!(err, AdapterError::Parse(_)));
    }

    #[test]
    fn empty_format_field_yields_no_types() {
        let (types, description) = resolve_types("", &[format("O", "Open", "")]).unwrap();
        assert!(types.is_empty());
        assert_eq!(description, "");
    }

    #[test]
    fn weekday_synthesis_uses_the_monday_first_table() {
        assert_eq!(synthesize_datetime("0", "19:00:00").unwrap(), "Monday, 19:00:00");
        assert_eq!(synthesize_datetime("6", "10:30:00").unwrap(), "Sunday, 10:30:00");
    }

    #[test]
    fn out_of_range_weekday_index_is_an_error_not_a_wrap() {
        assert!(matches!(
            synthesize_datetime("7", "19:00:00"),
            Err(AdapterError::Parse(_))
        ));
        assert!(matches!(
            synthesize_datetime("sunday", "19:00:00"),
            Err(AdapterError::Parse(_))
        ));
    }

    #[test]
    fn virtual_meeting_link_lands_in_notes() {
        let meeting = BmltMeeting {
            id_bigint: "1042".to_string(),
            weekday_tinyint: "2".to_string(),
            start_time: "19:30:00".to_string(),
            meeting_name: "Hope Group".to_string(),
            latitude: "42.35".to_string(),
            longitude: "-71.06".to_string(),
            location_municipality: "Boston".to_string(),
            location_street: "12 Main St".to_string(),
            formats: String::new(),
            virtual_meeting_link: "https://zoom.example/j/1".to_string(),
            virtual_meeting_additional_info: "Passcode 1234".to_string(),
        };
        let record = to_meeting(&meeting, &[], Source::Nerna).unwrap();
        assert_eq!(record.notes.as_deref(), Some("https://zoom.example/j/1, Passcode 1234"));
        assert_eq!(record.datetime, "Wednesday, 19:30:00");
        assert_eq!(record.location, "42.35, -71.06");
        assert_eq!(record.code, "1042");
        assert_eq!(record.last_updated, None);
        assert_eq!(record.contact, None);
    }

    #[test]
    fn meeting_without_virtual_link_has_empty_notes() {
        let meeting = BmltMeeting {
            id_bigint: "7".to_string(),
            weekday_tinyint: "4".to_string(),
            start_time: "18:00:00".to_string(),
            meeting_name: "Steps".to_string(),
            latitude: "42.0".to_string(),
            longitude: "-71.0".to_string(),
            location_municipality: String::new(),
            location_street: String::new(),
            formats: String::new(),
            virtual_meeting_link: String::new(),
            virtual_meeting_additional_info: "ignored".to_string(),
        };
        let record = to_meeting(&meeting, &[], Source::Nerna).unwrap();
        assert_eq!(record.notes.as_deref(), Some(""));
        assert_eq!(record.town, "");
    }

    #[test]
    fn wrapped_payload_parses_end_to_end() {
        let wrapped = r#"({"meetings":[{"id_bigint":"9","weekday_tinyint":"0","start_time":"07:00:00","meeting_name":"Early Birds","latitude":"42.1","longitude":"-71.2","location_municipality":"Quincy","location_street":"5 Shore Rd","formats":"O"}],"formats":[{"key_string":"O","name_string":"Open","description_string":"Anyone may attend"}]});"#;
        let payload = strip_jsonp(wrapped).unwrap();
        let response: SearchResponse = serde_json::from_str(payload).unwrap();
        let record = to_meeting(&response.meetings[0], &response.formats, Source::Nerna).unwrap();
        assert_eq!(record.datetime, "Monday, 07:00:00");
        assert_eq!(record.types, vec!["Open"]);
        assert_eq!(record.type_description.as_deref(), Some("Anyone may attend"));
    }
}
