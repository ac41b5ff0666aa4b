//! End-to-end adapter runs against a mock origin server.

use rmh_adapters::{BmltAdapter, SourceAdapter, TsmlAdapter};
use rmh_core::Source;
use rmh_storage::{HttpClientConfig, HttpFetcher};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(HttpClientConfig::default()).expect("http fetcher")
}

#[tokio::test]
async fn tsml_adapter_walks_listing_then_detail_pages() {
    let server = MockServer::start().await;

    let listing = format!(
        r#"<table><tbody id="meetings_tbody">
             <tr>
               <td class="name"><a href="{base}/m/serenity">Serenity Now</a></td>
               <td class="types">O,D</td>
               <td class="region">Back Bay</td>
               <td class="location">Parish Hall</td>
               <td class="address">12 Main St</td>
             </tr>
           </tbody></table>"#,
        base = server.uri()
    );
    let detail = r#"
        <div class="meeting-time">Sunday, 8:00 am</div>
        <ul class="meeting-types"><li>Open</li></ul>
        <div class="meeting-type-description">Anyone may attend.</div>
        <div class="list-group-item-updated">Updated 2024-01-15</div>
        <div class="meeting-notes">Side door.</div>
        <div class="list-group-item-group"><a href="mailto:chair@example.org">Chair</a></div>"#;

    Mock::given(method("GET"))
        .and(path("/meetings"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(listing, "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/m/serenity"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(detail, "text/html"))
        .mount(&server)
        .await;

    let adapter = TsmlAdapter::new(Source::AaBoston, format!("{}/meetings", server.uri()), false);
    let meetings = adapter.scrape(&fetcher(), Uuid::new_v4()).await.expect("scrape");

    assert_eq!(meetings.len(), 1);
    let meeting = &meetings[0];
    assert_eq!(meeting.code, "O,D");
    assert_eq!(meeting.datetime, "Sunday, 8:00 am");
    assert_eq!(meeting.town, "Back Bay");
    assert_eq!(meeting.name.as_deref(), Some("Serenity Now"));
    assert_eq!(meeting.types, vec!["Open"]);
    assert_eq!(meeting.last_updated.as_deref(), Some("2024-01-15"));
    assert_eq!(
        meeting.contact.as_deref(),
        Some(&["chair@example.org".to_string()][..])
    );
    assert_eq!(meeting.source, Source::AaBoston);
}

#[tokio::test]
async fn tsml_adapter_fails_when_a_detail_fetch_fails() {
    let server = MockServer::start().await;

    let listing = format!(
        r#"<table><tbody id="meetings_tbody">
             <tr><td class="name"><a href="{base}/m/gone">Gone</a></td></tr>
           </tbody></table>"#,
        base = server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/meetings"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(listing, "text/html"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/m/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let adapter = TsmlAdapter::new(Source::AaBoston, format!("{}/meetings", server.uri()), false);
    let err = adapter.scrape(&fetcher(), Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, rmh_adapters::AdapterError::Network(_)));
}

#[tokio::test]
async fn bmlt_adapter_unwraps_the_padded_response() {
    let server = MockServer::start().await;

    let body = r#"({"meetings":[{"id_bigint":"9","weekday_tinyint":"0","start_time":"07:00:00","meeting_name":"Early Birds","latitude":"42.1","longitude":"-71.2","location_municipality":"Quincy","location_street":"5 Shore Rd","formats":"O"}],"formats":[{"key_string":"O","name_string":"Open","description_string":"Anyone may attend"}]});"#;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let adapter = BmltAdapter::new(Source::Nerna, format!("{}/search", server.uri()));
    let meetings = adapter.scrape(&fetcher(), Uuid::new_v4()).await.expect("scrape");

    assert_eq!(meetings.len(), 1);
    assert_eq!(meetings[0].datetime, "Monday, 07:00:00");
    assert_eq!(meetings[0].location, "42.1, -71.2");
    assert_eq!(meetings[0].types, vec!["Open"]);
    assert_eq!(meetings[0].source, Source::Nerna);
}

#[tokio::test]
async fn empty_tsml_listing_is_a_successful_empty_scrape() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/meetings"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<table><tbody id="meetings_tbody"></tbody></table>"#,
            "text/html",
        ))
        .mount(&server)
        .await;

    let adapter = TsmlAdapter::new(Source::IndyAa, format!("{}/meetings", server.uri()), true);
    let meetings = adapter.scrape(&fetcher(), Uuid::new_v4()).await.expect("scrape");
    assert!(meetings.is_empty());
}
