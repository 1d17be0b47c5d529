//! Requester behavior against a scripted transport: success classification,
//! fault extraction, location resolution, the search feed and failure
//! folding.

mod common;

use common::*;
use mdm_core::requester::{IF_MATCH_HEADER, REQUEST_INFO_HEADER, USER_NAME_HEADER};
use mdm_core::{
    AcceptAnyFaultHandler, Criteria, HttpMethod, HttpResponse, RequestInfo, Requester, Response, Search,
    SearchOperator, StatusCode, TransportError,
};

fn feed(names: &[&str], next: Option<&str>) -> String {
    let entries: Vec<serde_json::Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| serde_json::json!({ "content": Person::named(name).with_id(i as i64 + 1) }))
        .collect();
    let links: Vec<serde_json::Value> = next
        .map(|href| serde_json::json!({ "rel": "next-results", "href": href }))
        .into_iter()
        .collect();
    serde_json::json!({ "links": links, "entries": entries }).to_string()
}

fn criteria() -> Search {
    Search::matching(Criteria::new().and("name", SearchOperator::Contains, "Ann"))
}

// ---------------------------------------------------------------------------
// get
// ---------------------------------------------------------------------------

#[test]
fn get_success_carries_entity_tag() {
    let person = Person::named("Ada").with_id(1);
    let transport = ScriptedTransport::new([entity(&person, Some("\"4\""))]);

    let response: Response<Person> = requester(&transport).get(&format!("{BASE_URL}/1"));

    assert!(response.is_valid);
    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.concurrency_token.as_deref(), Some("\"4\""));
    assert_eq!(response.message, Some(person));
    assert!(response.fault.is_none());

    let sent = transport.sent();
    assert_eq!(sent[0].method, HttpMethod::Get);
    assert_eq!(sent[0].header(USER_NAME_HEADER), Some("tester"));
    assert!(sent[0].header(REQUEST_INFO_HEADER).is_none());
}

#[test]
fn get_without_entity_tag_has_no_token() {
    let transport = ScriptedTransport::new([entity(&Person::named("Ada").with_id(1), None)]);
    let response: Response<Person> = requester(&transport).get(&format!("{BASE_URL}/1"));
    assert!(response.is_valid);
    assert!(response.concurrency_token.is_none());
}

#[test]
fn get_not_found_reads_server_fault() {
    let transport = ScriptedTransport::new([fault(404, "person 9 not found")]);
    let response: Response<Person> = requester(&transport).get(&format!("{BASE_URL}/9"));
    assert!(!response.is_valid);
    assert_eq!(response.status, StatusCode::NotFound);
    assert_eq!(response.fault_message(), Some("person 9 not found"));
    assert!(response.message.is_none());
}

#[test]
fn unparseable_fault_is_synthesized_from_status() {
    let transport = ScriptedTransport::new([Ok(HttpResponse::new(409).with_body("<html>conflict</html>"))]);
    let response: Response<Person> = requester(&transport).get(&format!("{BASE_URL}/9"));
    assert_eq!(response.status, StatusCode::Conflict);
    assert_eq!(response.fault_message(), Some("Conflict"));
}

#[test]
fn undecodable_success_body_is_internal_error() {
    let transport = ScriptedTransport::new([Ok(HttpResponse::new(200).with_body("not json"))]);
    let response: Response<Person> = requester(&transport).get(&format!("{BASE_URL}/1"));
    assert!(!response.is_valid);
    assert_eq!(response.status, StatusCode::InternalError);
    assert!(response.fault_message().unwrap().starts_with("deserialization failed"));
}

#[test]
fn timeout_is_internal_error() {
    let transport = ScriptedTransport::new([Err(TransportError::Timeout("after 30s".to_string()))]);
    let response: Response<Person> = requester(&transport).get(&format!("{BASE_URL}/1"));
    assert!(!response.is_valid);
    assert_eq!(response.status, StatusCode::InternalError);
    assert_eq!(response.fault_message(), Some("request timed out: after 30s"));
}

// ---------------------------------------------------------------------------
// post / delete
// ---------------------------------------------------------------------------

#[test]
fn create_resolves_relative_location() {
    let transport = ScriptedTransport::new([status_with_location(201, "api/person/12")]);
    let response: Response<Person> = requester(&transport).create(BASE_URL, &Person::named("Ada"), None);

    assert!(response.is_valid);
    assert_eq!(response.status, StatusCode::Created);
    assert_eq!(response.location.as_deref(), Some("http://mdm.test/api/person/12"));
    assert!(response.message.is_none());

    let sent = &transport.sent()[0];
    assert_eq!(sent.method, HttpMethod::Post);
    assert_eq!(sent.header("content-type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["details"]["name"], "Ada");
    assert!(sent.header(IF_MATCH_HEADER).is_none());
}

#[test]
fn create_keeps_absolute_location() {
    let transport = ScriptedTransport::new([status_with_location(201, "https://replica.test/person/12")]);
    let response: Response<Person> = requester(&transport).create(BASE_URL, &Person::named("Ada"), None);
    assert_eq!(response.location.as_deref(), Some("https://replica.test/person/12"));
}

#[test]
fn correlation_header_carries_populated_request_info() {
    let transport = ScriptedTransport::new([status_with_location(201, "api/person/12")]);
    let response: Response<Person> = requester(&transport).create(BASE_URL, &Person::named("Ada"), None);

    let header = transport.sent()[0].header(REQUEST_INFO_HEADER).unwrap().to_string();
    let info = RequestInfo::decode(&header).unwrap();
    assert_eq!(info.source_system, "Endur");
    assert_eq!(response.request_id.as_deref(), Some(info.request_id.as_str()));
}

#[test]
fn post_with_custom_expected_status() {
    let transport = ScriptedTransport::new([status(200)]);
    let response: Response<Person> = requester(&transport).post(
        &format!("{BASE_URL}/1/activate"),
        &serde_json::json!({}),
        StatusCode::Ok,
        None,
        Some(RequestInfo::new("act-1", "Spark")),
    );
    assert!(response.is_valid);
    assert_eq!(response.request_id.as_deref(), Some("act-1"));
    assert!(response.location.is_none());
}

#[test]
fn failed_post_keeps_request_id() {
    let transport = ScriptedTransport::new([Err(TransportError::Connection("reset by peer".to_string()))]);
    let response: Response<Person> = requester(&transport).update(
        &format!("{BASE_URL}/1"),
        "\"1\"",
        &Person::named("Ada"),
        Some(RequestInfo::new("upd-1", "")),
    );
    assert_eq!(response.status, StatusCode::InternalError);
    assert_eq!(response.request_id.as_deref(), Some("upd-1"));
    assert_eq!(response.fault_message(), Some("connection failed: reset by peer"));
}

#[test]
fn delete_expects_ok_and_sends_correlation() {
    let transport = ScriptedTransport::new([status(200), status(204)]);
    let requester = requester(&transport);

    let first: Response<Person> = requester.delete(&format!("{BASE_URL}/1/mapping/3"), None);
    assert!(first.is_valid);
    assert!(first.request_id.is_some());

    let second: Response<Person> = requester.delete(&format!("{BASE_URL}/1/mapping/3"), None);
    assert!(!second.is_valid);
    assert_eq!(second.status, StatusCode::NoContent);

    let sent = transport.sent();
    assert_eq!(sent[0].method, HttpMethod::Delete);
    assert!(sent[0].header(REQUEST_INFO_HEADER).is_some());
    assert!(sent[0].body.is_none());
}

#[test]
fn custom_fault_handler_widens_success() {
    let transport = ScriptedTransport::new([status(200)]);
    let requester = Requester::new(transport.clone(), &config())
        .with_fault_handler(AcceptAnyFaultHandler::new([StatusCode::Ok]));
    let response: Response<Person> = requester.delete(&format!("{BASE_URL}/1"), None);
    assert!(response.is_valid);

    let transport = ScriptedTransport::new([status(204)]);
    let requester = Requester::new(transport.clone(), &config())
        .with_fault_handler(AcceptAnyFaultHandler::new([StatusCode::NoContent]));
    let response: Response<Person> = requester.delete(&format!("{BASE_URL}/1"), None);
    assert!(response.is_valid);
    assert_eq!(response.status, StatusCode::NoContent);
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

#[test]
fn search_reads_entries_and_next_page() {
    let next = "http://mdm.test/api/person/search?page=2";
    let transport = ScriptedTransport::new([Ok(HttpResponse::new(200).with_body(feed(&["Ann", "Anna"], Some(next))))]);

    let response = requester(&transport).search::<Person>(&format!("{BASE_URL}/search"), &criteria());

    assert!(response.is_valid);
    let people = response.message.as_ref().unwrap();
    assert_eq!(people.len(), 2);
    assert_eq!(people[1].details.name, "Anna");
    assert_eq!(response.next_page.as_deref(), Some(next));

    let sent = &transport.sent()[0];
    assert_eq!(sent.method, HttpMethod::Post);
    assert_eq!(sent.header(USER_NAME_HEADER), Some("tester"));
    let body: serde_json::Value = serde_json::from_str(sent.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["criteria"][0]["comparisons"][0]["value"], "Ann");
}

#[test]
fn search_last_page_has_no_next_page() {
    let transport = ScriptedTransport::new([Ok(HttpResponse::new(200).with_body(feed(&["Ann"], None)))]);
    let response = requester(&transport).search::<Person>(&format!("{BASE_URL}/search"), &criteria());
    assert!(response.is_valid);
    assert!(response.next_page.is_none());
}

#[test]
fn search_relative_next_page_is_made_absolute() {
    let transport = ScriptedTransport::new([Ok(
        HttpResponse::new(200).with_body(feed(&["Ann"], Some("/api/person/search?page=2")))
    )]);
    let response = requester(&transport).search::<Person>(&format!("{BASE_URL}/search"), &criteria());
    assert_eq!(
        response.next_page.as_deref(),
        Some("http://mdm.test/api/person/search?page=2")
    );
}

#[test]
fn search_not_found_is_valid_and_empty() {
    let transport = ScriptedTransport::new([fault(404, "no results")]);
    let response = requester(&transport).search::<Person>(&format!("{BASE_URL}/search"), &criteria());
    assert!(response.is_valid);
    assert_eq!(response.status, StatusCode::NotFound);
    assert_eq!(response.message, Some(Vec::new()));
    assert!(response.fault.is_none());
    assert!(response.next_page.is_none());
}

#[test]
fn search_other_failures_are_faults() {
    for (code, expected) in [(400, StatusCode::BadRequest), (500, StatusCode::InternalError)] {
        let transport = ScriptedTransport::new([fault(code, "search rejected")]);
        let response = requester(&transport).search::<Person>(&format!("{BASE_URL}/search"), &criteria());
        assert!(!response.is_valid);
        assert_eq!(response.status, expected);
        assert_eq!(response.fault_message(), Some("search rejected"));
    }
}

#[test]
fn search_with_malformed_feed_is_internal_error() {
    let transport = ScriptedTransport::new([Ok(HttpResponse::new(200).with_body("not a feed"))]);
    let response = requester(&transport).search::<Person>(&format!("{BASE_URL}/search"), &criteria());
    assert!(!response.is_valid);
    assert_eq!(response.status, StatusCode::InternalError);
}
