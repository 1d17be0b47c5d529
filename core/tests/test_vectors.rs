//! Verify requester classification against JSON test vectors stored in
//! `test-vectors/`.
//!
//! Each vector describes a call, the request it must produce, a simulated
//! reply, and the envelope expected back. Response bodies may be written as
//! JSON values or raw strings.

mod common;

use std::collections::BTreeMap;

use common::*;
use mdm_core::{HttpMethod, HttpResponse, Response, StatusCode};

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn reply(case: &serde_json::Value) -> HttpResponse {
    let reply = &case["reply"];
    let body = match &reply["body"] {
        serde_json::Value::String(raw) => raw.clone(),
        serde_json::Value::Null => String::new(),
        json => json.to_string(),
    };
    let headers: BTreeMap<String, String> =
        serde_json::from_value(reply["headers"].clone()).unwrap_or_default();
    headers
        .into_iter()
        .fold(HttpResponse::new(reply["status"].as_u64().unwrap() as u16), |response, (name, value)| {
            response.with_header(&name, value)
        })
        .with_body(body)
}

#[test]
fn envelope_test_vectors() {
    let raw = include_str!("../../test-vectors/envelopes.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let uri = case["uri"].as_str().unwrap();
        let transport = ScriptedTransport::new([Ok(reply(case))]);
        let requester = requester(&transport);

        let response: Response<Person> = match case["operation"].as_str().unwrap() {
            "get" => requester.get(uri),
            "create" => requester.create(uri, &Person::named("Ada"), None),
            "delete" => requester.delete(uri, None),
            other => panic!("{name}: unknown operation {other}"),
        };

        let sent = transport.sent();
        let expected_request = &case["expected_request"];
        assert_eq!(sent.len(), 1, "{name}: request count");
        assert_eq!(
            sent[0].method,
            parse_method(expected_request["method"].as_str().unwrap()),
            "{name}: method"
        );
        assert_eq!(sent[0].path, expected_request["path"].as_str().unwrap(), "{name}: path");

        let expected = &case["expected"];
        assert_eq!(response.is_valid, expected["isValid"].as_bool().unwrap(), "{name}: validity");
        assert_eq!(
            response.status,
            StatusCode::from_u16(expected["status"].as_u64().unwrap() as u16),
            "{name}: status"
        );
        assert_eq!(response.fault_message(), expected["fault"].as_str(), "{name}: fault");
        assert_eq!(
            response.concurrency_token.as_deref(),
            expected["concurrencyToken"].as_str(),
            "{name}: concurrency token"
        );
        assert_eq!(response.location.as_deref(), expected["location"].as_str(), "{name}: location");
        assert_eq!(
            response.message.as_ref().map(|person| person.details.name.as_str()),
            expected["name"].as_str(),
            "{name}: entity"
        );
    }
}
