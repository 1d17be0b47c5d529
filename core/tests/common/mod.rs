//! Shared fixtures: a scripted transport and a sample entity contract.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use mdm_core::{
    EntityService, HttpRequest, HttpResponse, HttpTransport, MdmConfig, MdmEntity, MdmId, Requester,
    SystemData, TransportError,
};
use serde::{Deserialize, Serialize};

pub const BASE_URL: &str = "http://mdm.test/api/person";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDetails {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default)]
    pub identifiers: Vec<MdmId>,
    pub details: PersonDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mdm_system_data: Option<SystemData>,
}

impl Person {
    pub fn named(name: &str) -> Self {
        Self {
            identifiers: Vec::new(),
            details: PersonDetails {
                name: name.to_string(),
                email: None,
            },
            mdm_system_data: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.identifiers.insert(0, MdmId::native("Nexus", id));
        self
    }

    pub fn with_identifier(mut self, identifier: MdmId) -> Self {
        self.identifiers.push(identifier);
        self
    }

    pub fn starting(mut self, start: DateTime<Utc>) -> Self {
        self.mdm_system_data = Some(SystemData {
            start_date: Some(start),
            end_date: None,
        });
        self
    }

    pub fn json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

impl MdmEntity for Person {
    fn identifiers(&self) -> &[MdmId] {
        &self.identifiers
    }

    fn start_date(&self) -> Option<DateTime<Utc>> {
        self.mdm_system_data.as_ref().and_then(|data| data.start_date)
    }
}

/// Replays canned replies in order and records every request it sees.
/// Runs out into a connection error.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Result<HttpResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connection("connection refused".to_string())))
    }
}

pub fn config() -> MdmConfig {
    MdmConfig::new("Endur").with_user_name("tester")
}

pub fn requester(transport: &Arc<ScriptedTransport>) -> Arc<Requester> {
    Arc::new(Requester::new(Arc::clone(transport), &config()))
}

pub fn service(transport: &Arc<ScriptedTransport>) -> EntityService<Person> {
    EntityService::new(BASE_URL, requester(transport))
}

/// `200 OK` carrying `person`, tagged with `etag` when given.
pub fn entity(person: &Person, etag: Option<&str>) -> Result<HttpResponse, TransportError> {
    let response = HttpResponse::new(200).with_body(person.json());
    Ok(match etag {
        Some(tag) => response.with_header("ETag", tag),
        None => response,
    })
}

pub fn status(code: u16) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(code))
}

pub fn status_with_location(code: u16, location: &str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(code).with_header("Location", location))
}

pub fn fault(code: u16, message: &str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(code).with_body(format!(r#"{{"message":"{message}"}}"#)))
}
