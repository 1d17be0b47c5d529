use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

/// System whose identifiers are this server's own ids.
pub const CANONICAL_SYSTEM: &str = "Nexus";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const REQUEST_INFO_HEADER: &str = "x-mdm-request";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MdmId {
    pub system_name: String,
    pub identifier: String,
    #[serde(default)]
    pub is_mdm_id: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_reverse_ind: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_id: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDetails {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default)]
    pub identifiers: Vec<MdmId>,
    pub details: PersonDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mdm_system_data: Option<SystemData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub system_name: String,
    pub identifier: String,
    #[serde(default)]
    pub default_reverse_ind: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MappingResponse {
    pub mappings: Vec<MdmId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Fault {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub max_page_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct Comparison {
    pub field: String,
    pub operator: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct Criteria {
    #[serde(default)]
    pub comparisons: Vec<Comparison>,
}

#[derive(Debug, Deserialize)]
pub struct Search {
    #[serde(default)]
    pub options: SearchOptions,
    #[serde(default)]
    pub criteria: Vec<Criteria>,
}

#[derive(Debug)]
struct Record {
    person: Person,
    version: u64,
    history: Vec<Person>,
}

impl Record {
    fn etag(&self) -> String {
        format!("\"{}\"", self.version)
    }
}

#[derive(Debug, Default)]
pub struct Store {
    people: BTreeMap<i64, Record>,
    last_id: i64,
    last_mapping_id: i64,
}

pub type Db = Arc<RwLock<Store>>;

type ApiError = (StatusCode, Json<Fault>);

fn fault(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(Fault { message: message.into() }))
}

fn not_found(id: i64) -> ApiError {
    fault(StatusCode::NOT_FOUND, format!("person {id} not found"))
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/person", post(create_person))
        .route("/person/map", get(map_person))
        .route("/person/crossmap", get(cross_map))
        .route("/person/search", post(search))
        .route("/person/{id}", get(get_person).post(update_person))
        .route("/person/{id}/list", get(list_versions))
        .route("/person/{id}/mapping", post(create_mapping))
        .route(
            "/person/{id}/mapping/{mapping_id}",
            get(get_mapping).delete(delete_mapping),
        )
        .layer(middleware::from_fn(require_user))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_user(request: Request, next: Next) -> Response {
    if request.headers().get(USER_NAME_HEADER).is_none() {
        return fault(StatusCode::UNAUTHORIZED, "missing caller identity").into_response();
    }
    next.run(request).await
}

fn require_request_info(headers: &HeaderMap) -> Result<(), ApiError> {
    match headers.get(REQUEST_INFO_HEADER) {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(fault(StatusCode::BAD_REQUEST, "missing request info header")),
    }
}

fn entity_response(record: &Record) -> Response {
    (
        StatusCode::OK,
        [(header::ETAG, record.etag())],
        Json(record.person.clone()),
    )
        .into_response()
}

fn same_system(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn find_by_identifier<'a>(store: &'a Store, system: &str, value: &str) -> Option<&'a Record> {
    store.people.values().find(|record| {
        record
            .person
            .identifiers
            .iter()
            .any(|id| same_system(&id.system_name, system) && id.identifier == value)
    })
}

#[derive(Debug, Deserialize)]
pub struct AsOfQuery {
    #[serde(rename = "as-of")]
    pub as_of: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MapQuery {
    #[serde(rename = "source-system")]
    pub source_system: String,
    #[serde(rename = "mapping-value")]
    pub mapping_value: String,
    #[serde(rename = "destination-system")]
    pub destination_system: Option<String>,
    #[serde(rename = "as-of")]
    pub as_of: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

async fn create_person(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(mut person): Json<Person>,
) -> Result<impl IntoResponse, ApiError> {
    require_request_info(&headers)?;
    if person.details.name.trim().is_empty() {
        return Err(fault(StatusCode::BAD_REQUEST, "name is required"));
    }

    let mut store = db.write().await;
    store.last_id += 1;
    let id = store.last_id;

    person.identifiers.retain(|identifier| !identifier.is_mdm_id);
    for identifier in &mut person.identifiers {
        store.last_mapping_id += 1;
        identifier.mapping_id = Some(store.last_mapping_id);
    }
    person.identifiers.insert(
        0,
        MdmId {
            system_name: CANONICAL_SYSTEM.to_string(),
            identifier: id.to_string(),
            is_mdm_id: true,
            default_reverse_ind: None,
            mapping_id: None,
        },
    );

    store.people.insert(
        id,
        Record {
            history: vec![person.clone()],
            person,
            version: 1,
        },
    );
    debug!(id, "person created");
    Ok((StatusCode::CREATED, [(header::LOCATION, format!("person/{id}"))]))
}

async fn get_person(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Query(query): Query<AsOfQuery>,
) -> Result<Response, ApiError> {
    debug!(id, as_of = ?query.as_of, "get person");
    let store = db.read().await;
    store.people.get(&id).map(entity_response).ok_or_else(|| not_found(id))
}

async fn update_person(
    State(db): State<Db>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(person): Json<Person>,
) -> Result<impl IntoResponse, ApiError> {
    require_request_info(&headers)?;
    let mut store = db.write().await;
    let record = store.people.get_mut(&id).ok_or_else(|| not_found(id))?;

    let expected = record.etag();
    let supplied = headers.get(header::IF_MATCH).and_then(|value| value.to_str().ok());
    if supplied != Some(expected.as_str()) {
        return Err(fault(
            StatusCode::PRECONDITION_FAILED,
            format!("person {id} has changed; current version is {expected}"),
        ));
    }

    record.person.details = person.details;
    record.person.mdm_system_data = person.mdm_system_data;
    record.version += 1;
    record.history.push(record.person.clone());
    debug!(id, version = record.version, "person updated");
    Ok((StatusCode::NO_CONTENT, [(header::LOCATION, format!("/person/{id}"))]))
}

async fn list_versions(State(db): State<Db>, Path(id): Path<i64>) -> Result<Json<Vec<Person>>, ApiError> {
    let store = db.read().await;
    store
        .people
        .get(&id)
        .map(|record| Json(record.history.clone()))
        .ok_or_else(|| not_found(id))
}

async fn create_mapping(
    State(db): State<Db>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(mapping): Json<Mapping>,
) -> Result<impl IntoResponse, ApiError> {
    require_request_info(&headers)?;
    if same_system(&mapping.system_name, CANONICAL_SYSTEM) {
        return Err(fault(StatusCode::BAD_REQUEST, "cannot map to the canonical system"));
    }

    let mut store = db.write().await;
    if find_by_identifier(&store, &mapping.system_name, &mapping.identifier).is_some() {
        return Err(fault(
            StatusCode::CONFLICT,
            format!("{}/{} is already mapped", mapping.system_name, mapping.identifier),
        ));
    }
    store.last_mapping_id += 1;
    let mapping_id = store.last_mapping_id;
    let record = store.people.get_mut(&id).ok_or_else(|| not_found(id))?;
    record.person.identifiers.push(MdmId {
        system_name: mapping.system_name,
        identifier: mapping.identifier,
        is_mdm_id: false,
        default_reverse_ind: mapping.default_reverse_ind,
        mapping_id: Some(mapping_id),
    });
    record.version += 1;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("person/{id}/mapping/{mapping_id}"))],
    ))
}

async fn get_mapping(
    State(db): State<Db>,
    Path((id, mapping_id)): Path<(i64, i64)>,
) -> Result<Json<MappingResponse>, ApiError> {
    let store = db.read().await;
    let record = store.people.get(&id).ok_or_else(|| not_found(id))?;
    record
        .person
        .identifiers
        .iter()
        .find(|identifier| identifier.mapping_id == Some(mapping_id))
        .map(|identifier| {
            Json(MappingResponse {
                mappings: vec![identifier.clone()],
            })
        })
        .ok_or_else(|| fault(StatusCode::NOT_FOUND, format!("mapping {mapping_id} not found")))
}

async fn delete_mapping(
    State(db): State<Db>,
    Path((id, mapping_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    require_request_info(&headers)?;
    let mut store = db.write().await;
    let record = store.people.get_mut(&id).ok_or_else(|| not_found(id))?;
    let before = record.person.identifiers.len();
    record
        .person
        .identifiers
        .retain(|identifier| identifier.mapping_id != Some(mapping_id));
    if record.person.identifiers.len() == before {
        return Err(fault(StatusCode::NOT_FOUND, format!("mapping {mapping_id} not found")));
    }
    record.version += 1;
    Ok(StatusCode::OK)
}

async fn map_person(State(db): State<Db>, Query(query): Query<MapQuery>) -> Result<Response, ApiError> {
    let store = db.read().await;
    find_by_identifier(&store, &query.source_system, &query.mapping_value)
        .map(entity_response)
        .ok_or_else(|| {
            fault(
                StatusCode::NOT_FOUND,
                format!("no person mapped from {}/{}", query.source_system, query.mapping_value),
            )
        })
}

async fn cross_map(
    State(db): State<Db>,
    Query(query): Query<MapQuery>,
) -> Result<Json<MappingResponse>, ApiError> {
    let destination = query
        .destination_system
        .ok_or_else(|| fault(StatusCode::BAD_REQUEST, "destination-system is required"))?;
    let store = db.read().await;
    let record = find_by_identifier(&store, &query.source_system, &query.mapping_value).ok_or_else(|| {
        fault(
            StatusCode::NOT_FOUND,
            format!("no person mapped from {}/{}", query.source_system, query.mapping_value),
        )
    })?;
    let mappings: Vec<MdmId> = record
        .person
        .identifiers
        .iter()
        .filter(|identifier| same_system(&identifier.system_name, &destination))
        .cloned()
        .collect();
    if mappings.is_empty() {
        return Err(fault(StatusCode::NOT_FOUND, format!("no mapping to {destination}")));
    }
    Ok(Json(MappingResponse { mappings }))
}

fn field_value<'a>(person: &'a Person, field: &str) -> Option<&'a str> {
    match field {
        "name" => Some(person.details.name.as_str()),
        "email" => person.details.email.as_deref(),
        _ => None,
    }
}

fn comparison_matches(person: &Person, comparison: &Comparison) -> bool {
    let Some(actual) = field_value(person, &comparison.field) else {
        return false;
    };
    match comparison.operator.as_str() {
        "equals" => actual == comparison.value,
        "notEquals" => actual != comparison.value,
        "contains" => actual.contains(&comparison.value),
        _ => false,
    }
}

fn search_matches(person: &Person, search: &Search) -> bool {
    search.criteria.is_empty()
        || search.criteria.iter().any(|criteria| {
            criteria
                .comparisons
                .iter()
                .all(|comparison| comparison_matches(person, comparison))
        })
}

async fn search(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
    Json(search): Json<Search>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = db.read().await;
    let matches: Vec<&Person> = store
        .people
        .values()
        .map(|record| &record.person)
        .filter(|person| search_matches(person, &search))
        .collect();
    if matches.is_empty() {
        return Err(fault(StatusCode::NOT_FOUND, "no results"));
    }

    let page = query.page.unwrap_or(1).max(1);
    let size = search.options.max_page_size.unwrap_or(usize::MAX).max(1);
    let entries: Vec<serde_json::Value> = matches
        .iter()
        .skip((page - 1).saturating_mul(size))
        .take(size)
        .map(|person| json!({ "id": format!("urn:uuid:{}", Uuid::new_v4()), "content": person }))
        .collect();

    let mut links = Vec::new();
    if page.saturating_mul(size) < matches.len() {
        let path = format!("/person/search?page={}", page + 1);
        let href = match headers.get(header::HOST).and_then(|host| host.to_str().ok()) {
            Some(host) => format!("http://{host}{path}"),
            None => path,
        };
        links.push(json!({ "rel": "next-results", "href": href }));
    }

    Ok(Json(json!({
        "title": "person search results",
        "links": links,
        "entries": entries,
    })))
}
