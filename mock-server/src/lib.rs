//! In-memory generic REST backend.
//!
//! Every resource name under `/api` is its own collection of JSON objects
//! keyed by a server-assigned numeric `id`. The wire types here are defined
//! independently from the client crate.

use std::{cmp::Ordering, collections::BTreeMap, collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Debug, Default)]
pub struct Store {
    collections: HashMap<String, BTreeMap<u64, Value>>,
    next_id: u64,
}

impl Store {
    fn collection(&mut self, resource: &str) -> &mut BTreeMap<u64, Value> {
        self.collections.entry(resource.to_string()).or_default()
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Debug, Clone, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchPage {
    pub sort: Vec<SortKey>,
    pub index: u64,
    pub size: u64,
}

impl Default for SearchPage {
    fn default() -> Self {
        Self {
            sort: Vec::new(),
            index: 0,
            size: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub first: u64,
    pub page: u64,
    pub page_count: Option<u64>,
    pub rows: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub data: Vec<Value>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route(
            "/api/{resource}",
            get(list_records)
                .post(create_record)
                .put(update_by_body)
                .delete(delete_matching),
        )
        .route("/api/{resource}/_search", post(search_records))
        .route(
            "/api/{resource}/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route("/upload", post(upload))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_records(State(db): State<Db>, Path(resource): Path<String>) -> Json<Vec<Value>> {
    let store = db.read().await;
    let records = store
        .collections
        .get(&resource)
        .map(|c| c.values().cloned().collect())
        .unwrap_or_default();
    Json(records)
}

async fn create_record(
    State(db): State<Db>,
    Path(resource): Path<String>,
    Json(input): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let Value::Object(mut fields) = input else {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    };

    let mut store = db.write().await;
    store.next_id += 1;
    let id = store.next_id;
    fields.insert("id".to_string(), json!(id));

    let record = Value::Object(fields);
    store.collection(&resource).insert(id, record.clone());
    tracing::debug!(%resource, id, "created record");

    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_record(
    State(db): State<Db>,
    Path((resource, id)): Path<(String, u64)>,
) -> Result<Json<Value>, StatusCode> {
    let store = db.read().await;
    store
        .collections
        .get(&resource)
        .and_then(|c| c.get(&id))
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_record(
    State(db): State<Db>,
    Path((resource, id)): Path<(String, u64)>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    replace(&db, &resource, id, input).await
}

/// `PUT /api/{resource}` for backends that take the id from the body.
async fn update_by_body(
    State(db): State<Db>,
    Path(resource): Path<String>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let id = match input.get("id") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
    .ok_or(StatusCode::BAD_REQUEST)?;

    replace(&db, &resource, id, input).await
}

async fn replace(
    db: &Db,
    resource: &str,
    id: u64,
    input: Value,
) -> Result<Json<Value>, StatusCode> {
    let Value::Object(mut fields) = input else {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    };

    let mut store = db.write().await;
    let record = store
        .collection(resource)
        .get_mut(&id)
        .ok_or(StatusCode::NOT_FOUND)?;
    fields.insert("id".to_string(), json!(id));
    *record = Value::Object(fields);
    tracing::debug!(%resource, id, "updated record");

    Ok(Json(record.clone()))
}

async fn delete_record(
    State(db): State<Db>,
    Path((resource, id)): Path<(String, u64)>,
) -> Result<StatusCode, StatusCode> {
    let mut store = db.write().await;
    store
        .collection(&resource)
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

/// `DELETE /api/{resource}` removes every record matching the filter body.
async fn delete_matching(
    State(db): State<Db>,
    Path(resource): Path<String>,
    Json(filter): Json<Value>,
) -> Result<Json<Deleted>, StatusCode> {
    let filter = filter_fields(filter)?;

    let mut store = db.write().await;
    let collection = store.collection(&resource);
    let before = collection.len();
    collection.retain(|_, record| !matches_filter(record, &filter));
    let deleted = before - collection.len();
    tracing::debug!(%resource, deleted, "deleted by filter");

    Ok(Json(Deleted { deleted }))
}

async fn search_records(
    State(db): State<Db>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<SearchResult>, StatusCode> {
    let mut filter = filter_fields(body)?;
    let page = match filter.remove("page") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            serde_json::from_value::<SearchPage>(value)
                .map_err(|_| StatusCode::UNPROCESSABLE_ENTITY)?,
        ),
    };

    let store = db.read().await;
    let mut rows: Vec<Value> = store
        .collections
        .get(&resource)
        .map(|c| {
            c.values()
                .filter(|record| matches_filter(record, &filter))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    let total = rows.len() as u64;

    let Some(page) = page else {
        return Ok(Json(SearchResult {
            data: rows,
            pagination: Pagination {
                first: 0,
                page: 0,
                page_count: Some(1),
                rows: Some(total),
            },
        }));
    };

    if page.size == 0 {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    rows.sort_by(|a, b| {
        page.sort
            .iter()
            .map(|key| {
                let ord = compare(a.get(&key.field), b.get(&key.field));
                if key.direction.eq_ignore_ascii_case("desc") {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    let first = page
        .index
        .checked_mul(page.size)
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let data = rows
        .into_iter()
        .skip(usize::try_from(first).unwrap_or(usize::MAX))
        .take(usize::try_from(page.size).unwrap_or(usize::MAX))
        .collect();

    Ok(Json(SearchResult {
        data,
        pagination: Pagination {
            first,
            page: page.index,
            page_count: Some(total.div_ceil(page.size)),
            rows: Some(total),
        },
    }))
}

/// Accepts multipart uploads and reports what arrived.
async fn upload(mut multipart: Multipart) -> Result<Json<Vec<UploadedPart>>, StatusCode> {
    let mut parts = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;

        parts.push(UploadedPart {
            name,
            file_name,
            content_type,
            size: data.len(),
        });
    }

    tracing::debug!(parts = parts.len(), "received upload");

    Ok(Json(parts))
}

fn filter_fields(body: Value) -> Result<Map<String, Value>, StatusCode> {
    match body {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(StatusCode::UNPROCESSABLE_ENTITY),
    }
}

fn matches_filter(record: &Value, filter: &Map<String, Value>) -> bool {
    filter
        .iter()
        .all(|(key, expected)| record.get(key) == Some(expected))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (None, None) => Ordering::Equal,
    }
}
