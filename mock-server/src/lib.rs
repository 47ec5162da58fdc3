//! In-memory stand-in for a ServiceNow instance's Table API.
//!
//! Serves `GET` and `POST` on `/api/now/table/{table}` with the Table API's
//! `{"result": ...}` envelope, optional basic-auth enforcement and a
//! hibernation switch that replaces every answer with the HTML sleep page.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Page a hibernating developer instance serves with status 200.
pub const HIBERNATION_PAGE: &str = "<html><head><title>Instance Hibernating</title></head>\
<body><h1>Your instance is hibernating</h1>\
<p>Sign in to the developer portal to wake it up.</p></body></html>";

/// Row cap applied when the caller sends no `sysparm_limit`.
const DEFAULT_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Mutable state of the mock instance.
#[derive(Debug, Default)]
pub struct Instance {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    hibernating: AtomicBool,
    credentials: Option<Credentials>,
}

pub type Db = Arc<Instance>;

impl Instance {
    /// An awake instance that accepts any (or no) credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// An awake instance that requires these basic-auth credentials.
    pub fn with_credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Some(Credentials {
                username: username.into(),
                password: password.into(),
            }),
            ..Self::default()
        }
    }

    pub fn set_hibernating(&self, hibernating: bool) {
        self.hibernating.store(hibernating, Ordering::SeqCst);
    }

    pub fn is_hibernating(&self) -> bool {
        self.hibernating.load(Ordering::SeqCst)
    }

    pub async fn records(&self, table: &str) -> Vec<Value> {
        self.tables.read().await.get(table).cloned().unwrap_or_default()
    }

    /// Store a record, assigning it a fresh `sys_id`, and return it.
    pub async fn insert(&self, table: &str, mut fields: Map<String, Value>) -> Value {
        fields.insert(
            "sys_id".to_string(),
            Value::String(Uuid::new_v4().simple().to_string()),
        );
        let record = Value::Object(fields);
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        record
    }
}

#[derive(Debug, Deserialize)]
pub struct TableQuery {
    pub sysparm_limit: Option<usize>,
}

pub fn app() -> Router {
    app_with(Arc::new(Instance::new()))
}

pub fn app_with(db: Db) -> Router {
    Router::new()
        .route("/api/now/table/{table}", get(list_records).post(create_record))
        .with_state(db)
}

pub async fn run_with(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock table API listening");
    }
    axum::serve(listener, app_with(db)).await
}

async fn list_records(
    State(db): State<Db>,
    Path(table): Path<String>,
    Query(query): Query<TableQuery>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = gate(&db, &headers) {
        return rejection;
    }
    let limit = query.sysparm_limit.unwrap_or(DEFAULT_LIMIT);
    let result: Vec<Value> = db.records(&table).await.into_iter().take(limit).collect();
    debug!(%table, count = result.len(), "listed records");
    Json(json!({ "result": result })).into_response()
}

async fn create_record(
    State(db): State<Db>,
    Path(table): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(rejection) = gate(&db, &headers) {
        return rejection;
    }
    let fields = if body.is_empty() {
        Map::new()
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(fields)) => fields,
            _ => {
                return failure(
                    StatusCode::BAD_REQUEST,
                    "Invalid request body",
                    "Expected a JSON object",
                )
            }
        }
    };
    let record = db.insert(&table, fields).await;
    debug!(%table, "created record");
    (StatusCode::CREATED, Json(json!({ "result": record }))).into_response()
}

/// Hibernation takes precedence over authentication, as on a real instance.
fn gate(db: &Instance, headers: &HeaderMap) -> Option<Response> {
    if db.is_hibernating() {
        return Some(Html(HIBERNATION_PAGE).into_response());
    }
    match &db.credentials {
        Some(expected) if !authorized(headers, expected) => Some(failure(
            StatusCode::UNAUTHORIZED,
            "User Not Authenticated",
            "Required to provide Auth information",
        )),
        _ => None,
    }
}

fn authorized(headers: &HeaderMap, expected: &Credentials) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded).ok())
        .and_then(|raw| String::from_utf8(raw).ok())
        .is_some_and(|pair| pair == format!("{}:{}", expected.username, expected.password))
}

fn failure(status: StatusCode, message: &str, detail: &str) -> Response {
    let body = json!({
        "error": { "message": message, "detail": detail },
        "status": "failure",
    });
    (status, Json(body)).into_response()
}
