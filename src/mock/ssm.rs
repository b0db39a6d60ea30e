//! In-memory emulation of the SSM JSON RPC protocol (`X-Amz-Target` dispatch).
//!
//! Only the calls the SSM backend and its tests need are handled:
//! `PutParameter`, `GetParametersByPath` and `GetParameter`.
//! A request body that fails to decode is answered with `400 ValidationException`;
//! the server keeps running.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const TARGET_HEADER: &str = "x-amz-target";
pub const PUT_PARAMETER: &str = "AmazonSSM.PutParameter";
pub const GET_PARAMETERS_BY_PATH: &str = "AmazonSSM.GetParametersByPath";
pub const GET_PARAMETER: &str = "AmazonSSM.GetParameter";

/// Page size used when `MaxResults` is absent; also the service maximum.
pub const MAX_RESULTS: usize = 10;

const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Shared parameter table. Clones point at the same data.
#[derive(Debug, Clone, Default)]
pub struct ParameterTable {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.write().await.insert(name.into(), value.into());
    }

    pub async fn get(&self, name: &str) -> Option<String> {
        self.inner.read().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Parameters below `path`, sorted by name. Without `recursive` only
    /// direct children are returned.
    pub async fn list(&self, path: &str, recursive: bool) -> Vec<(String, String)> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        self.inner
            .read()
            .await
            .range(prefix.clone()..)
            .take_while(|(name, _)| name.starts_with(&prefix))
            .filter(|(name, _)| recursive || !name[prefix.len()..].contains('/'))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutParameterRequest {
    pub name: String,
    pub value: String,
    #[serde(rename = "Type")]
    pub parameter_type: Option<String>,
    pub overwrite: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetParametersByPathRequest {
    pub path: String,
    pub recursive: Option<bool>,
    pub with_decryption: Option<bool>,
    pub max_results: Option<usize>,
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetParameterRequest {
    pub name: String,
    pub with_decryption: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterEntry {
    pub name: String,
    #[serde(rename = "Type")]
    pub parameter_type: String,
    pub value: String,
    pub version: i64,
}

impl ParameterEntry {
    fn string(name: String, value: String) -> Self {
        Self {
            name,
            parameter_type: "String".to_string(),
            value,
            version: 1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutParameterResponse {
    pub version: i64,
    pub tier: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetParametersByPathResponse {
    pub parameters: Vec<ParameterEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetParameterResponse {
    pub parameter: ParameterEntry,
}

/// Error shape of the JSON 1.1 protocol.
struct ServiceError {
    code: &'static str,
    message: String,
}

impl ServiceError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "__type": self.code,
            "message": self.message,
        });
        let mut response = (StatusCode::BAD_REQUEST, Json(body)).into_response();
        response
            .headers_mut()
            .insert("x-amzn-errortype", HeaderValue::from_static(self.code));
        response
    }
}

fn json_response<T: Serialize>(body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T, ServiceError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::error!("Malformed request body: {}", e);
        ServiceError::new("ValidationException", format!("Malformed request body: {}", e))
    })
}

/// Router serving the mock on every path.
pub fn router(table: ParameterTable) -> Router {
    Router::new().fallback(handle_request).with_state(table)
}

async fn handle_request(
    State(table): State<ParameterTable>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .is_some_and(|value| !value.is_empty());
    if method != Method::POST || !authorized {
        tracing::warn!("Unauthorized request");
        return StatusCode::OK.into_response();
    }

    let target = headers
        .get(TARGET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let result = match target {
        PUT_PARAMETER => put_parameter(&table, &body).await,
        GET_PARAMETERS_BY_PATH => get_parameters_by_path(&table, &body).await,
        GET_PARAMETER => get_parameter(&table, &body).await,
        other => {
            tracing::warn!("Unknown target '{}'", other);
            return StatusCode::OK.into_response();
        }
    };

    result.unwrap_or_else(IntoResponse::into_response)
}

async fn put_parameter(table: &ParameterTable, body: &Bytes) -> Result<Response, ServiceError> {
    let request: PutParameterRequest = decode(body)?;
    tracing::debug!("Body={:?}", request);
    tracing::info!("DB: Setting key={} value={}", request.name, request.value);

    table.put(request.name, request.value).await;

    Ok(json_response(&PutParameterResponse {
        version: 1,
        tier: "Standard".to_string(),
    }))
}

async fn get_parameters_by_path(
    table: &ParameterTable,
    body: &Bytes,
) -> Result<Response, ServiceError> {
    let request: GetParametersByPathRequest = decode(body)?;
    tracing::debug!("Body={:?}", request);

    let page_size = request.max_results.unwrap_or(MAX_RESULTS).clamp(1, MAX_RESULTS);
    let offset = match request.next_token.as_deref() {
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| ServiceError::new("InvalidNextToken", "The specified token isn't valid."))?,
        None => 0,
    };

    let matching = table
        .list(&request.path, request.recursive.unwrap_or(false))
        .await;
    let total = matching.len();
    let parameters: Vec<ParameterEntry> = matching
        .into_iter()
        .skip(offset)
        .take(page_size)
        .map(|(name, value)| ParameterEntry::string(name, value))
        .collect();

    let consumed = offset + parameters.len();
    let next_token = (consumed < total).then(|| consumed.to_string());

    Ok(json_response(&GetParametersByPathResponse {
        parameters,
        next_token,
    }))
}

async fn get_parameter(table: &ParameterTable, body: &Bytes) -> Result<Response, ServiceError> {
    let request: GetParameterRequest = decode(body)?;
    tracing::debug!("Body={:?}", request);

    match table.get(&request.name).await {
        Some(value) => Ok(json_response(&GetParameterResponse {
            parameter: ParameterEntry::string(request.name, value),
        })),
        None => Err(ServiceError::new(
            "ParameterNotFound",
            format!("Parameter {} not found.", request.name),
        )),
    }
}
