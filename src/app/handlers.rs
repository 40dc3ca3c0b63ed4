use crate::core::relay::{ProxyRequest, RelayService};
use crate::core::{image, RecordStore};
use crate::utils::error::RelayError;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct WriteQuery {
    pub id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub id: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub headers: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    pub success: bool,
    pub file_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub success: bool,
    pub file_url: String,
    pub upstream_status: u16,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// JSON error envelope: the `error` field names the failing stage so store
/// and outbound failures stay distinguishable to callers.
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn missing(params: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: format!("Missing {} parameters", params),
                details: None,
            },
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let status =
            StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let (error, details) = match &err {
            RelayError::InvalidInput { .. } | RelayError::RateLimited { .. } => {
                (err.to_string(), None)
            }
            RelayError::Outbound { reason } => {
                ("Outbound request failed".to_string(), Some(reason.clone()))
            }
            RelayError::StoreRead { details, .. } => {
                ("Failed to read file".to_string(), some_nonempty(details))
            }
            RelayError::StoreWrite { details, .. } => {
                ("Failed to write file".to_string(), some_nonempty(details))
            }
            RelayError::WriteConflict { .. } => {
                ("Failed to write file".to_string(), Some(err.to_string()))
            }
            other => ("Internal error".to_string(), Some(other.to_string())),
        };
        Self {
            status,
            body: ErrorBody { error, details },
        }
    }
}

fn some_nonempty(details: &str) -> Option<String> {
    if details.is_empty() {
        None
    } else {
        Some(details.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub async fn index() -> &'static str {
    "Hello, world!"
}

pub async fn write_message<S: RecordStore>(
    State(relay): State<Arc<RelayService<S>>>,
    Query(query): Query<WriteQuery>,
) -> Result<Json<WriteResponse>, ApiError> {
    let (id, message) = match (query.id, query.message) {
        (Some(id), Some(message)) => (id, message),
        _ => return Err(ApiError::missing("'id' or 'message'")),
    };

    let file_url = relay.append_message(&id, &message).await?;
    Ok(Json(WriteResponse {
        success: true,
        file_url,
    }))
}

pub async fn proxy_http<S: RecordStore>(
    State(relay): State<Arc<RelayService<S>>>,
    Query(query): Query<ProxyQuery>,
) -> Result<Json<ProxyResponse>, ApiError> {
    let (id, url) = match (query.id, query.url) {
        (Some(id), Some(url)) => (id, url),
        _ => return Err(ApiError::missing("'id' or 'url'")),
    };

    let outcome = relay
        .proxy_and_record(ProxyRequest {
            id,
            url,
            method: query.method,
            headers: query.headers,
            token: query.token,
        })
        .await?;

    Ok(Json(ProxyResponse {
        success: true,
        file_url: outcome.file_url,
        upstream_status: outcome.upstream_status,
    }))
}

pub async fn render_messages<S: RecordStore>(
    State(relay): State<Arc<RelayService<S>>>,
    Query(query): Query<ImageQuery>,
) -> Result<Response, ApiError> {
    let id = query.id.ok_or_else(|| ApiError::missing("'id'"))?;

    let record = relay.read_record(&id).await?;
    let bitmap = image::encode_record(&record)?;

    Ok(([(header::CONTENT_TYPE, "image/bmp")], bitmap).into_response())
}
