//! Lead Service: typed client over the backend CRUD API.
//! One HTTP call per operation; results come back as `{status, data}` or a [`LeadServiceError`].

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde_json::{Map, Value};

/// Successful backend reply: status code plus the decoded body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceResponse {
    pub status: u16,
    pub data: Value,
}

impl ServiceResponse {
    pub fn new(status: u16, data: Value) -> Self {
        Self { status, data }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LeadServiceError {
    /// Connection or protocol failure. The reqwest error is kept for logs only.
    #[error("Failed to reach lead backend")]
    Unreachable(#[source] reqwest::Error),
    #[error("{message}")]
    Backend { status: u16, message: String },
    #[error("Failed to delete lead from backend")]
    DeleteFailed { status: u16, details: Option<String> },
}

impl LeadServiceError {
    /// Status reported by the backend, when it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            LeadServiceError::Unreachable(_) => None,
            LeadServiceError::Backend { status, .. } => Some(*status),
            LeadServiceError::DeleteFailed { status, .. } => Some(*status),
        }
    }

    /// Backend-provided explanation, safe to show to callers.
    pub fn details(&self) -> Option<&str> {
        match self {
            LeadServiceError::DeleteFailed { details, .. } => details.as_deref(),
            _ => None,
        }
    }
}

/// CRUD operations the command router dispatches to.
#[async_trait::async_trait]
pub trait LeadBackend: Send + Sync {
    async fn create_lead(
        &self,
        data: &Map<String, Value>,
    ) -> Result<ServiceResponse, LeadServiceError>;

    async fn list_leads(&self) -> Result<ServiceResponse, LeadServiceError>;

    /// A 404 is a result (`{message: "Not found"}`), not an error.
    async fn get_lead(&self, id: &str) -> Result<ServiceResponse, LeadServiceError>;

    async fn update_lead(
        &self,
        id: &str,
        data: &Map<String, Value>,
    ) -> Result<ServiceResponse, LeadServiceError>;

    /// Only 200 and 204 count as success.
    async fn delete_lead(&self, id: &str) -> Result<ServiceResponse, LeadServiceError>;
}

/// HTTP implementation of [`LeadBackend`] against `{base}/api/leads`.
#[derive(Clone)]
pub struct LeadService {
    base: Url,
    client: Client,
}

impl LeadService {
    pub fn new(base: Url, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let client = crate::http::client(timeout)?;
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, id: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["api", "leads"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, Value), LeadServiceError> {
        let res = request.send().await.map_err(|e| {
            tracing::error!("[leads] backend call failed: {}", e);
            LeadServiceError::Unreachable(e)
        })?;
        let status = res.status();
        let text = res.text().await.map_err(|e| {
            tracing::error!("[leads] backend body unreadable: {}", e);
            LeadServiceError::Unreachable(e)
        })?;
        Ok((status, decode_body(&text)))
    }

    fn expect_success(
        status: StatusCode,
        data: Value,
    ) -> Result<ServiceResponse, LeadServiceError> {
        if status.is_success() {
            Ok(ServiceResponse::new(status.as_u16(), data))
        } else {
            Err(LeadServiceError::Backend {
                status: status.as_u16(),
                message: backend_message(&data).unwrap_or_else(|| {
                    format!("Lead backend responded with status {}", status.as_u16())
                }),
            })
        }
    }
}

#[async_trait::async_trait]
impl LeadBackend for LeadService {
    async fn create_lead(
        &self,
        data: &Map<String, Value>,
    ) -> Result<ServiceResponse, LeadServiceError> {
        let (status, body) = self.send(self.client.post(self.url(None)).json(data)).await?;
        Self::expect_success(status, body)
    }

    async fn list_leads(&self) -> Result<ServiceResponse, LeadServiceError> {
        let (status, body) = self.send(self.client.get(self.url(None))).await?;
        Self::expect_success(status, body)
    }

    async fn get_lead(&self, id: &str) -> Result<ServiceResponse, LeadServiceError> {
        let (status, body) = self.send(self.client.get(self.url(Some(id)))).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(ServiceResponse::new(status.as_u16(), body));
        }
        Self::expect_success(status, body)
    }

    async fn update_lead(
        &self,
        id: &str,
        data: &Map<String, Value>,
    ) -> Result<ServiceResponse, LeadServiceError> {
        let (status, body) = self
            .send(self.client.put(self.url(Some(id))).json(data))
            .await?;
        Self::expect_success(status, body)
    }

    async fn delete_lead(&self, id: &str) -> Result<ServiceResponse, LeadServiceError> {
        let (status, body) = self.send(self.client.delete(self.url(Some(id)))).await?;
        if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
            return Ok(ServiceResponse::new(status.as_u16(), body));
        }
        tracing::warn!("[leads] delete of {} answered {}", id, status);
        Err(LeadServiceError::DeleteFailed {
            status: status.as_u16(),
            details: backend_message(&body),
        })
    }
}

/// JSON when the body parses, the raw text otherwise, null when empty.
fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// The backend's own explanation: `error`, then `message`.
fn backend_message(body: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
}
