//! Backend CRUD service: `/api/leads` over the sled lead store.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use leadrelay_core::{LeadFields, LeadStore, StoreError};
use serde_json::json;

use crate::http::health;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{0}")]
    BadRequest(String),
    #[error("No lead found with ID: {0}")]
    LeadNotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    DeleteFailed(StoreError),
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            BackendError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            BackendError::LeadNotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Lead not found", "message": self.to_string() }),
            ),
            BackendError::Store(e) => {
                tracing::error!("[backend] store failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": e.to_string() }),
                )
            }
            BackendError::DeleteFailed(e) => {
                tracing::error!("[backend] delete failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to delete lead", "message": e.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

fn body(payload: Result<Json<LeadFields>, JsonRejection>) -> Result<LeadFields, BackendError> {
    payload
        .map(|Json(fields)| fields)
        .map_err(|rejection| BackendError::BadRequest(rejection.body_text()))
}

pub fn router(store: LeadStore) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/leads", get(list_leads).post(create_lead))
        .route(
            "/api/leads/:id",
            get(get_lead).put(update_lead).delete(delete_lead),
        )
        .with_state(store)
}

async fn create_lead(
    State(store): State<LeadStore>,
    payload: Result<Json<LeadFields>, JsonRejection>,
) -> Result<impl IntoResponse, BackendError> {
    let lead = store.create(body(payload)?)?;
    tracing::info!("[backend] lead {} created ({})", lead.id, lead.name);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Lead created successfully", "id": lead.id })),
    ))
}

async fn list_leads(State(store): State<LeadStore>) -> Result<impl IntoResponse, BackendError> {
    Ok(Json(store.list()?))
}

async fn get_lead(
    State(store): State<LeadStore>,
    Path(id): Path<String>,
) -> Result<Response, BackendError> {
    Ok(match store.get(&id)? {
        Some(lead) => Json(lead).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" }))).into_response(),
    })
}

async fn update_lead(
    State(store): State<LeadStore>,
    Path(id): Path<String>,
    payload: Result<Json<LeadFields>, JsonRejection>,
) -> Result<impl IntoResponse, BackendError> {
    let fields = body(payload)?;
    match store.update(&id, fields)? {
        Some(_) => {
            tracing::info!("[backend] lead {} updated", id);
            Ok(Json(json!({ "message": "Lead updated successfully" })))
        }
        None => Err(BackendError::LeadNotFound(id)),
    }
}

async fn delete_lead(
    State(store): State<LeadStore>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, BackendError> {
    match store.remove(&id).map_err(BackendError::DeleteFailed)? {
        Some(_) => {
            tracing::info!("[backend] lead {} deleted", id);
            Ok(Json(json!({
                "success": true,
                "message": format!("Lead with ID {} has been deleted successfully", id),
                "deletedId": id,
            })))
        }
        None => Err(BackendError::LeadNotFound(id)),
    }
}
