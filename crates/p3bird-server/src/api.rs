//! JSON API handlers.

use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use p3bird_orm::{FindAll, Limit, OrmError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl From<OrmError> for ApiError {
    fn from(err: OrmError) -> Self {
        match err {
            OrmError::InvalidLimit(_) => ApiError::BadRequest(err.to_string()),
            other => {
                tracing::error!(error = %other, "database request failed");
                ApiError::InternalServerError(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    /// `"count"` or `"offset, count"`.
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
}

/// Handler for `GET /api/users`, newest first.
pub async fn list_users_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<ListUsersResponse>, ApiError> {
    let mut query = FindAll::new().order_by("`created_at` desc");
    if let Some(limit) = params.limit.as_deref() {
        query = query.limit(limit.parse::<Limit>()?);
    }

    let users = User::find_all(&state.db, query).await?;
    Ok(Json(ListUsersResponse { users }))
}
