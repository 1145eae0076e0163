//! User record lookup.
//!
//! GET /api/v1/users/{id} - the live record, loading it from storage if needed.

use axum::Json;
use axum::extract::{Path, State};
use randchat_types::error::UserError;
use randchat_types::user::{User, UserId};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let id: UserId = id
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid user id: {id}")))?;

    let handle = state
        .lifecycle()
        .directory()
        .get(id)
        .await?
        .ok_or(UserError::NotFound)?;

    Ok(ApiResponse::success(handle.snapshot().await).into_body())
}
