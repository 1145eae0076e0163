//! Service statistics endpoint.
//!
//! GET /api/v1/stats - user counts by state, talk count, live connections.

use axum::Json;
use axum::extract::State;
use randchat_core::repository::talk::TalkRepository;
use randchat_core::repository::user::{UserRepository, UserStats};
use randchat_types::error::RepositoryError;
use serde::Serialize;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceStats {
    pub users: UserStats,
    pub talks: u64,
    /// Live user records held in memory.
    pub cached_users: usize,
    pub connections: usize,
}

pub async fn collect(state: &AppState) -> Result<ServiceStats, RepositoryError> {
    let lifecycle = state.lifecycle();
    Ok(ServiceStats {
        users: lifecycle.directory().repository().stats().await?,
        talks: lifecycle.talks().count().await?,
        cached_users: lifecycle.directory().cache_size(),
        connections: state.hub.connected(),
    })
}

pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ServiceStats>>, AppError> {
    Ok(ApiResponse::success(collect(&state).await?).into_body())
}
