//! Config entry listing and removal.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;

use miotac_app::ports::Integration;
use miotac_domain::config_entry::ConfigEntry;
use miotac_domain::id::EntryId;
use miotac_domain::time::Timestamp;

use crate::error::ApiError;
use crate::state::AppState;

/// Public view of a config entry. The device token is never returned.
#[derive(Debug, Serialize)]
pub struct EntryView {
    pub entry_id: EntryId,
    pub unique_id: String,
    pub title: String,
    pub host: String,
    pub name: String,
    pub retries: u32,
    pub created_at: Timestamp,
}

impl From<ConfigEntry> for EntryView {
    fn from(entry: ConfigEntry) -> Self {
        Self {
            entry_id: entry.entry_id,
            unique_id: entry.unique_id,
            title: entry.title,
            host: entry.data.host,
            name: entry.data.name,
            retries: entry.data.retries,
            created_at: entry.created_at,
        }
    }
}

/// `GET /api/config_entries`
pub async fn list<I: Integration>(
    State(state): State<AppState<I>>,
) -> Result<Json<Vec<EntryView>>, ApiError> {
    let entries = state.integration.config_entries().await?;
    Ok(Json(entries.into_iter().map(EntryView::from).collect()))
}

/// `DELETE /api/config_entries/{entry_id}`
pub async fn remove<I: Integration>(
    State(state): State<AppState<I>>,
    Path(entry_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let entry_id = EntryId::from_str(&entry_id)
        .map_err(|_| ApiError::BadRequest(format!("invalid entry id {entry_id:?}")))?;
    state.integration.remove_entry(entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
