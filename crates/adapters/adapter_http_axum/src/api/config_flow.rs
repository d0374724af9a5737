//! The add-device form.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use miotac_app::ports::Integration;
use miotac_app::services::config_flow::{FlowResult, FormDefaults, UserInput};

use crate::api::config_entries::EntryView;
use crate::error::ApiError;
use crate::state::AppState;

/// JSON rendering of a [`FlowResult`].
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowView {
    Form {
        step_id: &'static str,
        defaults: FormDefaults,
        errors: BTreeMap<String, String>,
    },
    CreateEntry {
        entry: EntryView,
    },
    Abort {
        reason: &'static str,
    },
}

impl From<FlowResult> for FlowView {
    fn from(result: FlowResult) -> Self {
        match result {
            FlowResult::ShowForm {
                step_id,
                defaults,
                errors,
            } => Self::Form {
                step_id,
                defaults,
                errors,
            },
            FlowResult::CreateEntry { entry } => Self::CreateEntry {
                entry: entry.into(),
            },
            FlowResult::Abort { reason } => Self::Abort { reason },
        }
    }
}

fn respond(result: FlowResult) -> (StatusCode, Json<FlowView>) {
    let status = match result {
        FlowResult::CreateEntry { .. } => StatusCode::CREATED,
        FlowResult::ShowForm { .. } | FlowResult::Abort { .. } => StatusCode::OK,
    };
    (status, Json(result.into()))
}

/// `GET /api/config_flow/user`: the empty form.
pub async fn show<I: Integration>(
    State(state): State<AppState<I>>,
) -> Result<(StatusCode, Json<FlowView>), ApiError> {
    let result = state.integration.config_flow_user(None).await?;
    Ok(respond(result))
}

/// `POST /api/config_flow/user`: submit the form.
pub async fn submit<I: Integration>(
    State(state): State<AppState<I>>,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<FlowView>), ApiError> {
    let result = state.integration.config_flow_user(Some(input)).await?;
    Ok(respond(result))
}
