//! Service-call dispatch.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};

use miotac_app::ports::Integration;
use miotac_domain::service::ServiceResult;

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/services/{domain}/{service}`
///
/// The body is a JSON object with an optional `entity_id` plus the service
/// parameters. An empty body is treated as `{}`.
pub async fn call<I: Integration>(
    State(state): State<AppState<I>>,
    Path((domain, service)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Vec<ServiceResult>>, ApiError> {
    let data = if body.is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_slice(&body)
            .map_err(|err| ApiError::BadRequest(format!("invalid JSON body: {err}")))?
    };

    tracing::debug!(%domain, %service, "service call");
    let results = state.integration.call_service(&domain, &service, data).await?;
    Ok(Json(results))
}
