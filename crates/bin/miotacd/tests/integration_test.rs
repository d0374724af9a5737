//! End-to-end smoke tests for the full miotacd stack.
//!
//! Each test spins up the complete application (in-memory `SQLite`, real
//! repository, simulated units, real integration, real axum router) and
//! exercises the HTTP layer via `tower::ServiceExt::oneshot`. No TCP port is
//! bound.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use miotac_adapter_http_axum::router;
use miotac_adapter_http_axum::state::AppState;
use miotac_adapter_simulated::{SimulatedAirConditioner, SimulatedConnector};
use miotac_adapter_storage_sqlite_sqlx::{Config, SqliteConfigEntryRepository};
use miotac_app::event_bus::InProcessEventBus;
use miotac_app::services::integration::{IntegrationSettings, MiotIntegration};
use miotac_domain::device::Token;
use miotac_domain::status::OperationMode;
use serde_json::{Value, json};
use tower::ServiceExt;

const HOST: &str = "192.168.1.20";
const TOKEN: &str = "0123456789abcdef0123456789abcdef";
const MAC: &str = "50:EC:50:00:00:01";

type Integration = MiotIntegration<SimulatedConnector, SqliteConfigEntryRepository, InProcessEventBus>;

struct Stack {
    app: Router,
    unit: Arc<SimulatedAirConditioner>,
    integration: Arc<Integration>,
}

/// Build a fully-wired router backed by an in-memory `SQLite` database and
/// one simulated unit.
async fn stack(model: &str) -> Stack {
    let db = Config::new("sqlite::memory:")
        .build()
        .await
        .expect("in-memory database should initialise");
    let repo = SqliteConfigEntryRepository::new(db.pool().clone());

    let mut connector = SimulatedConnector::new();
    let unit = connector.add(
        HOST,
        Token::parse(TOKEN).unwrap(),
        SimulatedAirConditioner::new(model, MAC),
    );

    let event_bus = Arc::new(InProcessEventBus::new(256));
    let integration = Arc::new(MiotIntegration::new(
        connector,
        repo,
        Arc::clone(&event_bus),
        IntegrationSettings::default(),
    ));
    let app = router::build(AppState::new(Arc::clone(&integration), event_bus));

    Stack {
        app,
        unit,
        integration,
    }
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn form(host: &str) -> Value {
    json!({"host": host, "token": TOKEN, "name": "Bedroom", "retries": 3})
}

async fn add_device(app: &Router) -> Value {
    let (status, body) = call(app, post("/api/config_flow/user", &form(HOST))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let stack = stack("xiaomi.aircondition.mc4").await;

    let response = stack.app.clone().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Config flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_show_empty_form_with_default_retries() {
    let stack = stack("xiaomi.aircondition.mc4").await;

    let (status, body) = call(&stack.app, get("/api/config_flow/user")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "form");
    assert_eq!(body["defaults"]["retries"], 10);
    assert_eq!(body["errors"], json!({}));
}

#[tokio::test]
async fn should_create_entry_and_expose_entities() {
    let stack = stack("xiaomi.aircondition.mc4").await;

    let body = add_device(&stack.app).await;
    assert_eq!(body["type"], "create_entry");
    assert_eq!(
        body["entry"]["unique_id"],
        format!("xiaomi.aircondition.mc4-{MAC}")
    );
    assert!(body["entry"].get("token").is_none());

    let (status, entities) = call(&stack.app, get("/api/entities")).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = entities
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["entity_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 7);
    assert!(ids.contains(&"climate.bedroom"));
    assert!(ids.contains(&"switch.bedroom_eco"));

    let (_, climate) = call(&stack.app, get("/api/entities/climate.bedroom")).await;
    assert_eq!(climate["state"], "off");
    assert_eq!(climate["available"], true);

    let (_, entries) = call(&stack.app, get("/api/config_entries")).await;
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["retries"], 3);

    stack.integration.shutdown();
}

#[tokio::test]
async fn should_abort_when_device_already_configured() {
    let stack = stack("xiaomi.aircondition.mc4").await;
    add_device(&stack.app).await;

    let (status, body) = call(&stack.app, post("/api/config_flow/user", &form(HOST))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"type": "abort", "reason": "already_configured"}));
    stack.integration.shutdown();
}

#[tokio::test]
async fn should_report_unreachable_device_on_form() {
    let stack = stack("xiaomi.aircondition.mc4").await;

    let (status, body) = call(
        &stack.app,
        post("/api/config_flow/user", &form("192.168.1.99")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "form");
    assert_eq!(body["errors"]["base"], "platform_not_ready");
    assert_eq!(body["defaults"]["host"], "192.168.1.99");
    assert_eq!(body["defaults"]["token"], "");
}

#[tokio::test]
async fn should_reject_unsupported_model() {
    let stack = stack("zhimi.airpurifier.v7").await;

    let (_, body) = call(&stack.app, post("/api/config_flow/user", &form(HOST))).await;

    assert_eq!(body["errors"]["base"], "unsupported_device");
    let (_, entries) = call(&stack.app, get("/api/config_entries")).await;
    assert_eq!(entries, json!([]));
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_drive_unit_through_climate_service() {
    let stack = stack("xiaomi.aircondition.mc4").await;
    add_device(&stack.app).await;

    let (status, body) = call(
        &stack.app,
        post(
            "/api/services/climate/set_hvac_mode",
            &json!({"entity_id": "climate.bedroom", "hvac_mode": "heat"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"entity_id": "climate.bedroom", "success": true}]));
    let unit = stack.unit.peek();
    assert!(unit.power);
    assert_eq!(unit.mode, OperationMode::Heat);

    let (_, climate) = call(&stack.app, get("/api/entities/climate.bedroom")).await;
    assert_eq!(climate["state"], "heat");
    stack.integration.shutdown();
}

#[tokio::test]
async fn should_toggle_switch_and_refresh_its_state() {
    let stack = stack("xiaomi.aircondition.mc4").await;
    add_device(&stack.app).await;

    let (status, _) = call(
        &stack.app,
        post(
            "/api/services/switch/turn_on",
            &json!({"entity_id": "switch.bedroom_eco"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(stack.unit.peek().eco);
    let (_, switch) = call(&stack.app, get("/api/entities/switch.bedroom_eco")).await;
    assert_eq!(switch["state"], "on");
    stack.integration.shutdown();
}

#[tokio::test]
async fn should_mark_climate_unavailable_when_command_is_refused() {
    let stack = stack("xiaomi.aircondition.mc4").await;
    add_device(&stack.app).await;
    stack.unit.refuse_commands(true);

    let (_, body) = call(
        &stack.app,
        post(
            "/api/services/climate/set_temperature",
            &json!({"entity_id": "climate.bedroom", "temperature": 22}),
        ),
    )
    .await;

    assert_eq!(body[0]["success"], false);
    assert!((stack.unit.peek().target_temperature - 26.0).abs() < f64::EPSILON);
    let (_, climate) = call(&stack.app, get("/api/entities/climate.bedroom")).await;
    assert_eq!(climate["available"], false);
    assert_eq!(climate["state"], "unavailable");
    stack.integration.shutdown();
}

#[tokio::test]
async fn should_reject_invalid_service_data() {
    let stack = stack("xiaomi.aircondition.mc4").await;
    add_device(&stack.app).await;

    let (status, _) = call(
        &stack.app,
        post(
            "/api/services/climate/miot_ac_set_delay_off_timer",
            &json!({"entity_id": "climate.bedroom", "minutes": 721}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!stack.unit.peek().timer.enabled);
    stack.integration.shutdown();
}

#[tokio::test]
async fn should_return_404_for_service_on_unknown_entity() {
    let stack = stack("xiaomi.aircondition.mc4").await;
    add_device(&stack.app).await;

    let (status, _) = call(
        &stack.app,
        post(
            "/api/services/switch/toggle",
            &json!({"entity_id": "switch.kitchen_eco"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    stack.integration.shutdown();
}

// ---------------------------------------------------------------------------
// Entry removal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_remove_entry_and_its_entities() {
    let stack = stack("xiaomi.aircondition.mc4").await;
    let created = add_device(&stack.app).await;
    let entry_id = created["entry"]["entry_id"].as_str().unwrap().to_string();

    let (status, _) = call(
        &stack.app,
        Request::delete(format!("/api/config_entries/{entry_id}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, entities) = call(&stack.app, get("/api/entities")).await;
    assert_eq!(entities, json!([]));
    let (_, entries) = call(&stack.app, get("/api/config_entries")).await;
    assert_eq!(entries, json!([]));

    let (status, _) = call(
        &stack.app,
        Request::delete(format!("/api/config_entries/{entry_id}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
