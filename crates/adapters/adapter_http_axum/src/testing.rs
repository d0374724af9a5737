//! Stub [`Integration`] shared by the handler tests.

use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response};
use tower::ServiceExt;

use miotac_app::event_bus::InProcessEventBus;
use miotac_app::ports::Integration;
use miotac_app::services::config_flow::{FlowResult, UserInput};
use miotac_domain::config_entry::{ConfigEntry, EntryData};
use miotac_domain::device::Token;
use miotac_domain::entity::{Entity, EntityState};
use miotac_domain::error::{MiotError, NotFoundError, ValidationError};
use miotac_domain::id::EntryId;
use miotac_domain::service::{ServiceCall, ServiceResult};

use crate::state::AppState;

pub(crate) const TOKEN: &str = "0123456789abcdef0123456789abcdef";

#[derive(Default)]
pub(crate) struct StubIntegration {
    pub entities: Vec<Entity>,
    pub entries: Mutex<Vec<ConfigEntry>>,
    pub calls: Mutex<Vec<ServiceCall>>,
    pub flow_inputs: Mutex<Vec<Option<UserInput>>>,
    pub flow_result: Option<FlowResult>,
}

impl StubIntegration {
    pub fn with_entities() -> Self {
        Self {
            entities: vec![
                entity("climate.bedroom", EntityState::Cool),
                entity("switch.bedroom_eco", EntityState::Off),
            ],
            ..Self::default()
        }
    }
}

pub(crate) fn entity(entity_id: &str, state: EntityState) -> Entity {
    Entity::builder()
        .entity_id(entity_id)
        .unique_id(format!("mc4-{entity_id}"))
        .friendly_name("Bedroom")
        .state(state)
        .available(true)
        .build()
        .unwrap()
}

pub(crate) fn config_entry(name: &str) -> ConfigEntry {
    ConfigEntry::new(
        format!("xiaomi.aircondition.mc4-{name}"),
        EntryData {
            host: "192.168.1.20".to_string(),
            token: Token::parse(TOKEN).unwrap(),
            name: name.to_string(),
            retries: 10,
        },
    )
    .unwrap()
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Integration for StubIntegration {
    fn domain(&self) -> &'static str {
        "stub"
    }

    fn entities(&self) -> Vec<Entity> {
        self.entities.clone()
    }

    fn entity(&self, entity_id: &str) -> Result<Entity, MiotError> {
        self.entities
            .iter()
            .find(|e| e.entity_id == entity_id)
            .cloned()
            .ok_or_else(|| {
                NotFoundError {
                    entity: "Entity",
                    id: entity_id.to_string(),
                }
                .into()
            })
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: serde_json::Value,
    ) -> Result<Vec<ServiceResult>, MiotError> {
        let call = ServiceCall::parse(domain, service, &data)?;
        let results = self
            .entities
            .iter()
            .filter(|e| e.domain() == domain && call.targets(&e.entity_id))
            .map(|e| ServiceResult {
                entity_id: e.entity_id.clone(),
                success: true,
            })
            .collect();
        lock(&self.calls).push(call);
        Ok(results)
    }

    async fn config_entries(&self) -> Result<Vec<ConfigEntry>, MiotError> {
        Ok(lock(&self.entries).clone())
    }

    async fn remove_entry(&self, entry_id: EntryId) -> Result<(), MiotError> {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|e| e.entry_id != entry_id);
        if entries.len() == before {
            return Err(NotFoundError {
                entity: "ConfigEntry",
                id: entry_id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn config_flow_user(&self, input: Option<UserInput>) -> Result<FlowResult, MiotError> {
        lock(&self.flow_inputs).push(input);
        self.flow_result
            .clone()
            .ok_or_else(|| ValidationError::MissingField("flow_result").into())
    }

    fn shutdown(&self) {}
}

pub(crate) fn app(integration: StubIntegration) -> (Router, Arc<StubIntegration>) {
    let integration = Arc::new(integration);
    let state = AppState::new(
        Arc::clone(&integration),
        Arc::new(InProcessEventBus::new(16)),
    );
    (crate::router::build(state), integration)
}

pub(crate) async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub(crate) async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
