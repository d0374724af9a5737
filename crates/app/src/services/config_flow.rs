//! Config flow: validate user input, probe the unit, persist an entry.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use miotac_domain::config_entry::{ConfigEntry, DEFAULT_RETRIES, EntryData};
use miotac_domain::device::Token;
use miotac_domain::error::MiotError;

use crate::ports::{ConfigEntryRepository, DeviceConnector};
use crate::services::probe::check_device;

pub const STEP_USER: &str = "user";
pub const ERROR_BASE: &str = "base";
pub const ERROR_REQUIRED: &str = "required";
pub const ERROR_INVALID_TOKEN: &str = "invalid_token";
pub const ERROR_INVALID_RETRIES: &str = "invalid_retries";
pub const ABORT_ALREADY_CONFIGURED: &str = "already_configured";

/// Raw form submission. Every field is optional so that a partial form
/// comes back with per-field errors instead of a decoding failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInput {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub retries: Option<i64>,
}

/// Values pre-filled in the form. The token is never echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormDefaults {
    pub host: String,
    pub token: String,
    pub name: String,
    pub retries: i64,
}

impl FormDefaults {
    fn from_input(input: &UserInput) -> Self {
        Self {
            host: input.host.clone().unwrap_or_default(),
            token: String::new(),
            name: input.name.clone().unwrap_or_default(),
            retries: input.retries.unwrap_or(i64::from(DEFAULT_RETRIES)),
        }
    }
}

/// Outcome of one flow step.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowResult {
    /// Show the form (again). `errors` maps a field name, or `base`, to an
    /// error key.
    ShowForm {
        step_id: &'static str,
        defaults: FormDefaults,
        errors: BTreeMap<String, String>,
    },
    CreateEntry { entry: ConfigEntry },
    Abort { reason: &'static str },
}

impl FlowResult {
    fn form(input: &UserInput, errors: BTreeMap<String, String>) -> Self {
        Self::ShowForm {
            step_id: STEP_USER,
            defaults: FormDefaults::from_input(input),
            errors,
        }
    }
}

/// Runs flow steps against a connector and the entry store.
pub struct ConfigFlow<'a, C, R> {
    connector: &'a C,
    repo: &'a R,
}

impl<'a, C, R> ConfigFlow<'a, C, R>
where
    C: DeviceConnector,
    R: ConfigEntryRepository + Sync,
{
    #[must_use]
    pub fn new(connector: &'a C, repo: &'a R) -> Self {
        Self { connector, repo }
    }

    /// The "user" step. `None` shows the empty form.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the repository. Invalid input and
    /// probe failures are reported through [`FlowResult::ShowForm`].
    #[tracing::instrument(skip_all)]
    pub async fn step_user(&self, input: Option<UserInput>) -> Result<FlowResult, MiotError> {
        let Some(input) = input else {
            return Ok(FlowResult::form(&UserInput::default(), BTreeMap::new()));
        };
        let data = match validate(&input) {
            Ok(data) => data,
            Err(errors) => return Ok(FlowResult::form(&input, errors)),
        };
        match self.create(data).await? {
            Ok(result) => Ok(result),
            Err(key) => {
                let errors = BTreeMap::from([(ERROR_BASE.to_string(), key.to_string())]);
                Ok(FlowResult::form(&input, errors))
            }
        }
    }

    /// Create an entry from already validated settings, such as devices
    /// listed in the daemon configuration.
    ///
    /// A probe failure aborts with its error key.
    ///
    /// # Errors
    ///
    /// Returns a storage error from the repository.
    #[tracing::instrument(skip_all, fields(host = %data.host))]
    pub async fn step_import(&self, data: EntryData) -> Result<FlowResult, MiotError> {
        Ok(self
            .create(data)
            .await?
            .unwrap_or_else(|reason| FlowResult::Abort { reason }))
    }

    /// Probe and persist. The inner error is the probe's error key.
    async fn create(
        &self,
        data: EntryData,
    ) -> Result<Result<FlowResult, &'static str>, MiotError> {
        let device = Arc::new(self.connector.connect(&data.host, &data.token));
        let probe = match check_device(&device, &data.host).await {
            Ok(probe) => probe,
            Err(error) => {
                tracing::warn!(host = %data.host, error = %error, "device probe failed");
                return Ok(Err(error.error_key()));
            }
        };
        if self.repo.find_by_unique_id(&probe.unique_id).await?.is_some() {
            tracing::info!(unique_id = %probe.unique_id, "device is already configured");
            return Ok(Ok(FlowResult::Abort {
                reason: ABORT_ALREADY_CONFIGURED,
            }));
        }
        let entry = self
            .repo
            .create(ConfigEntry::new(probe.unique_id, data)?)
            .await?;
        tracing::info!(entry_id = %entry.entry_id, title = %entry.title, "config entry created");
        Ok(Ok(FlowResult::CreateEntry { entry }))
    }
}

/// Check the form schema, collecting one error per invalid field.
fn validate(input: &UserInput) -> Result<EntryData, BTreeMap<String, String>> {
    let mut errors = BTreeMap::new();
    let mut required = |field: &str, value: &Option<String>| {
        let value = value.as_deref().map(str::trim).filter(|v| !v.is_empty());
        if value.is_none() {
            errors.insert(field.to_string(), ERROR_REQUIRED.to_string());
        }
        value.map(str::to_string)
    };
    let host = required("host", &input.host);
    let name = required("name", &input.name);
    let token = required("token", &input.token);

    let token = token.and_then(|token| match Token::parse(&token) {
        Ok(token) => Some(token),
        Err(_) => {
            errors.insert("token".to_string(), ERROR_INVALID_TOKEN.to_string());
            None
        }
    });
    let retries = match input.retries {
        None => Some(DEFAULT_RETRIES),
        Some(retries) => u32::try_from(retries).ok().filter(|r| *r >= 1),
    };
    if retries.is_none() {
        errors.insert("retries".to_string(), ERROR_INVALID_RETRIES.to_string());
    }

    match (host, token, name, retries) {
        (Some(host), Some(token), Some(name), Some(retries)) if errors.is_empty() => {
            Ok(EntryData {
                host,
                token,
                name,
                retries,
            })
        }
        _ => Err(errors),
    }
}
