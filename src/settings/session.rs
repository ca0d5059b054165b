//! Save orchestration between the draft and the remote service.
//!
//! A [`SettingsSession`] owns one draft, the last-read server document, and
//! the alert slots the caller renders. Saves are single-flight: the session
//! is Idle or Saving, a second save while Saving is ignored, and every save
//! ends back in Idle no matter how it went.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::completion::CompletionBridge;
use super::draft::SettingsDraft;
use super::minimize::minimize;
use crate::catalog::ProviderCatalog;
use crate::client::{ConfigService, ServiceError};
use crate::models::{ModelRole, ServerConfiguration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Saving,
}

/// A user-facing notice. Error alerts stick around until replaced; success
/// alerts are meant to be shown once and dropped by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Success(String),
    Error(String),
}

impl Alert {
    pub fn message(&self) -> &str {
        match self {
            Alert::Success(message) | Alert::Error(message) => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Alert::Error(_))
    }
}

/// How a save attempt ended. Detail for the user lands in the alert slots;
/// this is for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Failed,
    NotLoaded,
    InFlight,
}

/// Which affordance completion controls should present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAffordance {
    Settings,
    Warning,
}

pub struct SettingsSession {
    service: Arc<dyn ConfigService>,
    server: Option<ServerConfiguration>,
    load_error: Option<String>,
    draft: SettingsDraft,
    state: SaveState,
    alert: Option<Alert>,
    api_key_alert: Option<Alert>,
    completion: Option<CompletionBridge>,
}

impl SettingsSession {
    pub fn new(service: Arc<dyn ConfigService>) -> Self {
        Self {
            service,
            server: None,
            load_error: None,
            draft: SettingsDraft::default(),
            state: SaveState::Idle,
            alert: None,
            api_key_alert: None,
            completion: None,
        }
    }

    /// Attaches a completion-availability subscription. Without one, the
    /// session assumes completions are enabled and never shows the warning
    /// affordance.
    pub fn with_completion_bridge(mut self, bridge: CompletionBridge) -> Self {
        self.completion = Some(bridge);
        self
    }

    /// Fetches the configuration and seeds the draft from it. Until a load
    /// succeeds the session exposes no draft and refuses to save.
    pub async fn load(&mut self) -> Result<(), ServiceError> {
        match self.service.fetch_config().await {
            Ok(config) => {
                self.draft.seed(&config);
                self.server = Some(config);
                self.load_error = None;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "failed to load configuration");
                self.load_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.server.is_some()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// The server document as of the last successful fetch.
    pub fn server(&self) -> Option<&ServerConfiguration> {
        self.server.as_ref()
    }

    pub fn draft(&self) -> Option<&SettingsDraft> {
        self.server.is_some().then_some(&self.draft)
    }

    /// Mutable access to the draft, only once a load has succeeded.
    pub fn draft_mut(&mut self) -> Option<&mut SettingsDraft> {
        self.server.is_some().then_some(&mut self.draft)
    }

    pub fn save_state(&self) -> SaveState {
        self.state
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn api_key_alert(&self) -> Option<&Alert> {
        self.api_key_alert.as_ref()
    }

    /// Submits the draft as a minimal patch, then refetches and reseeds.
    ///
    /// On any failure the draft and the key working set are left exactly as
    /// they were; the outcome is reflected in the alert slot and the session
    /// returns to Idle either way.
    pub async fn save(&mut self) -> SaveOutcome {
        let request = match (&self.server, self.state) {
            (None, _) => {
                debug!("save ignored, configuration never loaded");
                return SaveOutcome::NotLoaded;
            }
            (Some(_), SaveState::Saving) => {
                warn!("save ignored, another save is in flight");
                return SaveOutcome::InFlight;
            }
            (Some(server), SaveState::Idle) => minimize(server, self.draft.full_request()),
        };
        self.state = SaveState::Saving;
        self.api_key_alert = None;
        let attempt = Uuid::new_v4();
        if request.is_noop() {
            debug!(attempt = %attempt, "draft matches the server, update carries only the marker");
        }
        info!(attempt = %attempt, last_read = %request.last_read, "submitting configuration update");

        let outcome = match self.service.update_config(&request).await {
            Ok(()) => match self.service.fetch_config().await {
                Ok(fresh) => {
                    self.draft.seed(&fresh);
                    self.draft.clear_api_keys();
                    self.server = Some(fresh);
                    self.alert = Some(Alert::Success("Settings saved".to_string()));
                    info!(attempt = %attempt, "configuration saved and reloaded");
                    SaveOutcome::Saved
                }
                Err(err) => {
                    warn!(attempt = %attempt, error = %err, "update accepted but refresh failed");
                    self.alert = Some(Alert::Error(format!(
                        "settings were saved, but refreshing them failed: {err}"
                    )));
                    SaveOutcome::Saved
                }
            },
            Err(err) => {
                error!(attempt = %attempt, error = %err, "configuration update rejected");
                self.alert = Some(Alert::Error(err.to_string()));
                SaveOutcome::Failed
            }
        };
        self.state = SaveState::Idle;
        outcome
    }

    /// Refreshes the stored-key listing on the server document in place.
    pub async fn refresh_api_keys(&mut self) -> Result<(), ServiceError> {
        let keys = self.service.list_api_keys().await?;
        if let Some(server) = self.server.as_mut() {
            server.api_keys = keys;
        }
        Ok(())
    }

    /// Deletes one stored key on the service, immediately, outside the save
    /// flow. Reports into the API-key alert slot and returns whether the
    /// deletion went through.
    pub async fn delete_api_key(&mut self, name: &str) -> bool {
        match self.service.delete_api_key(name).await {
            Ok(()) => {
                // A pending edit under the deleted name must not survive to
                // the next save.
                self.draft.remove_api_key(name);
                if let Err(err) = self.refresh_api_keys().await {
                    warn!(error = %err, "key deleted but listing refresh failed");
                }
                self.api_key_alert = Some(Alert::Success(format!("API key {name} deleted")));
                true
            }
            Err(err) => {
                error!(name, error = %err, "failed to delete API key");
                self.api_key_alert = Some(Alert::Error(err.to_string()));
                false
            }
        }
    }

    /// Key names required by the currently selected providers that are
    /// neither stored on the server nor pending in the draft. Advisory only;
    /// saving is never blocked on this.
    pub fn missing_api_keys(&self, catalog: &ProviderCatalog) -> Vec<String> {
        let Some(server) = &self.server else {
            return Vec::new();
        };
        let mut missing = Vec::new();
        for role in ModelRole::ALL {
            let Some(provider_id) = self.draft.selection(role).provider_id() else {
                continue;
            };
            let Some(provider) = catalog.provider_for(role, provider_id) else {
                continue;
            };
            let Some(key_name) = &provider.api_key_name else {
                continue;
            };
            let pending = self
                .draft
                .api_keys()
                .get(key_name)
                .is_some_and(|value| !value.trim().is_empty());
            if !server.api_keys.contains_key(key_name) && !pending && !missing.contains(key_name) {
                missing.push(key_name.clone());
            }
        }
        missing
    }

    /// False while a subscribed completion provider reports itself disabled;
    /// completion-role controls should not accept edits then.
    pub fn completion_controls_enabled(&self) -> bool {
        self.completion
            .as_ref()
            .map_or(true, CompletionBridge::is_enabled)
    }

    /// Warning when a completion model is selected while the provider says
    /// it is disabled, plain settings otherwise.
    pub fn completion_affordance(&self) -> CompletionAffordance {
        let selected = self.draft.global_id(ModelRole::Completion).is_some();
        if selected && !self.completion_controls_enabled() {
            CompletionAffordance::Warning
        } else {
            CompletionAffordance::Settings
        }
    }
}
