//! Provider catalog served by the configuration service.
//!
//! The catalog is advisory: it drives provider pickers, field schemas, and
//! missing-key hints, but the update surface never requires it.

use serde::{Deserialize, Serialize};

use crate::models::ModelRole;

/// One configurable input declared by a provider's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettingsField {
    Text { key: String, label: String },
    Multiline { key: String, label: String },
    Integer {
        key: String,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<i64>,
    },
}

impl SettingsField {
    pub fn key(&self) -> &str {
        match self {
            SettingsField::Text { key, .. }
            | SettingsField::Multiline { key, .. }
            | SettingsField::Integer { key, .. } => key,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SettingsField::Text { label, .. }
            | SettingsField::Multiline { label, .. }
            | SettingsField::Integer { label, .. } => label,
        }
    }
}

/// A provider entry in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    /// Environment-variable style name of the API key this provider reads,
    /// e.g. `OPENAI_API_KEY`. Absent for providers that need no key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_name: Option<String>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub fields: Vec<SettingsField>,
}

impl ProviderInfo {
    pub fn knows_model(&self, model_name: &str) -> bool {
        self.models.iter().any(|m| m == model_name)
    }
}

/// The full catalog: language-model providers serve the chat and completion
/// roles, embedding providers serve the embedding role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderCatalog {
    #[serde(default)]
    pub language_providers: Vec<ProviderInfo>,
    #[serde(default)]
    pub embedding_providers: Vec<ProviderInfo>,
}

impl ProviderCatalog {
    pub fn providers_for(&self, role: ModelRole) -> &[ProviderInfo] {
        match role {
            ModelRole::Chat | ModelRole::Completion => &self.language_providers,
            ModelRole::Embedding => &self.embedding_providers,
        }
    }

    pub fn provider_for(&self, role: ModelRole, provider_id: &str) -> Option<&ProviderInfo> {
        self.providers_for(role).iter().find(|p| p.id == provider_id)
    }

    pub fn is_empty(&self) -> bool {
        self.language_providers.is_empty() && self.embedding_providers.is_empty()
    }
}
