//! Wire and domain types shared by the settings core and the service client.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field values drafted for one model, keyed by the schema field key.
pub type FieldValues = BTreeMap<String, serde_json::Value>;

/// The three configurable model slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelRole {
    Chat,
    Completion,
    Embedding,
}

impl ModelRole {
    pub const ALL: [ModelRole; 3] = [ModelRole::Chat, ModelRole::Completion, ModelRole::Embedding];

    /// The roles that carry per-model field values. Embedding providers
    /// expose no tunable fields on the update surface.
    pub const FIELDED: [ModelRole; 2] = [ModelRole::Chat, ModelRole::Completion];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelRole::Chat => "chat",
            ModelRole::Completion => "completion",
            ModelRole::Embedding => "embedding",
        }
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown model role '{0}', expected chat, completion, or embedding")]
pub struct RoleParseError(String);

impl FromStr for ModelRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(ModelRole::Chat),
            "completion" | "completions" => Ok(ModelRole::Completion),
            "embedding" | "embeddings" => Ok(ModelRole::Embedding),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

/// Composite `provider:model` identifier used by the service to address a
/// concrete model across providers.
///
/// The provider segment never contains `:`; the model segment may, so the
/// codec always splits on the first colon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalModelId(String);

impl GlobalModelId {
    /// Joins a provider id and a model name. Returns `None` unless the
    /// provider segment is present and the model name is non-empty; a
    /// partially-formed identifier never exists.
    pub fn compose(provider_id: Option<&str>, model_name: &str) -> Option<Self> {
        match provider_id {
            Some(provider) if !provider.is_empty() && !model_name.is_empty() => {
                Some(Self(format!("{provider}:{model_name}")))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for GlobalModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One role's drafted provider and model name.
///
/// Invariant: a model name is only held while a provider is selected.
/// Clearing the provider clears the model name with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSelection {
    provider_id: Option<String>,
    model_name: String,
}

impl ProviderSelection {
    /// Decomposes a stored global id into its parts. `None` yields the empty
    /// selection. An identifier without a colon is treated as a bare provider
    /// id with no model; an identifier with an empty provider segment names
    /// no provider and decomposes to the empty selection.
    pub fn from_global_id(global_id: Option<&str>) -> Self {
        let Some(id) = global_id else {
            return Self::default();
        };
        let (provider, model) = match id.split_once(':') {
            Some(parts) => parts,
            None => (id, ""),
        };
        if provider.is_empty() {
            return Self::default();
        }
        Self {
            provider_id: Some(provider.to_string()),
            model_name: model.to_string(),
        }
    }

    pub fn provider_id(&self) -> Option<&str> {
        self.provider_id.as_deref()
    }

    /// The drafted model name, verbatim. Whitespace is preserved so the user
    /// sees exactly what they typed until they correct it.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Selects a provider. Passing `None` or an empty id deselects the
    /// provider and forcibly clears the model name.
    pub fn set_provider(&mut self, provider_id: Option<String>) {
        match provider_id {
            Some(id) if !id.is_empty() => self.provider_id = Some(id),
            _ => {
                self.provider_id = None;
                self.model_name.clear();
            }
        }
    }

    pub fn set_model_name(&mut self, model_name: impl Into<String>) {
        self.model_name = model_name.into();
    }

    /// The composed global id, or `None` while the selection is incomplete.
    pub fn global_id(&self) -> Option<GlobalModelId> {
        GlobalModelId::compose(self.provider_id.as_deref(), &self.model_name)
    }

    pub fn is_empty(&self) -> bool {
        self.provider_id.is_none()
    }
}

/// Optimistic-concurrency marker issued by the configuration service.
///
/// The service currently issues epoch milliseconds, but the client only ever
/// echoes the value back on writes; it is otherwise opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LastRead(i64);

impl LastRead {
    pub fn value(self) -> i64 {
        self.0
    }

    /// Best-effort rendering of the marker as a UTC timestamp, for display
    /// only. `None` when the value is out of chrono's range.
    pub fn as_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }
}

impl fmt::Display for LastRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
impl From<i64> for LastRead {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// The configuration document as served by `GET /api/config`.
///
/// `api_keys` maps stored key names to masked placeholders; the service never
/// returns secret material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfiguration {
    pub model_provider_id: Option<String>,
    pub embeddings_provider_id: Option<String>,
    pub completions_model_provider_id: Option<String>,
    #[serde(default)]
    pub send_with_shift_enter: bool,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValues>,
    #[serde(default)]
    pub api_keys: BTreeMap<String, String>,
    pub last_read: LastRead,
}

/// A draft's complete intended configuration, before minimization.
///
/// `api_keys` holds only submissible entries; blank names and values have
/// already been filtered out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftRequest {
    pub model_provider_id: Option<String>,
    pub embeddings_provider_id: Option<String>,
    pub completions_model_provider_id: Option<String>,
    pub send_with_shift_enter: bool,
    pub fields: BTreeMap<String, FieldValues>,
    pub api_keys: BTreeMap<String, String>,
}

/// Sparse patch submitted to `POST /api/config`.
///
/// Scalar members distinguish "leave untouched" (absent) from "write null"
/// (`Some(None)`, serialized as an explicit `null`). The marker in
/// `last_read` is always present so the service can reject stale writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_provider_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings_provider_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completions_model_provider_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_with_shift_enter: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, FieldValues>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_keys: Option<BTreeMap<String, String>>,
    pub last_read: LastRead,
}

impl UpdateRequest {
    /// True when the patch carries nothing beyond the concurrency marker.
    pub fn is_noop(&self) -> bool {
        self.model_provider_id.is_none()
            && self.embeddings_provider_id.is_none()
            && self.completions_model_provider_id.is_none()
            && self.send_with_shift_enter.is_none()
            && self.fields.is_none()
            && self.api_keys.is_none()
    }
}
