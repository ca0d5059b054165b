//! In-memory draft of the user's configuration edits.
//!
//! The draft is seeded from a fetched [`ServerConfiguration`] and mutated
//! freely while the user edits. It never talks to the service; turning a
//! draft into a wire patch is the minimizer's job.

use std::collections::BTreeMap;

use crate::models::{
    DraftRequest, FieldValues, GlobalModelId, ModelRole, ProviderSelection, ServerConfiguration,
};

#[derive(Debug, Clone, Default)]
pub struct SettingsDraft {
    chat: ProviderSelection,
    completion: ProviderSelection,
    embedding: ProviderSelection,
    /// Field values keyed by global model id. May hold entries for models
    /// that are no longer selected; those stay out of the wire request until
    /// their model is selected again.
    fields: BTreeMap<String, FieldValues>,
    /// Working set of API key edits, name to plaintext value. Names the user
    /// has typed but not saved live here and nowhere else.
    api_keys: BTreeMap<String, String>,
    send_with_shift_enter: bool,
}

impl SettingsDraft {
    pub fn seeded_from(config: &ServerConfiguration) -> Self {
        let mut draft = Self::default();
        draft.seed(config);
        draft
    }

    /// Re-seeds the draft from a freshly fetched configuration. Selections
    /// and the send flag are replaced outright. Field values are copied per
    /// selected model only where the server has an entry, so a server
    /// document with no entry does not clobber drafted values.
    pub fn seed(&mut self, config: &ServerConfiguration) {
        self.chat = ProviderSelection::from_global_id(config.model_provider_id.as_deref());
        self.completion =
            ProviderSelection::from_global_id(config.completions_model_provider_id.as_deref());
        self.embedding = ProviderSelection::from_global_id(config.embeddings_provider_id.as_deref());
        self.send_with_shift_enter = config.send_with_shift_enter;
        for role in ModelRole::FIELDED {
            if let Some(id) = self.global_id(role) {
                if let Some(values) = config.fields.get(id.as_str()) {
                    self.fields.insert(id.into_string(), values.clone());
                }
            }
        }
    }

    pub fn selection(&self, role: ModelRole) -> &ProviderSelection {
        match role {
            ModelRole::Chat => &self.chat,
            ModelRole::Completion => &self.completion,
            ModelRole::Embedding => &self.embedding,
        }
    }

    fn selection_mut(&mut self, role: ModelRole) -> &mut ProviderSelection {
        match role {
            ModelRole::Chat => &mut self.chat,
            ModelRole::Completion => &mut self.completion,
            ModelRole::Embedding => &mut self.embedding,
        }
    }

    pub fn set_provider(&mut self, role: ModelRole, provider_id: Option<String>) {
        self.selection_mut(role).set_provider(provider_id);
    }

    pub fn set_model_name(&mut self, role: ModelRole, model_name: impl Into<String>) {
        self.selection_mut(role).set_model_name(model_name);
    }

    pub fn global_id(&self, role: ModelRole) -> Option<GlobalModelId> {
        self.selection(role).global_id()
    }

    /// Drafted field values for the role's currently selected model.
    pub fn fields_for(&self, role: ModelRole) -> Option<&FieldValues> {
        let id = self.global_id(role)?;
        self.fields.get(id.as_str())
    }

    /// Sets one field value for the role's selected model. Returns `false`
    /// without storing anything when the role has no complete selection.
    pub fn set_field_value(
        &mut self,
        role: ModelRole,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> bool {
        let Some(id) = self.global_id(role) else {
            return false;
        };
        self.fields
            .entry(id.into_string())
            .or_default()
            .insert(key.into(), value);
        true
    }

    /// Replaces the whole field set for the role's selected model.
    pub fn replace_fields(&mut self, role: ModelRole, values: FieldValues) -> bool {
        let Some(id) = self.global_id(role) else {
            return false;
        };
        self.fields.insert(id.into_string(), values);
        true
    }

    pub fn set_api_key(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.api_keys.insert(name.into(), value.into());
    }

    pub fn remove_api_key(&mut self, name: &str) {
        self.api_keys.remove(name);
    }

    pub fn clear_api_keys(&mut self) {
        self.api_keys.clear();
    }

    pub fn api_keys(&self) -> &BTreeMap<String, String> {
        &self.api_keys
    }

    /// The key entries that would actually be submitted: an entry survives
    /// only if neither its name nor its value is blank. Surviving values are
    /// passed through verbatim, inner whitespace and all.
    pub fn submissible_api_keys(&self) -> BTreeMap<String, String> {
        self.api_keys
            .iter()
            .filter(|(name, value)| !name.trim().is_empty() && !value.trim().is_empty())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn send_with_shift_enter(&self) -> bool {
        self.send_with_shift_enter
    }

    pub fn set_send_with_shift_enter(&mut self, enabled: bool) {
        self.send_with_shift_enter = enabled;
    }

    /// Snapshot of the draft's full intent, ready for minimization. Field
    /// entries are included only for currently selected models and only when
    /// non-empty; if chat and completion share a model they contribute one
    /// entry.
    pub fn full_request(&self) -> DraftRequest {
        let mut fields = BTreeMap::new();
        for role in ModelRole::FIELDED {
            if let Some(id) = self.global_id(role) {
                if let Some(values) = self.fields.get(id.as_str()) {
                    if !values.is_empty() {
                        fields.insert(id.into_string(), values.clone());
                    }
                }
            }
        }
        DraftRequest {
            model_provider_id: self.global_id(ModelRole::Chat).map(GlobalModelId::into_string),
            embeddings_provider_id: self
                .global_id(ModelRole::Embedding)
                .map(GlobalModelId::into_string),
            completions_model_provider_id: self
                .global_id(ModelRole::Completion)
                .map(GlobalModelId::into_string),
            send_with_shift_enter: self.send_with_shift_enter,
            fields,
            api_keys: self.submissible_api_keys(),
        }
    }
}
