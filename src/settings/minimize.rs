//! Reduction of a full draft to the smallest wire patch.
//!
//! Anything equal to the server's copy stays off the wire; what remains is
//! exactly the set of members the server must change, plus the concurrency
//! marker it must check.

use std::collections::BTreeMap;

use crate::models::{DraftRequest, FieldValues, ServerConfiguration, UpdateRequest};

/// Diffs the draft's full intent against the server document last read.
///
/// Scalar members are included only when they differ, with `Some(None)`
/// encoding an explicit clear. Field entries are included per model and only
/// when they differ from the server's entry. Submissible API keys are always
/// included when any exist, since the server stores secrets it never echoes
/// back for comparison. `last_read` is stamped unconditionally.
pub fn minimize(server: &ServerConfiguration, draft: DraftRequest) -> UpdateRequest {
    let DraftRequest {
        model_provider_id,
        embeddings_provider_id,
        completions_model_provider_id,
        send_with_shift_enter,
        fields,
        api_keys,
    } = draft;
    UpdateRequest {
        model_provider_id: diff_scalar(&server.model_provider_id, model_provider_id),
        embeddings_provider_id: diff_scalar(&server.embeddings_provider_id, embeddings_provider_id),
        completions_model_provider_id: diff_scalar(
            &server.completions_model_provider_id,
            completions_model_provider_id,
        ),
        send_with_shift_enter: (server.send_with_shift_enter != send_with_shift_enter)
            .then_some(send_with_shift_enter),
        fields: diff_fields(&server.fields, fields),
        api_keys: (!api_keys.is_empty()).then_some(api_keys),
        last_read: server.last_read,
    }
}

fn diff_scalar(server: &Option<String>, draft: Option<String>) -> Option<Option<String>> {
    if *server == draft {
        None
    } else {
        Some(draft)
    }
}

fn diff_fields(
    server: &BTreeMap<String, FieldValues>,
    draft: BTreeMap<String, FieldValues>,
) -> Option<BTreeMap<String, FieldValues>> {
    let changed: BTreeMap<String, FieldValues> = draft
        .into_iter()
        .filter(|(id, values)| !values.is_empty() && server.get(id) != Some(values))
        .collect();
    (!changed.is_empty()).then_some(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LastRead, ModelRole};
    use crate::settings::draft::SettingsDraft;
    use proptest::prelude::*;
    use serde_json::json;

    fn server_config() -> ServerConfiguration {
        serde_json::from_value(json!({
            "model_provider_id": "openai:gpt-4",
            "embeddings_provider_id": "cohere:embed-english-v3.0",
            "completions_model_provider_id": "openai:gpt-4",
            "send_with_shift_enter": false,
            "fields": {
                "openai:gpt-4": { "base_url": "https://api.openai.com/v1" },
                "anthropic:claude-3": { "max_tokens": 4096 }
            },
            "api_keys": { "OPENAI_API_KEY": "****" },
            "last_read": 1_700_000_000_000_i64
        }))
        .unwrap()
    }

    #[test]
    fn untouched_draft_minimizes_to_marker_only() {
        let server = server_config();
        let draft = SettingsDraft::seeded_from(&server);
        let patch = minimize(&server, draft.full_request());
        assert!(patch.is_noop());
        assert_eq!(patch.last_read, server.last_read);
    }

    #[test]
    fn renaming_one_model_touches_one_member() {
        let server = server_config();
        let mut draft = SettingsDraft::seeded_from(&server);
        draft.set_model_name(ModelRole::Chat, "gpt-4o");

        let patch = minimize(&server, draft.full_request());
        assert_eq!(
            patch.model_provider_id,
            Some(Some("openai:gpt-4o".to_string()))
        );
        assert_eq!(patch.completions_model_provider_id, None);
        assert_eq!(patch.embeddings_provider_id, None);
        assert_eq!(patch.send_with_shift_enter, None);
        assert_eq!(patch.api_keys, None);
        // No fields member either: the renamed model has no drafted fields
        // yet, and the completion role's entry still matches the server.
        assert_eq!(patch.fields, None);
    }

    #[test]
    fn clearing_a_selection_writes_an_explicit_null() {
        let server = server_config();
        let mut draft = SettingsDraft::seeded_from(&server);
        draft.set_provider(ModelRole::Embedding, None);

        let patch = minimize(&server, draft.full_request());
        assert_eq!(patch.embeddings_provider_id, Some(None));
        assert_eq!(patch.model_provider_id, None);
    }

    #[test]
    fn flag_flip_is_a_one_member_patch() {
        let server = server_config();
        let mut draft = SettingsDraft::seeded_from(&server);
        draft.set_send_with_shift_enter(true);

        let patch = minimize(&server, draft.full_request());
        assert_eq!(patch.send_with_shift_enter, Some(true));
        assert_eq!(patch.model_provider_id, None);
        assert_eq!(patch.fields, None);
    }

    #[test]
    fn only_changed_field_entries_are_sent() {
        let server = server_config();
        let mut draft = SettingsDraft::seeded_from(&server);
        draft.set_field_value(ModelRole::Chat, "base_url", json!("http://localhost:8080"));

        let patch = minimize(&server, draft.full_request());
        let fields = patch.fields.unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(
            fields["openai:gpt-4"]["base_url"],
            json!("http://localhost:8080")
        );
    }

    #[test]
    fn api_keys_are_sent_whenever_any_survive_filtering() {
        let server = server_config();
        let mut draft = SettingsDraft::seeded_from(&server);
        // Same name as an already-stored key: still sent, the server never
        // echoes secrets back so there is nothing to compare against.
        draft.set_api_key("OPENAI_API_KEY", "sk-rotated");

        let patch = minimize(&server, draft.full_request());
        assert_eq!(
            patch.api_keys,
            Some(BTreeMap::from([(
                "OPENAI_API_KEY".to_string(),
                "sk-rotated".to_string()
            )]))
        );
    }

    #[test]
    fn marker_is_stamped_even_on_noop_patches() {
        let server = server_config();
        let draft = SettingsDraft::seeded_from(&server);
        let patch = minimize(&server, draft.full_request());
        assert_eq!(patch.last_read.value(), 1_700_000_000_000);
    }

    // Reference semantics for the equivalence law below: the server applies
    // a patch by replacing exactly the members present in it.
    fn apply_patch(server: &ServerConfiguration, patch: &UpdateRequest) -> ServerConfiguration {
        let mut next = server.clone();
        if let Some(value) = &patch.model_provider_id {
            next.model_provider_id = value.clone();
        }
        if let Some(value) = &patch.embeddings_provider_id {
            next.embeddings_provider_id = value.clone();
        }
        if let Some(value) = &patch.completions_model_provider_id {
            next.completions_model_provider_id = value.clone();
        }
        if let Some(value) = patch.send_with_shift_enter {
            next.send_with_shift_enter = value;
        }
        if let Some(fields) = &patch.fields {
            for (id, values) in fields {
                next.fields.insert(id.clone(), values.clone());
            }
        }
        if let Some(keys) = &patch.api_keys {
            for (name, value) in keys {
                next.api_keys.insert(name.clone(), value.clone());
            }
        }
        next
    }

    fn apply_draft(server: &ServerConfiguration, draft: &DraftRequest) -> ServerConfiguration {
        let mut next = server.clone();
        next.model_provider_id = draft.model_provider_id.clone();
        next.embeddings_provider_id = draft.embeddings_provider_id.clone();
        next.completions_model_provider_id = draft.completions_model_provider_id.clone();
        next.send_with_shift_enter = draft.send_with_shift_enter;
        for (id, values) in &draft.fields {
            next.fields.insert(id.clone(), values.clone());
        }
        for (name, value) in &draft.api_keys {
            next.api_keys.insert(name.clone(), value.clone());
        }
        next
    }

    fn global_id() -> impl Strategy<Value = String> {
        ("[a-z]{2,6}", "[a-z0-9.-]{1,8}").prop_map(|(p, m)| format!("{p}:{m}"))
    }

    fn json_leaf() -> impl Strategy<Value = serde_json::Value> {
        prop_oneof![
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i32>().prop_map(serde_json::Value::from),
            "[a-z ]{0,8}".prop_map(serde_json::Value::from),
        ]
    }

    fn field_values() -> impl Strategy<Value = FieldValues> {
        proptest::collection::btree_map("[a-z_]{1,6}", json_leaf(), 0..3)
    }

    fn arb_server() -> impl Strategy<Value = ServerConfiguration> {
        (
            proptest::option::of(global_id()),
            proptest::option::of(global_id()),
            proptest::option::of(global_id()),
            any::<bool>(),
            proptest::collection::btree_map(global_id(), field_values(), 0..3),
            proptest::collection::btree_map("[A-Z_]{3,8}", "[a-z0-9]{1,8}", 0..3),
            1_600_000_000_000_i64..1_800_000_000_000_i64,
        )
            .prop_map(|(chat, embed, completion, send, fields, keys, marker)| {
                ServerConfiguration {
                    model_provider_id: chat,
                    embeddings_provider_id: embed,
                    completions_model_provider_id: completion,
                    send_with_shift_enter: send,
                    fields,
                    api_keys: keys,
                    last_read: LastRead::from(marker),
                }
            })
    }

    #[derive(Debug, Clone)]
    enum Edit {
        Provider(ModelRole, Option<String>),
        Model(ModelRole, String),
        Field(ModelRole, String, serde_json::Value),
        ApiKey(String, String),
        Send(bool),
    }

    fn arb_role() -> impl Strategy<Value = ModelRole> {
        prop_oneof![
            Just(ModelRole::Chat),
            Just(ModelRole::Completion),
            Just(ModelRole::Embedding),
        ]
    }

    fn arb_edit() -> impl Strategy<Value = Edit> {
        prop_oneof![
            (arb_role(), proptest::option::of("[a-z]{2,6}"))
                .prop_map(|(role, provider)| Edit::Provider(role, provider)),
            (arb_role(), "[a-z0-9.-]{0,8}").prop_map(|(role, model)| Edit::Model(role, model)),
            (arb_role(), "[a-z_]{1,6}", json_leaf())
                .prop_map(|(role, key, value)| Edit::Field(role, key, value)),
            ("[A-Z_]{3,8}", "[ a-z0-9-]{0,10}").prop_map(|(name, value)| Edit::ApiKey(name, value)),
            any::<bool>().prop_map(Edit::Send),
        ]
    }

    proptest! {
        // Sending the minimized patch must leave the server in the same
        // state as sending the full draft would have.
        #[test]
        fn minimized_patch_is_equivalent_to_the_full_draft(
            server in arb_server(),
            edits in proptest::collection::vec(arb_edit(), 0..12),
        ) {
            let mut draft = SettingsDraft::seeded_from(&server);
            for edit in edits {
                match edit {
                    Edit::Provider(role, provider) => draft.set_provider(role, provider),
                    Edit::Model(role, model) => draft.set_model_name(role, model),
                    Edit::Field(role, key, value) => {
                        draft.set_field_value(role, key, value);
                    }
                    Edit::ApiKey(name, value) => draft.set_api_key(name, value),
                    Edit::Send(enabled) => draft.set_send_with_shift_enter(enabled),
                }
            }
            let full = draft.full_request();
            let patch = minimize(&server, full.clone());
            prop_assert_eq!(apply_patch(&server, &patch), apply_draft(&server, &full));
        }

        // Minimizing a just-seeded draft can never produce wire traffic
        // beyond the concurrency marker.
        #[test]
        fn seeding_then_minimizing_is_a_noop(server in arb_server()) {
            let draft = SettingsDraft::seeded_from(&server);
            let patch = minimize(&server, draft.full_request());
            prop_assert!(patch.is_noop());
        }
    }
}
