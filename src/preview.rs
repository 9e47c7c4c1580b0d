use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::matcher;
use crate::transform::{ReplaceConfig, replace_name};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, ValueEnum, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    #[serde(rename = "AllItems")]
    All,
    #[serde(rename = "SelectedItems")]
    Selected,
}

impl Scope {
    pub fn label(self) -> &'static str {
        match self {
            Scope::All => "all layers",
            Scope::Selected => "selected layers",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewEntry {
    pub original_name: String,
    pub new_name: String,
}

/// Partial configuration update; unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub find_text: Option<String>,
    pub replace_text: Option<String>,
    pub case_sensitive: Option<bool>,
    pub scope: Option<Scope>,
}

/// Snapshot of the configuration handed to the commit collaborator. Derived
/// from the configuration alone, never from the preview list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitPayload {
    pub find_text: String,
    pub replace_text: String,
    pub case_sensitive: bool,
    pub scope: Scope,
}

/// Single source of truth for "what will happen if the user commits now".
/// Owns the candidate name lists, the current find/replace configuration and
/// scope, and the derived preview. The preview is only ever rebuilt whole:
/// `set_config` is the one mutation entry point and it recomputes before
/// returning, so callers can never observe a stale or half-updated list.
#[derive(Debug)]
pub struct PreviewCoordinator {
    all_names: Vec<String>,
    selected_names: Vec<String>,
    config: ReplaceConfig,
    scope: Scope,
    preview: Vec<PreviewEntry>,
}

impl PreviewCoordinator {
    pub fn new(all_names: Vec<String>, selected_names: Vec<String>) -> Self {
        let scope = if selected_names.is_empty() {
            Scope::All
        } else {
            Scope::Selected
        };
        Self {
            all_names,
            selected_names,
            config: ReplaceConfig::default(),
            scope,
            preview: Vec::new(),
        }
    }

    /// Merges a partial update into the configuration, then synchronously
    /// rebuilds the preview.
    pub fn set_config(&mut self, update: ConfigUpdate) -> &[PreviewEntry] {
        if let Some(find_text) = update.find_text {
            self.config.matching.find_text = find_text;
        }
        if let Some(replace_text) = update.replace_text {
            self.config.replace_text = replace_text;
        }
        if let Some(case_sensitive) = update.case_sensitive {
            self.config.matching.case_sensitive = case_sensitive;
        }
        if let Some(scope) = update.scope {
            self.scope = scope;
        }
        self.recompute();
        &self.preview
    }

    pub fn preview(&self) -> &[PreviewEntry] {
        &self.preview
    }

    /// The scope the operation actually runs under: requesting the selection
    /// while none exists silently resolves to all layers.
    pub fn effective_scope(&self) -> Scope {
        if self.scope == Scope::Selected && self.selected_names.is_empty() {
            Scope::All
        } else {
            self.scope
        }
    }

    pub fn commit_payload(&self) -> CommitPayload {
        CommitPayload {
            find_text: self.config.matching.find_text.clone(),
            replace_text: self.config.replace_text.clone(),
            case_sensitive: self.config.matching.case_sensitive,
            scope: self.effective_scope(),
        }
    }

    fn recompute(&mut self) {
        let candidates = match self.effective_scope() {
            Scope::All => &self.all_names,
            Scope::Selected => &self.selected_names,
        };
        let mut fresh = Vec::new();
        for name in candidates {
            if matcher::matches(name, &self.config.matching) {
                fresh.push(PreviewEntry {
                    original_name: name.clone(),
                    new_name: replace_name(name, &self.config),
                });
            }
        }
        self.preview = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn pairs(preview: &[PreviewEntry]) -> Vec<(&str, &str)> {
        preview
            .iter()
            .map(|entry| (entry.original_name.as_str(), entry.new_name.as_str()))
            .collect()
    }

    #[test]
    fn insensitive_preview_in_candidate_order() {
        let mut coordinator =
            PreviewCoordinator::new(names(&["Button", "button_bg", "Icon"]), Vec::new());
        let preview = coordinator.set_config(ConfigUpdate {
            find_text: Some("button".into()),
            replace_text: Some("btn".into()),
            case_sensitive: Some(false),
            ..ConfigUpdate::default()
        });
        assert_eq!(pairs(preview), vec![("Button", "btn"), ("button_bg", "btn_bg")]);
    }

    #[test]
    fn sensitive_preview_excludes_wrong_case() {
        let mut coordinator =
            PreviewCoordinator::new(names(&["Button", "button_bg", "Icon"]), Vec::new());
        let preview = coordinator.set_config(ConfigUpdate {
            find_text: Some("button".into()),
            replace_text: Some("btn".into()),
            case_sensitive: Some(true),
            ..ConfigUpdate::default()
        });
        assert_eq!(pairs(preview), vec![("button_bg", "btn_bg")]);
    }

    #[test]
    fn clearing_find_text_empties_preview() {
        let mut coordinator = PreviewCoordinator::new(names(&["Button", "Icon"]), Vec::new());
        coordinator.set_config(ConfigUpdate {
            find_text: Some("Button".into()),
            ..ConfigUpdate::default()
        });
        assert_eq!(coordinator.preview().len(), 1);
        let preview = coordinator.set_config(ConfigUpdate {
            find_text: Some(String::new()),
            ..ConfigUpdate::default()
        });
        assert!(preview.is_empty());
    }

    #[test]
    fn scope_switch_drops_stale_entries() {
        let mut coordinator = PreviewCoordinator::new(
            names(&["header", "footer", "sidebar"]),
            names(&["footer"]),
        );
        coordinator.set_config(ConfigUpdate {
            find_text: Some("er".into()),
            scope: Some(Scope::All),
            ..ConfigUpdate::default()
        });
        assert_eq!(coordinator.preview().len(), 2);
        let preview = coordinator.set_config(ConfigUpdate {
            scope: Some(Scope::Selected),
            ..ConfigUpdate::default()
        });
        assert_eq!(pairs(preview), vec![("footer", "foot")]);
    }

    #[test]
    fn empty_selection_falls_back_to_all_layers() {
        let mut all_scope = PreviewCoordinator::new(names(&["Button", "button_bg"]), Vec::new());
        let mut selected_scope =
            PreviewCoordinator::new(names(&["Button", "button_bg"]), Vec::new());
        let update = ConfigUpdate {
            find_text: Some("button".into()),
            replace_text: Some("btn".into()),
            case_sensitive: Some(false),
            ..ConfigUpdate::default()
        };
        all_scope.set_config(ConfigUpdate {
            scope: Some(Scope::All),
            ..update.clone()
        });
        selected_scope.set_config(ConfigUpdate {
            scope: Some(Scope::Selected),
            ..update
        });
        assert_eq!(all_scope.preview(), selected_scope.preview());
        assert_eq!(selected_scope.effective_scope(), Scope::All);
    }

    #[test]
    fn initial_scope_follows_selection() {
        let with_selection =
            PreviewCoordinator::new(names(&["a", "b"]), names(&["b"]));
        assert_eq!(with_selection.effective_scope(), Scope::Selected);
        let without_selection = PreviewCoordinator::new(names(&["a", "b"]), Vec::new());
        assert_eq!(without_selection.effective_scope(), Scope::All);
    }

    #[test]
    fn commit_payload_snapshots_configuration() {
        let mut coordinator = PreviewCoordinator::new(names(&["Button"]), Vec::new());
        coordinator.set_config(ConfigUpdate {
            find_text: Some("button".into()),
            replace_text: Some("btn".into()),
            case_sensitive: Some(false),
            scope: Some(Scope::All),
        });
        let payload = coordinator.commit_payload();
        let wire = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            wire,
            serde_json::json!({
                "findText": "button",
                "replaceText": "btn",
                "caseSensitive": false,
                "scope": "AllItems"
            })
        );
    }

    #[test]
    fn payload_scope_reflects_fallback() {
        let mut coordinator = PreviewCoordinator::new(names(&["Button"]), Vec::new());
        coordinator.set_config(ConfigUpdate {
            scope: Some(Scope::Selected),
            ..ConfigUpdate::default()
        });
        assert_eq!(coordinator.commit_payload().scope, Scope::All);
    }
}
