use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::matcher::{self, MatchConfig};
use crate::preview::{CommitPayload, Scope};
use crate::transform::{ReplaceConfig, replace_name};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub selection: Vec<String>,
}

impl Document {
    /// Layers referenced by the selection, in document order. Selection ids
    /// that no longer resolve to a layer are ignored.
    pub fn selected_layers(&self) -> Vec<&Layer> {
        let selected: HashSet<&str> = self.selection.iter().map(String::as_str).collect();
        self.layers
            .iter()
            .filter(|layer| selected.contains(layer.id.as_str()))
            .collect()
    }

    /// Performs the rename the payload describes, rewriting matching layer
    /// names in place. The payload alone drives the commit; the preview list
    /// is never consulted. Returns the number of layers renamed.
    pub fn apply_renames(&mut self, payload: &CommitPayload) -> usize {
        let config = ReplaceConfig {
            matching: MatchConfig {
                find_text: payload.find_text.clone(),
                case_sensitive: payload.case_sensitive,
            },
            replace_text: payload.replace_text.clone(),
        };
        let selected: HashSet<&str> = self.selection.iter().map(String::as_str).collect();
        // Same degradation rule as the preview: an empty selection widens
        // the selected scope to the whole document.
        let restrict = payload.scope == Scope::Selected && !selected.is_empty();

        let mut renamed = 0;
        for layer in &mut self.layers {
            if restrict && !selected.contains(layer.id.as_str()) {
                continue;
            }
            if matcher::matches(&layer.name, &config.matching) {
                layer.name = replace_name(&layer.name, &config);
                renamed += 1;
            }
        }
        renamed
    }
}

pub fn load_document(path: &Path) -> Result<Document> {
    let data = fs::read(path).with_context(|| format!("reading document {}", path.display()))?;
    if is_yaml_path(path) {
        serde_yaml::from_slice(&data)
            .with_context(|| format!("parsing YAML document {}", path.display()))
    } else {
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing JSON document {}", path.display()))
    }
}

pub fn save_document(document: &Document, path: &Path, no_backup: bool) -> Result<Option<PathBuf>> {
    let serialized = if is_yaml_path(path) {
        serde_yaml::to_string(document).context("serializing document as YAML")?
    } else {
        let mut text =
            serde_json::to_string_pretty(document).context("serializing document as JSON")?;
        text.push('\n');
        text
    };
    let backup = create_backup_if_needed(path, no_backup)?;
    write_via_temp(path, serialized.as_bytes())
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(backup)
}

fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

fn create_backup_if_needed(path: &Path, no_backup: bool) -> Result<Option<PathBuf>> {
    if no_backup || !path.exists() {
        return Ok(None);
    }

    let mut attempt = 0usize;
    loop {
        let candidate = backup_candidate(path, attempt);
        if !candidate.exists() {
            fs::copy(path, &candidate)
                .with_context(|| format!("creating backup {}", candidate.display()))?;
            return Ok(Some(candidate));
        }
        attempt += 1;
    }
}

fn backup_candidate(path: &Path, index: usize) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("relabel_document");
    let suffix = if index == 0 {
        ".bak".to_string()
    } else {
        format!(".bak{index}")
    };
    path.with_file_name(format!("{name}{suffix}"))
}

fn write_via_temp(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = parent {
        fs::create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))?;
    }
    let base_dir = parent.unwrap_or_else(|| Path::new("."));
    let unique = format!(
        ".relabel-tmp-{}-{}",
        std::process::id(),
        OffsetDateTime::now_utc().unix_timestamp_nanos()
    );
    let temp_path = base_dir.join(unique);
    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("creating temp file {}", temp_path.display()))?;
        file.write_all(data)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("syncing temp file {}", temp_path.display()))?;
    }
    fs::rename(&temp_path, path).or_else(|err| {
        let _ = fs::remove_file(&temp_path);
        Err(err).with_context(|| format!("replacing {}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Document {
        Document {
            layers: vec![
                Layer {
                    id: "l1".into(),
                    name: "Button".into(),
                },
                Layer {
                    id: "l2".into(),
                    name: "button_bg".into(),
                },
                Layer {
                    id: "l3".into(),
                    name: "Icon".into(),
                },
            ],
            selection: vec!["l2".into()],
        }
    }

    fn payload(find: &str, replace: &str, case_sensitive: bool, scope: Scope) -> CommitPayload {
        CommitPayload {
            find_text: find.to_string(),
            replace_text: replace.to_string(),
            case_sensitive,
            scope,
        }
    }

    #[test]
    fn selected_layers_keep_document_order() {
        let mut doc = document();
        doc.selection = vec!["l3".into(), "l1".into(), "missing".into()];
        let names: Vec<&str> = doc
            .selected_layers()
            .iter()
            .map(|layer| layer.name.as_str())
            .collect();
        assert_eq!(names, vec!["Button", "Icon"]);
    }

    #[test]
    fn apply_renames_all_scope() {
        let mut doc = document();
        let renamed = doc.apply_renames(&payload("button", "btn", false, Scope::All));
        assert_eq!(renamed, 2);
        let names: Vec<&str> = doc.layers.iter().map(|layer| layer.name.as_str()).collect();
        assert_eq!(names, vec!["btn", "btn_bg", "Icon"]);
    }

    #[test]
    fn apply_renames_respects_selected_scope() {
        let mut doc = document();
        let renamed = doc.apply_renames(&payload("button", "btn", false, Scope::Selected));
        assert_eq!(renamed, 1);
        let names: Vec<&str> = doc.layers.iter().map(|layer| layer.name.as_str()).collect();
        assert_eq!(names, vec!["Button", "btn_bg", "Icon"]);
    }

    #[test]
    fn selected_scope_with_empty_selection_renames_everything() {
        let mut doc = document();
        doc.selection.clear();
        let renamed = doc.apply_renames(&payload("button", "btn", false, Scope::Selected));
        assert_eq!(renamed, 2);
    }

    #[test]
    fn case_sensitive_commit_skips_wrong_case() {
        let mut doc = document();
        let renamed = doc.apply_renames(&payload("button", "btn", true, Scope::All));
        assert_eq!(renamed, 1);
        assert_eq!(doc.layers[0].name, "Button");
        assert_eq!(doc.layers[1].name, "btn_bg");
    }

    #[test]
    fn load_json_and_yaml_documents() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("doc.json");
        fs::write(
            &json_path,
            r#"{"layers": [{"id": "a", "name": "Button"}], "selection": []}"#,
        )
        .unwrap();
        let from_json = load_document(&json_path).unwrap();
        assert_eq!(from_json.layers[0].name, "Button");

        let yaml_path = dir.path().join("doc.yaml");
        fs::write(&yaml_path, "layers:\n  - id: a\n    name: Button\n").unwrap();
        let from_yaml = load_document(&yaml_path).unwrap();
        assert_eq!(from_yaml.layers[0].name, "Button");
        assert!(from_yaml.selection.is_empty());
    }

    #[test]
    fn save_creates_backup_and_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let mut doc = document();
        save_document(&doc, &path, true).unwrap();

        doc.apply_renames(&payload("button", "btn", false, Scope::All));
        let backup = save_document(&doc, &path, false).unwrap();
        assert_eq!(backup, Some(dir.path().join("doc.json.bak")));

        let reloaded = load_document(&path).unwrap();
        assert_eq!(reloaded.layers[0].name, "btn");
        let original = load_document(&dir.path().join("doc.json.bak")).unwrap();
        assert_eq!(original.layers[0].name, "Button");
    }

    #[test]
    fn save_without_backup_leaves_no_bak_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let doc = document();
        save_document(&doc, &path, true).unwrap();
        let backup = save_document(&doc, &path, true).unwrap();
        assert!(backup.is_none());
        assert!(!dir.path().join("doc.json.bak").exists());
    }
}
