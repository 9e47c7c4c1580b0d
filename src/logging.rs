use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::preview::{CommitPayload, Scope};

const LOG_DIR: &str = ".relabel";
const LOG_FILE: &str = "usage_log.jsonl";
const MAX_ENTRIES: usize = 500;

/// One recorded action. Purely observational: recording failures are
/// swallowed at call sites and never change command results.
#[derive(Debug, Serialize, Deserialize)]
pub struct UsageEntry {
    pub timestamp: String,
    pub action: String,
    pub find_text: String,
    pub replace_text: String,
    pub case_sensitive: bool,
    pub scope: Scope,
    pub renamed: usize,
}

pub fn record_action(action: &str, payload: &CommitPayload, renamed: usize) -> Result<()> {
    let log_path = ensure_log_file()?;
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".into());
    let entry = UsageEntry {
        timestamp,
        action: action.to_string(),
        find_text: payload.find_text.clone(),
        replace_text: payload.replace_text.clone(),
        case_sensitive: payload.case_sensitive,
        scope: payload.scope,
        renamed,
    };
    let json = serde_json::to_string(&entry)?;
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&log_path)
        .with_context(|| format!("opening {log_path:?}"))?;
    writeln!(file, "{json}")?;
    truncate_log(&log_path)?;
    Ok(())
}

pub fn read_recent(tail: usize) -> Result<Vec<UsageEntry>> {
    let mut entries = read_all()?;
    if entries.len() > tail {
        entries.drain(..entries.len() - tail);
    }
    Ok(entries)
}

pub fn read_all() -> Result<Vec<UsageEntry>> {
    let log_path = PathBuf::from(LOG_DIR).join(LOG_FILE);
    if !log_path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(&log_path).with_context(|| format!("opening {log_path:?}"))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        // Lines from older versions or partial writes are skipped.
        if let Ok(entry) = serde_json::from_str(&line) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn ensure_log_file() -> Result<PathBuf> {
    let dir = PathBuf::from(LOG_DIR);
    if !dir.exists() {
        fs::create_dir_all(&dir).with_context(|| format!("creating {dir:?}"))?;
    }
    Ok(dir.join(LOG_FILE))
}

fn truncate_log(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("reading {path:?}"))?;
    let reader = BufReader::new(file);
    let lines: Vec<_> = reader.lines().collect::<Result<_, _>>()?;
    if lines.len() <= MAX_ENTRIES {
        return Ok(());
    }
    let keep = &lines[lines.len() - MAX_ENTRIES..];
    fs::write(path, keep.join("\n") + "\n")?;
    Ok(())
}
