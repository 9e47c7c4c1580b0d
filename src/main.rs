use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use arboard::Clipboard;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use is_terminal::IsTerminal;
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

mod document;
mod logging;
mod matcher;
mod preview;
mod transform;

use preview::{CommitPayload, ConfigUpdate, PreviewCoordinator, PreviewEntry, Scope};

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, Default)]
enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn should_color(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Replace(cmd) => handle_replace(cmd)?,
        Command::Log(cmd) => handle_log(cmd)?,
        Command::Report(cmd) => handle_report(cmd)?,
    }
    Ok(())
}

fn handle_replace(cmd: ReplaceCommand) -> Result<()> {
    let colorize = cmd.color.should_color();
    let mut document = document::load_document(&cmd.document)?;
    let (replace_text, replacement_source) = resolve_replacement_text(&cmd)?;

    let all_names: Vec<String> = document
        .layers
        .iter()
        .map(|layer| layer.name.clone())
        .collect();
    let selected_names: Vec<String> = document
        .selected_layers()
        .iter()
        .map(|layer| layer.name.clone())
        .collect();

    let mut coordinator = PreviewCoordinator::new(all_names, selected_names);
    coordinator.set_config(ConfigUpdate {
        find_text: Some(cmd.find.clone()),
        replace_text: Some(replace_text),
        case_sensitive: Some(cmd.case_sensitive),
        scope: cmd.scope,
    });
    let payload = coordinator.commit_payload();
    print_command_summary(&cmd, &document, &payload, replacement_source);

    let preview = coordinator.preview();
    if preview.is_empty() {
        println!("no layers match '{}'; nothing to do.", payload.find_text);
        log_action(&cmd, "no-op", &payload, 0, preview);
        return Ok(());
    }

    println!("--- preview: {} layer(s) ---", preview.len());
    for entry in preview {
        println!("{}", format_preview_row(entry, colorize));
    }

    if !cmd.apply {
        println!("dry-run: rerun with --apply to rename these layers.");
        log_action(&cmd, "dry-run", &payload, preview.len(), preview);
        return Ok(());
    }

    let decision = if cmd.auto_apply {
        ApprovalDecision::Apply
    } else {
        prompt_approval(preview.len(), &cmd.document)?
    };

    match decision {
        ApprovalDecision::Apply => {
            let renamed = document.apply_renames(&payload);
            let backup = document::save_document(&document, &cmd.document, cmd.no_backup)?;
            if let Some(bak) = backup {
                println!(
                    "backup saved: {} -> {}",
                    cmd.document.display(),
                    bak.display()
                );
            }
            println!("renamed {renamed} layer(s) in {}", cmd.document.display());
            log_action(&cmd, "submit", &payload, renamed, preview);
        }
        ApprovalDecision::Skip => {
            println!("skipped {}", cmd.document.display());
            log_action(&cmd, "skipped", &payload, 0, preview);
        }
    }
    Ok(())
}

fn handle_log(cmd: LogCommand) -> Result<()> {
    let entries = logging::read_recent(cmd.tail)?;
    if entries.is_empty() {
        println!("usage log is empty.");
        return Ok(());
    }
    for entry in entries {
        println!(
            "[{}] {:<8} find='{}' replace='{}' case-sensitive={} scope={} renamed={}",
            entry.timestamp,
            entry.action,
            entry.find_text,
            entry.replace_text,
            entry.case_sensitive,
            entry.scope.label(),
            entry.renamed
        );
    }
    Ok(())
}

fn handle_report(cmd: ReportCommand) -> Result<()> {
    let entries = logging::read_all()?;
    if entries.is_empty() {
        println!("usage log is empty.");
        return Ok(());
    }
    let since = if let Some(ref raw) = cmd.since {
        let parsed = OffsetDateTime::parse(raw, &Rfc3339)
            .with_context(|| format!("parsing --since '{raw}' as RFC3339 timestamp"))?;
        Some(parsed)
    } else {
        None
    };
    let report_format = ReportFormat::from_str(&cmd.format)?;

    let mut filtered = Vec::new();
    for entry in entries {
        let Ok(ts) = OffsetDateTime::parse(&entry.timestamp, &Rfc3339) else {
            continue;
        };
        if since.is_none_or(|min| ts >= min) {
            filtered.push(entry);
        }
    }
    if filtered.is_empty() {
        println!("no log entries match the requested window.");
        return Ok(());
    }

    let mut summary: BTreeMap<String, usize> = BTreeMap::new();
    for entry in &filtered {
        *summary.entry(entry.action.clone()).or_default() += 1;
    }
    match report_format {
        ReportFormat::Table => {
            println!(
                "Report entries: {} (since {})",
                filtered.len(),
                cmd.since.as_deref().unwrap_or("beginning of log")
            );
            for (action, count) in summary {
                println!("{action:<10} {count}");
            }
        }
        ReportFormat::Json => {
            let rows: Vec<_> = summary
                .into_iter()
                .map(|(action, count)| {
                    json!({
                        "action": action,
                        "count": count
                    })
                })
                .collect();
            println!("{}", serde_json::to_string(&rows)?);
        }
    }
    Ok(())
}

fn resolve_replacement_text(cmd: &ReplaceCommand) -> Result<(String, &'static str)> {
    if let Some(text) = &cmd.replacement {
        return Ok((text.clone(), "literal"));
    }
    if cmd.with_stdin {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("reading replacement text from stdin")?;
        return Ok((buf, "stdin"));
    }
    if cmd.with_clipboard {
        let mut clipboard = Clipboard::new().context("opening clipboard")?;
        let text = clipboard
            .get_text()
            .context("reading clipboard text for replacement")?;
        return Ok((text, "clipboard"));
    }
    bail!("replacement text required; use --with, --with-stdin, or --with-clipboard");
}

fn print_command_summary(
    cmd: &ReplaceCommand,
    document: &document::Document,
    payload: &CommitPayload,
    replacement_source: &str,
) {
    println!("command: replace");
    println!(
        "mode: {}{}",
        if cmd.apply { "apply" } else { "dry-run" },
        if cmd.auto_apply {
            " (auto-approve)"
        } else {
            ""
        }
    );
    println!(
        "document: {} ({} layers, {} selected)",
        cmd.document.display(),
        document.layers.len(),
        document.selected_layers().len()
    );
    println!("find: '{}'", payload.find_text);
    println!(
        "replace: '{}' (source: {replacement_source})",
        payload.replace_text
    );
    println!("case sensitive: {}", payload.case_sensitive);
    println!("scope: {}", payload.scope.label());
    println!("json output: {}", cmd.json);
    if cmd.no_backup {
        println!("backups disabled");
    }
    println!("---");
}

fn format_preview_row(entry: &PreviewEntry, colorize: bool) -> String {
    if colorize {
        format!(
            "  \x1b[31m{}\x1b[0m -> \x1b[32m{}\x1b[0m",
            entry.original_name, entry.new_name
        )
    } else {
        format!("  {} -> {}", entry.original_name, entry.new_name)
    }
}

fn log_action(
    cmd: &ReplaceCommand,
    action: &str,
    payload: &CommitPayload,
    renamed: usize,
    preview: &[PreviewEntry],
) {
    let _ = logging::record_action(action, payload, renamed);
    emit_json_event(cmd.json, action, payload, renamed, preview);
}

fn emit_json_event(
    enabled: bool,
    action: &str,
    payload: &CommitPayload,
    renamed: usize,
    preview: &[PreviewEntry],
) {
    if !enabled {
        return;
    }
    let mut event = JsonMap::new();
    event.insert("command".into(), JsonValue::String("replace".into()));
    event.insert("action".into(), JsonValue::String(action.to_string()));
    if let Ok(JsonValue::Object(fields)) = serde_json::to_value(payload) {
        for (key, value) in fields {
            event.insert(key, value);
        }
    }
    event.insert("renamed".into(), json!(renamed));
    event.insert("preview".into(), preview_to_json(preview));
    println!("{}", JsonValue::Object(event));
}

fn preview_to_json(preview: &[PreviewEntry]) -> JsonValue {
    JsonValue::Array(
        preview
            .iter()
            .map(|entry| {
                json!({
                    "originalName": entry.original_name,
                    "newName": entry.new_name
                })
            })
            .collect(),
    )
}

#[derive(Debug, Clone, Copy)]
enum ApprovalDecision {
    Apply,
    Skip,
}

fn prompt_approval(count: usize, document: &Path) -> Result<ApprovalDecision> {
    loop {
        print_prompt(&format!(
            "Rename {count} layer(s) in {}? [y]es/[n]o: ",
            document.display()
        ))?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" | "" => return Ok(ApprovalDecision::Apply),
            "n" | "no" => return Ok(ApprovalDecision::Skip),
            _ => {
                println!("Please enter y or n.");
            }
        }
    }
}

fn print_prompt(message: &str) -> Result<()> {
    print!("{message}");
    io::stdout().flush()?;
    Ok(())
}

#[derive(Clone, Copy)]
enum ReportFormat {
    Table,
    Json,
}

impl ReportFormat {
    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(anyhow!(
                "unsupported report format '{other}' (expected table or json)"
            )),
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "relabel",
    version,
    about = "Batch find/replace renamer for design-document layers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Replace(ReplaceCommand),
    Log(LogCommand),
    Report(ReportCommand),
}

#[derive(Debug, Args)]
struct ReplaceCommand {
    #[arg(long = "document", value_name = "FILE", value_hint = ValueHint::FilePath)]
    document: PathBuf,
    #[arg(long, value_name = "TEXT")]
    find: String,
    #[arg(
        long = "with",
        value_name = "TEXT",
        conflicts_with_all = ["with_stdin", "with_clipboard"],
        required_unless_present_any = ["with_stdin", "with_clipboard"]
    )]
    replacement: Option<String>,
    #[arg(long = "with-stdin", action = ArgAction::SetTrue, conflicts_with = "with_clipboard")]
    with_stdin: bool,
    #[arg(long = "with-clipboard", action = ArgAction::SetTrue, conflicts_with = "with_stdin")]
    with_clipboard: bool,
    #[arg(long = "case-sensitive", action = ArgAction::SetTrue)]
    case_sensitive: bool,
    #[arg(long = "scope", value_enum)]
    scope: Option<Scope>,
    #[arg(long, action = ArgAction::SetTrue)]
    apply: bool,
    #[arg(long = "yes", action = ArgAction::SetTrue)]
    auto_apply: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
    #[arg(long = "no-backup", action = ArgAction::SetTrue)]
    no_backup: bool,
    #[arg(long = "color", value_enum, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Debug, Args)]
struct LogCommand {
    #[arg(long = "tail", default_value_t = 20)]
    tail: usize,
}

#[derive(Debug, Args)]
struct ReportCommand {
    #[arg(long = "since", value_name = "RFC3339")]
    since: Option<String>,
    #[arg(long = "format", default_value = "table")]
    format: String,
}
