use crate::cache::{ArtifactRecord, ArtifactSummary, CacheEntry, PropertyValue};
use crate::error::{BridgeError, UserFriendlyError};
use crate::pipeline::{Operation, OutcomeStatus, PipelineReport};
use console::{style, Emoji, Term};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static PACKAGE: Emoji = Emoji("📦 ", "* ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    /// Warnings are shown even in quiet mode: they mean the output file
    /// lacks the RizomUV data the user asked for.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Warning, message),
            OutputMode::Json => self.print_json_message("warning", message),
            OutputMode::Plain => println!("WARNING: {}", message),
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &BridgeError) {
        self.error(&error.user_message());

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!("{}{}", INFO, style(format!("Suggestion: {}", suggestion)).cyan());
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => eprintln!("SUGGESTION: {}", suggestion),
            }
        }
    }

    pub fn print_pipeline_report(&self, report: &PipelineReport) {
        match self.mode {
            OutputMode::Human => self.print_human_report(report),
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Plain => print_plain_report(report),
        }
    }

    pub fn print_cache_listing(&self, directory: &Path, entries: &[CacheEntry]) {
        match self.mode {
            OutputMode::Human => {
                if entries.is_empty() {
                    self.print_human_message(
                        MessageType::Info,
                        &format!("No caches in {}", directory.display()),
                    );
                    return;
                }

                self.print_header(&format!("Caches in {}", directory.display()));
                for (index, entry) in entries.iter().enumerate() {
                    let label = entry.display_label();
                    if self.use_colors {
                        println!(
                            "  {:>3}. {}  {}",
                            index + 1,
                            style(label).cyan().bold(),
                            style(entry.file_name()).dim()
                        );
                    } else {
                        println!("  {:>3}. {}  {}", index + 1, label, entry.file_name());
                    }
                }
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "cache_list",
                    "directory": directory,
                    "entries": entries,
                }));
            }
            OutputMode::Plain => {
                for entry in entries {
                    println!(
                        "{}\t{}\t{}",
                        entry.source_file_name(),
                        entry.size_bytes,
                        entry.artifact_path.display()
                    );
                }
            }
        }
    }

    pub fn print_path(&self, path: &Path) {
        match self.mode {
            OutputMode::Json => self.print_json_object(&serde_json::json!({ "path": path })),
            _ => println!("{}", path.display()),
        }
    }

    pub fn print_artifact(&self, entry: &CacheEntry, records: &[ArtifactRecord]) {
        let summary = ArtifactSummary::from_records(records);
        match self.mode {
            OutputMode::Human => {
                self.print_header(&entry.display_label());
                println!("Artifact:            {}", entry.artifact_path.display());
                println!("Size:                {}", format_bytes(entry.size_bytes));
                println!("Document properties: {}", summary.document_properties);
                println!("Mesh properties:     {}", summary.mesh_properties);
                println!(
                    "Island groups:       {} records, {} ids",
                    summary.island_group_records, summary.island_group_ids
                );
                if !summary.meshes.is_empty() {
                    println!("Meshes:              {}", summary.meshes.join(", "));
                }

                if self.should_show_message(1) && !records.is_empty() {
                    println!();
                    for record in records {
                        println!("  {}", describe_record(record));
                    }
                }
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "artifact",
                    "entry": entry,
                    "summary": summary,
                    "records": records,
                }));
            }
            OutputMode::Plain => {
                println!("ARTIFACT: {}", entry.artifact_path.display());
                println!("Size: {} bytes", entry.size_bytes);
                println!("Document properties: {}", summary.document_properties);
                println!("Mesh properties: {}", summary.mesh_properties);
                println!("Island group records: {}", summary.island_group_records);
                println!("Meshes: {}", summary.meshes.join(","));
            }
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{}{}", PACKAGE, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => println!("=== {} ===", title),
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => println!("{}", "-".repeat(60)),
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        if self.use_colors {
            let (emoji, styled) = match msg_type {
                MessageType::Success => (&CHECKMARK, style(message).green().bold()),
                MessageType::Error => (&CROSS, style(message).red().bold()),
                MessageType::Warning => (&WARNING, style(message).yellow().bold()),
                MessageType::Info => (&INFO, style(message).cyan()),
            };

            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, styled),
                _ => println!("{}{}", emoji, styled),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_report(&self, report: &PipelineReport) {
        for warning in &report.warnings {
            self.warning(warning);
        }

        let verb = match report.operation {
            Operation::Import => "Imported",
            Operation::Export => "Exported",
        };

        match report.status {
            OutcomeStatus::Cancelled => {
                let reason = report.cancel_reason.as_deref().unwrap_or("cancelled");
                self.print_human_message(
                    MessageType::Error,
                    &format!("{} was not processed: {}", report.target.display(), reason),
                );
                return;
            }
            OutcomeStatus::Success => {
                self.success(&format!("{} {}", verb, report.target.display()));
            }
            OutcomeStatus::SuccessWithWarnings => {
                self.success(&format!(
                    "{} {} ({} warning{})",
                    verb,
                    report.target.display(),
                    report.warnings.len(),
                    if report.warnings.len() == 1 { "" } else { "s" }
                ));
            }
        }

        if !self.should_show_message(0) {
            return;
        }

        if let Some(artifact) = &report.artifact {
            let label = match report.operation {
                Operation::Import => "Cache written",
                Operation::Export => "Cache injected",
            };
            println!("  {}: {}", label, artifact.display());
        }
        println!("  Time taken:  {}", format_duration(report.duration));

        if self.should_show_message(2) {
            let states: Vec<String> = report.states.iter().map(|s| format!("{:?}", s)).collect();
            self.debug(&format!("States: {}", states.join(" -> ")));
        }
    }
}

fn print_plain_report(report: &PipelineReport) {
    let status = match report.status {
        OutcomeStatus::Success => "SUCCESS",
        OutcomeStatus::SuccessWithWarnings => "SUCCESS_WITH_WARNINGS",
        OutcomeStatus::Cancelled => "CANCELLED",
    };
    println!("STATUS: {}", status);
    println!("Target: {}", report.target.display());
    if let Some(artifact) = &report.artifact {
        println!("Artifact: {}", artifact.display());
    }
    if report.operation == Operation::Export {
        println!("Injected: {}", report.injected);
    }
    if let Some(reason) = &report.cancel_reason {
        println!("Reason: {}", reason);
    }
    for warning in &report.warnings {
        println!("WARNING: {}", warning);
    }
    println!("Duration: {:?}", report.duration);
    println!("Finished: {}", report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"));
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn describe_value(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Int(v) => v.to_string(),
        PropertyValue::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) if !text.chars().any(|c| c.is_control()) => format!("{:?}", text),
            _ => format!("<{} bytes>", bytes.len()),
        },
        PropertyValue::None => "-".to_string(),
    }
}

fn describe_record(record: &ArtifactRecord) -> String {
    match record {
        ArtifactRecord::DocumentProperty {
            object,
            name,
            type_name,
            value,
        } => format!("G {}.{} ({}) = {}", object, name, type_name, describe_value(value)),
        ArtifactRecord::MeshProperty {
            mesh,
            name,
            type_name,
            value,
        } => format!("M {}.{} ({}) = {}", mesh, name, type_name, describe_value(value)),
        ArtifactRecord::IslandGroups {
            mesh,
            user_data,
            group_ids,
        } => format!("I {}.{} [{} ids]", mesh, user_data, group_ids.len()),
    }
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
