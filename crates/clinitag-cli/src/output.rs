//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use clinitag_domain::{
    ChunkRecord, Condition, Document, ExecutionEvent, ExecutionLog, RunStatus, Tag,
};
use clinitag_extractor::{ReportStatus, RunReport};
use colored::*;
use serde::Serialize;
use serde_json::json;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Characters of chunk text or errors shown in table cells
const CELL_PREVIEW_CHARS: usize = 60;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format registered documents.
    pub fn format_documents(&self, documents: &[Document]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(documents),
            OutputFormat::Quiet => Ok(join_lines(documents.iter().map(|d| d.identifier.clone()))),
            OutputFormat::Table => {
                if documents.is_empty() {
                    return Ok(self.colorize("No documents found.", "yellow"));
                }
                let rows = documents.iter().map(|d| {
                    vec![
                        d.id.to_string(),
                        d.identifier.clone(),
                        d.category.clone(),
                        d.version.clone(),
                    ]
                });
                Ok(table(["ID", "Identifier", "Category", "Version"], rows))
            }
        }
    }

    /// Format a document's chunk ledger.
    pub fn format_chunks(&self, chunks: &[ChunkRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(chunks),
            OutputFormat::Quiet => Ok(join_lines(chunks.iter().map(|c| c.index.to_string()))),
            OutputFormat::Table => {
                if chunks.is_empty() {
                    return Ok(self.colorize("No chunks recorded.", "yellow"));
                }
                let rows = chunks.iter().map(|c| {
                    let state = if c.processed {
                        self.colorize("processed", "green")
                    } else if c.needs_retry() {
                        self.colorize("failed", "red")
                    } else {
                        self.colorize("pending", "yellow")
                    };
                    vec![
                        c.index.to_string(),
                        state,
                        c.attempts.to_string(),
                        c.last_error
                            .as_deref()
                            .map(|e| preview(e, CELL_PREVIEW_CHARS))
                            .unwrap_or_default(),
                        preview(&c.text, CELL_PREVIEW_CHARS),
                    ]
                });
                Ok(table(["Index", "State", "Attempts", "Last error", "Text"], rows))
            }
        }
    }

    /// Format tags with their conditions.
    pub fn format_tags(&self, tags: &[(Tag, Vec<Condition>)]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<_> = tags
                    .iter()
                    .map(|(tag, conditions)| json!({ "tag": tag, "conditions": conditions }))
                    .collect();
                to_json(&values)
            }
            OutputFormat::Quiet => Ok(join_lines(tags.iter().map(|(t, _)| t.name.clone()))),
            OutputFormat::Table => {
                if tags.is_empty() {
                    return Ok(self.colorize("No tags found.", "yellow"));
                }
                let rows = tags.iter().map(|(tag, conditions)| {
                    let described: Vec<String> =
                        conditions.iter().map(describe_condition).collect();
                    vec![
                        tag.name.clone(),
                        tag.display_name.clone(),
                        tag.category.clone(),
                        described.join("\n"),
                    ]
                });
                Ok(table(["Name", "Display name", "Category", "Conditions"], rows))
            }
        }
    }

    /// Format execution logs.
    pub fn format_logs(&self, logs: &[ExecutionLog]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(logs),
            OutputFormat::Quiet => Ok(join_lines(logs.iter().map(|l| l.run_id.clone()))),
            OutputFormat::Table => {
                if logs.is_empty() {
                    return Ok(self.colorize("No runs recorded.", "yellow"));
                }
                let rows = logs.iter().map(|log| {
                    let status = match log.status {
                        RunStatus::Running => self.colorize("running", "blue"),
                        RunStatus::Succeeded => self.colorize("succeeded", "green"),
                        RunStatus::Failed => self.colorize("failed", "red"),
                    };
                    vec![
                        log.run_id.clone(),
                        log.agent_name.clone(),
                        status,
                        log.duration_ms.map(|d| format!("{} ms", d)).unwrap_or_default(),
                        log.error_message.clone().unwrap_or_default(),
                    ]
                });
                Ok(table(["Run", "Agent", "Status", "Duration", "Error"], rows))
            }
        }
    }

    /// Format a run's event trace.
    pub fn format_events(&self, events: &[ExecutionEvent]) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(events),
            OutputFormat::Quiet => Ok(join_lines(events.iter().map(|e| e.message.clone()))),
            OutputFormat::Table => {
                if events.is_empty() {
                    return Ok(self.colorize("No events recorded.", "yellow"));
                }
                let rows = events.iter().map(|e| {
                    vec![
                        e.sequence.to_string(),
                        e.message.clone(),
                        e.metadata
                            .as_ref()
                            .map(|m| preview(&m.to_string(), CELL_PREVIEW_CHARS * 2))
                            .unwrap_or_default(),
                    ]
                });
                Ok(table(["#", "Message", "Metadata"], rows))
            }
        }
    }

    /// Format the report of an extraction run.
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Quiet => Ok(format!(
                "{}/{}",
                report.chunks_processed(),
                report.chunks_total
            )),
            OutputFormat::Table => {
                let headline = format!(
                    "{} ({}): {} of {} chunks processed ({} skipped)",
                    report.document,
                    report.version,
                    report.chunks_processed(),
                    report.chunks_total,
                    report.chunks_skipped,
                );
                let mut lines = vec![match report.status {
                    ReportStatus::Complete => self.success(&headline),
                    ReportStatus::Partial => self.warning(&headline),
                    ReportStatus::Stalled => self.error(&headline),
                }];
                lines.push(format!(
                    "  tags: {} extracted, {} created, {} reused",
                    report.tags_extracted, report.tags_created, report.tags_reused
                ));
                lines.push(format!(
                    "  conditions: {} added, {} already present",
                    report.conditions_added, report.conditions_existing
                ));
                if report.rejected > 0 {
                    lines.push(format!("  rejected entries: {}", report.rejected));
                }
                for failure in &report.chunk_failures {
                    lines.push(self.colorize(
                        &format!("  chunk {} ({}): {}", failure.index, failure.kind, failure.message),
                        "red",
                    ));
                }
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// One-line description of a condition.
pub fn describe_condition(condition: &Condition) -> String {
    match condition {
        Condition::Field(c) => {
            let mut out = format!("field {}", c.name);
            if let Some(op) = c.operator {
                out.push_str(&format!(" {}", op));
            }
            if let Some(value) = c.value {
                out.push_str(&format!(" {}", value));
            }
            out
        }
        Condition::Tag(c) => format!("tag {}", c.name),
        Condition::Event(c) => {
            let attributes: Vec<&str> = [c.status.as_deref(), c.time_relation.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if attributes.is_empty() {
                format!("event {}", c.name)
            } else {
                format!("event {} ({})", c.name, attributes.join(", "))
            }
        }
        Condition::NaturalLanguage(c) => format!("natural_language \"{}\"", c.expression),
    }
}

fn table<const N: usize>(headers: [&str; N], rows: impl Iterator<Item = Vec<String>>) -> String {
    let mut builder = Builder::default();
    builder.push_record(headers);
    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn join_lines(lines: impl Iterator<Item = String>) -> String {
    lines.collect::<Vec<_>>().join("\n")
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}
