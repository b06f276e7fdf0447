//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits `CODE=VALUE` lines.

use std::collections::BTreeMap;
use std::io::{self, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use gree_core::{StatusCode, StatusValue};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Debug, Tabled)]
struct StatusRow {
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Name")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Meaning")]
    meaning: &'static str,
}

impl StatusRow {
    fn new(code: &str, value: &StatusValue) -> Self {
        let known = StatusCode::from_code(code);
        Self {
            code: code.to_owned(),
            name: known.map_or("", StatusCode::name),
            value: value.to_string(),
            meaning: known.and_then(|c| c.name_of(value)).unwrap_or(""),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct CodeRow {
    #[tabled(rename = "Code")]
    pub code: &'static str,
    #[tabled(rename = "Name")]
    pub name: &'static str,
    #[tabled(rename = "Description")]
    pub description: &'static str,
    #[tabled(rename = "Values")]
    #[serde(skip)]
    pub summary: String,
    #[tabled(skip)]
    pub values: BTreeMap<&'static str, i64>,
}

impl From<StatusCode> for CodeRow {
    fn from(code: StatusCode) -> Self {
        let summary = code
            .values()
            .iter()
            .map(|(name, v)| format!("{name}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            code: code.code(),
            name: code.name(),
            description: code.description(),
            summary,
            values: code.values().iter().copied().collect(),
        }
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a status table (code -> value) in the chosen format.
pub fn render_status(
    format: OutputFormat,
    status: &BTreeMap<String, StatusValue>,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<StatusRow> = status
                .iter()
                .map(|(code, value)| StatusRow::new(code, value))
                .collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(status, false),
        OutputFormat::JsonCompact => render_json(status, true),
        OutputFormat::Yaml => render_yaml(status),
        OutputFormat::Plain => Ok(status
            .iter()
            .map(|(code, value)| format!("{code}={value}"))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T>(
    format: OutputFormat,
    data: &[T],
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize + Tabled,
{
    match format {
        OutputFormat::Table => Ok(render_table(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views don't use
/// `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Status line on stderr, green when color is enabled.
pub fn success(message: &str, color: bool, quiet: bool) {
    if quiet {
        return;
    }
    if color {
        eprintln!("{} {message}", "✓".green());
    } else {
        eprintln!("✓ {message}");
    }
}

/// Dimmed section header, used between `watch` frames.
pub fn header(text: &str, color: bool) -> String {
    if color {
        text.dimmed().to_string()
    } else {
        text.to_owned()
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(out)
}

fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}
