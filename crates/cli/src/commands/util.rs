use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde_json::{Map, Value as JsonValue};

use olf_core::session::{QueryOutput, Session, SessionConfig};

/// Options shared by every command that opens a session.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Object file to open. Falls back to `path` in the config file.
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Categories to materialize (ALL, NONE, or names such as SYMBOLS,EXPORTS).
    #[arg(long = "cache", value_name = "TOKEN")]
    pub cache: Vec<String>,

    /// Register segments, load commands and headers as well.
    #[arg(long, default_value_t = false)]
    pub extended: bool,

    /// Session config file (.json, .yaml or .yml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl SessionArgs {
    pub fn for_file(file: impl Into<PathBuf>) -> Self {
        Self { file: Some(file.into()), ..Default::default() }
    }

    /// Merge the config file (if any) with the flags; flags win.
    pub fn resolve(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("Failed to load session config {}", path.display()))?,
            None => SessionConfig::default(),
        };
        if let Some(file) = &self.file {
            config.path = file.clone();
        }
        if config.path.as_os_str().is_empty() {
            return Err(anyhow!("No input file given (pass FILE or set `path` in --config)"));
        }
        if !self.cache.is_empty() {
            config.cache = self.cache.clone();
        }
        config.extended |= self.extended;
        Ok(config)
    }
}

/// Resolve `args` and open a session over the file.
pub fn open_session(args: &SessionArgs) -> Result<Session> {
    let config = args.resolve()?;
    Session::open(&config)
        .with_context(|| format!("Failed to open session for {}", config.path.display()))
}

/// Render a result as an aligned text table followed by a row count.
///
/// Statements without result columns render as an empty string.
pub fn render_table(output: &QueryOutput) -> String {
    if output.columns.is_empty() {
        return String::new();
    }
    let cells: Vec<Vec<String>> =
        output.rows.iter().map(|row| row.iter().map(|v| v.to_string()).collect()).collect();
    let mut widths: Vec<usize> = output.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, output.columns.iter().map(String::as_str), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for row in &cells {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    let n = output.rows.len();
    out.push_str(&format!("({} row{})\n", n, if n == 1 { "" } else { "s" }));
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let padded: Vec<String> =
        cells.zip(widths).map(|(cell, w)| format!("{cell:<width$}", width = *w)).collect();
    out.push_str(padded.join("  ").trim_end());
    out.push('\n');
}

/// Result rows as a JSON array of objects keyed by column name.
pub fn rows_as_json(output: &QueryOutput) -> Result<JsonValue> {
    let mut rows = Vec::with_capacity(output.rows.len());
    for row in &output.rows {
        let mut object = Map::new();
        for (column, value) in output.columns.iter().zip(row) {
            object.insert(column.clone(), serde_json::to_value(value)?);
        }
        rows.push(JsonValue::Object(object));
    }
    Ok(JsonValue::Array(rows))
}
