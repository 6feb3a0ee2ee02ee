//! One query session over one object file.
//!
//! A session parses the cache policy, opens the provider, creates an in-memory
//! SQLite connection and registers the requested categories into it. It then
//! answers SQL until dropped, which releases the connection and the file bytes.

use std::ffi::CString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::{Batch, Statement};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::engine::{EngineError, SqliteCatalog};
use crate::model::HeaderRecord;
use crate::policy::{CachePolicySet, MetadataCategory, PolicyError};
use crate::provider::{ObjectProvider, ProviderError};
use crate::registrar::{Registrar, RegistrationError, RegistrationReport, TableEntry};
use crate::table::Value;

/// Error type for session setup and queries.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] PolicyError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// `query` was handed more than one statement.
    #[error("Expected a single SQL statement, got several (use query_all)")]
    MultipleStatements,

    /// A session config file exists but could not be parsed.
    #[error("Invalid session config {path}: {message}")]
    ConfigFile { path: PathBuf, message: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience result type for sessions.
pub type SessionResult<T> = Result<T, SessionError>;

/// Startup configuration for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Object file to open.
    #[serde(default)]
    pub path: PathBuf,
    /// Cache policy tokens (`ALL`, `NONE`, or category names).
    #[serde(default)]
    pub cache: Vec<String>,
    /// Register the extended category set instead of the default one.
    #[serde(default)]
    pub extended: bool,
}

impl SessionConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Load a config from a `.json`, `.yaml` or `.yml` file.
    ///
    /// Anything that is not `.json` is parsed as YAML.
    pub fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|source| SessionError::Io { path: path.to_path_buf(), source })?;
        let parsed = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_slice(&bytes).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_slice(&bytes).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| SessionError::ConfigFile { path: path.to_path_buf(), message })
    }

    pub fn policy(&self) -> Result<CachePolicySet, PolicyError> {
        CachePolicySet::from_selection(&self.cache)
    }

    pub fn categories(&self) -> &'static [MetadataCategory] {
        if self.extended {
            &MetadataCategory::EXTENDED
        } else {
            &MetadataCategory::DEFAULT
        }
    }
}

/// Column names and rows of one query result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryOutput {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, by name.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }
}

/// Object-level facts that are not row-shaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub path: Option<PathBuf>,
    pub format: String,
    pub name: Option<String>,
    pub header: HeaderRecord,
    pub libs: Vec<String>,
    pub rpaths: Vec<String>,
}

impl ObjectSummary {
    pub fn from_provider(path: Option<PathBuf>, provider: &dyn ObjectProvider) -> Self {
        Self {
            path,
            format: provider.format().to_string(),
            name: provider.name().map(str::to_string),
            header: provider.header(),
            libs: provider.libs().to_vec(),
            rpaths: provider.rpaths().to_vec(),
        }
    }
}

/// A registered connection plus the provider behind it.
#[derive(Debug)]
pub struct Session {
    path: Option<PathBuf>,
    provider: Arc<dyn ObjectProvider>,
    registrar: Registrar<SqliteCatalog>,
    report: RegistrationReport,
}

impl Session {
    /// Open the file named by `config` with the Mach-O provider.
    ///
    /// The policy is parsed before the file is touched.
    #[cfg(feature = "macho-provider")]
    pub fn open(config: &SessionConfig) -> SessionResult<Self> {
        let policy = config.policy()?;
        let provider: Arc<dyn ObjectProvider> =
            Arc::new(crate::provider::MachObject::open(&config.path)?);
        let mut session = Self::with_provider(provider, policy, config.categories())?;
        session.path = Some(config.path.clone());
        Ok(session)
    }

    /// Build a session over an already-open provider.
    pub fn with_provider(
        provider: Arc<dyn ObjectProvider>,
        policy: CachePolicySet,
        categories: &[MetadataCategory],
    ) -> SessionResult<Self> {
        let catalog = SqliteCatalog::open_in_memory()?;
        let mut registrar = Registrar::new(catalog, policy);
        let report = registrar.register_all(&provider, categories)?;
        info!(
            format = provider.format(),
            policy = %policy,
            tables = report.entries.len(),
            failed = report.failures().count(),
            "Session ready"
        );
        Ok(Self { path: None, provider, registrar, report })
    }

    /// Run exactly one statement and collect its result.
    ///
    /// Input holding more than one statement is rejected before anything runs.
    pub fn query(&self, sql: &str) -> SessionResult<QueryOutput> {
        let mut batch = Batch::new(self.connection(), sql);
        let Some(mut stmt) = batch.next()? else {
            return Ok(QueryOutput::default());
        };
        if batch.next()?.is_some() {
            return Err(SessionError::MultipleStatements);
        }
        collect_output(&mut stmt)
    }

    /// Run every statement in `sql` in order, one output per statement.
    ///
    /// Stops at the first failing statement; earlier statements stay applied.
    pub fn query_all(&self, sql: &str) -> SessionResult<Vec<QueryOutput>> {
        let mut batch = Batch::new(self.connection(), sql);
        let mut outputs = Vec::new();
        while let Some(mut stmt) = batch.next()? {
            outputs.push(collect_output(&mut stmt)?);
        }
        Ok(outputs)
    }

    /// Run statements that return no rows.
    pub fn execute_batch(&self, sql: &str) -> SessionResult<()> {
        self.registrar.catalog().connection().execute_batch(sql)?;
        Ok(())
    }

    /// Registered tables, in registration order.
    pub fn tables(&self) -> &[TableEntry] {
        &self.report.entries
    }

    pub fn report(&self) -> &RegistrationReport {
        &self.report
    }

    pub fn provider(&self) -> &dyn ObjectProvider {
        self.provider.as_ref()
    }

    pub fn policy(&self) -> CachePolicySet {
        self.registrar.policy()
    }

    pub fn connection(&self) -> &rusqlite::Connection {
        self.registrar.catalog().connection()
    }

    pub fn summary(&self) -> ObjectSummary {
        ObjectSummary::from_provider(self.path.clone(), self.provider())
    }
}

/// Whether `sql` ends in a complete statement, per SQLite's own tokenizer.
///
/// Semicolons inside literals or comments do not count, and a trailing comment
/// after the final `;` does not keep the statement open.
pub fn is_complete_statement(sql: &str) -> bool {
    let Ok(sql) = CString::new(sql) else {
        return false;
    };
    // SAFETY: `sql` is NUL-terminated and outlives the call.
    unsafe { rusqlite::ffi::sqlite3_complete(sql.as_ptr()) != 0 }
}

fn collect_output(stmt: &mut Statement<'_>) -> SessionResult<QueryOutput> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            values.push(Value::from(row.get_ref(idx)?));
        }
        out.push(values);
    }
    Ok(QueryOutput { columns, rows: out })
}
