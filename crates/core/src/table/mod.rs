//! Rows, column schemas, and lazy table generators.
//!
//! A [`TableGenerator`] is the re-invocable row source behind every registered
//! table. Calling [`TableGenerator::rows`] starts a new independent pass over the
//! provider; nothing is collected unless the registrar materializes the table.

use std::fmt;
use std::sync::Arc;

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde::Serialize;
use thiserror::Error;

use crate::policy::MetadataCategory;
use crate::provider::{ObjectProvider, ProviderError, ProviderResult};

/// Error raised while producing rows.
#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A record could not be flattened into the category's schema.
    #[error("Row projection fault in {category}: {message}")]
    Projection { category: MetadataCategory, message: String },
}

/// Convenience result type for row production.
pub type TableResult<T> = Result<T, TableError>;

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", i64::from(*b)),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(v) => ToSqlOutput::Borrowed(ValueRef::Integer(*v)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(v) => Value::Integer(v),
            // Engine-side values only; projectors never emit these.
            ValueRef::Real(v) => Value::Text(v.to_string()),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Text(format!("<{} byte blob>", b.len())),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

// SQLite integers are 64-bit signed; unsigned quantities are stored bit-for-bit.
impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Integer(value as i64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Ordered column names for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: &'static [&'static str],
}

impl ColumnSchema {
    pub const fn new(columns: &'static [&'static str]) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// `CREATE TABLE` statement declaring these columns, as expected by
    /// `sqlite3_declare_vtab`.
    pub fn declaration(&self) -> String {
        let cols: Vec<String> = self.columns.iter().map(|c| quote_identifier(c)).collect();
        format!("CREATE TABLE x({})", cols.join(", "))
    }
}

/// Quote an SQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// One projected row: named cells in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    cells: Vec<(&'static str, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper to append a cell.
    pub fn with(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.cells.push((column, value.into()));
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.iter().find(|(name, _)| *name == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Check the cells against `schema` and return the values positionally.
    pub fn into_values(
        self,
        category: MetadataCategory,
        schema: &ColumnSchema,
    ) -> TableResult<Vec<Value>> {
        let names_match = self.cells.len() == schema.len()
            && self.cells.iter().zip(schema.columns()).all(|((name, _), col)| name == col);
        if !names_match {
            let got: Vec<_> = self.columns().collect();
            return Err(TableError::Projection {
                category,
                message: format!(
                    "row columns {:?} do not match schema {:?}",
                    got,
                    schema.columns()
                ),
            });
        }
        Ok(self.cells.into_iter().map(|(_, v)| v).collect())
    }
}

/// A lazily-produced sequence of rows.
pub type RowStream<'a> = Box<dyn Iterator<Item = TableResult<Row>> + 'a>;

/// Projector entry point: opens one pass over a provider's category.
pub type Projector = for<'p> fn(&'p dyn ObjectProvider) -> ProviderResult<RowStream<'p>>;

/// Named, schema-declaring, re-invocable row source for one category.
///
/// Holds only the shared provider handle and the projector; it keeps no cursor
/// state of its own.
#[derive(Clone)]
pub struct TableGenerator {
    category: MetadataCategory,
    schema: ColumnSchema,
    provider: Arc<dyn ObjectProvider>,
    projector: Projector,
}

impl fmt::Debug for TableGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableGenerator")
            .field("category", &self.category)
            .field("schema", &self.schema)
            .field("format", &self.provider.format())
            .finish_non_exhaustive()
    }
}

impl TableGenerator {
    pub fn new(
        category: MetadataCategory,
        schema: ColumnSchema,
        provider: Arc<dyn ObjectProvider>,
        projector: Projector,
    ) -> Self {
        Self { category, schema, provider, projector }
    }

    pub fn category(&self) -> MetadataCategory {
        self.category
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn provider(&self) -> &dyn ObjectProvider {
        self.provider.as_ref()
    }

    /// Start a fresh pass over the provider.
    pub fn rows(&self) -> TableResult<RowStream<'_>> {
        Ok((self.projector)(self.provider.as_ref())?)
    }

    /// Start a fresh pass yielding schema-checked positional values.
    pub fn values(&self) -> TableResult<impl Iterator<Item = TableResult<Vec<Value>>> + '_> {
        let category = self.category;
        let schema = self.schema;
        Ok(self.rows()?.map(move |row| row.and_then(|r| r.into_values(category, &schema))))
    }
}
