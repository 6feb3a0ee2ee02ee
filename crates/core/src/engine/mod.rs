//! Query-engine seam.
//!
//! The registrar only needs two things from the engine: bind a name to a live
//! row source, and copy one table into another. [`TableCatalog`] captures that;
//! [`SqliteCatalog`] implements it over a `rusqlite` connection using
//! eponymous virtual tables.

use std::sync::Arc;

use thiserror::Error;

use crate::table::TableGenerator;

mod sqlite;
mod vtab;

pub use sqlite::SqliteCatalog;

/// Error type for catalog operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The name is already bound in the engine namespace.
    #[error("Table '{0}' is already registered")]
    DuplicateTable(String),
}

/// Convenience result type for catalog operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// The table namespace of a relational engine.
pub trait TableCatalog {
    /// Bind `name` to a live generator; every scan opens a fresh pass.
    fn register_virtual_table(
        &mut self,
        name: &str,
        generator: Arc<TableGenerator>,
    ) -> EngineResult<()>;

    /// Copy every row of `source`, in order, into a new stored table `target`.
    ///
    /// Returns the number of rows copied. On failure `target` must not exist.
    fn materialize(&mut self, source: &str, target: &str) -> EngineResult<u64>;

    /// Remove a stored table if present.
    fn drop_table(&mut self, name: &str) -> EngineResult<()>;

    /// Whether `name` resolves to a virtual or stored table.
    fn has_table(&self, name: &str) -> EngineResult<bool>;
}
