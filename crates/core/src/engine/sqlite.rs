use std::collections::BTreeSet;
use std::sync::Arc;

use rusqlite::vtab::eponymous_only_module;
use rusqlite::{params, Connection};
use tracing::debug;

use crate::engine::vtab::GeneratorTable;
use crate::engine::{EngineError, EngineResult, TableCatalog};
use crate::table::{quote_identifier, TableGenerator};

/// SQLite-backed table catalog.
///
/// This is a thin wrapper around `rusqlite::Connection` that is responsible for:
/// - Binding generators as eponymous virtual tables (one module per table).
/// - Copying virtual tables into stored tables inside a transaction.
/// - Tracking which names are bound, since eponymous tables never appear in
///   `sqlite_master`.
#[derive(Debug)]
pub struct SqliteCatalog {
    conn: Connection,
    virtual_tables: BTreeSet<String>,
}

impl SqliteCatalog {
    /// Wrap a fresh in-memory connection.
    pub fn open_in_memory() -> EngineResult<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    pub fn new(conn: Connection) -> Self {
        Self { conn, virtual_tables: BTreeSet::new() }
    }

    /// Expose a reference to the underlying connection for querying.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Names bound to live generators, sorted.
    pub fn virtual_tables(&self) -> impl Iterator<Item = &str> {
        self.virtual_tables.iter().map(String::as_str)
    }
}

impl TableCatalog for SqliteCatalog {
    fn register_virtual_table(
        &mut self,
        name: &str,
        generator: Arc<TableGenerator>,
    ) -> EngineResult<()> {
        if self.has_table(name)? {
            return Err(EngineError::DuplicateTable(name.to_string()));
        }
        self.conn.create_module(name, eponymous_only_module::<GeneratorTable>(), Some(generator))?;
        self.virtual_tables.insert(name.to_ascii_lowercase());
        debug!(table = name, "Registered virtual table");
        Ok(())
    }

    fn materialize(&mut self, source: &str, target: &str) -> EngineResult<u64> {
        if self.has_table(target)? {
            return Err(EngineError::DuplicateTable(target.to_string()));
        }
        let (source_sql, target_sql) = (quote_identifier(source), quote_identifier(target));

        // Dropping the transaction on any error path rolls the new table back.
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!("CREATE TABLE {target_sql} AS SELECT * FROM {source_sql};"))?;
        let rows: i64 =
            tx.query_row(&format!("SELECT count(*) FROM {target_sql}"), [], |row| row.get(0))?;
        tx.commit()?;

        debug!(source, target, rows, "Materialized table");
        Ok(rows as u64)
    }

    fn drop_table(&mut self, name: &str) -> EngineResult<()> {
        self.conn.execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_identifier(name)))?;
        Ok(())
    }

    fn has_table(&self, name: &str) -> EngineResult<bool> {
        if self.virtual_tables.contains(&name.to_ascii_lowercase()) {
            return Ok(true);
        }
        let count: i64 = self.conn.query_row(
            r#"
            SELECT count(*) FROM sqlite_master
            WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE
            "#,
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
