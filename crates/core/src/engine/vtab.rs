use std::os::raw::c_int;
use std::sync::Arc;

use rusqlite::ffi;
use rusqlite::vtab::{Context, IndexInfo, VTab, VTabConnection, VTabCursor, Values};

use crate::table::{TableError, TableGenerator, TableResult, Value};

/// Planner cost of a full scan. Generators cannot seek, so every plan is one.
const FULL_SCAN_COST: f64 = 1_000_000.0;

type ValueStream<'a> = Box<dyn Iterator<Item = TableResult<Vec<Value>>> + 'a>;

/// Eponymous virtual table backed by a [`TableGenerator`] passed as module aux data.
#[repr(C)]
pub(crate) struct GeneratorTable {
    base: ffi::sqlite3_vtab,
    generator: Arc<TableGenerator>,
}

unsafe impl<'vtab> VTab<'vtab> for GeneratorTable {
    type Aux = Arc<TableGenerator>;
    type Cursor = GeneratorCursor<'vtab>;

    fn connect(
        _db: &mut VTabConnection,
        aux: Option<&Self::Aux>,
        _args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let generator = aux.cloned().ok_or_else(|| {
            rusqlite::Error::ModuleError("virtual table registered without a generator".into())
        })?;
        let declaration = generator.schema().declaration();
        Ok((declaration, GeneratorTable { base: ffi::sqlite3_vtab::default(), generator }))
    }

    fn best_index(&self, info: &mut IndexInfo) -> rusqlite::Result<()> {
        info.set_estimated_cost(FULL_SCAN_COST);
        Ok(())
    }

    fn open(&'vtab mut self) -> rusqlite::Result<GeneratorCursor<'vtab>> {
        Ok(GeneratorCursor::new(&self.generator))
    }
}

/// One scan over a generator. Each `filter` call starts an independent pass.
#[repr(C)]
pub(crate) struct GeneratorCursor<'vtab> {
    base: ffi::sqlite3_vtab_cursor,
    generator: &'vtab TableGenerator,
    stream: Option<ValueStream<'vtab>>,
    current: Option<Vec<Value>>,
    rowid: i64,
}

impl<'vtab> GeneratorCursor<'vtab> {
    fn new(generator: &'vtab TableGenerator) -> Self {
        Self {
            base: ffi::sqlite3_vtab_cursor::default(),
            generator,
            stream: None,
            current: None,
            rowid: 0,
        }
    }

    fn advance(&mut self) -> rusqlite::Result<()> {
        let next = self.stream.as_mut().and_then(|stream| stream.next());
        match next {
            Some(Ok(values)) => {
                self.rowid += 1;
                self.current = Some(values);
                Ok(())
            }
            Some(Err(err)) => {
                self.finish();
                Err(self.module_error(&err))
            }
            None => {
                self.finish();
                Ok(())
            }
        }
    }

    fn finish(&mut self) {
        self.current = None;
        self.stream = None;
    }

    fn module_error(&self, err: &TableError) -> rusqlite::Error {
        rusqlite::Error::ModuleError(format!(
            "{} table, row {}: {err}",
            self.generator.category(),
            self.rowid + 1
        ))
    }
}

unsafe impl VTabCursor for GeneratorCursor<'_> {
    fn filter(
        &mut self,
        _idx_num: c_int,
        _idx_str: Option<&str>,
        _args: &Values<'_>,
    ) -> rusqlite::Result<()> {
        let generator = self.generator;
        self.rowid = 0;
        match generator.values() {
            Ok(stream) => self.stream = Some(Box::new(stream)),
            Err(err) => {
                self.finish();
                return Err(self.module_error(&err));
            }
        }
        self.advance()
    }

    fn next(&mut self) -> rusqlite::Result<()> {
        self.advance()
    }

    fn eof(&self) -> bool {
        self.current.is_none()
    }

    fn column(&self, ctx: &mut Context, i: c_int) -> rusqlite::Result<()> {
        let value = self
            .current
            .as_ref()
            .and_then(|row| usize::try_from(i).ok().and_then(|i| row.get(i)));
        match value {
            Some(value) => ctx.set_result(value),
            None => ctx.set_result(&Value::Null),
        }
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        Ok(self.rowid)
    }
}
