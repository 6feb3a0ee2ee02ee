//! Parsed-object providers.
//!
//! A provider owns a parsed object file and hands out fresh, lazily-decoded
//! record sequences for each metadata category. The rest of the crate never
//! touches format-specific structures; it only sees [`ObjectProvider`].

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::{
    ExportRecord, HeaderRecord, ImportRecord, LoadCommandRecord, SectionRecord, SegmentRecord,
    SymbolRecord,
};
use crate::policy::MetadataCategory;

#[cfg(feature = "macho-provider")]
pub mod macho;

#[cfg(feature = "macho-provider")]
pub use macho::MachObject;

/// Error type for provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The input file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input is not an object file this provider understands.
    #[error("File format error: {0}")]
    Format(String),

    /// A record could not be decoded while walking a category.
    #[error("Failed to decode {category}: {message}")]
    Decode { category: MetadataCategory, message: String },
}

impl ProviderError {
    pub fn decode(category: MetadataCategory, message: impl Into<String>) -> Self {
        ProviderError::Decode { category, message: message.into() }
    }
}

/// Convenience result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// A lazily-produced sequence of native records.
///
/// Items are decoded one at a time; a decoding fault is yielded in place of the
/// failing record.
pub type RecordStream<'a, T> = Box<dyn Iterator<Item = ProviderResult<T>> + 'a>;

/// Stable interface to a parsed object file.
///
/// Every sequence accessor returns a new, independent pass over the data each
/// time it is called.
pub trait ObjectProvider: Send + Sync {
    /// Format tag used as the table-name prefix (e.g. `macho`).
    fn format(&self) -> &str;

    fn header(&self) -> HeaderRecord;

    /// Install name of a dylib, if the object carries one.
    fn name(&self) -> Option<&str>;

    /// Dynamic library dependencies, in load-command order.
    fn libs(&self) -> &[String];

    /// Runtime search paths, in load-command order.
    fn rpaths(&self) -> &[String];

    fn symbols(&self) -> ProviderResult<RecordStream<'_, SymbolRecord>>;

    fn sections(&self) -> ProviderResult<RecordStream<'_, SectionRecord>>;

    fn exports(&self) -> ProviderResult<RecordStream<'_, ExportRecord>>;

    fn imports(&self) -> ProviderResult<RecordStream<'_, ImportRecord>>;

    fn segments(&self) -> ProviderResult<RecordStream<'_, SegmentRecord>>;

    fn load_commands(&self) -> ProviderResult<RecordStream<'_, LoadCommandRecord>>;
}

impl fmt::Debug for dyn ObjectProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectProvider").field("format", &self.format()).finish_non_exhaustive()
    }
}
