//! Native record model for parsed object files.
//!
//! These are the concrete, owned shapes a provider hands out for each metadata
//! category. They intentionally mirror the underlying format's fields; flattening
//! into table rows happens in `projection`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type of a Mach-O symbol table entry (the `N_TYPE` bits of `n_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolType {
    Undefined,
    Absolute,
    Section,
    Prebound,
    Indirect,
    Unknown(u8),
}

impl SymbolType {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolType::Undefined => "N_UNDF",
            SymbolType::Absolute => "N_ABS",
            SymbolType::Section => "N_SECT",
            SymbolType::Prebound => "N_PBUD",
            SymbolType::Indirect => "N_INDR",
            SymbolType::Unknown(_) => "UNKNOWN_N_TYPE",
        }
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One symbol table entry with its decoded name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    pub symbol_type: SymbolType,
    pub global: bool,
    pub weak: bool,
    pub undefined: bool,
    pub stab: bool,
    /// 1-based section ordinal, 0 for `NO_SECT`.
    pub section: usize,
    pub value: u64,
}

impl SymbolRecord {
    pub fn new(name: impl Into<String>, symbol_type: SymbolType) -> Self {
        Self {
            name: name.into(),
            symbol_type,
            global: false,
            weak: false,
            undefined: symbol_type == SymbolType::Undefined,
            stab: false,
            section: 0,
            value: 0,
        }
    }
}

/// One section header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    /// 1-based position across all segments, in load-command order.
    pub index: usize,
    /// `None` when the section name bytes are not valid UTF-8.
    pub name: Option<String>,
    pub segment: Option<String>,
    pub addr: u64,
    pub size: u64,
    pub offset: u32,
    pub align: u32,
    pub reloff: u32,
    pub nreloc: u32,
    pub flags: u32,
}

/// Kind of an export trie entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    #[default]
    Regular,
    Reexport,
    Stub,
}

impl ExportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportKind::Regular => "regular",
            ExportKind::Reexport => "reexport",
            ExportKind::Stub => "stub",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific payload of an export.
///
/// Only regular exports carry an address; only re-exports carry a library.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportInfo {
    pub kind: ExportKind,
    pub address: u64,
    pub flags: u64,
    pub lib: Option<String>,
    pub lib_symbol_name: Option<String>,
}

/// One export trie entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub name: String,
    pub info: ExportInfo,
    pub size: usize,
    pub offset: u64,
}

/// One bound (imported) symbol as produced by the bind opcode interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub name: String,
    pub dylib: String,
    pub is_lazy: bool,
    pub offset: u64,
    pub size: usize,
    pub address: u64,
    pub addend: i64,
    pub is_weak: bool,
    pub start_of_sequence_offset: u64,
}

/// One segment load command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub name: Option<String>,
    pub cmd: u32,
    pub cmdsize: u32,
    pub vmaddr: u64,
    pub vmsize: u64,
    pub fileoff: u64,
    pub filesize: u64,
    pub maxprot: u32,
    pub initprot: u32,
    pub nsects: u32,
    pub flags: u32,
}

/// One load command, identified by its offset in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadCommandRecord {
    pub offset: usize,
    /// Display name of the command (e.g. `LC_SYMTAB`).
    pub command: String,
    pub cmdsize: usize,
}

/// The object file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeaderRecord {
    pub magic: u32,
    pub cputype: u32,
    pub cpusubtype: u32,
    pub filetype: u32,
    pub ncmds: usize,
    pub sizeofcmds: u32,
    pub flags: u32,
    pub reserved: u32,
}
