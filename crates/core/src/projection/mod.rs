//! Per-category row projectors and their column schemas.
//!
//! Each projector is a pure function from one native record to one [`Row`].
//! Nested fields are flattened by their leaf name (`info.address` becomes
//! `address`); type-like enumerations are projected as their display strings.

use std::sync::Arc;

use crate::model::{
    ExportRecord, HeaderRecord, ImportRecord, LoadCommandRecord, SectionRecord, SegmentRecord,
    SymbolRecord,
};
use crate::policy::MetadataCategory;
use crate::provider::{ObjectProvider, ProviderResult, RecordStream};
use crate::table::{ColumnSchema, Projector, Row, RowStream, TableError, TableGenerator};

pub const SYMBOL_COLUMNS: ColumnSchema =
    ColumnSchema::new(&["name", "type", "global", "weak", "undefined", "stab"]);

pub const SECTION_COLUMNS: ColumnSchema = ColumnSchema::new(&[
    "name", "segment", "addr", "size", "offset", "align", "reloff", "nreloc", "flags",
]);

pub const EXPORT_COLUMNS: ColumnSchema = ColumnSchema::new(&[
    "name",
    "size",
    "offset",
    "type",
    "address",
    "flags",
    "lib",
    "lib_symbol_name",
]);

pub const IMPORT_COLUMNS: ColumnSchema = ColumnSchema::new(&[
    "name",
    "dylib",
    "lazy",
    "offset",
    "size",
    "address",
    "addend",
    "is_weak",
    "start_of_sequence_offset",
]);

pub const SEGMENT_COLUMNS: ColumnSchema = ColumnSchema::new(&[
    "name", "cmd", "cmdsize", "vmaddr", "vmsize", "fileoff", "filesize", "maxprot", "initprot",
    "nsects", "flags",
]);

pub const LOAD_COMMAND_COLUMNS: ColumnSchema =
    ColumnSchema::new(&["offset", "command", "cmdsize"]);

pub const HEADER_COLUMNS: ColumnSchema = ColumnSchema::new(&[
    "magic",
    "cputype",
    "cpusubtype",
    "filetype",
    "ncmds",
    "sizeofcmds",
    "flags",
    "reserved",
]);

/// Column schema for a category, if it has a projector.
pub fn schema_for(category: MetadataCategory) -> Option<ColumnSchema> {
    projector_for(category).map(|(schema, _)| schema)
}

/// Build the table generator for `category`.
///
/// Returns `None` for reserved categories that have no projector yet.
pub fn generator_for(
    category: MetadataCategory,
    provider: Arc<dyn ObjectProvider>,
) -> Option<TableGenerator> {
    let (schema, projector) = projector_for(category)?;
    Some(TableGenerator::new(category, schema, provider, projector))
}

fn projector_for(category: MetadataCategory) -> Option<(ColumnSchema, Projector)> {
    let entry = match category {
        MetadataCategory::Symbols => (SYMBOL_COLUMNS, symbol_rows as Projector),
        MetadataCategory::Sections => (SECTION_COLUMNS, section_rows as Projector),
        MetadataCategory::Exports => (EXPORT_COLUMNS, export_rows as Projector),
        MetadataCategory::Imports => (IMPORT_COLUMNS, import_rows as Projector),
        MetadataCategory::Segments => (SEGMENT_COLUMNS, segment_rows as Projector),
        MetadataCategory::LoadCommands => {
            (LOAD_COMMAND_COLUMNS, load_command_rows as Projector)
        }
        MetadataCategory::Headers => (HEADER_COLUMNS, header_rows as Projector),
        MetadataCategory::Instructions
        | MetadataCategory::Strings
        | MetadataCategory::VersionRequirements
        | MetadataCategory::VersionDefinitions
        | MetadataCategory::DieInfo
        | MetadataCategory::DieCallGraph => return None,
    };
    Some(entry)
}

fn project_each<'a, T: 'a>(
    records: RecordStream<'a, T>,
    project: fn(&T) -> Row,
) -> RowStream<'a> {
    Box::new(records.map(move |r| r.map(|record| project(&record)).map_err(TableError::from)))
}

fn symbol_rows(provider: &dyn ObjectProvider) -> ProviderResult<RowStream<'_>> {
    Ok(project_each(provider.symbols()?, project_symbol))
}

fn section_rows(provider: &dyn ObjectProvider) -> ProviderResult<RowStream<'_>> {
    Ok(project_each(provider.sections()?, project_section))
}

fn export_rows(provider: &dyn ObjectProvider) -> ProviderResult<RowStream<'_>> {
    Ok(project_each(provider.exports()?, project_export))
}

fn import_rows(provider: &dyn ObjectProvider) -> ProviderResult<RowStream<'_>> {
    Ok(project_each(provider.imports()?, project_import))
}

fn segment_rows(provider: &dyn ObjectProvider) -> ProviderResult<RowStream<'_>> {
    Ok(project_each(provider.segments()?, project_segment))
}

fn load_command_rows(provider: &dyn ObjectProvider) -> ProviderResult<RowStream<'_>> {
    Ok(project_each(provider.load_commands()?, project_load_command))
}

fn header_rows(provider: &dyn ObjectProvider) -> ProviderResult<RowStream<'_>> {
    let header = provider.header();
    Ok(Box::new(std::iter::once(Ok(project_header(&header)))))
}

pub fn project_symbol(symbol: &SymbolRecord) -> Row {
    Row::new()
        .with("name", symbol.name.as_str())
        .with("type", symbol.symbol_type.as_str())
        .with("global", symbol.global)
        .with("weak", symbol.weak)
        .with("undefined", symbol.undefined)
        .with("stab", symbol.stab)
}

pub fn project_section(section: &SectionRecord) -> Row {
    Row::new()
        .with("name", section.name.clone())
        .with("segment", section.segment.clone())
        .with("addr", section.addr)
        .with("size", section.size)
        .with("offset", section.offset)
        .with("align", section.align)
        .with("reloff", section.reloff)
        .with("nreloc", section.nreloc)
        .with("flags", section.flags)
}

pub fn project_export(export: &ExportRecord) -> Row {
    Row::new()
        .with("name", export.name.as_str())
        .with("size", export.size)
        .with("offset", export.offset)
        .with("type", export.info.kind.as_str())
        .with("address", export.info.address)
        .with("flags", export.info.flags)
        .with("lib", export.info.lib.clone())
        .with("lib_symbol_name", export.info.lib_symbol_name.clone())
}

pub fn project_import(import: &ImportRecord) -> Row {
    Row::new()
        .with("name", import.name.as_str())
        .with("dylib", import.dylib.as_str())
        .with("lazy", import.is_lazy)
        .with("offset", import.offset)
        .with("size", import.size)
        .with("address", import.address)
        .with("addend", import.addend)
        .with("is_weak", import.is_weak)
        .with("start_of_sequence_offset", import.start_of_sequence_offset)
}

pub fn project_segment(segment: &SegmentRecord) -> Row {
    Row::new()
        .with("name", segment.name.clone())
        .with("cmd", segment.cmd)
        .with("cmdsize", segment.cmdsize)
        .with("vmaddr", segment.vmaddr)
        .with("vmsize", segment.vmsize)
        .with("fileoff", segment.fileoff)
        .with("filesize", segment.filesize)
        .with("maxprot", segment.maxprot)
        .with("initprot", segment.initprot)
        .with("nsects", segment.nsects)
        .with("flags", segment.flags)
}

pub fn project_load_command(command: &LoadCommandRecord) -> Row {
    Row::new()
        .with("offset", command.offset)
        .with("command", command.command.as_str())
        .with("cmdsize", command.cmdsize)
}

pub fn project_header(header: &HeaderRecord) -> Row {
    Row::new()
        .with("magic", header.magic)
        .with("cputype", header.cputype)
        .with("cpusubtype", header.cpusubtype)
        .with("filetype", header.filetype)
        .with("ncmds", header.ncmds)
        .with("sizeofcmds", header.sizeofcmds)
        .with("flags", header.flags)
        .with("reserved", header.reserved)
}
