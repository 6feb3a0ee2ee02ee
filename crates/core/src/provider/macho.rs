use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use goblin::mach::exports::{Export, ExportInfo as MachExportInfo};
use goblin::mach::header::Header;
use goblin::mach::imports::Import;
use goblin::mach::load_command::cmd_to_str;
use goblin::mach::segment::Section;
use goblin::mach::symbols::{Nlist, N_ABS, N_INDR, N_PBUD, N_SECT, N_UNDF};
use goblin::mach::{Mach, MachO};
use tracing::debug;

use crate::model::{
    ExportInfo, ExportKind, ExportRecord, HeaderRecord, ImportRecord, LoadCommandRecord,
    SectionRecord, SegmentRecord, SymbolRecord, SymbolType,
};
use crate::policy::MetadataCategory;
use crate::provider::{ObjectProvider, ProviderError, ProviderResult, RecordStream};

/// Goblin-backed Mach-O provider.
///
/// Owns the file bytes for the whole session. Fat binaries resolve to their
/// first Mach-O slice. Each accessor re-parses the load commands of that slice
/// and then walks the requested category; nothing decoded is retained between
/// calls.
pub struct MachObject {
    path: PathBuf,
    data: Vec<u8>,
    image: Range<usize>,
    header: HeaderRecord,
    name: Option<String>,
    libs: Vec<String>,
    rpaths: Vec<String>,
}

impl fmt::Debug for MachObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachObject")
            .field("path", &self.path)
            .field("len", &self.data.len())
            .field("image", &self.image)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl MachObject {
    /// Read and validate the object at `path`.
    pub fn open(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .map_err(|source| ProviderError::Io { path: path.to_path_buf(), source })?;
        Self::from_bytes(path, data)
    }

    /// Validate an in-memory object; `path` is only used for reporting.
    pub fn from_bytes(path: impl Into<PathBuf>, data: Vec<u8>) -> ProviderResult<Self> {
        let path = path.into();
        let image = locate_image(&data)?;
        let (header, name, libs, rpaths) = {
            let macho = parse_image(&data[image.clone()])?;
            // goblin reserves ordinal 0 for the image itself.
            let libs = match macho.libs.split_first() {
                Some((&"self", rest)) => rest,
                _ => &macho.libs[..],
            };
            (
                header_record(&macho.header),
                macho.name.map(str::to_string),
                libs.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                macho.rpaths.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            )
        };
        debug!(
            path = %path.display(),
            size = data.len(),
            image.start = image.start,
            image.end = image.end,
            ncmds = header.ncmds,
            "Opened Mach-O object"
        );
        Ok(Self { path, data, image, header, name, libs, rpaths })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self) -> ProviderResult<MachO<'_>> {
        parse_image(&self.data[self.image.clone()])
    }
}

impl ObjectProvider for MachObject {
    fn format(&self) -> &str {
        "macho"
    }

    fn header(&self) -> HeaderRecord {
        self.header
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn libs(&self) -> &[String] {
        &self.libs
    }

    fn rpaths(&self) -> &[String] {
        &self.rpaths
    }

    fn symbols(&self) -> ProviderResult<RecordStream<'_, SymbolRecord>> {
        let macho = self.parse()?;
        let iter = macho.symbols().map(|entry| {
            entry
                .map(|(name, nlist)| symbol_record(name, &nlist))
                .map_err(|e| ProviderError::decode(MetadataCategory::Symbols, e.to_string()))
        });
        Ok(Box::new(iter))
    }

    fn sections(&self) -> ProviderResult<RecordStream<'_, SectionRecord>> {
        let macho = self.parse()?;
        let mut records = Vec::new();
        for (index, entry) in macho.segments.sections().into_iter().flatten().enumerate() {
            records.push(
                entry
                    .map(|(section, _data)| section_record(index + 1, &section))
                    .map_err(|e| ProviderError::decode(MetadataCategory::Sections, e.to_string())),
            );
        }
        Ok(Box::new(records.into_iter()))
    }

    fn exports(&self) -> ProviderResult<RecordStream<'_, ExportRecord>> {
        let macho = self.parse()?;
        let exports = macho
            .exports()
            .map_err(|e| ProviderError::decode(MetadataCategory::Exports, e.to_string()))?;
        let records: Vec<_> =
            exports.into_iter().map(|export| Ok(export_record(export))).collect();
        Ok(Box::new(records.into_iter()))
    }

    fn imports(&self) -> ProviderResult<RecordStream<'_, ImportRecord>> {
        let macho = self.parse()?;
        let imports = macho
            .imports()
            .map_err(|e| ProviderError::decode(MetadataCategory::Imports, e.to_string()))?;
        let records: Vec<_> = imports.iter().map(|import| Ok(import_record(import))).collect();
        Ok(Box::new(records.into_iter()))
    }

    fn segments(&self) -> ProviderResult<RecordStream<'_, SegmentRecord>> {
        let macho = self.parse()?;
        let mut records = Vec::new();
        for segment in &macho.segments {
            records.push(Ok(SegmentRecord {
                name: segment.name().ok().map(str::to_string),
                cmd: segment.cmd,
                cmdsize: segment.cmdsize,
                vmaddr: segment.vmaddr,
                vmsize: segment.vmsize,
                fileoff: segment.fileoff,
                filesize: segment.filesize,
                maxprot: segment.maxprot,
                initprot: segment.initprot,
                nsects: segment.nsects,
                flags: segment.flags,
            }));
        }
        Ok(Box::new(records.into_iter()))
    }

    fn load_commands(&self) -> ProviderResult<RecordStream<'_, LoadCommandRecord>> {
        let macho = self.parse()?;
        let records: Vec<_> = macho
            .load_commands
            .iter()
            .map(|lc| LoadCommandRecord {
                offset: lc.offset,
                command: cmd_to_str(lc.command.cmd()).to_string(),
                cmdsize: lc.command.cmdsize(),
            })
            .collect();
        Ok(Box::new(records.into_iter().map(Ok)))
    }
}

fn parse_image(bytes: &[u8]) -> ProviderResult<MachO<'_>> {
    MachO::parse(bytes, 0).map_err(|e| ProviderError::Format(format!("not a Mach-O image: {e}")))
}

/// Byte range of the Mach-O image to expose.
fn locate_image(data: &[u8]) -> ProviderResult<Range<usize>> {
    let mach = Mach::parse(data)
        .map_err(|e| ProviderError::Format(format!("not a Mach-O file: {e}")))?;
    match mach {
        Mach::Binary(_) => Ok(0..data.len()),
        Mach::Fat(fat) => {
            for arch in fat.iter_arches() {
                let arch = arch.map_err(|e| {
                    ProviderError::Format(format!("cannot parse fat architecture entry: {e}"))
                })?;
                let start = arch.offset as usize;
                let end = start.saturating_add(arch.size as usize);
                if let Some(slice) = data.get(start..end) {
                    if MachO::parse(slice, 0).is_ok() {
                        return Ok(start..end);
                    }
                }
            }
            Err(ProviderError::Format("fat binary contains no Mach-O slice".into()))
        }
    }
}

impl SymbolType {
    /// Decode the masked `N_TYPE` bits of an nlist entry.
    pub fn from_n_type(n_type: u8) -> Self {
        match n_type {
            N_UNDF => SymbolType::Undefined,
            N_ABS => SymbolType::Absolute,
            N_SECT => SymbolType::Section,
            N_PBUD => SymbolType::Prebound,
            N_INDR => SymbolType::Indirect,
            other => SymbolType::Unknown(other),
        }
    }
}

fn header_record(header: &Header) -> HeaderRecord {
    HeaderRecord {
        magic: header.magic,
        cputype: header.cputype,
        cpusubtype: header.cpusubtype,
        filetype: header.filetype,
        ncmds: header.ncmds,
        sizeofcmds: header.sizeofcmds,
        flags: header.flags,
        reserved: header.reserved,
    }
}

fn symbol_record(name: &str, nlist: &Nlist) -> SymbolRecord {
    SymbolRecord {
        name: name.to_string(),
        symbol_type: SymbolType::from_n_type(nlist.get_type()),
        global: nlist.is_global(),
        weak: nlist.is_weak(),
        undefined: nlist.is_undefined(),
        stab: nlist.is_stab(),
        section: nlist.n_sect,
        value: nlist.n_value,
    }
}

fn section_record(index: usize, section: &Section) -> SectionRecord {
    SectionRecord {
        index,
        name: section.name().ok().map(str::to_string),
        segment: section.segname().ok().map(str::to_string),
        addr: section.addr,
        size: section.size,
        offset: section.offset,
        align: section.align,
        reloff: section.reloff,
        nreloc: section.nreloc,
        flags: section.flags,
    }
}

fn export_record(export: Export<'_>) -> ExportRecord {
    let info = match export.info {
        MachExportInfo::Regular { address, flags } => {
            ExportInfo { kind: ExportKind::Regular, address, flags, ..Default::default() }
        }
        MachExportInfo::Reexport { lib, lib_symbol_name, flags } => ExportInfo {
            kind: ExportKind::Reexport,
            flags,
            lib: Some(lib.to_string()),
            lib_symbol_name: lib_symbol_name.map(str::to_string),
            ..Default::default()
        },
        MachExportInfo::Stub { flags, .. } => {
            ExportInfo { kind: ExportKind::Stub, flags, ..Default::default() }
        }
    };
    ExportRecord { name: export.name, info, size: export.size, offset: export.offset }
}

fn import_record(import: &Import<'_>) -> ImportRecord {
    ImportRecord {
        name: import.name.to_string(),
        dylib: import.dylib.to_string(),
        is_lazy: import.is_lazy,
        offset: import.offset,
        size: import.size,
        address: import.address,
        addend: import.addend,
        is_weak: import.is_weak,
        start_of_sequence_offset: import.start_of_sequence_offset,
    }
}
