//! In-memory provider shared by the integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use object::write::{Mangling, Object, Symbol, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope,
};

use olf_core::model::{
    ExportInfo, ExportKind, ExportRecord, HeaderRecord, ImportRecord, LoadCommandRecord,
    SectionRecord, SegmentRecord, SymbolRecord, SymbolType,
};
use olf_core::policy::MetadataCategory;
use olf_core::provider::{ObjectProvider, ProviderError, ProviderResult, RecordStream};

/// Fixed records plus per-category scan counters and optional decode faults.
#[derive(Debug, Default)]
pub struct FixtureProvider {
    pub header: HeaderRecord,
    pub name: Option<String>,
    pub libs: Vec<String>,
    pub rpaths: Vec<String>,
    pub symbols: Vec<SymbolRecord>,
    pub sections: Vec<SectionRecord>,
    pub exports: Vec<ExportRecord>,
    pub imports: Vec<ImportRecord>,
    pub segments: Vec<SegmentRecord>,
    pub load_commands: Vec<LoadCommandRecord>,
    /// Yield a decode error in place of the export at this index.
    pub export_fault_at: Option<usize>,
    /// Fail `symbols()` before producing any rows.
    pub symbols_unavailable: bool,
    pub symbol_scans: AtomicUsize,
    pub export_scans: AtomicUsize,
    pub import_scans: AtomicUsize,
    /// Import records handed out across every pass.
    pub import_pulls: AtomicUsize,
}

impl FixtureProvider {
    /// A small dylib-shaped object: 3 symbols, 2 sections, 3 exports, 5 imports.
    pub fn sample() -> Self {
        let mut main = SymbolRecord::new("_main", SymbolType::Section);
        main.global = true;
        main.section = 1;
        main.value = 0x1000;
        let mut helper = SymbolRecord::new("_helper", SymbolType::Section);
        helper.section = 1;
        helper.value = 0x1040;
        let mut printf = SymbolRecord::new("_printf", SymbolType::Undefined);
        printf.global = true;
        printf.undefined = true;

        Self {
            header: HeaderRecord {
                magic: 0xfeed_facf,
                cputype: 0x0100_0007,
                cpusubtype: 3,
                filetype: 6,
                ncmds: 4,
                sizeofcmds: 512,
                flags: 0x85,
                reserved: 0,
            },
            name: Some("@rpath/libfixture.dylib".into()),
            libs: vec!["/usr/lib/libSystem.B.dylib".into()],
            rpaths: vec!["@loader_path/../lib".into()],
            symbols: vec![main, helper, printf],
            sections: vec![
                section(1, "__text", "__TEXT", 0x1000, 0x80),
                section(2, "__data", "__DATA", 0x2000, 0x10),
            ],
            exports: vec![
                export("_main", ExportKind::Regular, 0x1000, None),
                export("_helper", ExportKind::Regular, 0x1040, None),
                export("_compat", ExportKind::Reexport, 0, Some("libcompat.dylib")),
            ],
            imports: vec![
                import("_printf", false),
                import("_malloc", true),
                import("_free", true),
                import("_strlen", true),
                import("_exit", false),
            ],
            segments: vec![segment("__TEXT", 0x1000), segment("__DATA", 0x2000)],
            load_commands: vec![
                load_command(32, "LC_SEGMENT_64", 232),
                load_command(264, "LC_SEGMENT_64", 152),
                load_command(416, "LC_SYMTAB", 24),
                load_command(440, "LC_LOAD_DYLIB", 56),
            ],
            ..Default::default()
        }
    }

    pub fn with_export_fault(mut self, index: usize) -> Self {
        self.export_fault_at = Some(index);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn symbol_scans(&self) -> usize {
        self.symbol_scans.load(Ordering::SeqCst)
    }

    pub fn export_scans(&self) -> usize {
        self.export_scans.load(Ordering::SeqCst)
    }

    pub fn import_scans(&self) -> usize {
        self.import_scans.load(Ordering::SeqCst)
    }

    pub fn import_pulls(&self) -> usize {
        self.import_pulls.load(Ordering::SeqCst)
    }
}

impl ObjectProvider for FixtureProvider {
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
        if self.symbols_unavailable {
            return Err(ProviderError::decode(MetadataCategory::Symbols, "symbol table missing"));
        }
        self.symbol_scans.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.symbols.iter().cloned().map(Ok)))
    }

    fn sections(&self) -> ProviderResult<RecordStream<'_, SectionRecord>> {
        Ok(Box::new(self.sections.iter().cloned().map(Ok)))
    }

    fn exports(&self) -> ProviderResult<RecordStream<'_, ExportRecord>> {
        self.export_scans.fetch_add(1, Ordering::SeqCst);
        let fault = self.export_fault_at;
        Ok(Box::new(self.exports.iter().enumerate().map(move |(idx, export)| {
            if Some(idx) == fault {
                Err(ProviderError::decode(MetadataCategory::Exports, "truncated export trie"))
            } else {
                Ok(export.clone())
            }
        })))
    }

    fn imports(&self) -> ProviderResult<RecordStream<'_, ImportRecord>> {
        self.import_scans.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.imports.iter().map(|import| {
            self.import_pulls.fetch_add(1, Ordering::SeqCst);
            Ok(import.clone())
        })))
    }

    fn segments(&self) -> ProviderResult<RecordStream<'_, SegmentRecord>> {
        Ok(Box::new(self.segments.iter().cloned().map(Ok)))
    }

    fn load_commands(&self) -> ProviderResult<RecordStream<'_, LoadCommandRecord>> {
        Ok(Box::new(self.load_commands.iter().cloned().map(Ok)))
    }
}

fn section(index: usize, name: &str, segment: &str, addr: u64, size: u64) -> SectionRecord {
    SectionRecord {
        index,
        name: Some(name.into()),
        segment: Some(segment.into()),
        addr,
        size,
        offset: addr as u32,
        align: 4,
        reloff: 0,
        nreloc: 0,
        flags: 0x8000_0400,
    }
}

fn export(name: &str, kind: ExportKind, address: u64, lib: Option<&str>) -> ExportRecord {
    ExportRecord {
        name: name.into(),
        info: ExportInfo {
            kind,
            address,
            flags: 0,
            lib: lib.map(str::to_string),
            lib_symbol_name: None,
        },
        size: 0,
        offset: address,
    }
}

fn import(name: &str, is_lazy: bool) -> ImportRecord {
    ImportRecord {
        name: name.into(),
        dylib: "/usr/lib/libSystem.B.dylib".into(),
        is_lazy,
        offset: 0x3000,
        size: 8,
        address: 0x3000,
        addend: 0,
        is_weak: false,
        start_of_sequence_offset: 0,
    }
}

fn segment(name: &str, vmaddr: u64) -> SegmentRecord {
    SegmentRecord {
        name: Some(name.into()),
        cmd: 0x19,
        cmdsize: 152,
        vmaddr,
        vmsize: 0x1000,
        fileoff: vmaddr - 0x1000,
        filesize: 0x1000,
        maxprot: 5,
        initprot: 5,
        nsects: 1,
        flags: 0,
    }
}

fn load_command(offset: usize, command: &str, cmdsize: usize) -> LoadCommandRecord {
    LoadCommandRecord { offset, command: command.into(), cmdsize }
}

/// Write a minimal x86_64 Mach-O relocatable with `_main` defined in
/// `__TEXT,__text` and `_printf` undefined.
pub fn write_macho_fixture(dir: &Path) -> PathBuf {
    let mut obj = Object::new(BinaryFormat::MachO, Architecture::X86_64, Endianness::Little);
    obj.set_mangling(Mangling::None);

    let text = obj.add_section(b"__TEXT".to_vec(), b"__text".to_vec(), SectionKind::Text);
    // push rbp; mov rbp, rsp; xor eax, eax; pop rbp; ret
    obj.append_section_data(text, &[0x55, 0x48, 0x89, 0xe5, 0x31, 0xc0, 0x5d, 0xc3], 16);
    obj.add_symbol(Symbol {
        name: b"_main".to_vec(),
        value: 0,
        size: 8,
        kind: SymbolKind::Text,
        scope: SymbolScope::Dynamic,
        weak: false,
        section: SymbolSection::Section(text),
        flags: SymbolFlags::None,
    });
    obj.add_symbol(Symbol {
        name: b"_printf".to_vec(),
        value: 0,
        size: 0,
        kind: SymbolKind::Text,
        scope: SymbolScope::Dynamic,
        weak: false,
        section: SymbolSection::Undefined,
        flags: SymbolFlags::None,
    });

    let bytes = obj.write().expect("write mach-o fixture");
    let path = dir.join("fixture.o");
    std::fs::write(&path, bytes).expect("write fixture file");
    path
}
