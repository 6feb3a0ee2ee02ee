#![allow(dead_code)]

use std::path::{Path, PathBuf};

use object::write::{Mangling, Object, Symbol, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope,
};

/// x86_64 Mach-O relocatable with `_main` and `_helper` in `__TEXT,__text`
/// plus an undefined `_printf`.
pub fn write_macho_fixture(dir: &Path) -> PathBuf {
    let mut obj = Object::new(BinaryFormat::MachO, Architecture::X86_64, Endianness::Little);
    obj.set_mangling(Mangling::None);

    let text = obj.add_section(b"__TEXT".to_vec(), b"__text".to_vec(), SectionKind::Text);
    obj.append_section_data(text, &[0x31, 0xc0, 0xc3, 0x90, 0x31, 0xc0, 0xc3, 0x90], 16);
    for (name, value) in [(&b"_main"[..], 0u64), (&b"_helper"[..], 4)] {
        obj.add_symbol(Symbol {
            name: name.to_vec(),
            value,
            size: 4,
            kind: SymbolKind::Text,
            scope: SymbolScope::Dynamic,
            weak: false,
            section: SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
    }
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

    let path = dir.join("fixture.o");
    std::fs::write(&path, obj.write().expect("write mach-o")).expect("write fixture");
    path
}
