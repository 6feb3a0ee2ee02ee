use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use olf_core::provider::MachObject;
use olf_core::session::ObjectSummary;

use crate::{absolute_path, sha256_file};

#[derive(Debug, Serialize)]
pub struct InfoReport {
    #[serde(flatten)]
    pub summary: ObjectSummary,
    pub sha256: String,
}

/// Collect the object-level facts for `file` without registering any tables.
pub fn collect_info(file: &Path) -> Result<InfoReport> {
    let object = MachObject::open(file)
        .with_context(|| format!("Failed to open object {}", file.display()))?;
    let summary = ObjectSummary::from_provider(Some(absolute_path(file)?), &object);
    let sha256 = sha256_file(file)?;
    Ok(InfoReport { summary, sha256 })
}

/// Print header, install name, libraries, rpaths and hash of `file`.
pub fn info_command(file: &Path, json: bool) -> Result<()> {
    let report = collect_info(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let summary = &report.summary;
    let header = &summary.header;
    if let Some(path) = &summary.path {
        println!("File: {}", path.display());
    }
    println!("  Format: {}", summary.format);
    println!("  SHA-256: {}", report.sha256);
    println!("  Magic: {:#x}", header.magic);
    println!("  CPU: type {} subtype {}", header.cputype, header.cpusubtype);
    println!("  File type: {}", header.filetype);
    println!("  Load commands: {} ({} bytes)", header.ncmds, header.sizeofcmds);
    println!("  Flags: {:#x}", header.flags);
    println!("  Install name: {}", summary.name.as_deref().unwrap_or("(none)"));
    print_list("Libraries", &summary.libs);
    print_list("Rpaths", &summary.rpaths);
    Ok(())
}

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        println!("  {label}: (none)");
        return;
    }
    println!("  {label}:");
    for item in items {
        println!("    - {item}");
    }
}
