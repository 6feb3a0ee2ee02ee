use anyhow::Result;

use olf_core::registrar::{CategoryState, TableEntry};

use crate::commands::util::{open_session, SessionArgs};

/// Register the file's tables and list each with its state.
pub fn tables_command(args: &SessionArgs, json: bool) -> Result<()> {
    let session = open_session(args)?;
    let entries = session.tables();

    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    println!("Tables (policy: {}):", session.policy());
    for entry in entries {
        println!("{}", describe_entry(entry));
    }
    Ok(())
}

/// One-line description of a registered table.
pub fn describe_entry(entry: &TableEntry) -> String {
    let detail = match &entry.state {
        CategoryState::CanonicalMaterialized { rows } => format!("materialized, {rows} rows"),
        CategoryState::CanonicalMaterializationFailed { reason } => {
            format!("unavailable: {reason}")
        }
        other => other.label().to_string(),
    };
    match &entry.raw {
        Some(raw) => format!("- {} [{}] (raw: {})", entry.canonical, detail, raw),
        None => format!("- {} [{}]", entry.canonical, detail),
    }
}
