use std::io::{self, BufRead, Write};

use anyhow::Result;

use olf_core::session::{is_complete_statement, Session};

use crate::commands::tables::describe_entry;
use crate::commands::util::{open_session, render_table, SessionArgs};

pub const PROMPT: &str = "ölf> ";
pub const CONTINUATION_PROMPT: &str = " ...> ";

/// Interactive shell on stdin/stdout.
pub fn shell_command(args: &SessionArgs) -> Result<()> {
    let session = open_session(args)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_shell(&session, stdin.lock(), stdout.lock())
}

/// Read `;`-terminated statements from `input` until EOF or `.quit`.
///
/// Query errors are written to `out` and the loop keeps going.
pub fn run_shell<R: BufRead, W: Write>(session: &Session, input: R, mut out: W) -> Result<()> {
    let mut buffer = String::new();
    write!(out, "{PROMPT}")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();

        if buffer.is_empty() && trimmed.starts_with('.') {
            match trimmed {
                ".quit" | ".exit" => return Ok(()),
                ".tables" => {
                    for entry in session.tables() {
                        writeln!(out, "{}", describe_entry(entry))?;
                    }
                }
                ".help" => {
                    writeln!(out, ".tables  list registered tables")?;
                    writeln!(out, ".quit    leave the shell")?;
                }
                other => writeln!(out, "Unknown command: {other} (try .help)")?,
            }
        } else if !trimmed.is_empty() {
            buffer.push_str(&line);
            buffer.push('\n');
            if is_complete_statement(&buffer) {
                let sql = std::mem::take(&mut buffer);
                match session.query_all(&sql) {
                    Ok(outputs) => {
                        for output in &outputs {
                            write!(out, "{}", render_table(output))?;
                        }
                    }
                    Err(err) => writeln!(out, "Error: {err}")?,
                }
            }
        }

        write!(out, "{}", if buffer.is_empty() { PROMPT } else { CONTINUATION_PROMPT })?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}
