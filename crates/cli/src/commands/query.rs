use anyhow::{anyhow, Context, Result};

use crate::commands::util::{open_session, render_table, rows_as_json, SessionArgs};

/// Run each `--sql` argument in order against one session.
///
/// An argument may hold several `;`-separated statements; each prints its own result.
pub fn query_command(args: &SessionArgs, statements: &[String], json: bool) -> Result<()> {
    if statements.is_empty() {
        return Err(anyhow!("No SQL given (pass at least one --sql)"));
    }
    let session = open_session(args)?;
    for sql in statements {
        let outputs = session.query_all(sql).with_context(|| format!("Query failed: {sql}"))?;
        for output in &outputs {
            if json {
                println!("{}", serde_json::to_string_pretty(&rows_as_json(output)?)?);
            } else {
                print!("{}", render_table(output));
            }
        }
    }
    Ok(())
}
