use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use olf::commands::{
    categories_command, info_command, query_command, shell_command, tables_command, SessionArgs,
};
use olf::logging::init_logging;

/// Query the structural metadata of Mach-O binaries with SQL.
///
/// This CLI is a thin wrapper around `olf-core` (exposed in code as `olf_core`).
/// Symbols, sections, exports and imports (and optionally segments, load
/// commands and the header) are exposed as tables of an in-memory SQLite
/// database.
#[derive(Parser, Debug)]
#[command(name = "olf", version, about = "Query binary metadata with SQL", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register the tables for a file and list them with their state.
    Tables {
        #[command(flatten)]
        session: SessionArgs,

        /// Emit JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Run one or more SQL statements and print the results.
    Query {
        #[command(flatten)]
        session: SessionArgs,

        /// Statement to run. May be given more than once; runs in order.
        #[arg(long = "sql", value_name = "SQL", required = true)]
        sql: Vec<String>,

        /// Emit each result as a JSON array of objects.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Interactive SQL shell. Statements end with `;`; `.tables`, `.quit`.
    Shell {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Show header, install name, libraries, rpaths and SHA-256 of a file.
    Info {
        /// Object file to inspect.
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Emit JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// List every metadata category and its table.
    Categories {
        /// Emit JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Tables { session, json } => tables_command(&session, json)?,
        Command::Query { session, sql, json } => query_command(&session, &sql, json)?,
        Command::Shell { session } => shell_command(&session)?,
        Command::Info { file, json } => info_command(&file, json)?,
        Command::Categories { json } => categories_command(json)?,
    }

    Ok(())
}
