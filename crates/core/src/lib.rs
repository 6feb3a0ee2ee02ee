//! olf-core
//!
//! Core library exposing the structural metadata of native binaries
//! (symbols, sections, exports, imports, segments, load commands) as SQL tables.
//!
//! This crate defines the native record model, the per-category row projectors,
//! the lazy table generators, the materialization policy, and the registrar that
//! binds all of it into a SQLite connection through virtual tables.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, embedding hosts, etc.).

pub mod model;
pub mod policy;
pub mod provider;
pub mod table;
pub mod projection;
pub mod engine;
pub mod registrar;
pub mod session;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
