pub mod categories;
pub mod info;
pub mod query;
pub mod shell;
pub mod tables;
pub mod util;

pub use categories::*;
pub use info::*;
pub use query::*;
pub use shell::*;
pub use tables::*;
pub use util::*;
