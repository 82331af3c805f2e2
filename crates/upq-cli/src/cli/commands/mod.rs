//! CLI command handlers, one file per command.

mod send;
mod status;

pub use send::run_send;
pub use status::run_status;
