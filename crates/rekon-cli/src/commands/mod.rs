//! CLI subcommands.

pub mod batch;
pub mod process;
pub mod profiles;
