//! CLI subcommand implementations for the assist-transfers binary.

pub mod harvest_cmd;
pub mod institutions_cmd;
pub mod output;
