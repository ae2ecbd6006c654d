//! CLI subcommands

pub mod evaluate;
pub mod status;
