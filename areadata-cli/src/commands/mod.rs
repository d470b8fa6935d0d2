//! CLI subcommands.

pub mod articles;
pub mod common;
pub mod config;
pub mod files;
pub mod replace;
