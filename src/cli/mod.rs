//! Command-line interface for podcastify.
//!
//! Provides commands for downloading and delivering audio, uploading local
//! files through the fallback chain, resolving titles and listing backends.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands, ConfigArgs};
