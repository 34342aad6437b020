use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::styles;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// extmod - Load external module bundles and watch their load state
#[derive(Debug, Parser)]
#[command(name = "extmod", author, about, version, styles=styles::styles())]
pub struct ExtmodArgs {
    /// The subcommand to run
    #[command(subcommand)]
    pub subcommand: ExtmodSubcommand,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum ExtmodSubcommand {
    /// Load a module bundle and print every load state transition
    #[command(name = "load")]
    Load {
        /// Absolute URL of the module bundle
        #[arg(value_name = "URL")]
        url: String,

        /// The name the bundle publishes its module under
        #[arg(short, long, value_name = "KEY")]
        key: String,

        /// Globals to seed before the bundle runs (NAME=JSON)
        #[arg(short, long = "global", value_name = "NAME=JSON")]
        globals: Vec<String>,

        /// Path to a TOML configuration file
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Override the slow-load threshold in milliseconds
        #[arg(long, value_name = "MS")]
        slow_ms: Option<u64>,

        /// Observe the URL this many times with fresh projectors sharing one cache
        #[arg(short, long, default_value_t = 1)]
        repeat: u32,
    },
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
