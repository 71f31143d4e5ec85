//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bwx - HTTP bandwidth exerciser
#[derive(Parser)]
#[command(name = "bwx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drive sustained concurrent HTTP transfer to saturate and measure a link")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Hammer one or more URLs with concurrent downloads
    #[command(alias = "dl")]
    Download {
        /// Download URL, repeatable
        #[arg(long = "url", value_name = "URL")]
        urls: Vec<String>,

        /// Concurrent connections total
        #[arg(long, default_value_t = 16)]
        conns: usize,

        /// Run duration like 30s, 5m, 1h
        #[arg(long, default_value = "5m")]
        time: String,

        /// Loop downloads instead of one pass per connection
        #[arg(long = "loop")]
        loop_downloads: bool,

        /// Confirm you have permission to hit these URLs hard
        #[arg(long = "i-understand")]
        i_understand: bool,
    },

    /// Stream filler bytes at an upload target
    #[command(alias = "ul")]
    Upload {
        /// Upload target URL
        #[arg(long, default_value = "http://127.0.0.1:8080/upload")]
        url: String,

        /// Concurrent connections total
        #[arg(long, default_value_t = 16)]
        conns: usize,

        /// Run duration like 30s, 5m, 1h
        #[arg(long, default_value = "5m")]
        time: String,
    },

    /// Run the body-discarding receiving endpoint
    Sink {
        /// Listen port
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}
