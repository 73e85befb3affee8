use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docconv")]
#[command(author, version, about = "Document conversion service")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP conversion server
    Start {
        /// Host to bind to (overrides config and LISTEN_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and LISTEN_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Convert a single local file
    Convert {
        /// Document to convert
        #[arg(required = true)]
        input: PathBuf,

        /// Destination format extension, e.g. pdf
        #[arg(long = "to")]
        to: String,

        /// Where to write the result (defaults to the input name with the new extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List registered document formats
    Formats,

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
