//! Command-line interface.
//!
//! With no subcommand the binary starts the web server. Subcommands run
//! one-off maintenance tasks against the same database:
//! - `sitemap` - Generate sitemap.xml for the public site

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "paisadrive")]
#[command(author, version, about = "Marketplace de carros usados", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "paisadrive.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate sitemap.xml from the current listings
    Sitemap {
        /// Output file path
        #[arg(short, long, default_value = "sitemap.xml")]
        output: PathBuf,

        /// Override the public base URL from the config
        #[arg(long)]
        base_url: Option<String>,
    },
}
