//! CLI definition and dispatch.

mod cache;
mod common;
mod generate;
mod serve;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use better_bible::config::Config;

#[derive(Parser, Debug)]
#[command(name = "better-bible", version, about = "Age-tiered Bible study content service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
        /// Port (overrides config)
        #[arg(long, short)]
        port: Option<u16>,
        /// Static asset directory (overrides config)
        #[arg(long)]
        public_dir: Option<PathBuf>,
    },
    /// Generate content for one verse and print it as JSON
    Generate {
        /// Verse reference, e.g. "John 3:16"
        verse: String,
        /// Age tier: 0-6, 7-12, 13-17 or Adult
        #[arg(long, short, default_value = "Adult")]
        age: String,
    },
    /// Inspect or maintain the content cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Remove entries older than the configured maximum age
    Purge {
        /// Maximum age in days (overrides config)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Show backend and entry count
    Stats,
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve {
            bind,
            port,
            public_dir,
        } => serve::cmd_serve(config, bind, port, public_dir).await,
        Commands::Generate { verse, age } => generate::cmd_generate(config, &verse, &age).await,
        Commands::Cache { action } => cache::cmd_cache(config, action).await,
    }
}
