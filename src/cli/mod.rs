//! Command-line surface: forward build (default), reverse-only rebuild, and lookups.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::mapping::builder::{
    BuildOptions, DEFAULT_CONCURRENCY, DEFAULT_PAGE_RETRIES, DEFAULT_PAGE_SIZE,
};
use crate::mapping::store::DataDir;

pub mod build;
pub mod lookup;

#[derive(Parser, Debug)]
#[command(
    name = "monarch-omim",
    version,
    about = "Build and query Monarch Initiative ↔ OMIM identifier mappings",
    long_about = "Without a subcommand, fetches every disease (plus optional gene and phenotype) \
                  record from the Monarch search API, writes the Monarch → OMIM table, then \
                  derives the OMIM → Monarch table."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding monarch-omim.json and omim-monarch.json
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    #[command(flatten)]
    pub build: BuildArgs,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Also map genes (biolink:Gene)
    #[arg(long)]
    pub genes: bool,

    /// Also map phenotypes (biolink:PhenotypicFeature)
    #[arg(long)]
    pub phenotypes: bool,

    /// Only rebuild omim-monarch.json from the existing monarch-omim.json
    #[arg(long)]
    pub reverse: bool,

    /// Search page size (1-500)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Concurrent page fetches per category (1-8)
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Retries for a failing page before its category is aborted (0-10)
    #[arg(long, default_value_t = DEFAULT_PAGE_RETRIES)]
    pub retries: u32,

    /// Do not keep monarch-omim.backup.json when replacing the forward table
    #[arg(long)]
    pub no_backup: bool,
}

impl BuildArgs {
    pub fn options(&self) -> BuildOptions {
        BuildOptions::new(self.genes, self.phenotypes)
            .with_page_size(self.page_size)
            .with_concurrency(self.concurrency)
            .with_retries(self.retries, Duration::from_millis(500))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Translate identifiers using the persisted tables
    Lookup(lookup::LookupArgs),
}

/// Runs the selected workflow and returns the text to print on stdout.
///
/// # Errors
///
/// Returns an error when any selected category fails to build, when the
/// forward table cannot be read in `--reverse` mode, or when writing a table fails.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let data_dir = DataDir::new(cli.data_dir);
    match cli.command {
        Some(Commands::Lookup(args)) => lookup::run(args, &data_dir).await,
        None if cli.build.reverse => build::run_reverse(&data_dir).await,
        None => build::run_forward(&cli.build, &data_dir).await,
    }
}
