use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::render::Format;

#[derive(Debug, Parser)]
#[command(
    name = "devshelf",
    about = "Offline fuzzy search and reader for API documentation",
    version
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fuzzy-search entry names across installed docs
    Search(SearchArgs),
    /// Render one entry of an installed doc
    Show(ShowArgs),
    /// List installed docs
    List(ListArgs),
    /// Browse the cached catalog of docs that can be imported
    Available(AvailableArgs),
    /// Install a doc from a downloaded index and content database
    Import(ImportArgs),
    /// Remove installed docs
    Uninstall(UninstallArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Search only within these docs (repeatable, `name@version` accepted)
    #[arg(short = 'd', long = "doc", value_delimiter = ',')]
    pub docs: Vec<String>,

    /// Maximum number of results
    #[arg(short = 'n', long, short_alias = 'l', default_value = "10")]
    pub limit: usize,

    /// Output format for the rendered entry
    #[arg(short, long, value_enum, default_value_t)]
    pub format: Format,

    /// List matches instead of showing the best one
    #[arg(long)]
    pub list: bool,

    /// Do not truncate rendered content
    #[arg(long)]
    pub full: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Show --

#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Installed doc slug
    pub doc: String,

    /// Entry path, as printed by `search`
    pub path: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: Format,

    /// Do not truncate rendered content
    #[arg(long)]
    pub full: bool,
}

// -- List --

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Available --

#[derive(Debug, Parser)]
pub struct AvailableArgs {
    /// Only show docs whose name contains this (case-insensitive)
    pub query: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Import --

#[derive(Debug, Parser)]
pub struct ImportArgs {
    /// Slug to install under (`name@version` accepted)
    pub doc: String,

    /// Path to the doc's index.json
    #[arg(long)]
    pub index: PathBuf,

    /// Path to the doc's db.json (`{ path: html }`)
    #[arg(long)]
    pub db: PathBuf,

    /// Catalog (docs.json) to take metadata from and cache
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

// -- Uninstall --

#[derive(Debug, Parser)]
pub struct UninstallArgs {
    /// Docs to remove
    #[arg(required = true)]
    pub docs: Vec<String>,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "devshelf",
            &mut std::io::stdout(),
        );
    }
}
