use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "route-optique",
    version,
    about = "Search fiber-optic route sheets and count box connection points"
)]
pub struct Cli {
    #[command(flatten)]
    pub tables: TableArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find rows and print their routes
    Search(SearchArgs),
    /// List (or filter) the box catalogue
    Boxes(BoxesArgs),
    /// Count connection points of a box from the lookup table
    Prises(PrisesArgs),
    /// Show how route-table columns were classified
    Columns,
}

#[derive(Args, Debug, Clone)]
pub struct TableArgs {
    /// Route (ROP) table, CSV or Excel workbook
    #[arg(long, global = true)]
    pub route: Option<PathBuf>,

    /// Lookup (STBAN) table, CSV or Excel workbook
    #[arg(long, global = true)]
    pub lookup: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// CSV field separator, overrides the configuration
    #[arg(long, global = true)]
    pub separator: Option<char>,

    /// Print JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    pub term: String,

    /// Match the term exactly against box and cable columns
    #[arg(long = "box", default_value_t = false)]
    pub box_mode: bool,

    /// With --box, keep only hops whose state is STOCKEE
    #[arg(long, default_value_t = false)]
    pub stored_only: bool,

    /// Emit HTML fragments instead of text
    #[arg(long, default_value_t = false)]
    pub html: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BoxesArgs {
    /// Keep names containing this text
    #[arg(long)]
    pub query: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PrisesArgs {
    pub box_name: String,
}
