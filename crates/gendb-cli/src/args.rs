use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "gendb",
    about = "Invent a company, design its database and fill it with consistent fake data",
    version,
    after_help = "Examples:\n  gendb generate --tables 6 --output pedalo.json\n  gendb generate --summary \"Bike rentals in Lisbon\" --apply --db sqlite://bikes.db\n  gendb synthesize pedalo.json --offline --seed 42\n  gendb apply pedalo.json --db postgres://localhost/pedalo\n  gendb graph pedalo.json --format mermaid"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Invent a company, design its data model and generate rows with an LLM
    Generate(GenerateArgs),

    /// Regenerate the rows of an existing dataset file
    Synthesize(SynthesizeArgs),

    /// Create the tables of a dataset file in a database and insert its rows
    Apply(ApplyArgs),

    /// Show the table dependency graph of a dataset file
    Graph(GraphArgs),
}

/// Flags shared by every command that synthesizes rows.
#[derive(Args, Debug, Default)]
pub struct SynthesisFlags {
    /// Rows generated for a table without foreign keys
    #[arg(long)]
    pub rows_per_base_table: Option<usize>,

    /// Rows per referenced value for a foreign key column
    #[arg(long)]
    pub rows_per_reference: Option<usize>,

    /// Largest number of values asked of the LLM in one call
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Random seed for shuffles and locally generated values
    #[arg(long)]
    pub seed: Option<u64>,

    /// LLM model to use
    #[arg(long)]
    pub model: Option<String>,

    /// Use the local fake-data generator instead of an LLM
    #[arg(long)]
    pub offline: bool,
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// One-paragraph description of the business (invented when omitted)
    #[arg(long)]
    pub summary: Option<String>,

    /// Company name (suggested by the LLM when omitted)
    #[arg(long)]
    pub company: Option<String>,

    /// Approximate number of tables in the data model
    #[arg(long)]
    pub tables: Option<usize>,

    #[command(flatten)]
    pub synthesis: SynthesisFlags,

    /// Dataset file to write
    #[arg(short, long, default_value = "gendb.json")]
    pub output: PathBuf,

    /// Also create the tables and insert the rows into the database
    #[arg(long)]
    pub apply: bool,

    /// Database connection URL (postgres://, mysql://, sqlite://)
    /// Falls back to DATABASE_URL env var, .env file or gendb.toml
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,
}

#[derive(Parser, Debug)]
pub struct SynthesizeArgs {
    /// Dataset file whose tables are populated
    pub file: PathBuf,

    #[command(flatten)]
    pub synthesis: SynthesisFlags,

    /// Dataset file to write (defaults to overwriting FILE)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Dataset file to load
    pub file: PathBuf,

    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,
}

#[derive(Parser, Debug)]
pub struct GraphArgs {
    /// Dataset file whose data model is shown
    pub file: PathBuf,

    /// Output format for the dependency graph
    #[arg(long, default_value = "mermaid")]
    pub format: GraphFormat,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum GraphFormat {
    Mermaid,
    Dot,
    /// Tables in creation order, one per line
    Order,
}
