mod cmd;
mod logging;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "casefile", version, about = "File-first record tracking")]
struct Cli {
    /// Store root (defaults to the nearest `.casefile` directory upward
    /// from the working directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Override the author handle for this invocation only
    #[arg(long)]
    handle: Option<String>,

    /// Override the author email for this invocation only
    #[arg(long)]
    email: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Initialize a store
    Init(InitArgs),

    /// Manage user configuration
    Config(ConfigArgs),

    /// Create a record
    Create(CreateArgs),

    /// Show a record and its notes
    View(ViewArgs),

    /// List and search records
    List(ListArgs),

    /// Update a record's metadata
    Update(UpdateArgs),

    /// Work with a record's notes
    #[command(subcommand)]
    Note(NoteCommands),

    /// Rebuild the index from files
    Reindex,

    /// Report drift between files and index without repairing it
    Diagnose(DiagnoseArgs),

    /// Serve line-delimited JSON requests on stdin
    Io,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Header format for documents in this store
    #[arg(long, default_value = "yaml", value_parser = ["yaml", "toml"])]
    pub format: String,

    /// Identifier allocation scheme
    #[arg(long, default_value = "random", value_parser = ["random", "sequential"])]
    pub id_scheme: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Set the default author identity
    SetUser {
        #[arg(long)]
        handle: String,
        #[arg(long)]
        email: String,
    },
    /// Show the default author identity
    GetUser,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Record title
    #[arg(long)]
    pub title: String,

    /// Body text (reads stdin when omitted and piped)
    #[arg(long)]
    pub body: Option<String>,

    /// Single-value KV: 'key$text', 'key#42', 'key%1.5' (repeatable)
    #[arg(short = 'k', long = "kv")]
    pub kv: Vec<String>,

    /// Multi-value KV, appends instead of replacing (repeatable)
    #[arg(short = 'm', long = "kmv")]
    pub kmv: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ViewArgs {
    pub record_id: String,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Case-insensitive substring over title, body and KV strings
    #[arg(long)]
    pub search: Option<String>,

    /// KV filter: 'key=value', 'cost>100', 'count<=5' (repeatable, ANDed)
    #[arg(long = "ksearch")]
    pub ksearch: Vec<String>,

    /// KV sort keys: 'cost,priority-,name+'
    #[arg(long = "ksort")]
    pub ksort: Option<String>,

    /// Maximum records to show
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub record_id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// Single-value KV: replaces the key, or 'key-' removes it (repeatable)
    #[arg(short = 'k', long = "kv")]
    pub kv: Vec<String>,

    /// Multi-value KV: appends, or 'key$v-' removes one value (repeatable)
    #[arg(short = 'm', long = "kmv")]
    pub kmv: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum NoteCommands {
    /// Append a note to a record
    Add {
        record_id: String,
        /// Note message (reads stdin when omitted and piped)
        #[arg(long)]
        message: Option<String>,
        /// Single-value KV for the note (repeatable)
        #[arg(short = 'k', long = "kv")]
        kv: Vec<String>,
    },
    /// List a record's notes
    List { record_id: String },
}

#[derive(Debug, Args)]
pub struct DiagnoseArgs {
    /// Exit non-zero when drift is found
    #[arg(long)]
    pub strict: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::init(cli.log_file.as_deref());

    let ctx = cmd::Context {
        root: cli.root,
        handle: cli.handle,
        email: cli.email,
    };

    match cli.command {
        Commands::Init(args) => cmd::init::run(&ctx, &args),
        Commands::Config(args) => cmd::config::run(&args.command),
        Commands::Create(args) => cmd::create::run(&ctx, &args),
        Commands::View(args) => cmd::view::run(&ctx, &args),
        Commands::List(args) => cmd::list::run(&ctx, &args),
        Commands::Update(args) => cmd::update::run(&ctx, &args),
        Commands::Note(command) => cmd::note::run(&ctx, &command),
        Commands::Reindex => cmd::reindex::run(&ctx),
        Commands::Diagnose(args) => cmd::diagnose::run(&ctx, &args),
        Commands::Io => cmd::io::run(&ctx),
    }
}
