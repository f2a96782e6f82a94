use clap::{Parser, Subcommand};
use std::path::PathBuf;
use streams_cli::cmd::{
    self, config::ConfigSubcommand, entry::EntrySubcommand, form::FormSubcommand,
    schema::SchemaSubcommand,
};
use streams_cli::root;

#[derive(Parser)]
#[command(
    name = "streams",
    about = "Entry forms over runtime-defined streams: render, validate, save, notify",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .streams/ or .git/)
    #[arg(long, global = true, env = "STREAMS_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Debug logging (RUST_LOG still applies)
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold .streams/ with a sample stream and form
    Init,

    /// Inspect stream schemas
    Schema {
        #[command(subcommand)]
        subcommand: SchemaSubcommand,
    },

    /// Validate form configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Display or submit an entry form
    Form {
        #[command(subcommand)]
        subcommand: FormSubcommand,
    },

    /// Browse stored entries
    Entry {
        #[command(subcommand)]
        subcommand: EntrySubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Schema { subcommand } => cmd::schema::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Form { subcommand } => cmd::form::run(&root, subcommand, cli.json),
        Commands::Entry { subcommand } => cmd::entry::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
