mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::job::JobSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "opsdesk",
    about = "Dashboard action orchestration — catalog, streaming runs, and setup jobs",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: current directory)
    #[arg(long, global = true, env = "OPSDESK_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an opsdesk workspace in the current directory
    Init,

    /// Validate the action catalog and workspace config
    Check,

    /// List catalog actions, optionally filtered to one surface's offering
    Actions {
        /// Surface to select for (inbox, documents, crm, reviews, bot, phone, setup)
        #[arg(long)]
        surface: Option<String>,
        /// Context JSON for availability predicates
        #[arg(long)]
        context: Option<String>,
    },

    /// Dispatch an action and follow it to completion
    Run {
        /// Action id (aliases accepted)
        action: String,
        /// Context JSON forwarded to the executor
        #[arg(long)]
        context: Option<String>,
        /// Run config JSON (e.g. tone for drafts)
        #[arg(long)]
        config: Option<String>,
    },

    /// Manage long-running setup jobs
    Job {
        #[command(subcommand)]
        subcommand: JobSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = cli
        .root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Check => cmd::check::run(&root, cli.json),
        Commands::Actions { surface, context } => {
            cmd::actions::run(surface.as_deref(), context.as_deref(), cli.json)
        }
        Commands::Run {
            action,
            context,
            config,
        } => cmd::run::run(&root, &action, context.as_deref(), config.as_deref(), cli.json),
        Commands::Job { subcommand } => cmd::job::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
