//! transdrill CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "transdrill",
    version,
    about = "Translation drills with streak-based mastery"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Score locally and use built-in question templates (no network)
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one answer against a reference translation
    Check {
        /// The learner's translation
        #[arg(long)]
        answer: String,

        /// The model translation to score against
        #[arg(long)]
        reference: String,

        /// Grammar or topic note passed to the scorer
        #[arg(long)]
        context: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a new question with the same pattern as a level's challenge
    Generate {
        /// Level whose challenge is the pattern source
        #[arg(long, default_value = "1")]
        level: u32,

        /// Topic for the new sentence
        #[arg(long)]
        topic: Option<String>,

        /// Level catalog file or directory
        #[arg(long)]
        levels: Option<PathBuf>,

        /// Print the question as JSON
        #[arg(long)]
        json: bool,
    },

    /// List levels and whether they are unlocked
    Levels {
        /// Level catalog file or directory
        #[arg(long)]
        levels: Option<PathBuf>,
    },

    /// Validate level catalog TOML files
    Validate {
        /// Path to a catalog file or directory
        #[arg(long)]
        levels: PathBuf,
    },

    /// Practice a level interactively
    Practice {
        /// Level to practice
        #[arg(long, default_value = "1")]
        level: u32,

        /// Topic for generated follow-up questions
        #[arg(long)]
        topic: Option<String>,

        /// Level catalog file or directory
        #[arg(long)]
        levels: Option<PathBuf>,
    },

    /// Show or reset journey progress
    Progress {
        #[command(subcommand)]
        action: ProgressAction,
    },

    /// Create starter config and example level catalog
    Init,
}

#[derive(Subcommand)]
enum ProgressAction {
    /// Show completed and unlocked levels
    Show,
    /// Forget all progress
    Reset,
}

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("transdrill=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    let offline = cli.offline;

    let result = match cli.command {
        Commands::Check {
            answer,
            reference,
            context,
            json,
        } => commands::check::execute(answer, reference, context, json, offline, config).await,
        Commands::Generate {
            level,
            topic,
            levels,
            json,
        } => commands::generate::execute(level, topic, levels, json, offline, config).await,
        Commands::Levels { levels } => commands::levels::execute(levels, config),
        Commands::Validate { levels } => commands::validate::execute(levels),
        Commands::Practice {
            level,
            topic,
            levels,
        } => commands::practice::execute(level, topic, levels, offline, config).await,
        Commands::Progress { action } => match action {
            ProgressAction::Show => commands::progress::show(config),
            ProgressAction::Reset => commands::progress::reset(config),
        },
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
