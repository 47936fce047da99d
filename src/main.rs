use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use pricelens::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for pricelens::AppCommand {
    fn from(cmd: Commands) -> pricelens::AppCommand {
        match cmd {
            Commands::Convert { file, to, markup } => pricelens::AppCommand::Convert {
                input: file,
                to,
                markup,
            },
            Commands::Detect { text, to } => pricelens::AppCommand::Detect { text, to },
            Commands::Rates { base } => pricelens::AppCommand::Rates { base },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Annotate amounts in a page with their converted value
    Convert {
        /// Page to read, one paragraph per line; stdin when omitted
        file: Option<String>,
        /// Target currency, overriding the configured default
        #[arg(short, long)]
        to: Option<String>,
        /// Print markup instead of plain text
        #[arg(short, long)]
        markup: bool,
    },
    /// List the currency amounts found in a text
    Detect {
        text: String,
        /// Target currency, overriding the configured default
        #[arg(short, long)]
        to: Option<String>,
    },
    /// Show exchange rates for a base currency
    Rates { base: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => pricelens::cli::setup::setup(),
        Some(cmd) => pricelens::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
