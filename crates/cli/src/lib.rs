pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "docent",
    about = "Document question answering with lead capture",
    long_about = "Ask questions about local documents, hand over contact details when you want \
                  a call back, and inspect runtime configuration.",
    after_help = "Examples:\n  docent chat --doc handbook.txt\n  docent validate --name Jo \
                  --phone '201-555-0123' --email jo@example.com --date 'next monday'\n  \
                  docent doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Index documents and start an interactive question-answering session")]
    Chat {
        #[arg(long = "doc", required = true, help = "Text file to index (repeatable)")]
        docs: Vec<PathBuf>,
    },
    #[command(about = "Validate one set of lead details and return structured status output")]
    Validate(commands::validate::ValidateArgs),
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and check that the configured LLM provider responds")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { docs } => commands::chat::run(&docs),
        Command::Validate(args) => commands::validate::run(&args),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
