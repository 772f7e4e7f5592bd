pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "glassdesk",
    about = "Glassdesk operator CLI",
    long_about = "Inspect configuration, check readiness, classify customer identifiers, and talk to the support assistant from a terminal.",
    after_help = "Examples:\n  glassdesk doctor --json\n  glassdesk config\n  glassdesk classify ABC1D23\n  glassdesk chat"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Show effective configuration with source attribution and redacted secrets")]
    Config,
    #[command(about = "Validate config, reply templates, and session store connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Classify a customer identifier (CPF, phone, plate, chassis, order)")]
    Classify {
        #[arg(help = "Text to classify")]
        text: String,
    },
    #[command(about = "Chat with the assistant on the web channel using demo customers")]
    Chat,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => {
            let (output, passed) = commands::doctor::run(json);
            commands::CommandResult { exit_code: if passed { 0 } else { 1 }, output }
        }
        Command::Classify { text } => commands::classify::run(&text),
        Command::Chat => commands::chat::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
