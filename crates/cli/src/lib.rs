pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "intake",
    about = "Document intake operator CLI",
    long_about = "Inspect configuration, validate document types, and check readiness of the intake service.",
    after_help = "Examples:\n  intake doctor --json\n  intake config\n  intake doc-types"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, document type definitions, templates, and static assets")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        name = "doc-types",
        about = "List the document types the service can collect",
        long_about = "List the document types the service can collect. Requires a configuration \
                      that passes full validation, including the API key for groq/openai."
    )]
    DocTypes,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::DocTypes => commands::doc_types::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
