pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "dashshare",
    about = "Dashshare operator CLI",
    long_about = "Inspect configuration, check readiness, and exercise the Slack and image URL wiring.",
    after_help = "Examples:\n  dashshare doctor --json\n  dashshare config\n  dashshare channels\n  dashshare preview-url data/png/3f2a.png"
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
    #[command(about = "Validate config, Slack token readiness, and images directory access")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the Slack channels visible to the configured bot token")]
    Channels,
    #[command(about = "Print the public URL a rendered image file would be served from")]
    PreviewUrl {
        #[arg(help = "Path to a rendered image file")]
        file: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Channels => commands::channels::run(),
        Command::PreviewUrl { file } => commands::preview_url::run(&file),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
