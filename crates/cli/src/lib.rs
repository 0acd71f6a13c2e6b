pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "rosterbot",
    about = "Rosterbot operator CLI",
    long_about = "Inspect configuration and administer the keyword reaction map \
                  without going through the chat commands.",
    after_help = "Examples:\n  rosterbot config\n  rosterbot showmap\n  rosterbot updatemap ship 🚢"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with secret redaction")]
    Config,
    #[command(about = "Print the persisted reaction map")]
    Showmap,
    #[command(about = "Set a keyword → emoji pair and publish it to version control")]
    Updatemap {
        #[arg(help = "Keyword to update")]
        keyword: String,
        #[arg(help = "Emoji to associate with the keyword")]
        emoji: String,
        #[arg(long, help = "Write the file without invoking git")]
        no_publish: bool,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Showmap => commands::showmap::run().await,
        Command::Updatemap { keyword, emoji, no_publish } => {
            commands::updatemap::run(&keyword, &emoji, no_publish).await
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
