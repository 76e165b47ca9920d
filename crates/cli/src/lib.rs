pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::commands::price::PriceArgs;

#[derive(Debug, Parser)]
#[command(
    name = "valora",
    about = "Valora operator CLI",
    long_about = "Apply Valora migrations, inspect the effective configuration, and run offline pricing calculations.",
    after_help = "Examples:\n  valora migrate\n  valora config\n  valora price --base-price 1000 --urgenza 3"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Price one line item offline with default or file-supplied weights")]
    Price(PriceArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => commands::config::run(),
        Command::Price(args) => commands::price::run(&args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
