use std::process::ExitCode;

use clap::Parser;
use cli::Cli;

mod cli;
mod commands;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    Cli::parse().start().await
}
