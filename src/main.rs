//! Desplegar CLI — declarative smart-contract deployment.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "desplegar",
    version,
    about = "Declarative smart-contract deployment — dependency-ordered, journaled, resumable"
)]
struct Cli {
    #[command(subcommand)]
    command: desplegar::cli::Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = desplegar::cli::dispatch(cli.command).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
