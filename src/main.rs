//! covseed CLI entry point.

use clap::Parser;

use covseed::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = covseed::cli::run(cli).await;
    std::process::exit(code);
}
