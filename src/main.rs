//! recipecalc CLI: recipe amounts from a shareable URL fragment.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "recipecalc",
    version,
    about = "Recipe calculator; the whole recipe lives in a URL fragment"
)]
struct Cli {
    /// Print a JSON report
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: recipecalc::cli::Commands,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("RECIPECALC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let config = recipecalc::cli::CalcConfig { json: cli.json };
    if let Err(e) = recipecalc::cli::dispatch(cli.command, &config) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
