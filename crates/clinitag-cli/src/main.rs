//! Clinitag CLI - extract clinical tags from protocol documents.

use clap::Parser;
use clinitag_cli::commands;
use clinitag_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> clinitag_cli::Result<()> {
    let config = Config::load_from(cli.config.as_deref())?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Upload(args) => commands::execute_upload(args, &config, &formatter),
        Command::Sync => commands::execute_sync(&config, &formatter),
        Command::Documents => commands::execute_documents(&config, &formatter),
        Command::Extract(args) => commands::execute_extract(args, &config, &formatter).await,
        Command::Chunks(args) => commands::execute_chunks(args, &config, &formatter),
        Command::Tags(args) => commands::execute_tags(args, &config, &formatter),
        Command::Runs(args) => commands::execute_runs(args, &config, &formatter),
        Command::Events(args) => commands::execute_events(args, &config, &formatter),
    }
}
