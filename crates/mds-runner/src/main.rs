use clap::Parser;
use mds_runner::{execute_diff, execute_sync, Cli, Commands};
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // `.env` values override the inherited environment, before clap reads it.
    let dotenv = dotenvy::dotenv_override();
    init_tracing();
    match dotenv {
        Ok(path) => debug!(path = %path.display(), "environment file loaded"),
        Err(error) if error.not_found() => {}
        Err(error) => {
            eprintln!("load .env failed: {error}");
            std::process::exit(1);
        }
    }
    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Sync(command) => execute_sync(command),
        Commands::Diff(command) => execute_diff(command),
    };

    match result {
        Ok(output) => {
            println!("{output}");
        }
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    }
}

// Logs go to stderr so stdout stays parseable with `--format json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
