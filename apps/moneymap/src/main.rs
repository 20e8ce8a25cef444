//! MoneyMap server binary.

use clap::Parser;
use moneymap::cli::{Cli, Command, cmd_init, cmd_keygen, cmd_serve, cmd_test_email};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "moneymap=info,moneymap_core=info,tower_http=info";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Init { database } => cmd_init(&database.path),
        Command::Keygen => cmd_keygen().map(|_| ()),
        Command::TestEmail { mail, to } => cmd_test_email(&mail, to.as_deref()).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
