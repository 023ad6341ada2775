use std::process::ExitCode;

use clap::Parser;
use smartdoc_cli::{Cli, error_message, logging};
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.log_format);

    match smartdoc_cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = ?err, "command failed");
            eprintln!("{}", error_message(&err));
            ExitCode::FAILURE
        }
    }
}
