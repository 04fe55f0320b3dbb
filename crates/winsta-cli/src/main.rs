use winsta_core::logging;

mod cli;

use crate::cli::CliCommand;

/// Exit code for a run stopped by Ctrl-C (128 + SIGINT).
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    // Log to the state dir when possible; stderr otherwise.
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", e);
    }

    if let Err(err) = CliCommand::run_from_args().await {
        if cli::is_cancelled(&err) {
            eprintln!("winsta: cancelled");
            std::process::exit(EXIT_CANCELLED);
        }
        eprintln!("winsta error: {:#}", err);
        std::process::exit(1);
    }
}
