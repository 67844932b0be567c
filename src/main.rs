//! buildorder CLI - Resolve and run dependency-ordered tasks

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = buildorder::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
