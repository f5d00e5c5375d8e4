//! fatum CLI entry point
//!
//! Randonautica point finder - CLI + web service

use fatum::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
