//! apkwrap - Android WebView wrapper build pipeline.
//!
//! Validates a build request, generates the themed wrapper project, drives
//! the build toolchain, and publishes the resulting package.

use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Run CLI and get exit code
    let exit_code = match apkwrap::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}
