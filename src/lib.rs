//! alfred-ssh - SSH shells and port forwards from Alfred
//!
//! Every open port forward is an `ssh` multiplexing master whose control
//! socket lives in a registry directory. The socket's file name encodes the
//! forward, so the directory listing is the only state there is.

pub mod commands;
pub mod config;
pub mod forwarding;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::Cli;

/// Initialize logging
///
/// Logs go to stderr: stdout carries the Alfred JSON and the CLI result lines.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match commands::dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
