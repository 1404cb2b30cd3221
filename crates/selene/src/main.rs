//! selene: collect CI test reports into one normalized result stream
//!
//! Parses Robot Framework and JUnit-family XML reports, attaches the build
//! they belong to, and emits the records as JSON lines or stores them in
//! SQLite.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use selene::commands;
use selene::config::Config;

fn main() -> anyhow::Result<ExitCode> {
    let config = Config::parse();

    // Logs go to stderr; stdout carries JSON lines
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_level().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!(?config, "Starting selene");
    config.validate()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(&config, &mut out)
}
