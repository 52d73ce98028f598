//! packwright CLI - reproducible build pipeline for Cargo projects
//!
//! Usage: packwright <COMMAND>
//!
//! Commands:
//!   build-package  Resolve dependencies and compile the executable
//!   build-image    Resolve, compile and assemble the container image

mod cli;
mod commands;
mod ui;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::BuildPackage(args) => commands::build::cmd_build_package(args, cli.json),
        Commands::BuildImage(args) => commands::build::cmd_build_image(args, cli.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error::print_error(&err, cli.json);
            let code = ui::error::exit_code(&err);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays machine-readable
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
