use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// packwright - hash-verified, hermetic builds packaged as container images
#[derive(Parser, Debug)]
#[command(name = "packwright")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print a one-line JSON summary instead of human output
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (-v, -vv, -vvv); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve dependencies and compile the executable into <out>/bin
    BuildPackage(BuildArgs),

    /// Resolve, compile and assemble the container image archive
    BuildImage(BuildArgs),
}

/// Arguments shared by both actions
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct BuildArgs {
    /// Path to packwright.toml
    #[arg(short, long, default_value = "packwright.toml")]
    pub config: PathBuf,

    /// Build profile (overrides build.profile and PACKWRIGHT_PROFILE)
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Output directory
    #[arg(short, long, default_value = "out")]
    pub out: PathBuf,
}
