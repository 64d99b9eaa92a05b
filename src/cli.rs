//! CLI entry for vega, defining clap subcommands, installing logging, and dispatching each command handler.
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::command;

// The Cli struct represents the root of the command line interface.
#[derive(Parser, Debug)]
#[command(
    name = "vega",
    about = "Vega: inspect and maintain saved agent sessions",
    version
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Data directory (defaults to $VEGA_DATA_DIR, then the platform data dir)
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// The Commands enum represents the subcommands that can be used with the CLI.
/// subcommand's execute and args are defined in `command` module
#[derive(Subcommand, Debug)]
enum Commands {
    #[command(subcommand, about = "List, show, export and prune saved sessions")]
    Session(command::session::SessionCmds),
    #[command(about = "Print the effective lifecycle configuration")]
    Config(command::config::ConfigArgs),
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    // A subscriber may already be installed when parse runs more than once in-process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parses the command-line arguments and executes the corresponding command.
/// - `args`: parse from command line if it's `None`, otherwise parse from the given args
#[tokio::main]
pub async fn parse(args: Option<&[&str]>) -> anyhow::Result<()> {
    parse_async(args).await
}

/// `async` version of the [parse] function
pub async fn parse_async(args: Option<&[&str]>) -> anyhow::Result<()> {
    let cli = match args {
        Some(args) => Cli::try_parse_from(args)?,
        None => Cli::parse(),
    };
    init_logging(cli.verbose);

    let context = command::Context {
        data_dir: cli.data_dir,
    };
    match cli.command {
        Commands::Session(cmd) => command::session::execute(cmd, &context).await,
        Commands::Config(args) => command::config::execute(args),
    }
}

/// this test is to verify that the CLI can be built without panicking
/// according [clap dock](https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_4/index.html)
#[test]
fn verify_cli() {
    use clap::CommandFactory;

    Cli::command().debug_assert()
}
