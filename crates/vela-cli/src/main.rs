use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::Level;

mod check;
mod utils;


use check::{CheckArgs, handle_check};

/// Get the version string including git revision
fn version() -> &'static str {
    concat!(env!("CARGO_PKG_VERSION"), " (git:", env!("GIT_HASH"), ")")
}

#[derive(Parser)]
#[command(
    author,
    version = version(),
    about = "Vela type checker",
    long_about = None,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Typecheck serialized programs
    Check {
        /// A `.ron` program bundle, a directory of bundles, or `-` for stdin
        path: String,
        /// Checker options file (RON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output format for diagnostics
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Report every type diagnostic as an error
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_ansi(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check {
            path,
            config,
            format,
            strict,
        } => {
            let args = CheckArgs {
                path,
                config,
                format,
                strict,
            };
            process::exit(handle_check(&args));
        }
    }
}
