mod cmd;
mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// cfbuild - Build driver for the Clownfish Python extension
#[derive(Parser)]
#[command(name = "cfbuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project directory (the host binding root, e.g. runtime/python)
  #[arg(long, global = true, default_value = ".")]
  root: PathBuf,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Probe, generate bindings, build the core archive, and link the extension
  Build,

  /// Remove generated artifacts
  Clean {
    /// Also remove build output and the generator staging area
    #[arg(long)]
    all: bool,
  },

  /// Compile and run the configuration probe only
  Charmony,

  /// Build the runtime core static archive
  Libclownfish,

  /// Build the extension, then run the test suite
  Test,

  /// Show platform, toolchain, and project information
  Info,
}

fn init_logging(verbose: bool) {
  let default = if verbose { "info" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .without_time()
    .with_writer(std::io::stderr)
    .init();
}

fn resolve_root(root: &Path) -> Result<PathBuf> {
  dunce::canonicalize(root).with_context(|| format!("Project directory not found: {}", root.display()))
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let code = match run(cli) {
    Ok(code) => code,
    Err(err) => {
      output::print_error(&format!("{:#}", err));
      1
    }
  };
  std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
  let root = resolve_root(&cli.root)?;
  debug!(root = %root.display(), "resolved project root");
  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")?;

  match cli.command {
    Commands::Build => rt.block_on(cmd::cmd_build(&root, cli.output)),
    Commands::Clean { all } => rt.block_on(cmd::cmd_clean(&root, all, cli.output)),
    Commands::Charmony => rt.block_on(cmd::cmd_charmony(&root, cli.output)),
    Commands::Libclownfish => rt.block_on(cmd::cmd_libclownfish(&root, cli.output)),
    Commands::Test => rt.block_on(cmd::cmd_test(&root, cli.output)),
    Commands::Info => rt.block_on(cmd::cmd_info(&root, cli.output)),
  }
}
