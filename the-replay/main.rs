//! Replay an operation log against a document.
//!
//! Reads a document and a JSON array of operations, applies them through a
//! normalizing editor and prints the resulting document. With `--invert`, the
//! inverse of everything applied (normalization repairs included) is run
//! afterwards to check that it leads back to the starting document.

mod replay;

use std::path::PathBuf;

use clap::Parser;
use eyre::{
  Result,
  WrapErr,
};
use the_doc::{
  Value,
  config::Config,
};
use tracing_subscriber::EnvFilter;

use crate::replay::Options;

#[derive(Debug, Parser)]
#[command(name = "the-replay")]
#[command(about = "Apply an operation log to a document and print the result")]
struct Cli {
  /// Document JSON file
  document: PathBuf,

  /// Operation log JSON file, an array of operations
  operations: PathBuf,

  /// Editor config TOML file
  #[arg(long)]
  config: Option<PathBuf>,

  /// Also apply the inverted log and check that it restores the document
  #[arg(long)]
  invert: bool,

  /// Normalize the whole document before replaying
  #[arg(long)]
  force_normalize: bool,

  /// Log filter, e.g. `debug` or `the_doc=trace`; defaults to `RUST_LOG`
  #[arg(long)]
  log_level: Option<String>,
}

fn init_tracing(level: Option<&str>) {
  let filter = match level {
    Some(level) => EnvFilter::new(level),
    None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.log_level.as_deref());

  let config = match &cli.config {
    Some(path) => Config::from_file(path)?,
    None => Config::default(),
  };
  let value: Value = serde_json::from_value(replay::read_json(&cli.document)?)
    .wrap_err("document is not a valid value")?;
  let operations = replay::decode_log(replay::read_json(&cli.operations)?)?;

  let outcome = replay::run(value, operations, config, Options {
    invert:          cli.invert,
    force_normalize: cli.force_normalize,
  })?;

  println!("{}", serde_json::to_string_pretty(&*outcome.value)?);
  Ok(())
}
