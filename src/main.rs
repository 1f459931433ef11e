mod command;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use quickdict::Config;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Subcommand)]
enum Command {
    /// Rewrite a dictionary using a different container version.
    Convert(command::convert::ConvertArgs),
    /// Build a dictionary out of a `lang1 :: lang2` text file.
    Build(command::build::BuildArgs),
    /// Look up a token in a dictionary.
    Lookup(command::lookup::LookupArgs),
    /// Print information about a dictionary.
    Info(command::info::InfoArgs),
}

#[derive(Parser)]
#[command(name = "quickdict", version)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long, value_name = "path", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let filter = EnvFilter::builder().from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
        .try_init()?;

    let args = Args::try_parse()?;
    let config = Config::load(args.config.as_deref())?;

    match &args.command {
        Command::Convert(convert_args) => command::convert::run(&config, convert_args)?,
        Command::Build(build_args) => command::build::run(&config, build_args)?,
        Command::Lookup(lookup_args) => command::lookup::run(&config, lookup_args)?,
        Command::Info(info_args) => command::info::run(&config, info_args)?,
    }

    Ok(())
}
