use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use quickdict::container::VERSION_MIN;
use quickdict::engine;
use quickdict::{Config, DictionaryFile, WriteOptions};

#[derive(Parser)]
pub(crate) struct ConvertArgs {
    /// Dictionary to read.
    input: PathBuf,
    /// Where to write the converted dictionary.
    output: PathBuf,
    /// Container version to write.
    #[arg(long, default_value_t = VERSION_MIN)]
    version: i32,
    /// Drop all html entries and their rows to shrink the output.
    #[arg(long)]
    no_html: bool,
}

pub(crate) fn run(config: &Config, args: &ConvertArgs) -> Result<()> {
    let data = engine::read_bytes(&args.input, &config.stream)
        .with_context(|| anyhow!("{}", args.input.display()))?;

    let file = DictionaryFile::open(&data).with_context(|| anyhow!("{}", args.input.display()))?;

    tracing::info!(
        from = file.version(),
        to = args.version,
        no_html = args.no_html,
        "Converting {}",
        args.input.display()
    );

    let dictionary = file
        .to_dictionary()
        .with_context(|| anyhow!("{}", args.input.display()))?;

    let mut options = WriteOptions {
        version: args.version,
        compression: config.build.compression_level,
        ..WriteOptions::default()
    };

    if args.no_html {
        options = options.without_html();
    }

    let len = engine::write_path(&dictionary, &args.output, &options, &config.stream)
        .with_context(|| anyhow!("{}", args.output.display()))?;

    tracing::info!(len, "Wrote {}", args.output.display());
    Ok(())
}
