use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use quickdict::reporter::TracingReporter;
use quickdict::{engine, import};
use quickdict::{Config, DictionaryEngine, IndexSpec, WriteOptions};

#[derive(Parser)]
pub(crate) struct BuildArgs {
    /// Text file with one `lang1 :: lang2` entry per line, optionally gzip
    /// compressed.
    input: PathBuf,
    /// Where to write the dictionary.
    output: PathBuf,
    /// Locale of the first column, such as `de`.
    #[arg(long, value_name = "locale")]
    lang1: String,
    /// Locale of the second column, such as `en`.
    #[arg(long, value_name = "locale")]
    lang2: String,
    /// Description stored in the dictionary.
    #[arg(long)]
    description: Option<String>,
}

pub(crate) fn run(config: &Config, args: &BuildArgs) -> Result<()> {
    let start = Instant::now();

    let specs = [
        IndexSpec::new(&args.lang1.to_uppercase(), &args.lang1, &args.lang1, false),
        IndexSpec::new(&args.lang2.to_uppercase(), &args.lang2, &args.lang2, true),
    ];

    let description = match &args.description {
        Some(description) => description.clone(),
        None => format!("{} -> {}", args.lang1, args.lang2),
    };

    let mut engine = DictionaryEngine::new(&description, specs)
        .with_max_token_chars(config.build.max_token_chars);

    let name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let source = engine.add_source(&name);

    import::import_path(
        &mut engine,
        source,
        &args.input,
        &config.stream,
        &TracingReporter,
    )
    .with_context(|| anyhow!("{}", args.input.display()))?;

    let dictionary = engine.build(&TracingReporter)?;

    let options = WriteOptions {
        compression: config.build.compression_level,
        ..WriteOptions::default()
    };

    engine::write_path(&dictionary, &args.output, &options, &config.stream)
        .with_context(|| anyhow!("{}", args.output.display()))?;

    let duration = start.elapsed();
    tracing::info!(?duration, "Built {}", args.output.display());
    Ok(())
}
