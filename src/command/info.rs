use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use quickdict::engine;
use quickdict::{Config, DictionaryFile};

#[derive(Parser)]
pub(crate) struct InfoArgs {
    /// Dictionary to describe.
    dictionary: PathBuf,
}

pub(crate) fn run(config: &Config, args: &InfoArgs) -> Result<()> {
    let data = engine::read_bytes(&args.dictionary, &config.stream)
        .with_context(|| anyhow!("{}", args.dictionary.display()))?;

    let file =
        DictionaryFile::open(&data).with_context(|| anyhow!("{}", args.dictionary.display()))?;

    let o = std::io::stdout();
    let mut o = o.lock();

    writeln!(o, "Version: {}", file.version())?;
    writeln!(o, "Created: {}", file.created())?;
    writeln!(o, "Description: {}", file.description())?;
    writeln!(o, "Size: {} bytes", data.len())?;
    writeln!(o, "Pair entries: {}", file.pair_entry_count())?;
    writeln!(o, "Text entries: {}", file.text_entry_count())?;
    writeln!(o, "Html entries: {}", file.html_entry_count())?;

    for n in 0..file.source_count() {
        let source = file.source(n)?;
        writeln!(o, "Source #{n}: {} ({} entries)", source.name, source.count)?;
    }

    for n in 0..file.index_count() {
        let index = file.index(n).with_context(|| anyhow!("Index {n}"))?;

        writeln!(o, "Index #{n}: {} ({})", index.short_name, index.long_name)?;
        writeln!(o, "  Locale: {}", index.locale)?;
        writeln!(o, "  Normalizer: {}", index.normalizer)?;
        writeln!(o, "  Swapped pairs: {}", index.swap_pair_entries)?;
        writeln!(o, "  Tokens: {}", index.sorted_index_entries.len())?;
        writeln!(o, "  Main tokens: {}", index.main_token_count)?;
        writeln!(o, "  Rows: {}", index.rows.len())?;
    }

    Ok(())
}
