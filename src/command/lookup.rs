use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use quickdict::collation::Registry;
use quickdict::engine;
use quickdict::{Config, DictionaryFile, Index, Row};

#[derive(Parser)]
pub(crate) struct LookupArgs {
    /// Dictionary to search.
    dictionary: PathBuf,
    /// Token to look up.
    token: String,
    /// Index to search in, by position.
    #[arg(long, default_value_t = 0)]
    index: usize,
    /// List every token starting with the given one instead.
    #[arg(long)]
    prefix: bool,
}

pub(crate) fn run(config: &Config, args: &LookupArgs) -> Result<()> {
    let data = engine::read_bytes(&args.dictionary, &config.stream)
        .with_context(|| anyhow!("{}", args.dictionary.display()))?;

    let file =
        DictionaryFile::open(&data).with_context(|| anyhow!("{}", args.dictionary.display()))?;

    let index = file
        .index(args.index)
        .with_context(|| anyhow!("Index {}", args.index))?;

    let registry = Registry::default();

    let o = std::io::stdout();
    let mut o = o.lock();

    if args.prefix {
        let collation = index.collation(&registry)?;

        for entry in
            engine::prefix_search(&index, &collation, &args.token, config.trie.prune_bound)?
        {
            writeln!(o, "{}", entry.token)?;
        }

        return Ok(());
    }

    let rows = index.row_index(&registry, config.index.token_row_cache)?;
    let matches = rows.matches(&args.token);

    if matches.is_empty() {
        match rows.lookup(&args.token) {
            Some(found) => {
                let closest = &index.sorted_index_entries[found.entry];
                writeln!(
                    o,
                    "No match for `{}`, closest is `{}`",
                    args.token, closest.token
                )?;
            }
            None => {
                writeln!(o, "No match for `{}`", args.token)?;
            }
        }

        return Ok(());
    }

    for (entry, row) in matches {
        write_row(&mut o, &file, &index, &entry.token, row)?;
    }

    Ok(())
}

fn write_row<O>(
    o: &mut O,
    file: &DictionaryFile<'_>,
    index: &Index,
    token: &str,
    row: Row,
) -> Result<()>
where
    O: ?Sized + Write,
{
    let swap = index.swap_pair_entries;

    match row {
        Row::Pair(n) => {
            let entry = file.pair_entry(n as usize)?;

            for pair in &entry.pairs {
                writeln!(o, "{token}: {} :: {}", pair.side(swap), pair.side(!swap))?;
            }
        }
        Row::Text(n) => {
            let entry = file.text_entry(n as usize)?;
            writeln!(o, "{token}: {}", entry.text)?;
        }
        Row::Html(n) => {
            let entry = file.html_entry(n as usize)?;
            writeln!(o, "{token}: {}", entry.title)?;
            writeln!(o, "{}", entry.html)?;
        }
        Row::Token { .. } => {}
    }

    Ok(())
}
