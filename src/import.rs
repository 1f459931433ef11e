//! Importing plain text dictionary files.
//!
//! Every line holds one entry as `lang1 :: lang2`. Either side may hold
//! several sub-entries separated by `|`, which must be equal in number on
//! both sides and are paired up in order. Blank lines and lines starting with
//! `#` are ignored. Input ending in `.gz` is decompressed.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use thiserror::Error;

use crate::config::StreamConfig;
use crate::engine::DictionaryEngine;
use crate::entry::Pair;
use crate::error::Error;
use crate::reporter::Reporter;
use crate::stream::ReadAhead;
use crate::{report_info, report_warn};

const SEPARATOR: &str = "::";

/// Why a line could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LineError {
    #[error("Missing `::` separator")]
    MissingSeparator,
    #[error("More than one `::` separator")]
    ExtraSeparator,
    #[error("{left} sub-entries on the left but {right} on the right")]
    SubentryMismatch { left: usize, right: usize },
    #[error("Empty sub-entry")]
    EmptySubentry,
    #[error("Line is not valid UTF-8")]
    Utf8,
}

/// Parse a single line into the pairs of one entry.
///
/// Returns `Ok(None)` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<Vec<Pair>>, LineError> {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let Some((left, right)) = line.split_once(SEPARATOR) else {
        return Err(LineError::MissingSeparator);
    };

    if right.contains(SEPARATOR) {
        return Err(LineError::ExtraSeparator);
    }

    let left = left.split('|').map(str::trim).collect::<Vec<_>>();
    let right = right.split('|').map(str::trim).collect::<Vec<_>>();

    if left.len() != right.len() {
        return Err(LineError::SubentryMismatch {
            left: left.len(),
            right: right.len(),
        });
    }

    let mut pairs = Vec::with_capacity(left.len());

    for (a, b) in left.into_iter().zip(right) {
        if a.is_empty() || b.is_empty() {
            return Err(LineError::EmptySubentry);
        }

        pairs.push(Pair::new(a, b));
    }

    Ok(Some(pairs))
}

/// Summary of an import.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Imported {
    pub entries: usize,
    pub skipped: usize,
}

/// Import every line of `input` as a pair entry filed under `source`.
///
/// Malformed lines are reported and skipped.
pub fn import<R>(
    engine: &mut DictionaryEngine,
    source: u32,
    mut input: R,
    reporter: &dyn Reporter,
) -> Result<Imported, Error>
where
    R: BufRead,
{
    let mut imported = Imported::default();
    let mut buf = Vec::new();
    let mut line = 0usize;

    loop {
        buf.clear();

        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        line += 1;

        let result = match std::str::from_utf8(&buf) {
            Ok(text) => parse_line(text),
            Err(..) => Err(LineError::Utf8),
        };

        match result {
            Ok(Some(pairs)) => {
                engine.add_pair_entry(source, pairs)?;
                imported.entries += 1;
            }
            Ok(None) => {}
            Err(error) => {
                report_warn!(reporter, "Line {line}: {error}");
                imported.skipped += 1;
            }
        }
    }

    report_info!(
        reporter,
        "Imported {} entries, skipped {} line(s)",
        imported.entries,
        imported.skipped
    );

    Ok(imported)
}

/// Import a dictionary file, reading it through a background reader.
pub fn import_path(
    engine: &mut DictionaryEngine,
    source: u32,
    path: &Path,
    stream: &StreamConfig,
    reporter: &dyn Reporter,
) -> Result<Imported, Error> {
    let file = File::open(path)?;
    let input = ReadAhead::new(file, stream.block_size, stream.capacity)?;

    let input: Box<dyn Read> = if path.extension().is_some_and(|e| e == "gz") {
        Box::new(GzDecoder::new(input))
    } else {
        Box::new(input)
    };

    import(engine, source, BufReader::new(input), reporter)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::{import, import_path, parse_line, Imported, LineError};
    use crate::config::StreamConfig;
    use crate::engine::DictionaryEngine;
    use crate::entry::Pair;
    use crate::index::IndexSpec;
    use crate::reporter::{CollectingReporter, TracingReporter};

    const INPUT: &str = "\
# German-English sample
Hund :: dog

Katze | Kater :: cat | tomcat
broken line
eins | zwei :: one
  Haus ::   house
";

    fn engine() -> DictionaryEngine {
        DictionaryEngine::new(
            "sample",
            [
                IndexSpec::new("DE", "German", "de", false),
                IndexSpec::new("EN", "English", "en", true),
            ],
        )
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("  "), Ok(None));
        assert_eq!(parse_line("# comment :: here"), Ok(None));
        assert_eq!(
            parse_line("Hund :: dog"),
            Ok(Some(vec![Pair::new("Hund", "dog")]))
        );
        assert_eq!(
            parse_line("Katze|Kater :: cat | tomcat\n"),
            Ok(Some(vec![Pair::new("Katze", "cat"), Pair::new("Kater", "tomcat")]))
        );
        assert_eq!(parse_line("Hund dog"), Err(LineError::MissingSeparator));
        assert_eq!(parse_line("a :: b :: c"), Err(LineError::ExtraSeparator));
        assert_eq!(
            parse_line("a | b :: c"),
            Err(LineError::SubentryMismatch { left: 2, right: 1 })
        );
        assert_eq!(parse_line("a | :: c | d"), Err(LineError::EmptySubentry));
    }

    #[test]
    fn test_import() {
        let mut engine = engine();
        let source = engine.add_source("sample");

        let reporter = CollectingReporter::new();
        let imported = import(&mut engine, source, INPUT.as_bytes(), &reporter).unwrap();

        assert_eq!(
            imported,
            Imported {
                entries: 3,
                skipped: 2
            }
        );

        let warnings = reporter.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("Line 5: "), "{warnings:?}");
        assert!(warnings[1].starts_with("Line 6: "), "{warnings:?}");

        let dictionary = engine.build(&TracingReporter).unwrap();
        assert_eq!(dictionary.sources[0].count, 3);
        assert_eq!(dictionary.pair_entries[2].pairs, [Pair::new("Haus", "house")]);
    }

    #[test]
    fn test_invalid_utf8_is_skipped() {
        let mut engine = engine();
        let source = engine.add_source("sample");

        let input = b"Hund :: dog\n\xff\xfe :: bad\nHaus :: house\n";
        let imported = import(&mut engine, source, &input[..], &TracingReporter).unwrap();

        assert_eq!(
            imported,
            Imported {
                entries: 2,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_import_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt.gz");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(INPUT.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let mut engine = engine();
        let source = engine.add_source("sample");

        let stream = StreamConfig {
            block_size: 16,
            capacity: 64,
        };

        let imported =
            import_path(&mut engine, source, &path, &stream, &TracingReporter).unwrap();

        assert_eq!(imported.entries, 3);
    }
}
