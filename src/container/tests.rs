use crate::collation::Registry;
use crate::entry::{Dictionary, EntrySource, HtmlEntry, Pair, PairEntry, TextEntry};
use crate::error::Error;
use crate::index::{EntryRef, Index, IndexBuilder, IndexSpec, Row};
use crate::reporter::TracingReporter;
use crate::tokenizer::EntryTypeTag;

use super::{read, to_vec, DictionaryFile, WriteOptions, SENTINEL, VERSION_CURRENT};

fn index(spec: IndexSpec, postings: &[(&str, EntryRef, EntryTypeTag)]) -> Index {
    let registry = Registry::default();
    let collation = registry.collation(&spec.locale, &spec.normalizer).unwrap();
    let mut builder = IndexBuilder::new(spec, collation, 64);

    for &(token, entry, tag) in postings {
        builder.add(token, entry, tag, 1);
    }

    builder.build(&TracingReporter)
}

fn sample() -> Dictionary {
    let de = index(
        IndexSpec::new("DE", "German", "de", false),
        &[
            ("Hund", EntryRef::Pair(0), EntryTypeTag::Headword),
            ("Katze", EntryRef::Pair(1), EntryTypeTag::Headword),
            ("Hund", EntryRef::Html(0), EntryTypeTag::Headword),
            ("Hund", EntryRef::Text(0), EntryTypeTag::Note),
            ("Straße", EntryRef::Html(1), EntryTypeTag::Headword),
        ],
    );

    let en = index(
        IndexSpec::new("EN", "English", "en", true),
        &[
            ("dog", EntryRef::Pair(0), EntryTypeTag::Headword),
            ("cat", EntryRef::Pair(1), EntryTypeTag::Headword),
        ],
    );

    Dictionary {
        created: 1_700_000_000_000,
        description: String::from("German-English sample"),
        sources: vec![
            EntrySource {
                name: String::from("sample"),
                count: 3,
            },
            EntrySource {
                name: String::from("articles"),
                count: 2,
            },
        ],
        pair_entries: vec![
            PairEntry {
                source: 0,
                pairs: vec![Pair::new("Hund", "dog")],
            },
            PairEntry {
                source: 0,
                pairs: vec![Pair::new("Katze", "cat"), Pair::new("Kätzchen", "kitten")],
            },
        ],
        text_entries: vec![TextEntry {
            source: 0,
            text: String::from("Hunde bellen."),
        }],
        html_entries: vec![
            HtmlEntry {
                source: 1,
                title: String::from("Hund"),
                html: String::from("<p>Der <b>Hund</b> ist ein Haustier.</p>"),
            },
            HtmlEntry {
                source: 1,
                title: String::from("Straße"),
                html: "<p>Eine Straße.</p>".repeat(20),
            },
        ],
        indices: vec![de, en],
    }
}

#[test]
fn test_round_trip() {
    let dictionary = sample();
    let data = to_vec(&dictionary, &WriteOptions::default()).unwrap();
    assert_eq!(read(&data).unwrap(), dictionary);
}

#[test]
fn test_rewrite_is_identical() {
    let dictionary = sample();
    let options = WriteOptions::default();

    let first = to_vec(&dictionary, &options).unwrap();
    let second = to_vec(&read(&first).unwrap(), &options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_empty_dictionary() {
    let dictionary = Dictionary {
        created: 0,
        description: String::new(),
        sources: Vec::new(),
        pair_entries: Vec::new(),
        text_entries: Vec::new(),
        html_entries: Vec::new(),
        indices: Vec::new(),
    };

    let data = to_vec(&dictionary, &WriteOptions::default()).unwrap();
    assert_eq!(read(&data).unwrap(), dictionary);
}

#[test]
fn test_lazy_access() {
    let dictionary = sample();
    let data = to_vec(&dictionary, &WriteOptions::default()).unwrap();

    let file = DictionaryFile::open(&data).unwrap();
    assert_eq!(file.version(), VERSION_CURRENT);
    assert_eq!(file.description(), "German-English sample");
    assert_eq!(file.pair_entry_count(), 2);
    assert_eq!(file.html_entry_count(), 2);
    assert_eq!(file.index_count(), 2);

    assert_eq!(file.pair_entry(1).unwrap(), dictionary.pair_entries[1]);
    assert_eq!(file.html_entry(1).unwrap(), dictionary.html_entries[1]);
    assert_eq!(file.index(1).unwrap(), dictionary.indices[1]);
    assert!(file.pair_entry(2).is_err());
}

#[test]
fn test_truncated() {
    let data = to_vec(&sample(), &WriteOptions::default()).unwrap();

    for len in [0, 3, 11, data.len() / 2, data.len() - SENTINEL.len() - 1] {
        let result = read(&data[..len]);
        assert!(
            matches!(result, Err(Error::MalformedContainer { .. })),
            "{len}: {result:?}"
        );
    }
}

#[test]
fn test_unsupported_version() {
    let mut data = to_vec(&sample(), &WriteOptions::default()).unwrap();
    data[..4].copy_from_slice(&8i32.to_be_bytes());

    assert!(matches!(
        read(&data),
        Err(Error::UnsupportedVersion { version: 8 })
    ));

    let options = WriteOptions {
        version: 5,
        ..WriteOptions::default()
    };

    assert!(matches!(
        to_vec(&sample(), &options),
        Err(Error::UnsupportedVersion { version: 5 })
    ));
}

#[test]
fn test_compression_level() {
    let options = WriteOptions {
        compression: 99,
        ..WriteOptions::default()
    };

    assert!(matches!(
        to_vec(&sample(), &options),
        Err(Error::CompressionLevel { level: 99 })
    ));

    for compression in [0, 9] {
        let options = WriteOptions {
            compression,
            ..WriteOptions::default()
        };

        let data = to_vec(&sample(), &options).unwrap();
        assert_eq!(read(&data).unwrap(), sample());
    }
}

#[test]
fn test_corrupt_sentinel() {
    let mut data = to_vec(&sample(), &WriteOptions::default()).unwrap();
    let last = data.len() - 1;
    data[last] = b'X';

    assert!(matches!(
        read(&data),
        Err(Error::CorruptContainer { .. })
    ));
}

#[test]
fn test_without_html() {
    let dictionary = sample();
    let options = WriteOptions::default().without_html();
    let data = to_vec(&dictionary, &options).unwrap();
    let decoded = read(&data).unwrap();

    assert!(decoded.html_entries.is_empty());
    assert_eq!(decoded.pair_entries, dictionary.pair_entries);

    for (before, after) in dictionary.indices.iter().zip(&decoded.indices) {
        assert_eq!(before.sorted_index_entries.len(), after.sorted_index_entries.len());
        assert!(after.rows.iter().all(|row| !matches!(row, Row::Html(..))));

        for (b, a) in before.sorted_index_entries.iter().zip(&after.sorted_index_entries) {
            assert_eq!(a.token, b.token);
            assert!(a.html_refs.is_empty());

            let expected = before
                .entry_rows(b)
                .iter()
                .filter(|row| !matches!(row, Row::Html(..)))
                .copied()
                .collect::<Vec<_>>();

            assert_eq!(after.entry_rows(a), expected);
        }
    }

    // Tokens which only had html entries survive as bare markers.
    let de = decoded.index("DE").unwrap();
    let strasse = de
        .sorted_index_entries
        .iter()
        .find(|e| e.token == "Straße")
        .unwrap();
    assert_eq!(strasse.num_rows, 1);
}

#[test]
fn test_version_six_drops_html_refs() {
    let dictionary = sample();

    let de = dictionary.index("DE").unwrap();
    assert!(de.sorted_index_entries.iter().any(|e| !e.html_refs.is_empty()));

    let options = WriteOptions {
        version: 6,
        ..WriteOptions::default()
    };

    let data = to_vec(&dictionary, &options).unwrap();
    let decoded = read(&data).unwrap();

    assert_eq!(DictionaryFile::open(&data).unwrap().version(), 6);
    assert_eq!(decoded.html_entries, dictionary.html_entries);

    let de = decoded.index("DE").unwrap();
    assert!(de.sorted_index_entries.iter().all(|e| e.html_refs.is_empty()));
    assert_eq!(de.rows, dictionary.index("DE").unwrap().rows);
}
