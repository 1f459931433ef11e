use std::cmp::Ordering;

use crate::collation::Registry;
use crate::reporter::{CollectingReporter, Level, TracingReporter};
use crate::tokenizer::EntryTypeTag;

use super::{EntryRef, Index, IndexBuilder, IndexSpec, Row, RowIndex};

fn german(tokens: &[(&str, &[u32])]) -> Index {
    build(IndexSpec::new("DE", "German", "de", false), tokens)
}

fn build(spec: IndexSpec, tokens: &[(&str, &[u32])]) -> Index {
    let registry = Registry::default();
    let collation = registry.collation(&spec.locale, &spec.normalizer).unwrap();
    let mut builder = IndexBuilder::new(spec, collation, 64);

    for (token, entries) in tokens {
        for &entry in entries.iter() {
            builder.add(token, EntryRef::Pair(entry), EntryTypeTag::Headword, 1);
        }
    }

    builder.build(&TracingReporter)
}

fn sample() -> Index {
    german(&[
        ("der", &[0]),
        ("Die", &[1]),
        ("die", &[2]),
        ("gross", &[3]),
        ("Dieb", &[4]),
        ("rennen", &[5, 6]),
    ])
}

#[test]
fn test_sorted_german() {
    let index = sample();

    let tokens = index
        .sorted_index_entries
        .iter()
        .map(|e| e.token.as_str())
        .collect::<Vec<_>>();

    assert_eq!(tokens, ["der", "Die", "die", "Dieb", "gross", "rennen"]);
    assert_eq!(index.main_token_count, 6);
}

#[test]
fn test_ordering_invariant() {
    let index = german(&[
        ("Straße", &[0]),
        ("strasse", &[1]),
        ("Äpfel", &[2]),
        ("apfel", &[3]),
        ("Zug", &[4]),
        ("über", &[5]),
        ("Uber", &[6]),
    ]);

    let collation = index.collation(&Registry::default()).unwrap();

    for w in index.sorted_index_entries.windows(2) {
        let a = collation.normalize(&w[0].token);
        let b = collation.normalize(&w[1].token);
        assert_ne!(collation.compare(&a, &b), Ordering::Greater, "{a} > {b}");
    }
}

#[test]
fn test_lookup_closest() {
    let index = sample();
    let registry = Registry::default();
    let rows = index.row_index(&registry, 16).unwrap();

    let found = rows.lookup("die").unwrap();
    assert_eq!(index.sorted_index_entries[found.entry].token, "Die");
    assert!(found.exact);
    assert_eq!(found.row, index.sorted_index_entries[1].start_row);

    let found = rows.lookup("DIE").unwrap();
    assert_eq!(index.sorted_index_entries[found.entry].token, "Die");

    let found = rows.lookup("dia").unwrap();
    assert_eq!(index.sorted_index_entries[found.entry].token, "Die");
    assert!(!found.exact);

    let found = rows.lookup("zzz").unwrap();
    assert_eq!(index.sorted_index_entries[found.entry].token, "rennen");
    assert!(!found.exact);

    let found = rows.lookup("a").unwrap();
    assert_eq!(found.entry, 0);
}

#[test]
fn test_lookup_every_token() {
    let index = sample();
    let registry = Registry::default();
    let rows = index.row_index(&registry, 16).unwrap();
    let collation = rows.collation();

    for e in &index.sorted_index_entries {
        let found = rows.lookup(&e.token).unwrap();
        let at = &index.sorted_index_entries[found.entry];
        assert!(found.exact);
        assert_eq!(at.normalized_token(), collation.normalize(&e.token));
    }
}

#[test]
fn test_lookup_lower_normalizer() {
    let spec = IndexSpec {
        normalizer: String::from("lower"),
        ..IndexSpec::new("DE", "German", "de", false)
    };

    let index = build(spec, &[("uber", &[0]), ("über", &[1]), ("Uber", &[2])]);

    let tokens = index
        .sorted_index_entries
        .iter()
        .map(|e| e.token.as_str())
        .collect::<Vec<_>>();

    assert_eq!(tokens, ["Uber", "uber", "über"]);

    let registry = Registry::default();
    let rows = index.row_index(&registry, 16).unwrap();

    for e in &index.sorted_index_entries {
        let found = rows.lookup(&e.token).unwrap();
        assert!(found.exact, "{}", e.token);
        assert_eq!(
            index.sorted_index_entries[found.entry].normalized_token(),
            e.normalized_token()
        );
    }

    let found = rows.lookup("ÜBER").unwrap();
    assert!(found.exact);
    assert_eq!(index.sorted_index_entries[found.entry].token, "über");

    let found = rows
        .matches("über")
        .into_iter()
        .map(|(e, row)| (e.token.as_str(), row))
        .collect::<Vec<_>>();

    assert_eq!(found, [("über", Row::Pair(1))]);

    let found = rows
        .matches("UBER")
        .into_iter()
        .map(|(e, row)| (e.token.as_str(), row))
        .collect::<Vec<_>>();

    assert_eq!(found, [("Uber", Row::Pair(2)), ("uber", Row::Pair(0))]);

    let found = rows.lookup("ubel").unwrap();
    assert!(!found.exact);
    assert_eq!(found.entry, 0);
}

#[test]
fn test_lookup_empty() {
    let index = german(&[]);
    let registry = Registry::default();
    let rows = index.row_index(&registry, 16).unwrap();
    assert_eq!(rows.lookup("die"), None);
    assert!(rows.matches("die").is_empty());
}

#[test]
fn test_matches_case_variants() {
    let index = sample();
    let registry = Registry::default();
    let rows = index.row_index(&registry, 16).unwrap();

    let found = rows
        .matches("DIE")
        .into_iter()
        .map(|(e, row)| (e.token.as_str(), row))
        .collect::<Vec<_>>();

    assert_eq!(found, [("Die", Row::Pair(1)), ("die", Row::Pair(2))]);

    let found = rows.matches("rennen");
    assert_eq!(found.len(), 2);
    assert!(rows.matches("renne").is_empty());
}

#[test]
fn test_row_layout() {
    let index = sample();

    for (n, e) in index.sorted_index_entries.iter().enumerate() {
        assert_eq!(
            index.rows[e.start_row as usize],
            Row::Token {
                index_entry: n as u32,
                has_main_entry: true
            }
        );

        for row in index.entry_rows(e) {
            assert!(row.entry().is_some());
        }
    }

    let rows = index
        .sorted_index_entries
        .iter()
        .map(|e| e.num_rows)
        .sum::<u32>();

    assert_eq!(rows as usize, index.rows.len());
}

#[test]
fn test_token_row_cold_and_warm() {
    let index = sample();
    let registry = Registry::default();

    let cold = index.row_index(&registry, 4).unwrap();

    let expected = (0..index.rows.len() as u32)
        .map(|row| cold.token_row(row, true))
        .collect::<Vec<_>>();

    let warm = index.row_index(&registry, 64).unwrap();

    for (pos, _, token) in warm.rows(0) {
        assert_eq!(Some(token), expected[pos as usize]);
    }

    for row in (0..index.rows.len() as u32).rev() {
        assert_eq!(warm.token_row(row, false), expected[row as usize]);
        assert_eq!(warm.token_row(row, true), expected[row as usize]);
    }

    let rennen = &index.sorted_index_entries[5];
    assert_eq!(cold.token_row(rennen.start_row + 2, true), Some(5));
    assert_eq!(cold.token_row(index.rows.len() as u32, true), None);
}

#[test]
fn test_token_row_without_search() {
    let index = sample();
    let registry = Registry::default();
    let rows = index.row_index(&registry, 16).unwrap();

    let entry_row = index.sorted_index_entries[0].start_row + 1;
    assert_eq!(rows.token_row(entry_row, false), None);
    assert_eq!(rows.token_row(entry_row, true), Some(0));
    assert_eq!(rows.token_row(entry_row, false), Some(0));

    // Token markers resolve without consulting the cache.
    assert_eq!(rows.token_row(index.sorted_index_entries[3].start_row, false), Some(3));
}

#[test]
fn test_rows_from_middle() {
    let index = sample();
    let registry = Registry::default();
    let rows = index.row_index(&registry, 16).unwrap();

    let rennen = &index.sorted_index_entries[5];
    let collected = rows.rows(rennen.start_row + 1).collect::<Vec<_>>();
    assert_eq!(collected.len(), 2);
    assert!(collected.iter().all(|&(_, _, token)| token == 5));
}

#[test]
fn test_entry_order_by_token_count() {
    let registry = Registry::default();
    let spec = IndexSpec::new("EN", "English", "en", false);
    let collation = registry.collation("en", "fold").unwrap();
    let mut builder = IndexBuilder::new(spec, collation, 64);

    builder.add("run", EntryRef::Pair(0), EntryTypeTag::Word, 4);
    builder.add("run", EntryRef::Text(0), EntryTypeTag::Note, 1);
    builder.add("run", EntryRef::Pair(1), EntryTypeTag::Headword, 1);
    builder.add("run", EntryRef::Pair(2), EntryTypeTag::Word, 2);
    // Duplicate postings of the same entry are ignored.
    builder.add("run", EntryRef::Pair(2), EntryTypeTag::Word, 2);
    builder.add("ran", EntryRef::Pair(3), EntryTypeTag::Redirect, 1);

    let index = builder.build(&TracingReporter);

    assert_eq!(index.main_token_count, 1);

    let ran = &index.sorted_index_entries[0];
    assert_eq!(ran.token, "ran");
    assert_eq!(
        index.rows[ran.start_row as usize],
        Row::Token {
            index_entry: 0,
            has_main_entry: false
        }
    );

    let run = &index.sorted_index_entries[1];

    assert_eq!(
        index.entry_rows(run),
        [Row::Pair(1), Row::Text(0), Row::Pair(2), Row::Pair(0)]
    );
}

#[test]
fn test_repeated_entry_keeps_lowest_rank() {
    let registry = Registry::default();
    let spec = IndexSpec::new("EN", "English", "en", false);
    let collation = registry.collation("en", "fold").unwrap();

    let mut builder = IndexBuilder::new(spec.clone(), collation.clone(), 64);
    builder.add("dog", EntryRef::Pair(0), EntryTypeTag::Word, 3);
    builder.add("dog", EntryRef::Pair(1), EntryTypeTag::Headword, 2);
    builder.add("dog", EntryRef::Pair(0), EntryTypeTag::Headword, 1);
    builder.add("dog", EntryRef::Html(0), EntryTypeTag::Word, 2);
    builder.add("dog", EntryRef::Html(0), EntryTypeTag::Headword, 2);
    let a = builder.build(&TracingReporter);

    let mut builder = IndexBuilder::new(spec, collation, 64);
    builder.add("dog", EntryRef::Pair(0), EntryTypeTag::Headword, 1);
    builder.add("dog", EntryRef::Pair(1), EntryTypeTag::Headword, 2);
    builder.add("dog", EntryRef::Pair(0), EntryTypeTag::Word, 3);
    builder.add("dog", EntryRef::Html(0), EntryTypeTag::Headword, 2);
    let b = builder.build(&TracingReporter);

    for index in [&a, &b] {
        let dog = &index.sorted_index_entries[0];

        assert_eq!(
            index.entry_rows(dog),
            [Row::Pair(0), Row::Pair(1), Row::Html(0)]
        );

        assert_eq!(dog.html_refs, [0]);
    }
}

#[test]
fn test_skip_overlong() {
    let registry = Registry::default();
    let spec = IndexSpec::new("EN", "English", "en", false);
    let collation = registry.collation("en", "fold").unwrap();
    let mut builder = IndexBuilder::new(spec, collation, 4);

    assert!(builder.add("word", EntryRef::Pair(0), EntryTypeTag::Headword, 1));
    assert!(!builder.add("words", EntryRef::Pair(0), EntryTypeTag::Headword, 1));
    assert!(!builder.add("", EntryRef::Pair(0), EntryTypeTag::Headword, 1));

    let reporter = CollectingReporter::new();
    let index = builder.build(&reporter);
    assert_eq!(index.sorted_index_entries.len(), 1);

    let messages = reporter.take();

    assert_eq!(
        messages[0],
        (
            Level::Warn,
            String::from("EN: Skipped 2 overlong or empty token(s)")
        )
    );

    assert_eq!(messages[1].0, Level::Info);
    assert!(reporter.take().is_empty());
}

#[test]
fn test_normalized_stored_when_different() {
    let index = sample();
    let die = &index.sorted_index_entries[1];
    assert_eq!(die.normalized.as_deref(), Some("die"));
    let die = &index.sorted_index_entries[2];
    assert_eq!(die.normalized, None);
}

#[test]
fn test_unknown_collation() {
    let mut index = sample();
    index.locale = String::from("tlh");
    assert!(index.row_index(&Registry::default(), 16).is_err());
}

#[test]
fn test_concurrent_readers() {
    let index = sample();
    let registry = Registry::default();
    let rows = index.row_index(&registry, 2).unwrap();
    let total = index.rows.len() as u32;

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for row in 0..total {
                    assert!(rows.token_row(row, true).is_some());
                    assert!(rows.lookup("die").unwrap().exact);
                }
            });
        }
    });
}
