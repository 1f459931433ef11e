//! Building, storing and querying offline bilingual dictionaries.
//!
//! A dictionary is a single binary [`container`] holding raw entries and one
//! [`index`] per language, which maps tokens in collation order to the rows
//! of the entries they occur in.

pub mod collation;
pub mod config;
pub mod container;
pub mod engine;
pub mod entry;
mod error;
pub mod import;
pub mod index;
pub mod reporter;
pub mod stream;
pub mod tokenizer;
pub mod trie;

pub use self::config::Config;
pub use self::container::{DictionaryFile, WriteOptions};
pub use self::engine::DictionaryEngine;
pub use self::entry::{Dictionary, EntrySource, HtmlEntry, Pair, PairEntry, TextEntry};
pub use self::error::Error;
pub use self::index::{Index, IndexEntry, IndexSpec, Row, RowIndex, RowKind};
