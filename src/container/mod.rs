//! The binary dictionary container.
//!
//! A container is a header followed by a fixed sequence of sections, each
//! with its own table of contents so that any record can be decoded without
//! scanning the ones before it:
//!
//! ```text
//! i32      version
//! i64      creation time
//! string   description
//! section  sources
//! section  pair entries
//! section  text entries
//! section  html entries (bodies gzip compressed)
//! section  indices
//! string   sentinel
//! ```
//!
//! Each index record holds its metadata, a nested section of index entries,
//! and the rows stored positionally as a one byte tag and an `i32`.

pub(crate) mod codec;
mod elide;

#[cfg(test)]
mod tests;

use std::io::{Read, Write};

use byteorder::{BigEndian, WriteBytesExt};
use fixed_map::Set;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::entry::{Dictionary, EntrySource, HtmlEntry, Pair, PairEntry, TextEntry};
use crate::error::Error;
use crate::index::{Index, IndexEntry, Row, RowKind};

use self::codec::{write_bytes, write_len, write_string, Output, Reader, Section, SectionRef};
use self::elide::RowMapping;

/// The version written by default.
pub const VERSION_CURRENT: i32 = 7;
/// The oldest version which can be read or written.
pub const VERSION_MIN: i32 = 6;
/// Highest gzip level accepted for html bodies.
pub const COMPRESSION_MAX: u32 = 9;
/// Trailer used to detect truncation and corruption.
pub const SENTINEL: &str = "END OF DICTIONARY";

const TAG_PAIR: u8 = 0;
const TAG_TOKEN: u8 = 1;
const TAG_TEXT: u8 = 2;
const TAG_TOKEN_NO_MAIN: u8 = 3;
const TAG_HTML: u8 = 4;

/// Options used when writing a container.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Version to write.
    pub version: i32,
    /// Kinds of rows to drop. Token rows are never dropped.
    pub elide: Set<RowKind>,
    /// Gzip level used for html bodies.
    pub compression: u32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            version: VERSION_CURRENT,
            elide: Set::new(),
            compression: 6,
        }
    }
}

impl WriteOptions {
    /// Options which drop all html rows and entries.
    pub fn without_html(mut self) -> Self {
        self.elide.insert(RowKind::Html);
        self
    }

    fn html_refs(&self) -> bool {
        self.version >= 7 && !self.elide.contains(RowKind::Html)
    }
}

/// Encode a dictionary into a byte vector.
pub fn to_vec(dictionary: &Dictionary, options: &WriteOptions) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    write(dictionary, options, &mut out)?;
    Ok(out)
}

/// Write a dictionary to `out`, returning the number of bytes written.
///
/// Sections are assembled in memory one at a time and streamed to `out`, so
/// `out` doesn't need to support seeking.
pub fn write<W>(dictionary: &Dictionary, options: &WriteOptions, out: W) -> Result<u64, Error>
where
    W: Write,
{
    if !(VERSION_MIN..=VERSION_CURRENT).contains(&options.version) {
        return Err(Error::UnsupportedVersion {
            version: options.version,
        });
    }

    if options.compression > COMPRESSION_MAX {
        return Err(Error::CompressionLevel {
            level: options.compression,
        });
    }

    let mut out = Output::new(out);

    out.write_i32::<BigEndian>(options.version)?;
    out.write_i64::<BigEndian>(dictionary.created)?;
    write_string(&mut out, &dictionary.description)?;

    let mut section = Section::reserve(out.position(), dictionary.sources.len());

    for source in &dictionary.sources {
        section.begin_record();
        write_string(&mut section, &source.name)?;
        write_len(&mut section, source.count as usize)?;
    }

    section.finish(&mut out)?;

    let mut section = Section::reserve(out.position(), dictionary.pair_entries.len());

    for entry in &dictionary.pair_entries {
        section.begin_record();
        write_len(&mut section, entry.source as usize)?;
        write_len(&mut section, entry.pairs.len())?;

        for pair in &entry.pairs {
            write_string(&mut section, &pair.lang1)?;
            write_string(&mut section, &pair.lang2)?;
        }
    }

    section.finish(&mut out)?;

    let mut section = Section::reserve(out.position(), dictionary.text_entries.len());

    for entry in &dictionary.text_entries {
        section.begin_record();
        write_len(&mut section, entry.source as usize)?;
        write_string(&mut section, &entry.text)?;
    }

    section.finish(&mut out)?;

    let html_entries = if options.elide.contains(RowKind::Html) {
        &[][..]
    } else {
        &dictionary.html_entries[..]
    };

    let mut section = Section::reserve(out.position(), html_entries.len());
    let mut compressed = Vec::new();

    for entry in html_entries {
        section.begin_record();
        write_len(&mut section, entry.source as usize)?;
        write_string(&mut section, &entry.title)?;

        compressed.clear();
        let mut encoder = GzEncoder::new(&mut compressed, Compression::new(options.compression));
        encoder.write_all(entry.html.as_bytes())?;
        encoder.finish()?;
        write_bytes(&mut section, &compressed)?;
    }

    section.finish(&mut out)?;

    let mut section = Section::reserve(out.position(), dictionary.indices.len());

    for index in &dictionary.indices {
        section.begin_record();
        write_index(&mut section, index, options)?;
    }

    section.finish(&mut out)?;
    write_string(&mut out, SENTINEL)?;

    let len = out.position();
    out.into_inner().flush()?;

    tracing::debug!(len, version = options.version, "Wrote dictionary");
    Ok(len)
}

fn write_index(section: &mut Section, index: &Index, options: &WriteOptions) -> Result<(), Error> {
    let mapping = RowMapping::new(&index.rows, &options.elide);

    write_string(section, &index.short_name)?;
    write_string(section, &index.long_name)?;
    write_string(section, &index.locale)?;
    write_string(section, &index.normalizer)?;
    section.write_all(&[u8::from(index.swap_pair_entries)])?;
    write_len(section, index.main_token_count as usize)?;

    let entries = &index.sorted_index_entries;
    let mut nested = Section::reserve(section.position(), entries.len());

    for entry in entries {
        let (start_row, num_rows) = mapping.translate(entry);

        nested.begin_record();
        write_string(&mut nested, &entry.token)?;

        match &entry.normalized {
            Some(normalized) => {
                nested.write_all(&[1])?;
                write_string(&mut nested, normalized)?;
            }
            None => {
                nested.write_all(&[0])?;
            }
        }

        write_len(&mut nested, start_row as usize)?;
        write_len(&mut nested, num_rows as usize)?;

        if options.version >= 7 {
            let refs: &[u32] = if options.html_refs() {
                &entry.html_refs
            } else {
                &[]
            };

            write_len(&mut nested, refs.len())?;

            for &html in refs {
                write_len(&mut nested, html as usize)?;
            }
        }
    }

    nested.finish(section)?;

    write_len(section, mapping.len() as usize)?;

    for (n, row) in index.rows.iter().enumerate() {
        if mapping.map(n as u32).is_none() {
            continue;
        }

        let (tag, value) = match *row {
            Row::Token {
                index_entry,
                has_main_entry: true,
            } => (TAG_TOKEN, index_entry),
            Row::Token {
                index_entry,
                has_main_entry: false,
            } => (TAG_TOKEN_NO_MAIN, index_entry),
            Row::Pair(index) => (TAG_PAIR, index),
            Row::Text(index) => (TAG_TEXT, index),
            Row::Html(index) => (TAG_HTML, index),
        };

        section.write_all(&[tag])?;
        write_len(section, value as usize)?;
    }

    Ok(())
}

/// Fully decode a container.
pub fn read(data: &[u8]) -> Result<Dictionary, Error> {
    DictionaryFile::open(data)?.to_dictionary()
}

/// Lazy access to an encoded container.
///
/// Opening only parses the header and the tables of contents, entries and
/// indices are decoded on demand.
pub struct DictionaryFile<'a> {
    data: &'a [u8],
    version: i32,
    created: i64,
    description: &'a str,
    sources: SectionRef,
    pairs: SectionRef,
    texts: SectionRef,
    htmls: SectionRef,
    indices: SectionRef,
}

impl<'a> DictionaryFile<'a> {
    /// Open an encoded container, validating its header and sentinel.
    pub fn open(data: &'a [u8]) -> Result<Self, Error> {
        let mut reader = Reader::new(data);

        let version = reader.i32("version")?;

        if !(VERSION_MIN..=VERSION_CURRENT).contains(&version) {
            return Err(Error::UnsupportedVersion { version });
        }

        let created = reader.i64("creation time")?;
        let description = reader.string("description")?;
        let sources = SectionRef::read(&mut reader, "sources")?;
        let pairs = SectionRef::read(&mut reader, "pair entries")?;
        let texts = SectionRef::read(&mut reader, "text entries")?;
        let htmls = SectionRef::read(&mut reader, "html entries")?;
        let indices = SectionRef::read(&mut reader, "indices")?;

        let tail = indices.end();

        if reader.string("sentinel")? != SENTINEL {
            return Err(Error::CorruptContainer { offset: tail as u64 });
        }

        tracing::debug!(
            version,
            pairs = pairs.len(),
            texts = texts.len(),
            htmls = htmls.len(),
            indices = indices.len(),
            "Opened dictionary"
        );

        Ok(Self {
            data,
            version,
            created,
            description,
            sources,
            pairs,
            texts,
            htmls,
            indices,
        })
    }

    /// The container version.
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Creation time in milliseconds since the unix epoch.
    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn description(&self) -> &'a str {
        self.description
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn pair_entry_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn text_entry_count(&self) -> usize {
        self.texts.len()
    }

    pub fn html_entry_count(&self) -> usize {
        self.htmls.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Decode the source at `index`.
    pub fn source(&self, index: usize) -> Result<EntrySource, Error> {
        let mut r = self.sources.record(self.data, index, "source")?;
        let name = r.string("source name")?.to_owned();
        let count = r.u32("source count")?;
        Ok(EntrySource { name, count })
    }

    /// Decode the pair entry at `index`.
    pub fn pair_entry(&self, index: usize) -> Result<PairEntry, Error> {
        let mut r = self.pairs.record(self.data, index, "pair entry")?;
        let source = self.entry_source(&mut r)?;
        let len = r.u32("pair count")? as usize;

        let mut pairs = Vec::with_capacity(len.min(64));

        for _ in 0..len {
            let lang1 = r.string("pair text")?;
            let lang2 = r.string("pair text")?;
            pairs.push(Pair::new(lang1, lang2));
        }

        Ok(PairEntry { source, pairs })
    }

    /// Decode the text entry at `index`.
    pub fn text_entry(&self, index: usize) -> Result<TextEntry, Error> {
        let mut r = self.texts.record(self.data, index, "text entry")?;
        let source = self.entry_source(&mut r)?;
        let text = r.string("text")?.to_owned();
        Ok(TextEntry { source, text })
    }

    /// Decode and decompress the html entry at `index`.
    pub fn html_entry(&self, index: usize) -> Result<HtmlEntry, Error> {
        let mut r = self.htmls.record(self.data, index, "html entry")?;
        let source = self.entry_source(&mut r)?;
        let title = r.string("html title")?.to_owned();

        let at = r.position();
        let compressed = r.bytes("html body")?;

        let mut html = String::new();

        if GzDecoder::new(compressed).read_to_string(&mut html).is_err() {
            return Err(Error::malformed(at, "html body"));
        }

        Ok(HtmlEntry {
            source,
            title,
            html,
        })
    }

    fn entry_source(&self, r: &mut Reader<'_>) -> Result<u32, Error> {
        let at = r.position();
        let source = r.u32("entry source")?;

        if source as usize >= self.sources.len() {
            return Err(Error::malformed(at, "entry source"));
        }

        Ok(source)
    }

    /// Decode the index at `index`.
    pub fn index(&self, index: usize) -> Result<Index, Error> {
        let mut r = self.indices.record(self.data, index, "index")?;

        let short_name = r.string("index short name")?.to_owned();
        let long_name = r.string("index long name")?.to_owned();
        let locale = r.string("index locale")?.to_owned();
        let normalizer = r.string("index normalizer")?.to_owned();
        let swap_pair_entries = r.bool("swap pair entries")?;
        let main_token_count = r.u32("main token count")?;

        let entries = SectionRef::read(&mut r, "index entries")?;
        let mut sorted_index_entries = Vec::with_capacity(entries.len());

        for n in 0..entries.len() {
            let mut e = entries.record(self.data, n, "index entry")?;

            let token = e.string("token")?.to_owned();

            let normalized = match e.bool("normalized flag")? {
                true => Some(e.string("normalized token")?.to_owned()),
                false => None,
            };

            let start_row = e.u32("start row")?;
            let num_rows = e.u32("row count")?;

            let mut html_refs = Vec::new();

            if self.version >= 7 {
                let len = e.u32("html reference count")?;

                for _ in 0..len {
                    let at = e.position();
                    let html = e.u32("html reference")?;

                    if html as usize >= self.htmls.len() {
                        return Err(Error::malformed(at, "html reference"));
                    }

                    html_refs.push(html);
                }
            }

            sorted_index_entries.push(IndexEntry {
                token,
                normalized,
                start_row,
                num_rows,
                html_refs,
            });
        }

        let len = r.u32("row count")? as usize;
        let mut rows = Vec::with_capacity(len.min(r.remaining() / 5));

        for _ in 0..len {
            let at = r.position();
            let tag = r.u8("row tag")?;
            let value = r.u32("row value")?;

            let (row, bound) = match tag {
                TAG_PAIR => (Row::Pair(value), self.pairs.len()),
                TAG_TEXT => (Row::Text(value), self.texts.len()),
                TAG_HTML => (Row::Html(value), self.htmls.len()),
                TAG_TOKEN | TAG_TOKEN_NO_MAIN => {
                    let row = Row::Token {
                        index_entry: value,
                        has_main_entry: tag == TAG_TOKEN,
                    };

                    (row, sorted_index_entries.len())
                }
                _ => return Err(Error::malformed(at, "row tag")),
            };

            if value as usize >= bound {
                return Err(Error::malformed(at, "row value"));
            }

            rows.push(row);
        }

        for (n, entry) in sorted_index_entries.iter().enumerate() {
            let start = entry.start_row as usize;

            let valid = entry.num_rows > 0
                && start + entry.num_rows as usize <= rows.len()
                && matches!(rows[start], Row::Token { index_entry, .. } if index_entry as usize == n);

            if !valid {
                return Err(Error::malformed(r.position(), "index entry rows"));
            }
        }

        Ok(Index {
            short_name,
            long_name,
            locale,
            normalizer,
            swap_pair_entries,
            main_token_count,
            rows,
            sorted_index_entries,
        })
    }

    /// Decode everything.
    pub fn to_dictionary(&self) -> Result<Dictionary, Error> {
        Ok(Dictionary {
            created: self.created,
            description: self.description.to_owned(),
            sources: (0..self.sources.len())
                .map(|n| self.source(n))
                .collect::<Result<_, _>>()?,
            pair_entries: (0..self.pairs.len())
                .map(|n| self.pair_entry(n))
                .collect::<Result<_, _>>()?,
            text_entries: (0..self.texts.len())
                .map(|n| self.text_entry(n))
                .collect::<Result<_, _>>()?,
            html_entries: (0..self.htmls.len())
                .map(|n| self.html_entry(n))
                .collect::<Result<_, _>>()?,
            indices: (0..self.indices.len())
                .map(|n| self.index(n))
                .collect::<Result<_, _>>()?,
        })
    }
}
