use std::io;

use thiserror::Error;

/// An error raised while building, writing or reading a dictionary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The byte layout cannot be a valid container, such as a negative count
    /// or an offset past the end of the data.
    #[error("Malformed container at offset {offset}: {what}")]
    MalformedContainer { offset: u64, what: &'static str },
    /// The container version tag is outside of the supported range.
    #[error("Unsupported container version {version}")]
    UnsupportedVersion { version: i32 },
    /// The trailing sentinel did not match.
    #[error("Corrupt container, sentinel mismatch at offset {offset}")]
    CorruptContainer { offset: u64 },
    /// A collation locale or normalizer ruleset is not known.
    #[error("No {kind} available for `{id}`")]
    CollationUnavailable { kind: &'static str, id: String },
    /// An entry refers to a source which has not been added.
    #[error("Unknown entry source {index}")]
    UnknownSource { index: usize },
    /// An entry refers to an index which doesn't exist.
    #[error("Unknown index {index}")]
    UnknownIndex { index: usize },
    /// Gzip compression levels range from 0 to 9.
    #[error("Unsupported compression level {level}")]
    CompressionLevel { level: u32 },
    /// A stream buffer must fit at least two blocks.
    #[error("Buffer capacity {capacity} must hold at least two blocks of {block} bytes")]
    BufferCapacity { capacity: usize, block: usize },
    #[error("{0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
}

impl Error {
    pub(crate) fn malformed(offset: usize, what: &'static str) -> Self {
        Self::MalformedContainer {
            offset: offset as u64,
            what,
        }
    }
}
