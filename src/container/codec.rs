//! Primitives for the container encoding.
//!
//! All integers are big-endian. Strings are an `i32` byte length followed by
//! UTF-8 data. A section is laid out as:
//!
//! ```text
//! i32        record count
//! i64 * n    absolute offset of each record
//! i64        offset just past the last record
//! ...        records
//! ```

use std::io::{self, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::error::Error;

/// Size of a section header holding `count` records.
fn header_len(count: usize) -> u64 {
    4 + 8 * count as u64 + 8
}

pub(crate) fn write_len<W>(out: &mut W, len: usize) -> io::Result<()>
where
    W: ?Sized + Write,
{
    let Ok(len) = i32::try_from(len) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "length does not fit in container",
        ));
    };

    out.write_i32::<BigEndian>(len)
}

pub(crate) fn write_string<W>(out: &mut W, string: &str) -> io::Result<()>
where
    W: ?Sized + Write,
{
    write_bytes(out, string.as_bytes())
}

pub(crate) fn write_bytes<W>(out: &mut W, bytes: &[u8]) -> io::Result<()>
where
    W: ?Sized + Write,
{
    write_len(out, bytes.len())?;
    out.write_all(bytes)
}

/// A writer which keeps track of how many bytes have passed through it, so
/// that absolute offsets are known without seeking.
pub(crate) struct Output<W> {
    inner: W,
    position: u64,
}

impl<W> Output<W>
where
    W: Write,
{
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner
    }
}

impl<W> Write for Output<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A section under construction.
///
/// The table of contents is reserved up front from the number of records, so
/// the absolute offset of every record is known while it's being written.
/// Records are buffered and the table is written out in front of them by
/// [`Section::finish`].
pub(crate) struct Section {
    count: usize,
    data_start: u64,
    offsets: Vec<u64>,
    buf: Vec<u8>,
}

impl Section {
    /// Reserve a section of `count` records which will be written at the
    /// absolute offset `base`.
    pub(crate) fn reserve(base: u64, count: usize) -> Self {
        Self {
            count,
            data_start: base + header_len(count),
            offsets: Vec::with_capacity(count),
            buf: Vec::new(),
        }
    }

    /// Absolute offset of the next byte written to the section.
    pub(crate) fn position(&self) -> u64 {
        self.data_start + self.buf.len() as u64
    }

    /// Start a new record at the current position.
    pub(crate) fn begin_record(&mut self) {
        self.offsets.push(self.position());
    }

    /// Write the table of contents followed by the records, returning the
    /// offset just past the section.
    pub(crate) fn finish<W>(self, out: &mut W) -> io::Result<u64>
    where
        W: ?Sized + Write,
    {
        if self.offsets.len() != self.count {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "section reserved for {} records but {} were written",
                    self.count,
                    self.offsets.len()
                ),
            ));
        }

        let end = self.position();

        write_len(out, self.count)?;

        for offset in &self.offsets {
            out.write_i64::<BigEndian>(*offset as i64)?;
        }

        out.write_i64::<BigEndian>(end as i64)?;
        out.write_all(&self.buf)?;
        Ok(end)
    }
}

impl Write for Section {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Decoder over an in-memory container.
#[derive(Clone)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Construct a reader positioned at `pos`.
    pub(crate) fn at(data: &'a [u8], pos: usize) -> Result<Self, Error> {
        if pos > data.len() {
            return Err(Error::malformed(pos, "offset past end of data"));
        }

        Ok(Self { data, pos })
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], Error> {
        let Some(bytes) = self.pos.checked_add(n).and_then(|end| self.data.get(self.pos..end))
        else {
            return Err(Error::malformed(self.pos, what));
        };

        self.pos += n;
        Ok(bytes)
    }

    pub(crate) fn u8(&mut self, what: &'static str) -> Result<u8, Error> {
        Ok(self.take(1, what)?[0])
    }

    pub(crate) fn bool(&mut self, what: &'static str) -> Result<bool, Error> {
        match self.u8(what)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::malformed(self.pos - 1, what)),
        }
    }

    pub(crate) fn i32(&mut self, what: &'static str) -> Result<i32, Error> {
        Ok(BigEndian::read_i32(self.take(4, what)?))
    }

    pub(crate) fn i64(&mut self, what: &'static str) -> Result<i64, Error> {
        Ok(BigEndian::read_i64(self.take(8, what)?))
    }

    /// Read a non-negative `i32`.
    pub(crate) fn u32(&mut self, what: &'static str) -> Result<u32, Error> {
        let at = self.pos;
        u32::try_from(self.i32(what)?).map_err(|_| Error::malformed(at, what))
    }

    /// Read an absolute offset which must lie within the data.
    pub(crate) fn offset(&mut self, what: &'static str) -> Result<usize, Error> {
        let at = self.pos;

        match usize::try_from(self.i64(what)?) {
            Ok(offset) if offset <= self.data.len() => Ok(offset),
            _ => Err(Error::malformed(at, what)),
        }
    }

    pub(crate) fn bytes(&mut self, what: &'static str) -> Result<&'a [u8], Error> {
        let len = self.u32(what)? as usize;
        self.take(len, what)
    }

    pub(crate) fn string(&mut self, what: &'static str) -> Result<&'a str, Error> {
        let at = self.pos;
        let bytes = self.bytes(what)?;
        std::str::from_utf8(bytes).map_err(|_| Error::malformed(at, what))
    }
}

/// A parsed section header.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SectionRef {
    count: usize,
    toc: usize,
    data_start: usize,
    end: usize,
}

impl SectionRef {
    /// Parse a section header at the position of `reader`, leaving the
    /// reader positioned just past the section.
    pub(crate) fn read(reader: &mut Reader<'_>, what: &'static str) -> Result<Self, Error> {
        let count = reader.u32(what)? as usize;
        let toc = reader.position();

        let Some(data_start) = count
            .checked_mul(8)
            .and_then(|n| n.checked_add(toc + 8))
            .filter(|&n| n <= reader.data.len())
        else {
            return Err(Error::malformed(toc, what));
        };

        reader.pos = data_start - 8;
        let at = reader.position();
        let end = reader.offset(what)?;

        if end < data_start {
            return Err(Error::malformed(at, what));
        }

        reader.pos = end;

        Ok(Self {
            count,
            toc,
            data_start,
            end,
        })
    }

    /// Number of records in the section.
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    /// Offset just past the section.
    pub(crate) fn end(&self) -> usize {
        self.end
    }

    /// Get a reader positioned at the given record.
    pub(crate) fn record<'a>(
        &self,
        data: &'a [u8],
        index: usize,
        what: &'static str,
    ) -> Result<Reader<'a>, Error> {
        if index >= self.count {
            return Err(Error::malformed(self.toc, what));
        }

        let mut toc = Reader::at(data, self.toc + index * 8)?;
        let at = toc.position();
        let offset = toc.offset(what)?;

        if offset < self.data_start || offset > self.end {
            return Err(Error::malformed(at, what));
        }

        Ok(Reader {
            data: &data[..self.end],
            pos: offset,
        })
    }
}
