use std::io::{self, Read, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ReadAhead, WriteBehind};
use crate::error::Error;

/// A source which hands out at most `step` bytes per read.
struct Trickle {
    data: Vec<u8>,
    pos: usize,
    step: usize,
    fail_at: Option<usize>,
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail_at.is_some_and(|at| self.pos >= at) {
            return Err(io::Error::new(io::ErrorKind::Other, "boom"));
        }

        let n = buf.len().min(self.step).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[derive(Clone, Default)]
struct Shared {
    data: Arc<Mutex<Vec<u8>>>,
    fail_after: Option<usize>,
}

impl Write for Shared {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = self.data.lock();

        if self.fail_after.is_some_and(|n| data.len() >= n) {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }

        data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|n| (n % 251) as u8).collect()
}

#[test]
fn test_read_ahead() {
    let data = payload(10_000);

    let source = Trickle {
        data: data.clone(),
        pos: 0,
        step: 7,
        fail_at: None,
    };

    let mut reader = ReadAhead::new(source, 64, 256).unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_read_ahead_exact_blocks() {
    let data = payload(128);
    let mut reader = ReadAhead::new(io::Cursor::new(data.clone()), 64, 128).unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, data);
}

#[test]
fn test_read_ahead_failure_is_premature_eof() {
    let source = Trickle {
        data: payload(1000),
        pos: 0,
        step: 8,
        fail_at: Some(320),
    };

    let mut reader = ReadAhead::new(source, 64, 128).unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, payload(1000)[..320]);
}

#[test]
fn test_write_behind() {
    let sink = Shared::default();
    let data = payload(10_000);

    let mut writer = WriteBehind::new(sink.clone(), 100, 400).unwrap();

    for chunk in data.chunks(33) {
        writer.write_all(chunk).unwrap();
    }

    writer.close().unwrap();
    assert_eq!(*sink.data.lock(), data);
}

#[test]
fn test_write_behind_drop_flushes() {
    let sink = Shared::default();

    {
        let mut writer = WriteBehind::new(sink.clone(), 100, 200).unwrap();
        writer.write_all(b"hello world").unwrap();
    }

    assert_eq!(&sink.data.lock()[..], b"hello world");
}

#[test]
fn test_write_behind_failure() {
    let sink = Shared {
        data: Arc::default(),
        fail_after: Some(150),
    };

    let mut writer = WriteBehind::new(sink, 100, 200).unwrap();
    let data = payload(10_000);

    // Writes may or may not observe the failure depending on timing, but
    // closing always does.
    let _ = writer.write_all(&data);
    assert!(writer.close().is_err());
}

#[test]
fn test_capacity() {
    assert!(matches!(
        ReadAhead::new(io::empty(), 64, 100),
        Err(Error::BufferCapacity {
            capacity: 100,
            block: 64
        })
    ));

    assert!(matches!(
        WriteBehind::new(io::sink(), 0, 100),
        Err(Error::BufferCapacity { .. })
    ));
}
