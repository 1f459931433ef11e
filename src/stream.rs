//! Producer/consumer pipes decoupling slow I/O from the thread doing the
//! actual work.
//!
//! Both ends move fixed-size blocks over a bounded channel to a background
//! thread. There is no cancellation: the background thread stops when the
//! foreground end is dropped or closed, or when the underlying source or sink
//! fails. Failures are logged and surface in the foreground as a premature
//! end of stream.

#[cfg(test)]
mod tests;

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::error::Error;

/// Compute how many blocks may be in flight in the channel, with one block
/// being filled and one being drained outside of it.
fn channel_bound(capacity: usize, block: usize) -> Result<usize, Error> {
    if block == 0 || capacity / block < 2 {
        return Err(Error::BufferCapacity { capacity, block });
    }

    Ok(capacity / block - 2)
}

/// A reader which fills blocks from a slow source in the background.
pub struct ReadAhead {
    receiver: Receiver<Vec<u8>>,
    current: Vec<u8>,
    pos: usize,
}

impl ReadAhead {
    /// Start reading `source` in the background in blocks of `block` bytes,
    /// buffering up to `capacity` bytes.
    pub fn new<R>(mut source: R, block: usize, capacity: usize) -> Result<Self, Error>
    where
        R: 'static + Send + Read,
    {
        let (sender, receiver) = mpsc::sync_channel(channel_bound(capacity, block)?);

        thread::Builder::new()
            .name(String::from("read-ahead"))
            .spawn(move || fill(&mut source, &sender, block))?;

        Ok(Self {
            receiver,
            current: Vec::new(),
            pos: 0,
        })
    }
}

fn fill<R>(source: &mut R, sender: &SyncSender<Vec<u8>>, block: usize)
where
    R: Read,
{
    loop {
        let mut buf = vec![0; block];
        let mut len = 0;

        while len < block {
            match source.read(&mut buf[len..]) {
                Ok(0) => break,
                Ok(n) => len += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Read-ahead failed: {e}");
                    buf.truncate(len);
                    let _ = sender.send(buf);
                    return;
                }
            }
        }

        if len == 0 {
            return;
        }

        buf.truncate(len);

        let done = len < block;

        if sender.send(buf).is_err() {
            tracing::trace!("Read-ahead consumer went away");
            return;
        }

        if done {
            return;
        }
    }
}

impl Read for ReadAhead {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.current.len() {
            match self.receiver.recv() {
                Ok(block) => {
                    self.current = block;
                    self.pos = 0;
                }
                Err(..) => return Ok(0),
            }
        }

        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// A writer which hands off blocks to a background thread performing the
/// actual writes.
///
/// Data is only guaranteed to have reached the sink once
/// [`WriteBehind::close`] returns successfully.
pub struct WriteBehind {
    sender: Option<SyncSender<Vec<u8>>>,
    handle: Option<JoinHandle<io::Result<()>>>,
    current: Vec<u8>,
    block: usize,
}

impl WriteBehind {
    /// Start writing to `sink` in the background in blocks of `block` bytes,
    /// buffering up to `capacity` bytes.
    pub fn new<W>(mut sink: W, block: usize, capacity: usize) -> Result<Self, Error>
    where
        W: 'static + Send + Write,
    {
        let (sender, receiver) = mpsc::sync_channel::<Vec<u8>>(channel_bound(capacity, block)?);

        let handle = thread::Builder::new()
            .name(String::from("write-behind"))
            .spawn(move || drain(&mut sink, &receiver))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            current: Vec::with_capacity(block),
            block,
        })
    }

    fn send_current(&mut self) -> io::Result<()> {
        if self.current.is_empty() {
            return Ok(());
        }

        let block = std::mem::replace(&mut self.current, Vec::with_capacity(self.block));

        let Some(sender) = &self.sender else {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        };

        if sender.send(block).is_err() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "write-behind sink closed early",
            ));
        }

        Ok(())
    }

    /// Flush any buffered data and block until the background thread has
    /// written everything and closed the sink.
    pub fn close(mut self) -> io::Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> io::Result<()> {
        let sent = self.send_current();
        self.sender = None;

        let Some(handle) = self.handle.take() else {
            return sent;
        };

        let result = match handle.join() {
            Ok(result) => result,
            Err(..) => Err(io::Error::new(
                io::ErrorKind::Other,
                "write-behind thread panicked",
            )),
        };

        result.and(sent)
    }
}

fn drain<W>(sink: &mut W, receiver: &Receiver<Vec<u8>>) -> io::Result<()>
where
    W: Write,
{
    for block in receiver {
        if let Err(e) = sink.write_all(&block) {
            tracing::warn!("Write-behind failed: {e}");
            return Err(e);
        }
    }

    sink.flush()
}

impl Write for WriteBehind {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.block - self.current.len());
        self.current.extend_from_slice(&buf[..n]);

        if self.current.len() == self.block {
            self.send_current()?;
        }

        Ok(n)
    }

    /// Hands the partially filled block to the background thread. This does
    /// not wait for it to be written, see [`WriteBehind::close`].
    fn flush(&mut self) -> io::Result<()> {
        self.send_current()
    }
}

impl Drop for WriteBehind {
    fn drop(&mut self) {
        if self.handle.is_none() {
            return;
        }

        if let Err(e) = self.finish() {
            tracing::warn!("Closing write-behind buffer failed: {e}");
        }
    }
}
