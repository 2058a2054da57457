//! Opaque stream handles and the dispatch functions that forward to them.
//!
//! A handle hides which concrete stream sits behind it: a codec adapter, a
//! plain file, or a chain of adapters. Absent handles are reported as
//! [`StreamError::BadStream`] instead of panicking.

use std::io;

use crate::error::{Result, StreamError};
use crate::stream::{ReadStream, WriteStream};

/// Read from `stream`, or fail with [`StreamError::BadStream`] if there is none.
pub fn read_from_stream(stream: Option<&mut dyn ReadStream>, buf: &mut [u8]) -> Result<usize> {
    match stream {
        Some(stream) => stream.read(buf),
        None => Err(StreamError::BadStream),
    }
}

/// Write to `stream`, or fail with [`StreamError::BadStream`] if there is none.
pub fn write_to_stream(stream: Option<&mut dyn WriteStream>, buf: &[u8]) -> Result<usize> {
    match stream {
        Some(stream) => stream.write(buf),
        None => Err(StreamError::BadStream),
    }
}

/// Close `stream` if there is one. Closing nothing is a no-op.
pub fn close_read_stream(stream: Option<&mut dyn ReadStream>) -> Result<()> {
    match stream {
        Some(stream) => stream.close(),
        None => Ok(()),
    }
}

/// Close `stream` if there is one. Closing nothing is a no-op.
pub fn close_write_stream(stream: Option<&mut dyn WriteStream>) -> Result<()> {
    match stream {
        Some(stream) => stream.close(),
        None => Ok(()),
    }
}

/// An owned, type-erased read stream.
///
/// Closing releases the stream behind the handle and empties it, so a second
/// close is a no-op and any later read reports [`StreamError::BadStream`].
#[derive(Default)]
pub struct ReadHandle<'a> {
    inner: Option<Box<dyn ReadStream + 'a>>,
}

impl<'a> ReadHandle<'a> {
    pub fn new<S: ReadStream + 'a>(stream: S) -> Self {
        Self {
            inner: Some(Box::new(stream)),
        }
    }

    /// A handle with nothing behind it.
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn get(&mut self) -> Option<&mut dyn ReadStream> {
        match self.inner.as_mut() {
            Some(stream) => Some(stream.as_mut()),
            None => None,
        }
    }
}

impl ReadStream for ReadHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        read_from_stream(self.get(), buf)
    }

    fn close(&mut self) -> Result<()> {
        let result = close_read_stream(self.get());
        self.inner = None;
        result
    }
}

impl io::Read for ReadHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        Ok(ReadStream::read(self, buf)?)
    }
}

/// An owned, type-erased write stream.
///
/// Closing completes and releases the stream behind the handle and empties
/// it, so a second close is a no-op and any later write reports
/// [`StreamError::BadStream`].
#[derive(Default)]
pub struct WriteHandle<'a> {
    inner: Option<Box<dyn WriteStream + 'a>>,
}

impl<'a> WriteHandle<'a> {
    pub fn new<S: WriteStream + 'a>(stream: S) -> Self {
        Self {
            inner: Some(Box::new(stream)),
        }
    }

    /// A handle with nothing behind it.
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn get(&mut self) -> Option<&mut dyn WriteStream> {
        match self.inner.as_mut() {
            Some(stream) => Some(stream.as_mut()),
            None => None,
        }
    }
}

impl WriteStream for WriteHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        write_to_stream(self.get(), buf)
    }

    fn close(&mut self) -> Result<()> {
        let result = close_write_stream(self.get());
        self.inner = None;
        result
    }
}

impl io::Write for WriteHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        Ok(WriteStream::write(self, buf)?)
    }

    /// Compressed output cannot be flushed without ending the stream; use
    /// [`WriteStream::close`] for that.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
