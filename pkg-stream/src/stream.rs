//! The minimal read/write/close contract every stream endpoint satisfies.
//!
//! Compression adapters implement these traits and also consume them, so any
//! adapter can sit on top of another one, a file, or an in-memory buffer.

use std::io::{self, Read, Write};

use crate::error::{Result, StreamError};

/// A source of bytes.
pub trait ReadStream {
    /// Read up to `buf.len()` bytes into `buf`.
    ///
    /// Returns the number of bytes placed into `buf`. `Ok(0)` means end of data.
    /// An empty `buf` is rejected with [`StreamError::BadArgs`].
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Release everything this stream owns. Streams borrowed from the caller
    /// are never closed on their behalf.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A sink for bytes.
pub trait WriteStream {
    /// Write up to `buf.len()` bytes from `buf`.
    ///
    /// Returns the number of bytes accepted, which callers that need all of
    /// `buf` written compare against `buf.len()`. An empty `buf` is rejected
    /// with [`StreamError::BadArgs`].
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Complete any pending output and release everything this stream owns.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: ReadStream + ?Sized> ReadStream for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<S: WriteStream + ?Sized> WriteStream for &mut S {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl ReadStream for &[u8] {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(StreamError::BadArgs);
        }

        let n = buf.len().min(self.len());
        let (head, tail) = self.split_at(n);
        buf[..n].copy_from_slice(head);
        *self = tail;
        Ok(n)
    }
}

impl WriteStream for Vec<u8> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(StreamError::BadArgs);
        }

        self.extend_from_slice(buf);
        Ok(buf.len())
    }
}

/// Exposes any [`std::io::Read`] as a [`ReadStream`].
#[derive(Debug)]
pub struct IoReader<R> {
    inner: R,
}

impl<R: Read> IoReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ReadStream for IoReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(StreamError::BadArgs);
        }

        loop {
            match self.inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StreamError::Io(e)),
            }
        }
    }
}

/// Exposes any [`std::io::Write`] as a [`WriteStream`].
///
/// `write` hands the whole buffer to `write_all`, so a successful call always
/// reports the full length.
#[derive(Debug)]
pub struct IoWriter<W> {
    inner: W,
}

impl<W: Write> IoWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> WriteStream for IoWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(StreamError::BadArgs);
        }

        self.inner.write_all(buf)?;
        Ok(buf.len())
    }

    fn close(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}
