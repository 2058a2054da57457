//! Stream adapters that drive a codec state machine behind the
//! [`ReadStream`]/[`WriteStream`] contract.
//!
//! [`CodecReader`] pulls compressed bytes from its [`Source`] and decodes them
//! into the caller's buffer. [`CodecWriter`] encodes caller bytes and pushes the
//! compressed output into its [`Sink`], completing the stream on close.
//!
//! Both stage compressed data through a private chunk buffer of
//! [`CHUNK_SIZE`] bytes, and both latch a sticky error flag on the first
//! backing or codec failure: after that every call fails without touching the
//! codec again.

use std::fs::File;
use std::io::{self, Read, Write};

use crate::error::{Result, StreamError};
use crate::stream::{ReadStream, WriteStream};

mod reader;
mod writer;

#[cfg(test)]
mod tests;

pub use reader::CodecReader;
pub use writer::CodecWriter;

/// Size of the staging buffer between the codec and the backing target.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Consecutive codec steps without progress tolerated before giving up.
const MAX_IDLE_STEPS: u32 = 8;

fn chunk_buffer() -> Box<[u8]> {
    vec![0u8; CHUNK_SIZE].into_boxed_slice()
}

/// Where a [`CodecReader`] gets its compressed bytes from.
pub enum Source<'a> {
    /// A file opened by the adapter. Closed together with the adapter.
    File(File),
    /// A stream owned by the caller. Never closed by the adapter.
    Stream(&'a mut dyn ReadStream),
}

impl Source<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Source::File(file) => loop {
                match file.read(buf) {
                    Ok(n) => return Ok(n),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(StreamError::Io(e)),
                }
            },
            Source::Stream(stream) => stream
                .read(buf)
                .map_err(|e| StreamError::Underlying(Box::new(e))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Source::File(_) => "file",
            Source::Stream(_) => "stream",
        }
    }
}

/// Where a [`CodecWriter`] puts its compressed bytes.
pub enum Sink<'a> {
    /// A file created by the adapter. Closed together with the adapter.
    File(File),
    /// A stream owned by the caller. Never closed by the adapter.
    Stream(&'a mut dyn WriteStream),
}

impl Sink<'_> {
    /// Write all of `buf`. A wrapped stream gets exactly one `write` call and
    /// anything less than the full length is a short write.
    fn write_chunk(&mut self, buf: &[u8]) -> Result<()> {
        match self {
            Sink::File(file) => {
                file.write_all(buf)?;
                Ok(())
            }
            Sink::Stream(stream) => {
                let written = stream
                    .write(buf)
                    .map_err(|e| StreamError::Underlying(Box::new(e)))?;
                if written == buf.len() {
                    Ok(())
                } else {
                    Err(StreamError::ShortWrite {
                        expected: buf.len(),
                        written,
                    })
                }
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Sink::File(_) => "file",
            Sink::Stream(_) => "stream",
        }
    }
}
