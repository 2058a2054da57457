//! xz backend over liblzma's raw `Stream`.
//!
//! One `.xz` stream per adapter: the decoder stops at the first stream end and
//! does not look for concatenated streams.

use std::io::{Error, ErrorKind, Result};

use xz2::stream::{Action, Check, Status, Stream};

use super::{Decoder, Encoder, StreamStatus, Totals};

fn lzma_error(e: xz2::stream::Error) -> Error {
    Error::new(ErrorKind::Other, e)
}

/// A liblzma stream in either direction, stepped one window at a time.
struct Lzma(Stream);

impl Lzma {
    fn totals(&self) -> Totals {
        Totals::new(self.0.total_in(), self.0.total_out())
    }

    fn step(&mut self, input: &[u8], output: &mut [u8], action: Action) -> Result<StreamStatus> {
        let before = self.totals();
        let status = self.0.process(input, output, action).map_err(lzma_error)?;
        Ok(before.since(self.totals(), matches!(status, Status::StreamEnd)))
    }
}

pub struct XzCompressor {
    stream: Lzma,
}

impl XzCompressor {
    /// `level` is the xz preset, 0 (fastest) to 9 (smallest).
    pub fn new(level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("xz level must be 0-9, got {}", level),
            ));
        }

        let stream = Stream::new_easy_encoder(level, Check::Crc64).map_err(lzma_error)?;
        Ok(Self {
            stream: Lzma(stream),
        })
    }
}

impl Encoder for XzCompressor {
    fn compress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StreamStatus> {
        self.stream.step(input, output, Action::Run)
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<StreamStatus> {
        self.stream.step(&[], output, Action::Finish)
    }
}

pub struct XzDecompressor {
    stream: Lzma,
}

impl XzDecompressor {
    /// A decoder without a memory limit.
    pub fn new() -> Result<Self> {
        let stream = Stream::new_stream_decoder(u64::MAX, 0).map_err(lzma_error)?;
        Ok(Self {
            stream: Lzma(stream),
        })
    }
}

impl Decoder for XzDecompressor {
    fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StreamStatus> {
        self.stream.step(input, output, Action::Run)
    }
}
