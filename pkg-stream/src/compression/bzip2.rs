//! bzip2 compression state machines using the `bzip2` crate's raw streams.
//!
//! These are pure buffer-to-buffer operations with no I/O traits.

use std::io::{Error, ErrorKind, Result};

use bzip2::{Action, Compress, Compression, Decompress, Status};

use super::{Decoder, Encoder, StreamStatus, Totals};

fn bzip2_error(e: bzip2::Error) -> Error {
    Error::new(ErrorKind::Other, e)
}

fn unexpected(status: Status) -> Error {
    Error::new(
        ErrorKind::Other,
        format!("unexpected bzip2 status {:?}", status),
    )
}

/// Streaming bzip2 compressor.
pub struct Bzip2Compressor {
    stream: Compress,
}

impl Bzip2Compressor {
    /// Create a new compressor.
    ///
    /// `level` is the block size in units of 100k (1-9). `work_factor` (0-250)
    /// controls when the compressor falls back to its slower sorting algorithm
    /// for repetitive input; 0 selects the library default.
    pub fn new(level: u32, work_factor: u32) -> Result<Self> {
        if !(1..=9).contains(&level) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("bzip2 level must be 1-9, got {}", level),
            ));
        }
        if work_factor > 250 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("bzip2 work factor must be 0-250, got {}", work_factor),
            ));
        }

        Ok(Self {
            stream: Compress::new(Compression::new(level), work_factor),
        })
    }

    fn totals(&self) -> Totals {
        Totals::new(self.stream.total_in(), self.stream.total_out())
    }
}

impl Encoder for Bzip2Compressor {
    fn compress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StreamStatus> {
        let before = self.totals();
        match self
            .stream
            .compress(input, output, Action::Run)
            .map_err(bzip2_error)?
        {
            Status::RunOk => Ok(before.since(self.totals(), false)),
            other => Err(unexpected(other)),
        }
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<StreamStatus> {
        let before = self.totals();
        match self
            .stream
            .compress(&[], output, Action::Finish)
            .map_err(bzip2_error)?
        {
            Status::FinishOk => Ok(before.since(self.totals(), false)),
            Status::StreamEnd => Ok(before.since(self.totals(), true)),
            other => Err(unexpected(other)),
        }
    }
}

/// Streaming bzip2 decompressor.
pub struct Bzip2Decompressor {
    stream: Decompress,
}

impl Bzip2Decompressor {
    /// Create a new decompressor. `small` trades speed for a lower memory
    /// footprint.
    pub fn new(small: bool) -> Self {
        Self {
            stream: Decompress::new(small),
        }
    }

    fn totals(&self) -> Totals {
        Totals::new(self.stream.total_in(), self.stream.total_out())
    }
}

impl Default for Bzip2Decompressor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Decoder for Bzip2Decompressor {
    fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StreamStatus> {
        let before = self.totals();
        match self
            .stream
            .decompress(input, output)
            .map_err(bzip2_error)?
        {
            Status::Ok => Ok(before.since(self.totals(), false)),
            // bzip2 has a real end-of-stream marker; bytes after it are not ours.
            Status::StreamEnd => Ok(before.since(self.totals(), true)),
            other => Err(unexpected(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::tests::{roundtrip_in_pieces, sample_text};

    #[test]
    fn test_compress_decompress_roundtrip() {
        let data = sample_text();
        let out = roundtrip_in_pieces(
            Bzip2Compressor::new(9, 30).unwrap(),
            Bzip2Decompressor::default(),
            &data,
            4096,
            4096,
        );
        assert_eq!(out, data);
    }

    #[test]
    fn test_tiny_windows() {
        let data = sample_text();
        let out = roundtrip_in_pieces(
            Bzip2Compressor::new(1, 0).unwrap(),
            Bzip2Decompressor::new(true),
            &data,
            10,
            7,
        );
        assert_eq!(out, data);
    }

    #[test]
    fn test_empty_stream_fixture() {
        let mut compressor = Bzip2Compressor::new(9, 30).unwrap();
        let mut output = [0u8; 64];

        let status = compressor.finish(&mut output).unwrap();
        assert!(status.is_done());
        assert_eq!(
            &output[..status.bytes_produced()],
            b"BZh9\x17\x72\x45\x38\x50\x90\x00\x00\x00\x00"
        );
    }

    #[test]
    fn test_invalid_parameters() {
        for (level, wf) in [(0, 30), (10, 30), (9, 251)] {
            let err = Bzip2Compressor::new(level, wf).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_garbage_is_rejected() {
        let mut decompressor = Bzip2Decompressor::default();
        let mut output = [0u8; 64];
        assert!(decompressor
            .decompress(b"this is not a bzip2 stream", &mut output)
            .is_err());
    }
}
