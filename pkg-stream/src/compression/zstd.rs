//! zstd backend over the `zstd-safe` streaming contexts.
//!
//! A zstd payload may be several frames back to back, so the decoder never
//! reports the end of the stream on its own: finishing a frame only means the
//! next input byte starts another one. The adapter ends the stream when its
//! source runs dry.

use std::io::{Error, ErrorKind, Result};

use zstd_safe::{get_error_name, CCtx, CParameter, DCtx, InBuffer, OutBuffer};

use super::{Decoder, Encoder, StreamStatus};

/// Level used when the configuration does not name one.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

fn zstd_error(code: usize) -> Error {
    Error::new(ErrorKind::Other, get_error_name(code))
}

pub struct ZstdCompressor<'a> {
    ctx: CCtx<'a>,
}

impl ZstdCompressor<'_> {
    pub fn new(level: i32) -> Result<Self> {
        Self::build(level, None)
    }

    /// Compress against `dictionary`. The decoder must load the same one.
    pub fn with_dictionary(level: i32, dictionary: &[u8]) -> Result<Self> {
        Self::build(level, Some(dictionary))
    }

    fn build(level: i32, dictionary: Option<&[u8]>) -> Result<Self> {
        let mut ctx = CCtx::create();
        ctx.set_parameter(CParameter::CompressionLevel(level))
            .map_err(zstd_error)?;
        if let Some(dictionary) = dictionary {
            ctx.load_dictionary(dictionary).map_err(zstd_error)?;
        }
        Ok(Self { ctx })
    }
}

impl Encoder for ZstdCompressor<'_> {
    fn compress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StreamStatus> {
        let mut src = InBuffer::around(input);
        let mut dst = OutBuffer::around(output);
        self.ctx
            .compress_stream(&mut dst, &mut src)
            .map_err(zstd_error)?;

        Ok(StreamStatus::step(src.pos(), dst.pos(), false))
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<StreamStatus> {
        let mut dst = OutBuffer::around(output);
        // Bytes still waiting to be flushed; zero once the frame epilogue is out.
        let pending = self.ctx.end_stream(&mut dst).map_err(zstd_error)?;

        Ok(StreamStatus::step(0, dst.pos(), pending == 0))
    }
}

pub struct ZstdDecompressor<'a> {
    ctx: DCtx<'a>,
}

impl ZstdDecompressor<'_> {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ctx: DCtx::create(),
        })
    }

    pub fn with_dictionary(dictionary: &[u8]) -> Result<Self> {
        let mut ctx = DCtx::create();
        ctx.load_dictionary(dictionary).map_err(zstd_error)?;
        Ok(Self { ctx })
    }
}

impl Decoder for ZstdDecompressor<'_> {
    fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StreamStatus> {
        let mut src = InBuffer::around(input);
        let mut dst = OutBuffer::around(output);
        self.ctx
            .decompress_stream(&mut dst, &mut src)
            .map_err(zstd_error)?;

        Ok(StreamStatus::step(src.pos(), dst.pos(), false))
    }
}
