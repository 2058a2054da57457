//! Construction of compressed streams from a [`CompressionConfig`].
//!
//! There are four entry points, one per direction and backing kind. Each one
//! builds the codec first and only then opens the file, so a failure at any
//! step drops whatever was already built and no handle is returned.

use std::io;
use std::path::Path;

#[cfg(feature = "bzip2")]
use crate::compression::bzip2::{Bzip2Compressor, Bzip2Decompressor};
#[cfg(feature = "xz")]
use crate::compression::xz::{XzCompressor, XzDecompressor};
#[cfg(feature = "zstd")]
use crate::compression::zstd::{ZstdCompressor, ZstdDecompressor};
use crate::{
    adapter::{CodecReader, CodecWriter},
    compression::{
        constants::*, Compression, CompressionConfig, Decoder, Encoder, StoredCompressor,
        StoredDecompressor,
    },
    error::OpenError,
    handle::{ReadHandle, WriteHandle},
    stream::{ReadStream, WriteStream},
};

type BoxedEncoder = Box<dyn Encoder>;
type BoxedDecoder = Box<dyn Decoder>;

fn encoder_for(config: &CompressionConfig) -> Result<BoxedEncoder, OpenError> {
    let encoder: BoxedEncoder = match config.compression {
        Compression::Stored => Box::new(StoredCompressor),
        #[cfg(feature = "bzip2")]
        Compression::Bzip2 => {
            let level = config.get_u32("level").unwrap_or(BZIP2_DEFAULT_LEVEL);
            let work_factor = config
                .get_u32("work_factor")
                .unwrap_or(BZIP2_DEFAULT_WORK_FACTOR);
            Box::new(Bzip2Compressor::new(level, work_factor).map_err(OpenError::CodecInit)?)
        }
        #[cfg(feature = "xz")]
        Compression::Xz => {
            let level = config.get_u32("level").unwrap_or(XZ_DEFAULT_LEVEL);
            Box::new(XzCompressor::new(level).map_err(OpenError::CodecInit)?)
        }
        #[cfg(feature = "zstd")]
        Compression::Zstd => {
            let level = config
                .get_i32("level")
                .unwrap_or(crate::compression::zstd::DEFAULT_COMPRESSION_LEVEL);
            let compressor = match config.dictionary.as_deref() {
                Some(dict) => ZstdCompressor::with_dictionary(level, dict),
                None => ZstdCompressor::new(level),
            };
            Box::new(compressor.map_err(OpenError::CodecInit)?)
        }
        #[allow(unreachable_patterns)]
        other => return Err(OpenError::Unsupported(other)),
    };

    Ok(encoder)
}

fn decoder_for(config: &CompressionConfig) -> Result<BoxedDecoder, OpenError> {
    let decoder: BoxedDecoder = match config.compression {
        Compression::Stored => Box::new(StoredDecompressor),
        #[cfg(feature = "bzip2")]
        Compression::Bzip2 => {
            let small = config.get_bool("small").unwrap_or(false);
            Box::new(Bzip2Decompressor::new(small))
        }
        #[cfg(feature = "xz")]
        Compression::Xz => Box::new(XzDecompressor::new().map_err(OpenError::CodecInit)?),
        #[cfg(feature = "zstd")]
        Compression::Zstd => {
            let decompressor = match config.dictionary.as_deref() {
                Some(dict) => ZstdDecompressor::with_dictionary(dict),
                None => ZstdDecompressor::new(),
            };
            Box::new(decompressor.map_err(OpenError::CodecInit)?)
        }
        #[allow(unreachable_patterns)]
        other => return Err(OpenError::Unsupported(other)),
    };

    Ok(decoder)
}

/// Open the compressed file at `path` for decompressing reads.
pub fn open_read_path<P: AsRef<Path>>(
    path: P,
    config: &CompressionConfig,
) -> Result<ReadHandle<'static>, OpenError> {
    let path = path.as_ref();
    let reader = CodecReader::open(decoder_for(config)?, path)?;

    tracing::debug!(
        path = %path.display(),
        compression = %config.compression,
        "opened for reading"
    );
    Ok(ReadHandle::new(reader))
}

/// Decompress what `stream` yields. The stream stays owned by the caller and
/// is not closed when the returned handle is.
pub fn open_read_stream<'a>(
    stream: &'a mut dyn ReadStream,
    config: &CompressionConfig,
) -> Result<ReadHandle<'a>, OpenError> {
    let decoder = decoder_for(config)?;
    Ok(ReadHandle::new(CodecReader::from_stream(decoder, stream)))
}

/// Create (or truncate) the file at `path` and compress everything written to
/// the returned handle into it.
pub fn open_write_path<P: AsRef<Path>>(
    path: P,
    config: &CompressionConfig,
) -> Result<WriteHandle<'static>, OpenError> {
    let path = path.as_ref();
    let writer = CodecWriter::create(encoder_for(config)?, path)?;

    tracing::debug!(
        path = %path.display(),
        compression = %config.compression,
        "opened for writing"
    );
    Ok(WriteHandle::new(writer))
}

/// Compress everything written to the returned handle into `stream`. The
/// stream stays owned by the caller and is not closed when the returned handle
/// is.
pub fn open_write_stream<'a>(
    stream: &'a mut dyn WriteStream,
    config: &CompressionConfig,
) -> Result<WriteHandle<'a>, OpenError> {
    let encoder = encoder_for(config)?;
    Ok(WriteHandle::new(CodecWriter::from_stream(encoder, stream)))
}

/// Compress a byte slice in one go.
pub fn compress_bytes(data: &[u8], config: &CompressionConfig) -> io::Result<Vec<u8>> {
    let mut output = Vec::new();
    {
        let mut writer = open_write_stream(&mut output, config)?;
        if !data.is_empty() {
            let n = writer.write(data)?;
            if n != data.len() {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "compressor did not accept all input",
                ));
            }
        }
        writer.close()?;
    }
    Ok(output)
}

/// Decompress a byte slice in one go.
pub fn decompress_bytes(data: &[u8], config: &CompressionConfig) -> io::Result<Vec<u8>> {
    let mut input = data;
    let mut reader = open_read_stream(&mut input, config)?;

    let mut output = Vec::new();
    let mut buf = vec![0u8; crate::adapter::CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        output.extend_from_slice(&buf[..n]);
    }
    reader.close()?;

    Ok(output)
}
