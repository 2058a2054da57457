//! Compressed byte streams for reading and writing package payloads.
//!
//! Callers get a [`ReadHandle`] or [`WriteHandle`] from one of the `open_*`
//! functions and never need to know which codec, if any, sits behind it. A
//! stream can be backed by a file it owns or by another stream the caller
//! owns, so transforms can be chained:
//!
//! ```no_run
//! use pkg_stream::{open_write_path, open_write_stream, Compression, CompressionConfig, WriteStream};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut outer = open_write_path("payload.bz2.zst", &CompressionConfig::new(Compression::Zstd))?;
//! let mut inner = open_write_stream(&mut outer, &CompressionConfig::new(Compression::Bzip2))?;
//! inner.write(b"hello")?;
//! inner.close()?;
//! drop(inner);
//! outer.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Every failing call returns a [`StreamError`] whose [`code`](StreamError::code)
//! is one of the stable values in [`error::codes`].

pub mod adapter;
pub mod compression;
pub mod error;
pub mod handle;
mod open;
pub mod stream;

pub use adapter::{CodecReader, CodecWriter, Sink, Source, CHUNK_SIZE};
pub use compression::{
    ByteCount, Compression, CompressionConfig, Decoder, Encoder, StreamStatus,
};
pub use error::{into_raw, OpenError, StreamError};
pub use handle::{
    close_read_stream, close_write_stream, read_from_stream, write_to_stream, ReadHandle,
    WriteHandle,
};
pub use open::{
    compress_bytes, decompress_bytes, open_read_path, open_read_stream, open_write_path,
    open_write_stream,
};
pub use stream::{IoReader, IoWriter, ReadStream, WriteStream};
