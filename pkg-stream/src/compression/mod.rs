//! Codec backends for compressed streams.
//!
//! Every backend is a sans-IO state machine over caller-provided byte windows.
//! A step reports how far it got through a [`StreamStatus`]:
//! - [`bzip2::Bzip2Compressor`] / [`bzip2::Bzip2Decompressor`]
//! - [`xz::XzCompressor`] / [`xz::XzDecompressor`]
//! - [`zstd::ZstdCompressor`] / [`zstd::ZstdDecompressor`]
//! - [`StoredCompressor`] / [`StoredDecompressor`]
//!
//! They are driven through the [`Encoder`] and [`Decoder`] traits, which is all
//! the stream adapters in [`crate::adapter`] know about.

use core::fmt;
use std::collections::HashMap;
use std::io::{Error, ErrorKind, Result};
use std::str::FromStr;

#[cfg(feature = "bzip2")]
pub mod bzip2;
#[cfg(feature = "xz")]
pub mod xz;
#[cfg(feature = "zstd")]
pub mod zstd;

pub mod constants {
    /// Default bzip2 block size, in units of 100k.
    pub const BZIP2_DEFAULT_LEVEL: u32 = 9;
    /// Default bzip2 fallback threshold for repetitive input.
    pub const BZIP2_DEFAULT_WORK_FACTOR: u32 = 30;
    /// Default xz preset.
    pub const XZ_DEFAULT_LEVEL: u32 = 6;
}

/// Outcome of one codec step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// The codec moved some (possibly zero) bytes and expects another call.
    Progress {
        bytes_consumed: usize,
        bytes_produced: usize,
    },
    /// The codec reached the end marker of its stream during this step.
    Done {
        bytes_consumed: usize,
        bytes_produced: usize,
    },
}

impl StreamStatus {
    pub(crate) fn step(bytes_consumed: usize, bytes_produced: usize, done: bool) -> Self {
        if done {
            StreamStatus::Done {
                bytes_consumed,
                bytes_produced,
            }
        } else {
            StreamStatus::Progress {
                bytes_consumed,
                bytes_produced,
            }
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StreamStatus::Done { .. })
    }

    pub fn bytes_consumed(&self) -> usize {
        match *self {
            StreamStatus::Progress { bytes_consumed, .. }
            | StreamStatus::Done { bytes_consumed, .. } => bytes_consumed,
        }
    }

    pub fn bytes_produced(&self) -> usize {
        match *self {
            StreamStatus::Progress { bytes_produced, .. }
            | StreamStatus::Done { bytes_produced, .. } => bytes_produced,
        }
    }
}

/// Running `total_in`/`total_out` counters of a codec, sampled before a step.
///
/// Codecs that only expose lifetime totals turn them into per-step counts
/// with [`Totals::since`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Totals {
    input: u64,
    output: u64,
}

impl Totals {
    pub(crate) fn new(input: u64, output: u64) -> Self {
        Self { input, output }
    }

    /// Status for a step that moved the counters from `self` to `after`.
    pub(crate) fn since(self, after: Totals, done: bool) -> StreamStatus {
        StreamStatus::step(
            (after.input - self.input) as usize,
            (after.output - self.output) as usize,
            done,
        )
    }
}

/// A compressing state machine.
pub trait Encoder {
    /// Feed `input` and write whatever compressed output is ready into `output`.
    ///
    /// Call repeatedly until all input is consumed.
    fn compress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StreamStatus>;

    /// Flush remaining compressed data with no further input.
    ///
    /// Call repeatedly until `StreamStatus::Done` is returned.
    fn finish(&mut self, output: &mut [u8]) -> Result<StreamStatus>;
}

/// A decompressing state machine.
pub trait Decoder {
    /// Feed `input` and write decompressed bytes into `output`.
    ///
    /// Returns `StreamStatus::Done` only at an end marker after which nothing
    /// more can follow. Formats whose members may be concatenated never report
    /// it; for them the end of the input is the end of the stream. Input may be
    /// empty, which lets the codec drain output it is still holding.
    fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StreamStatus>;
}

impl<E: Encoder + ?Sized> Encoder for Box<E> {
    fn compress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StreamStatus> {
        (**self).compress(input, output)
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<StreamStatus> {
        (**self).finish(output)
    }
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StreamStatus> {
        (**self).decompress(input, output)
    }
}

/// Identity "compression": bytes pass through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct StoredCompressor;

impl Encoder for StoredCompressor {
    fn compress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StreamStatus> {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        Ok(StreamStatus::step(n, n, false))
    }

    fn finish(&mut self, _output: &mut [u8]) -> Result<StreamStatus> {
        Ok(StreamStatus::step(0, 0, true))
    }
}

/// Identity decoder. It has no end marker, so it never reports `Done`; the end
/// of the backing source is the end of the data.
#[derive(Debug, Default, Clone, Copy)]
pub struct StoredDecompressor;

impl Decoder for StoredDecompressor {
    fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<StreamStatus> {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        Ok(StreamStatus::step(n, n, false))
    }
}

/// Tracks the number of bytes moved through a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteCount {
    /// Uncompressed bytes handed to or returned from the caller.
    pub raw: u64,
    /// Compressed bytes exchanged with the backing target.
    pub compressed: u64,
}

/// Which codec a stream uses. Streams carry no header of their own, so a
/// compression is only ever named, never stored.
#[derive(Clone, Copy, Eq, PartialEq, Default)]
pub enum Compression {
    #[default]
    Stored,
    Bzip2,
    Zstd,
    Xz,
}

impl Compression {
    pub const fn available_variants() -> &'static [&'static str] {
        &["stored", "bzip2", "xz", "zstd"]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Compression::Stored => "stored",
            Compression::Bzip2 => "bzip2",
            Compression::Zstd => "zstd",
            Compression::Xz => "xz",
        }
    }

    /// Whether this build carries a backend for this compression.
    pub const fn is_supported(self) -> bool {
        match self {
            Compression::Stored => true,
            Compression::Bzip2 => cfg!(feature = "bzip2"),
            Compression::Zstd => cfg!(feature = "zstd"),
            Compression::Xz => cfg!(feature = "xz"),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stored" | "none" => Ok(Compression::Stored),
            "bzip2" | "bz2" => Ok(Compression::Bzip2),
            "xz" => Ok(Compression::Xz),
            "zstd" => Ok(Compression::Zstd),
            other => Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "Unknown compression `{}`, expected one of: {}",
                    other,
                    Compression::available_variants().join(", ")
                ),
            )),
        }
    }
}

/// Configuration for compression algorithms with optional parameters.
///
/// Recognised options: `level`, `work_factor` (bzip2) and `small` (bzip2
/// decoder). The dictionary is only used by Zstd.
#[derive(Clone, Debug, Default)]
pub struct CompressionConfig {
    pub compression: Compression,
    pub options: HashMap<String, String>,
    /// Zstd dictionary, used for both compression and decompression.
    pub dictionary: Option<Vec<u8>>,
}

impl CompressionConfig {
    pub fn new(compression: Compression) -> Self {
        Self {
            compression,
            options: HashMap::new(),
            dictionary: None,
        }
    }

    /// Create a config with a Zstd dictionary.
    pub fn with_dictionary(compression: Compression, dictionary: Vec<u8>) -> Self {
        Self {
            compression,
            options: HashMap::new(),
            dictionary: Some(dictionary),
        }
    }

    /// Set the dictionary.
    pub fn set_dictionary(&mut self, dictionary: Vec<u8>) {
        self.dictionary = Some(dictionary);
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    /// Builder form of [`set_option`](Self::set_option).
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_option(key, value);
        self
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.options.get(key).and_then(|v| v.parse().ok())
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.options.get(key).and_then(|v| v.parse().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(|v| match v.as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        })
    }
}

impl From<Compression> for CompressionConfig {
    fn from(compression: Compression) -> Self {
        Self::new(compression)
    }
}
