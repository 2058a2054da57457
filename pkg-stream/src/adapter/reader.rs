use std::fs::File;
use std::path::Path;

use super::writer::next_idle;
use super::{chunk_buffer, Source};
use crate::compression::{ByteCount, Decoder};
use crate::error::{OpenError, Result, StreamError};
use crate::stream::ReadStream;

/// Decompress-on-read adapter.
///
/// Each [`read`](ReadStream::read) decodes directly into the caller's buffer,
/// refilling the chunk buffer from the [`Source`] only once the codec has
/// consumed everything staged in it.
pub struct CodecReader<'a, D: Decoder> {
    // Field order is release order: codec, chunk buffer, backing file.
    decoder: Option<D>,
    chunk: Box<[u8]>,
    source: Option<Source<'a>>,
    /// Staged compressed bytes not yet consumed by the codec: `chunk[pos..len]`.
    pos: usize,
    len: usize,
    /// The codec has reported the end of the compressed stream.
    finished: bool,
    failed: bool,
    count: ByteCount,
}

impl<'a, D: Decoder> CodecReader<'a, D> {
    pub fn new(decoder: D, source: Source<'a>) -> Self {
        tracing::debug!(source = source.kind(), "opening codec reader");

        Self {
            decoder: Some(decoder),
            chunk: chunk_buffer(),
            source: Some(source),
            pos: 0,
            len: 0,
            finished: false,
            failed: false,
            count: ByteCount::default(),
        }
    }

    /// Decode from a caller-owned stream. The stream is left open on close.
    pub fn from_stream(decoder: D, stream: &'a mut dyn ReadStream) -> Self {
        Self::new(decoder, Source::Stream(stream))
    }

    /// Decode from the file at `path`, which the reader owns and closes.
    pub fn open<P: AsRef<Path>>(decoder: D, path: P) -> std::result::Result<Self, OpenError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| OpenError::OpenFile(e, path.to_path_buf()))?;
        Ok(Self::new(decoder, Source::File(file)))
    }

    /// Whether an earlier failure has poisoned this reader.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_closed(&self) -> bool {
        self.decoder.is_none()
    }

    pub fn byte_count(&self) -> ByteCount {
        self.count
    }

    fn fail(&mut self, err: StreamError) -> StreamError {
        tracing::warn!(error = %err, "codec reader failed");
        self.failed = true;
        err
    }

    /// Stage the next chunk of compressed input. Returns false at end of data.
    fn refill(&mut self) -> Result<bool> {
        let source = self.source.as_mut().ok_or(StreamError::Closed)?;
        let n = source.read(&mut self.chunk)?;
        tracing::trace!(bytes = n, "refilled input chunk");

        self.pos = 0;
        self.len = n;
        self.count.compressed += n as u64;
        Ok(n > 0)
    }
}

impl<D: Decoder> ReadStream for CodecReader<'_, D> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(StreamError::BadArgs);
        }
        if self.is_closed() {
            return Err(StreamError::Closed);
        }
        if self.failed {
            return Err(StreamError::Poisoned);
        }
        if self.finished {
            return Ok(0);
        }

        let mut produced = 0;
        let mut idle = 0;
        // Set when the source reports end of data during this call. The codec
        // is still stepped with empty input to drain what it holds.
        let mut exhausted = false;
        while produced < buf.len() {
            if self.pos == self.len && !exhausted {
                match self.refill() {
                    Ok(true) => {}
                    Ok(false) => exhausted = true,
                    Err(e) => return Err(self.fail(e)),
                }
            }

            let Some(decoder) = self.decoder.as_mut() else {
                return Err(StreamError::Closed);
            };
            let input = &self.chunk[self.pos..self.len];
            let status = match decoder.decompress(input, &mut buf[produced..]) {
                Ok(status) => status,
                Err(e) => return Err(self.fail(StreamError::Codec(e))),
            };

            self.pos += status.bytes_consumed();
            produced += status.bytes_produced();

            if status.is_done() {
                tracing::trace!("codec reached end of stream");
                self.finished = true;
                break;
            }

            if exhausted && status.bytes_produced() == 0 && self.pos == self.len {
                // Nothing staged, nothing buffered in the codec: end of data.
                break;
            }
            idle = match next_idle(idle, status) {
                Ok(idle) => idle,
                Err(e) => return Err(self.fail(e)),
            };
        }

        self.count.raw += produced as u64;
        Ok(produced)
    }

    fn close(&mut self) -> Result<()> {
        let Some(decoder) = self.decoder.take() else {
            return Ok(());
        };

        drop(decoder);
        self.chunk = Box::default();
        if let Some(source) = self.source.take() {
            tracing::debug!(source = source.kind(), count = ?self.count, "closing codec reader");
        }
        Ok(())
    }
}
