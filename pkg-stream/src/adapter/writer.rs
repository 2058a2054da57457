use std::fs::File;
use std::path::Path;

use super::{chunk_buffer, Sink, MAX_IDLE_STEPS};
use crate::compression::{ByteCount, Encoder, StreamStatus};
use crate::error::{OpenError, Result, StreamError};
use crate::stream::WriteStream;

/// Staged compressed output waiting to be flushed to the sink.
struct OutputChunk {
    buf: Box<[u8]>,
    filled: usize,
}

impl OutputChunk {
    fn new() -> Self {
        Self {
            buf: chunk_buffer(),
            filled: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.filled == self.buf.len()
    }

    fn spare(&mut self) -> &mut [u8] {
        &mut self.buf[self.filled..]
    }

    /// Write out exactly the staged bytes and reset.
    fn flush(&mut self, sink: &mut Sink<'_>, count: &mut ByteCount) -> Result<()> {
        if self.filled == 0 {
            return Ok(());
        }

        sink.write_chunk(&self.buf[..self.filled])?;
        tracing::trace!(bytes = self.filled, "flushed output chunk");

        count.compressed += self.filled as u64;
        self.filled = 0;
        Ok(())
    }
}

/// Compress-on-write adapter.
///
/// Output is only guaranteed complete after [`close`](WriteStream::close),
/// which runs the codec's finish step and flushes the tail of the stream.
/// Dropping an unclosed writer closes it, but the outcome can then only be
/// logged.
pub struct CodecWriter<'a, E: Encoder> {
    // Field order is release order: codec, chunk buffer, backing file.
    encoder: Option<E>,
    chunk: Option<OutputChunk>,
    sink: Option<Sink<'a>>,
    failed: bool,
    count: ByteCount,
}

impl<'a, E: Encoder> CodecWriter<'a, E> {
    pub fn new(encoder: E, sink: Sink<'a>) -> Self {
        tracing::debug!(sink = sink.kind(), "opening codec writer");

        Self {
            encoder: Some(encoder),
            chunk: Some(OutputChunk::new()),
            sink: Some(sink),
            failed: false,
            count: ByteCount::default(),
        }
    }

    /// Encode into a caller-owned stream. The stream is left open on close.
    pub fn from_stream(encoder: E, stream: &'a mut dyn WriteStream) -> Self {
        Self::new(encoder, Sink::Stream(stream))
    }

    /// Encode into a newly created (or truncated) file at `path`, which the
    /// writer owns and closes.
    pub fn create<P: AsRef<Path>>(encoder: E, path: P) -> std::result::Result<Self, OpenError> {
        let path = path.as_ref();
        let file =
            File::create(path).map_err(|e| OpenError::CreateFile(e, path.to_path_buf()))?;
        Ok(Self::new(encoder, Sink::File(file)))
    }

    /// Whether an earlier failure has poisoned this writer.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn is_closed(&self) -> bool {
        self.encoder.is_none()
    }

    pub fn byte_count(&self) -> ByteCount {
        self.count
    }

    fn fail(&mut self, err: StreamError) -> StreamError {
        tracing::warn!(error = %err, "codec writer failed");
        self.failed = true;
        err
    }

    fn encode(&mut self, buf: &[u8]) -> Result<usize> {
        let (Some(encoder), Some(chunk), Some(sink)) =
            (self.encoder.as_mut(), self.chunk.as_mut(), self.sink.as_mut())
        else {
            return Err(StreamError::Closed);
        };

        let mut consumed = 0;
        let mut idle = 0;
        while consumed < buf.len() {
            if chunk.is_full() {
                chunk.flush(sink, &mut self.count)?;
            }

            let status = encoder
                .compress(&buf[consumed..], chunk.spare())
                .map_err(StreamError::Codec)?;
            idle = next_idle(idle, status)?;

            consumed += status.bytes_consumed();
            chunk.filled += status.bytes_produced();
        }

        self.count.raw += consumed as u64;
        Ok(consumed)
    }

    /// Run the codec's finish step to completion, flushing full chunks as
    /// they fill, then flush the partial tail.
    fn drain(&mut self) -> Result<()> {
        let (Some(encoder), Some(chunk), Some(sink)) =
            (self.encoder.as_mut(), self.chunk.as_mut(), self.sink.as_mut())
        else {
            return Err(StreamError::Closed);
        };

        let mut idle = 0;
        loop {
            if chunk.is_full() {
                chunk.flush(sink, &mut self.count)?;
            }

            let status = encoder
                .finish(chunk.spare())
                .map_err(StreamError::Codec)?;
            chunk.filled += status.bytes_produced();

            if status.is_done() {
                break;
            }
            idle = next_idle(idle, status)?;
        }

        chunk.flush(sink, &mut self.count)
    }
}

/// Track consecutive codec steps that moved no bytes, failing once a codec
/// has clearly stopped making progress.
pub(super) fn next_idle(idle: u32, status: StreamStatus) -> Result<u32> {
    if status.bytes_consumed() > 0 || status.bytes_produced() > 0 {
        return Ok(0);
    }
    if idle + 1 >= MAX_IDLE_STEPS {
        return Err(StreamError::Codec(std::io::Error::new(
            std::io::ErrorKind::Other,
            "codec made no progress",
        )));
    }
    Ok(idle + 1)
}

impl<E: Encoder> WriteStream for CodecWriter<'_, E> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(StreamError::BadArgs);
        }
        if self.is_closed() {
            return Err(StreamError::Closed);
        }
        if self.failed {
            return Err(StreamError::Poisoned);
        }

        self.encode(buf).map_err(|e| self.fail(e))
    }

    /// Finish the compressed stream and release the codec, the chunk buffer
    /// and, for file-backed writers, the file.
    ///
    /// Every release step runs even when draining fails. A writer that had
    /// already failed skips the drain and reports [`StreamError::Poisoned`].
    fn close(&mut self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }

        let result = if self.failed {
            Err(StreamError::Poisoned)
        } else {
            self.drain().map_err(|e| self.fail(e))
        };

        self.encoder = None;
        self.chunk = None;
        if let Some(sink) = self.sink.take() {
            tracing::debug!(
                sink = sink.kind(),
                count = ?self.count,
                ok = result.is_ok(),
                "closing codec writer"
            );
        }

        result
    }
}

impl<E: Encoder> Drop for CodecWriter<'_, E> {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }

        tracing::warn!("CodecWriter dropped without calling close(). Finishing it now.");
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "compressed output may be incomplete");
        }
    }
}
