use super::*;
use crate::compression::{ByteCount, Decoder, StoredCompressor, StoredDecompressor};
use crate::error::{codes, OpenError};

/// Deterministic, incompressible test data.
fn noise(len: usize) -> Vec<u8> {
    let mut state = 0x2545_f491_4f6c_dd1d_u64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

/// A source that counts calls and can be told to fail.
struct ScriptedSource {
    data: Vec<u8>,
    pos: usize,
    calls: usize,
    fail: bool,
}

impl ScriptedSource {
    fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            calls: 0,
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }
}

impl ReadStream for ScriptedSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.calls += 1;
        if self.fail {
            return Err(StreamError::Io(io::Error::new(
                io::ErrorKind::Other,
                "disk on fire",
            )));
        }

        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// A sink that accepts at most `budget` bytes in total and records everything.
struct ScriptedSink {
    data: Vec<u8>,
    budget: usize,
    calls: usize,
    closed: bool,
}

impl ScriptedSink {
    fn new() -> Self {
        Self::with_budget(usize::MAX)
    }

    fn with_budget(budget: usize) -> Self {
        Self {
            data: Vec::new(),
            budget,
            calls: 0,
            closed: false,
        }
    }
}

impl WriteStream for ScriptedSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.calls += 1;
        let n = buf.len().min(self.budget);
        self.budget -= n;
        self.data.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

fn read_all<D: Decoder>(reader: &mut CodecReader<'_, D>, piece: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; piece];
    loop {
        let n = reader.read(&mut buf).unwrap();
        if n == 0 {
            return out;
        }
        out.extend_from_slice(&buf[..n]);
    }
}

#[test]
fn stored_writer_flushes_whole_chunks() {
    let data = noise(CHUNK_SIZE + 10);
    let mut sink = ScriptedSink::new();
    {
        let mut writer = CodecWriter::from_stream(StoredCompressor, &mut sink);
        assert_eq!(writer.write(&data).unwrap(), data.len());
        assert_eq!(writer.byte_count().compressed, CHUNK_SIZE as u64);
        writer.close().unwrap();
        assert_eq!(writer.byte_count().raw, data.len() as u64);
        assert_eq!(writer.byte_count().compressed, data.len() as u64);
    }

    assert_eq!(sink.data, data);
    // One full chunk while writing, the ten byte tail on close.
    assert_eq!(sink.calls, 2);
}

#[test]
fn wrapped_sink_is_left_open() {
    let mut sink = ScriptedSink::new();
    {
        let mut writer = CodecWriter::from_stream(StoredCompressor, &mut sink);
        writer.write(b"payload").unwrap();
        writer.close().unwrap();
    }

    assert!(!sink.closed);
    assert_eq!(sink.write(b" and more").unwrap(), 9);
    assert_eq!(sink.data, b"payload and more");
}

#[test]
fn wrapped_source_is_left_usable() {
    let mut source = ScriptedSource::new(b"abcdef".to_vec());
    {
        let mut reader = CodecReader::from_stream(StoredDecompressor, &mut source);
        let mut buf = [0u8; 3];
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        reader.close().unwrap();
    }

    // The stored decoder stages a whole refill, so the source is drained, but
    // it still answers reads.
    let mut buf = [0u8; 3];
    assert_eq!(source.read(&mut buf).unwrap(), 0);
}

#[test]
fn short_write_while_streaming_poisons_writer() {
    let data = noise(2 * CHUNK_SIZE);
    let mut sink = ScriptedSink::with_budget(CHUNK_SIZE / 2);
    {
        let mut writer = CodecWriter::from_stream(StoredCompressor, &mut sink);

        let err = writer.write(&data).unwrap_err();
        assert!(matches!(err, StreamError::ShortWrite { written, expected }
            if written == CHUNK_SIZE / 2 && expected == CHUNK_SIZE));
        assert_eq!(err.code(), codes::INTERNAL_ERROR);
        assert!(writer.is_failed());

        let err = writer.write(b"more").unwrap_err();
        assert!(matches!(err, StreamError::Poisoned));

        // Finalization is skipped but everything is still released.
        let err = writer.close().unwrap_err();
        assert_eq!(err.code(), codes::INTERNAL_ERROR);
        assert!(writer.is_closed());
    }

    assert_eq!(sink.calls, 1);
    assert!(!sink.closed);
}

#[cfg(feature = "bzip2")]
#[test]
fn short_write_while_finishing_is_reported() {
    use crate::compression::bzip2::Bzip2Compressor;

    let mut sink = ScriptedSink::with_budget(5);
    {
        let mut writer =
            CodecWriter::from_stream(Bzip2Compressor::new(9, 30).unwrap(), &mut sink);
        writer.write(b"hello hello hello").unwrap();

        let err = writer.close().unwrap_err();
        assert!(matches!(err, StreamError::ShortWrite { written: 5, .. }));
        assert!(err.is_internal());
        assert!(writer.is_failed());
        assert!(writer.is_closed());

        // Closing again does nothing.
        writer.close().unwrap();
    }

    assert_eq!(sink.calls, 1);
    assert_eq!(sink.data, b"BZh9\x31");
}

#[test]
fn bad_arguments_leave_backing_untouched() {
    let mut source = ScriptedSource::new(b"abc".to_vec());
    {
        let mut reader = CodecReader::from_stream(StoredDecompressor, &mut source);
        let err = reader.read(&mut []).unwrap_err();
        assert_eq!(err.code(), codes::BAD_ARGS);
        assert!(!reader.is_failed());
    }
    assert_eq!(source.calls, 0);

    let mut sink = ScriptedSink::new();
    {
        let mut writer = CodecWriter::from_stream(StoredCompressor, &mut sink);
        let err = writer.write(&[]).unwrap_err();
        assert_eq!(err.code(), codes::BAD_ARGS);
        assert!(!writer.is_failed());
        assert_eq!(writer.byte_count(), ByteCount::default());
        writer.close().unwrap();
    }
    assert_eq!(sink.calls, 0);
}

#[test]
fn failing_source_poisons_reader() {
    let mut source = ScriptedSource::failing();
    {
        let mut reader = CodecReader::from_stream(StoredDecompressor, &mut source);
        let mut buf = [0u8; 16];

        let err = reader.read(&mut buf).unwrap_err();
        assert!(matches!(err, StreamError::Underlying(_)));
        assert_eq!(err.code(), codes::INTERNAL_ERROR);

        let err = reader.read(&mut buf).unwrap_err();
        assert!(matches!(err, StreamError::Poisoned));
        reader.close().unwrap();
    }
    assert_eq!(source.calls, 1);
}

#[test]
fn closed_adapters_report_bad_stream() {
    let mut sink = Vec::new();
    let mut writer = CodecWriter::from_stream(StoredCompressor, &mut sink);
    writer.close().unwrap();
    writer.close().unwrap();
    let err = writer.write(b"late").unwrap_err();
    assert!(matches!(err, StreamError::Closed));
    assert_eq!(err.code(), codes::BAD_STREAM);

    let mut src: &[u8] = b"abc";
    let mut reader = CodecReader::from_stream(StoredDecompressor, &mut src);
    reader.close().unwrap();
    let err = reader.read(&mut [0u8; 4]).unwrap_err();
    assert_eq!(err.code(), codes::BAD_STREAM);
}

#[test]
fn stored_roundtrip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.raw");
    let data = noise(3 * CHUNK_SIZE + 123);

    let mut writer = CodecWriter::create(StoredCompressor, &path).unwrap();
    writer.write(&data).unwrap();
    writer.close().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), data);

    let mut reader = CodecReader::open(StoredDecompressor, &path).unwrap();
    assert_eq!(read_all(&mut reader, 1000), data);
    assert_eq!(reader.byte_count().raw, data.len() as u64);
    assert_eq!(reader.byte_count().compressed, data.len() as u64);
    reader.close().unwrap();
}

#[test]
fn file_open_failures_name_the_path() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing.raw");
    match CodecReader::open(StoredDecompressor, &missing) {
        Err(OpenError::OpenFile(e, path)) => {
            assert_eq!(e.kind(), io::ErrorKind::NotFound);
            assert_eq!(path, missing);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("opened a missing file"),
    }

    let nowhere = dir.path().join("no-such-dir").join("out.raw");
    match CodecWriter::create(StoredCompressor, &nowhere) {
        Err(OpenError::CreateFile(_, path)) => assert_eq!(path, nowhere),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("created a file in a missing directory"),
    }
}

#[cfg(feature = "bzip2")]
mod bzip2 {
    use super::*;
    use crate::compression::bzip2::{Bzip2Compressor, Bzip2Decompressor};

    fn compress(data: &[u8], level: u32) -> Vec<u8> {
        let mut sink = Vec::new();
        {
            let mut writer =
                CodecWriter::from_stream(Bzip2Compressor::new(level, 30).unwrap(), &mut sink);
            for piece in data.chunks(5000) {
                assert_eq!(writer.write(piece).unwrap(), piece.len());
            }
            writer.close().unwrap();
        }
        sink
    }

    #[test]
    fn partial_reads_continue_where_they_left_off() {
        let data = noise(3 * CHUNK_SIZE + 123);
        let compressed = compress(&data, 9);

        let mut src: &[u8] = &compressed;
        let mut reader = CodecReader::from_stream(Bzip2Decompressor::default(), &mut src);

        let mut first = [0u8; 7];
        assert_eq!(reader.read(&mut first).unwrap(), 7);
        assert_eq!(&first, &data[..7]);

        let rest = read_all(&mut reader, 7);
        assert_eq!(rest, &data[7..]);
    }

    #[test]
    fn end_of_data_keeps_returning_zero() {
        let data = b"short payload".to_vec();
        let compressed = compress(&data, 9);

        let mut source = ScriptedSource::new(compressed);
        {
            let mut reader = CodecReader::from_stream(Bzip2Decompressor::default(), &mut source);
            let mut buf = [0u8; 64];
            assert_eq!(reader.read(&mut buf).unwrap(), data.len());
            assert_eq!(&buf[..data.len()], &data[..]);
            assert_eq!(reader.read(&mut buf).unwrap(), 0);
            assert_eq!(reader.read(&mut buf).unwrap(), 0);
        }
        // Once the codec has seen the end marker the source is not read again.
        assert_eq!(source.calls, 1);
    }

    #[test]
    fn output_flushes_while_streaming() {
        // Level 1 uses 100k blocks, so compressed output appears long before close.
        let data = noise(300 * 1024);
        let mut sink = ScriptedSink::new();
        {
            let mut writer =
                CodecWriter::from_stream(Bzip2Compressor::new(1, 30).unwrap(), &mut sink);
            writer.write(&data).unwrap();
            assert!(writer.byte_count().compressed >= CHUNK_SIZE as u64);
            writer.close().unwrap();
        }
        assert!(sink.calls > 1);

        let mut src: &[u8] = &sink.data;
        let mut reader = CodecReader::from_stream(Bzip2Decompressor::new(true), &mut src);
        assert_eq!(read_all(&mut reader, CHUNK_SIZE), data);
    }

    #[test]
    fn corrupt_input_poisons_reader() {
        let mut src: &[u8] = b"definitely not a bzip2 stream";
        let mut reader = CodecReader::from_stream(Bzip2Decompressor::default(), &mut src);
        let mut buf = [0u8; 64];

        let err = reader.read(&mut buf).unwrap_err();
        assert!(matches!(err, StreamError::Codec(_)));
        assert!(reader.is_failed());
        assert!(matches!(
            reader.read(&mut buf).unwrap_err(),
            StreamError::Poisoned
        ));
    }

    #[test]
    fn dropping_an_unclosed_writer_finishes_the_stream() {
        let data = noise(1000);
        let mut sink = Vec::new();
        {
            let mut writer =
                CodecWriter::from_stream(Bzip2Compressor::new(9, 30).unwrap(), &mut sink);
            writer.write(&data).unwrap();
        }

        let mut src: &[u8] = &sink;
        let mut reader = CodecReader::from_stream(Bzip2Decompressor::default(), &mut src);
        assert_eq!(read_all(&mut reader, 4096), data);
    }

    #[test]
    fn truncated_input_ends_early_without_error() {
        let data = noise(2000);
        let compressed = compress(&data, 9);
        let mut src: &[u8] = &compressed[..compressed.len() / 2];

        let mut reader = CodecReader::from_stream(Bzip2Decompressor::default(), &mut src);
        let out = read_all(&mut reader, 4096);
        assert!(out.len() < data.len());
        assert!(!reader.is_failed());
    }
}
