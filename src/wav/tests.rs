use std::io::Cursor;

use tempfile::tempdir;

use super::*;
use crate::error::ErrorKind;

/// Hand-assembles a header so malformed layouts can be produced.
fn raw_header(
    fmt_extra: &[u8],
    format_tag: u16,
    format: &AudioFormat,
    data_tag: &[u8; 4],
    data_size: u32,
) -> Vec<u8> {
    let fmt_size = 16 + fmt_extra.len() as u32;
    let mut buf = Vec::new();
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(4 + 8 + fmt_size + 8 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&fmt_size.to_le_bytes());
    buf.extend_from_slice(&format_tag.to_le_bytes());
    buf.extend_from_slice(&format.channel_count.to_le_bytes());
    buf.extend_from_slice(&format.sample_rate.to_le_bytes());
    buf.extend_from_slice(&format.byte_rate.to_le_bytes());
    buf.extend_from_slice(&format.block_align.to_le_bytes());
    buf.extend_from_slice(&format.bits_per_sample.to_le_bytes());
    buf.extend_from_slice(fmt_extra);
    buf.extend_from_slice(data_tag);
    buf.extend_from_slice(&data_size.to_le_bytes());
    buf
}

fn write_i16(format: AudioFormat, samples: &[i16]) -> Vec<u8> {
    let data_size = samples.len() as u32 * 2;
    let mut stream = WavStream::write_to(Cursor::new(Vec::new()), format, data_size).unwrap();
    for &s in samples {
        stream.write_sample(s).unwrap();
    }
    stream.finish().unwrap();
    stream.into_inner().unwrap().into_inner()
}

#[test]
fn test_canonical_header_layout() {
    let format = AudioFormat::pcm(2, 44100, 16);
    let buf = write_i16(format, &[1, -1, 2, -2]);

    assert_eq!(buf.len(), 44 + 8);
    assert_eq!(&buf[0..4], b"RIFF");
    assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), 36 + 8);
    assert_eq!(&buf[8..12], b"WAVE");
    assert_eq!(&buf[12..16], b"fmt ");
    assert_eq!(u32::from_le_bytes(buf[16..20].try_into().unwrap()), 16);
    assert_eq!(u16::from_le_bytes(buf[20..22].try_into().unwrap()), 1);
    assert_eq!(u16::from_le_bytes(buf[22..24].try_into().unwrap()), 2);
    assert_eq!(u32::from_le_bytes(buf[24..28].try_into().unwrap()), 44100);
    assert_eq!(u32::from_le_bytes(buf[28..32].try_into().unwrap()), 176_400);
    assert_eq!(u16::from_le_bytes(buf[32..34].try_into().unwrap()), 4);
    assert_eq!(u16::from_le_bytes(buf[34..36].try_into().unwrap()), 16);
    assert_eq!(&buf[36..40], b"data");
    assert_eq!(u32::from_le_bytes(buf[40..44].try_into().unwrap()), 8);
    assert_eq!(&buf[44..46], &[0x01, 0x00]);
    assert_eq!(&buf[46..48], &[0xFF, 0xFF]);
}

#[test]
fn test_write_then_read_preserves_header() {
    for format in [
        AudioFormat::pcm(1, 8000, 8),
        AudioFormat::pcm(2, 44100, 16),
        AudioFormat::pcm(1, 96000, 32),
    ] {
        let data_size = format.block_align as u32 * 3;
        let mut writer = WavStream::write_to(Cursor::new(Vec::new()), format, data_size).unwrap();
        for _ in 0..data_size {
            writer.write_sample(0u8).unwrap();
        }
        writer.finish().unwrap();

        let reader = WavStream::read_from(writer.into_inner().unwrap()).unwrap();
        assert_eq!(reader.format(), &format);
        assert_eq!(reader.data_size(), data_size);
        assert_eq!(reader.data_offset(), HEADER_SIZE);
        assert_eq!(reader.frame_count(), 3);
    }
}

#[test]
fn test_read_samples_from_cursor() {
    let buf = write_i16(AudioFormat::pcm(1, 22050, 16), &[100, -200, 300]);
    let mut stream = WavStream::read_from(Cursor::new(buf)).unwrap();

    assert_eq!(stream.read_sample::<i16>().unwrap(), 100);
    assert_eq!(stream.read_sample::<i16>().unwrap(), -200);
    assert_eq!(stream.read_sample::<i16>().unwrap(), 300);

    let err = stream.read_sample::<i16>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    stream.rewind_to_data().unwrap();
    assert_eq!(stream.read_sample::<i16>().unwrap(), 100);
}

#[test]
fn test_rejects_wrong_magic() {
    let mut buf = write_i16(AudioFormat::pcm(1, 8000, 16), &[0]);
    buf[0..4].copy_from_slice(b"RIFX");
    let err = WavStream::read_from(Cursor::new(buf)).unwrap_err();
    assert!(matches!(err, WavError::UnexpectedChunk { expected: "RIFF", .. }));

    let mut buf = write_i16(AudioFormat::pcm(1, 8000, 16), &[0]);
    buf[8..12].copy_from_slice(b"AVI ");
    let err = WavStream::read_from(Cursor::new(buf)).unwrap_err();
    assert!(matches!(err, WavError::UnexpectedChunk { expected: "WAVE", .. }));
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_rejects_missing_fmt_chunk() {
    let mut buf = write_i16(AudioFormat::pcm(1, 8000, 16), &[0]);
    buf[12..16].copy_from_slice(b"JUNK");
    let err = WavStream::read_from(Cursor::new(buf)).unwrap_err();
    match &err {
        WavError::UnexpectedChunk { expected, found } => {
            assert_eq!(*expected, "fmt ");
            assert_eq!(found, "JUNK");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_rejects_non_pcm_before_reading_fields() {
    let format = AudioFormat::pcm(1, 8000, 16);
    let mut buf = raw_header(&[], 2, &format, b"data", 0);
    // Cut the header right after the format tag: reading any further field would be a short read.
    buf.truncate(22);
    let err = WavStream::read_from(Cursor::new(buf)).unwrap_err();
    assert!(matches!(err, WavError::NotPcm { tag: 2 }));
}

#[test]
fn test_rejects_extra_chunk_before_data() {
    let format = AudioFormat::pcm(1, 8000, 16);
    let buf = raw_header(&[], 1, &format, b"LIST", 0);
    let err = WavStream::read_from(Cursor::new(buf)).unwrap_err();
    match err {
        WavError::UnexpectedChunk { expected, found } => {
            assert_eq!(expected, "data");
            assert_eq!(found, "LIST");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_skips_fmt_extension_bytes() {
    let format = AudioFormat::pcm(1, 8000, 16);
    let mut buf = raw_header(&[0, 0], 1, &format, b"data", 4);
    buf.extend_from_slice(&7i16.to_le_bytes());
    buf.extend_from_slice(&(-7i16).to_le_bytes());

    let mut stream = WavStream::read_from(Cursor::new(buf)).unwrap();
    assert_eq!(stream.data_offset(), 46);
    assert_eq!(stream.data_size(), 4);
    assert_eq!(stream.read_sample::<i16>().unwrap(), 7);
    assert_eq!(stream.read_sample::<i16>().unwrap(), -7);
}

#[test]
fn test_rejects_inconsistent_byte_rate() {
    let mut format = AudioFormat::pcm(1, 8000, 16);
    format.byte_rate = 8000;
    let buf = raw_header(&[], 1, &format, b"data", 0);
    let err = WavStream::read_from(Cursor::new(buf)).unwrap_err();
    assert!(matches!(err, WavError::InvalidHeader { .. }));
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_rejects_partial_frame_payload() {
    let format = AudioFormat::pcm(2, 8000, 16);
    let buf = raw_header(&[], 1, &format, b"data", 6);
    let err = WavStream::read_from(Cursor::new(buf)).unwrap_err();
    assert!(matches!(err, WavError::InvalidHeader { .. }));
}

#[test]
fn test_truncated_header_is_io_error() {
    let buf = write_i16(AudioFormat::pcm(1, 8000, 16), &[0]);
    let err = WavStream::read_from(Cursor::new(buf[..30].to_vec())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_write_rejects_inconsistent_format() {
    let mut format = AudioFormat::pcm(2, 44100, 16);
    format.block_align = 2;
    let err = WavStream::write_to(Vec::new(), format, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_finish_detects_short_payload() {
    let mut stream = WavStream::write_to(Vec::new(), AudioFormat::pcm(1, 8000, 16), 4).unwrap();
    stream.write_sample(1i16).unwrap();
    let err = stream.finish().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    stream.write_sample(2i16).unwrap();
    stream.finish().unwrap();
}

/// Accepts `limit` bytes, then reports that nothing more can be written.
#[derive(Debug)]
struct LimitedStore {
    buf: Vec<u8>,
    limit: usize,
}

impl Write for LimitedStore {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = data.len().min(self.limit - self.buf.len());
        self.buf.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_short_header_write_is_io_error() {
    let store = LimitedStore { buf: Vec::new(), limit: 20 };
    let err = WavStream::write_to(store, AudioFormat::pcm(1, 8000, 16), 4).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_short_payload_write_is_io_error() {
    let store = LimitedStore { buf: Vec::new(), limit: HEADER_SIZE as usize + 2 };
    let mut stream = WavStream::write_to(store, AudioFormat::pcm(1, 8000, 16), 4).unwrap();
    stream.write_sample(1i16).unwrap();
    let err = stream.write_sample(2i16).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(stream.into_inner().unwrap().buf.len(), HEADER_SIZE as usize + 2);
}

#[test]
fn test_closed_stream_fails_io() {
    let buf = write_i16(AudioFormat::pcm(1, 8000, 16), &[5]);
    let mut stream = WavStream::read_from(Cursor::new(buf)).unwrap();
    stream.close();

    assert!(!stream.is_open());
    assert_eq!(stream.sample_rate(), 8000);
    assert_eq!(stream.read_sample::<i16>().unwrap_err().kind(), ErrorKind::Io);
    assert_eq!(stream.into_inner().unwrap_err().kind(), ErrorKind::Io);
}

#[test]
fn test_open_and_create_check_mode() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.wav");

    let format = AudioFormat::pcm(1, 8000, 16);
    let err = WavStream::create(&path, OpenMode::Read, format, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(!path.exists());

    let mut stream = WavStream::create(&path, OpenMode::Write, format, 0).unwrap();
    stream.finish().unwrap();
    drop(stream);

    let err = WavStream::open(&path, OpenMode::Write).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);

    let stream = WavStream::open(&path, OpenMode::Read).unwrap();
    assert_eq!(stream.path(), Some(path.as_path()));
    assert_eq!(stream.data_size(), 0);
}

#[test]
fn test_open_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let err = WavStream::open(dir.path().join("missing.wav"), OpenMode::Read).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_reads_file_written_by_hound() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("hound.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for s in [0i16, 1000, -1000, i16::MAX, i16::MIN] {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();

    let mut stream = WavStream::open(&path, OpenMode::Read).unwrap();
    assert_eq!(stream.format(), &AudioFormat::pcm(1, 16000, 16));
    assert_eq!(stream.frame_count(), 5);
    let samples: Vec<i16> = (0..5).map(|_| stream.read_sample().unwrap()).collect();
    assert_eq!(samples, [0, 1000, -1000, i16::MAX, i16::MIN]);
}

#[test]
fn test_hound_reads_created_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ours.wav");
    let format = AudioFormat::pcm(2, 48000, 16);
    let mut stream = WavStream::create(&path, OpenMode::Write, format, 8).unwrap();
    for s in [10i16, -10, 20, -20] {
        stream.write_sample(s).unwrap();
    }
    stream.finish().unwrap();
    drop(stream);

    let mut reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().sample_rate, 48000);
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, [10, -10, 20, -20]);
}

#[test]
fn test_save_as_rewrites_and_removes_source() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source.wav");
    let target = dir.path().join("target.wav");

    // Source carries a fmt extension that the rewrite drops.
    let format = AudioFormat::pcm(1, 8000, 16);
    let mut buf = raw_header(&[0xAA, 0xBB], 1, &format, b"data", 4);
    buf.extend_from_slice(&123i16.to_le_bytes());
    buf.extend_from_slice(&(-456i16).to_le_bytes());
    std::fs::write(&source, &buf).unwrap();

    let stream = WavStream::open(&source, OpenMode::Read).unwrap();
    let mut saved = stream.save_as(&target).unwrap();

    assert!(!source.exists());
    assert_eq!(saved.path(), Some(target.as_path()));
    assert_eq!(saved.format(), &format);
    assert_eq!(saved.data_offset(), HEADER_SIZE);
    assert_eq!(saved.read_sample::<i16>().unwrap(), 123);
    assert_eq!(saved.read_sample::<i16>().unwrap(), -456);
    assert_eq!(std::fs::metadata(&target).unwrap().len(), HEADER_SIZE + 4);
}

#[test]
fn test_save_as_onto_itself_keeps_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("same.wav");
    std::fs::write(&path, write_i16(AudioFormat::pcm(1, 8000, 16), &[9, 8, 7])).unwrap();

    let stream = WavStream::open(&path, OpenMode::Read).unwrap();
    let mut saved = stream.save_as(&path).unwrap();
    assert!(path.exists());
    assert_eq!(saved.frame_count(), 3);
    assert_eq!(saved.read_sample::<i16>().unwrap(), 9);
}
