//! Canonical RIFF/WAVE PCM container codec.
//!
//! A [`WavStream`] owns one byte store. In read mode it parses the
//! RIFF/WAVE/fmt/data chunk sequence eagerly and then hands out samples from a
//! cursor over the data chunk. In write mode it emits the 44-byte canonical
//! header up front and the caller streams exactly `data_size` payload bytes
//! after it.
//!
//! All multi-byte fields are little-endian and decoded field by field.

pub mod format;
pub mod sample;

#[cfg(test)]
mod tests;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{WavError, WavResult};
pub use format::{AudioFormat, OpenMode, SampleWidth};
pub use sample::Sample;

/// Size of the canonical header written by [`WavStream::write_to`].
pub const HEADER_SIZE: u64 = 44;

const PCM_FORMAT_TAG: u16 = 1;
const PCM_FMT_SIZE: u32 = 16;
/// RIFF size field minus the payload: "WAVE", the fmt chunk and the data chunk header.
const RIFF_OVERHEAD: u32 = 4 + (8 + PCM_FMT_SIZE) + 8;

/// Stream opened from disk for reading.
pub type WavFileReader = WavStream<BufReader<File>>;
/// Stream created on disk for writing.
pub type WavFileWriter = WavStream<BufWriter<File>>;

/// A WAV container bound to exactly one byte store.
///
/// Dropping the stream releases the store. [`WavStream::close`] releases it
/// early and leaves a valid, closed stream behind whose sample I/O fails.
#[derive(Debug)]
pub struct WavStream<S> {
    store: Option<S>,
    path: Option<PathBuf>,
    format: AudioFormat,
    data_size: u32,
    data_offset: u64,
    written: u64,
}

impl<S> WavStream<S> {
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn channel_count(&self) -> u16 {
        self.format.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn byte_rate(&self) -> u32 {
        self.format.byte_rate
    }

    pub fn block_align(&self) -> u16 {
        self.format.block_align
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.format.bits_per_sample
    }

    /// Bytes of PCM payload.
    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    /// Byte position of the first payload byte.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    pub fn frame_count(&self) -> u32 {
        self.data_size / self.format.block_align.max(1) as u32
    }

    /// File backing this stream, if it was opened or created from a path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_mergeable_with<T>(&self, other: &WavStream<T>) -> bool {
        self.format.is_mergeable_with(&other.format)
    }

    pub fn is_open(&self) -> bool {
        self.store.is_some()
    }

    /// Releases the byte store. Format accessors keep working.
    pub fn close(&mut self) {
        self.store = None;
    }

    /// Moves the byte store out, leaving this stream closed.
    pub fn into_inner(mut self) -> WavResult<S> {
        self.store.take().ok_or_else(closed)
    }

    fn store_mut(&mut self) -> WavResult<&mut S> {
        self.store.as_mut().ok_or_else(closed)
    }
}

fn closed() -> WavError {
    WavError::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "wav stream is closed",
    ))
}

impl<S: Read + Seek> WavStream<S> {
    /// Parses the header of `store`, starting from offset 0.
    pub fn read_from(mut store: S) -> WavResult<Self> {
        store.seek(SeekFrom::Start(0))?;

        expect_tag(&mut store, "RIFF")?;
        let _riff_size = read_u32(&mut store)?;
        expect_tag(&mut store, "WAVE")?;
        expect_tag(&mut store, "fmt ")?;
        let fmt_size = read_u32(&mut store)?;
        if fmt_size < PCM_FMT_SIZE {
            return Err(WavError::invalid_header(format!(
                "fmt chunk of {} bytes is shorter than {}",
                fmt_size, PCM_FMT_SIZE
            )));
        }

        let tag = read_u16(&mut store)?;
        if tag != PCM_FORMAT_TAG {
            return Err(WavError::NotPcm { tag });
        }

        let format = AudioFormat {
            channel_count: read_u16(&mut store)?,
            sample_rate: read_u32(&mut store)?,
            byte_rate: read_u32(&mut store)?,
            block_align: read_u16(&mut store)?,
            bits_per_sample: read_u16(&mut store)?,
        };
        format
            .check_consistency()
            .map_err(WavError::invalid_header)?;

        // Extension bytes are skipped, never interpreted.
        let extra = fmt_size - PCM_FMT_SIZE;
        if extra > 0 {
            store.seek(SeekFrom::Current(extra as i64))?;
        }

        expect_tag(&mut store, "data")?;
        let data_size = read_u32(&mut store)?;
        if data_size % format.block_align as u32 != 0 {
            return Err(WavError::invalid_header(format!(
                "data size {} is not a multiple of block align {}",
                data_size, format.block_align
            )));
        }
        let data_offset = store.stream_position()?;

        debug!(
            channels = format.channel_count,
            sample_rate = format.sample_rate,
            bits = format.bits_per_sample,
            data_size,
            data_offset,
            "parsed wav header"
        );

        Ok(Self {
            store: Some(store),
            path: None,
            format,
            data_size,
            data_offset,
            written: 0,
        })
    }

    /// Moves the read cursor back to the first payload byte.
    pub fn rewind_to_data(&mut self) -> WavResult<()> {
        let offset = self.data_offset;
        self.store_mut()?.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

impl<S: Read> WavStream<S> {
    /// Reads one sample at the cursor and advances it.
    ///
    /// Not bounded by `data_size`; callers gate on it themselves.
    pub fn read_sample<T: Sample>(&mut self) -> WavResult<T> {
        Ok(T::read_le(self.store_mut()?)?)
    }
}

impl<S: Write> WavStream<S> {
    /// Writes the canonical header to `store`.
    ///
    /// The caller must then write exactly `data_size` payload bytes and call
    /// [`WavStream::finish`].
    pub fn write_to(mut store: S, format: AudioFormat, data_size: u32) -> WavResult<Self> {
        let riff_size = check_writable(&format, data_size)?;

        store.write_all(b"RIFF")?;
        store.write_all(&riff_size.to_le_bytes())?;
        store.write_all(b"WAVE")?;

        store.write_all(b"fmt ")?;
        store.write_all(&PCM_FMT_SIZE.to_le_bytes())?;
        store.write_all(&PCM_FORMAT_TAG.to_le_bytes())?;
        store.write_all(&format.channel_count.to_le_bytes())?;
        store.write_all(&format.sample_rate.to_le_bytes())?;
        store.write_all(&format.byte_rate.to_le_bytes())?;
        store.write_all(&format.block_align.to_le_bytes())?;
        store.write_all(&format.bits_per_sample.to_le_bytes())?;

        store.write_all(b"data")?;
        store.write_all(&data_size.to_le_bytes())?;

        Ok(Self {
            store: Some(store),
            path: None,
            format,
            data_size,
            data_offset: HEADER_SIZE,
            written: 0,
        })
    }

    /// Writes one sample at the cursor and advances it.
    pub fn write_sample<T: Sample>(&mut self, value: T) -> WavResult<()> {
        value.write_le(self.store_mut()?)?;
        self.written += T::WIDTH as u64;
        Ok(())
    }

    /// Flushes the store and checks the payload length matches the header.
    pub fn finish(&mut self) -> WavResult<()> {
        self.store_mut()?.flush()?;
        if self.written != self.data_size as u64 {
            return Err(WavError::config(format!(
                "wrote {} payload bytes, header declares {}",
                self.written, self.data_size
            )));
        }
        Ok(())
    }
}

impl WavFileReader {
    /// Opens `path` and parses its header. `mode` must be [`OpenMode::Read`].
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> WavResult<Self> {
        if mode != OpenMode::Read {
            return Err(WavError::config("open requires read mode"));
        }
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut stream = Self::read_from(BufReader::new(file))?;
        stream.path = Some(path.to_path_buf());
        Ok(stream)
    }

    /// Rewrites this file under `path` with a canonical header.
    ///
    /// The new file is assembled in a temporary file next to `path` and moved
    /// into place in one step. The original file is removed afterwards unless
    /// it is the destination itself.
    pub fn save_as<P: AsRef<Path>>(mut self, path: P) -> WavResult<Self> {
        let path = path.as_ref();
        let source = self
            .path
            .clone()
            .ok_or_else(|| WavError::config("stream has no backing file"))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let temp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer =
                WavStream::write_to(BufWriter::new(temp.as_file()), self.format, self.data_size)?;
            self.rewind_to_data()?;
            let len = self.data_size as u64;
            let reader = self.store_mut()?;
            let copied = io::copy(&mut reader.by_ref().take(len), writer.store_mut()?)?;
            if copied != len {
                return Err(WavError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("payload ended after {} of {} bytes", copied, len),
                )));
            }
            writer.written = copied;
            writer.finish()?;
        }
        self.close();

        temp.persist(path).map_err(|e| WavError::Io(e.error))?;
        if fs::canonicalize(&source).ok() != fs::canonicalize(path).ok() {
            fs::remove_file(&source)?;
        }
        debug!(from = %source.display(), to = %path.display(), "saved wav file");

        Self::open(path, OpenMode::Read)
    }
}

impl WavFileWriter {
    /// Creates `path` and writes the header. `mode` must be [`OpenMode::Write`].
    ///
    /// The format is validated before the file is created.
    pub fn create<P: AsRef<Path>>(
        path: P,
        mode: OpenMode,
        format: AudioFormat,
        data_size: u32,
    ) -> WavResult<Self> {
        if mode != OpenMode::Write {
            return Err(WavError::config("create requires write mode"));
        }
        check_writable(&format, data_size)?;
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut stream = Self::write_to(BufWriter::new(file), format, data_size)?;
        stream.path = Some(path.to_path_buf());
        Ok(stream)
    }
}

/// Validates a header about to be written and returns its RIFF size field.
fn check_writable(format: &AudioFormat, data_size: u32) -> WavResult<u32> {
    format.check_consistency().map_err(WavError::config)?;
    if data_size % format.block_align as u32 != 0 {
        return Err(WavError::config(format!(
            "data size {} is not a multiple of block align {}",
            data_size, format.block_align
        )));
    }
    data_size
        .checked_add(RIFF_OVERHEAD)
        .ok_or_else(|| {
            WavError::config(format!("data size {} does not fit a RIFF file", data_size))
        })
}

fn expect_tag<R: Read>(reader: &mut R, expected: &'static str) -> WavResult<()> {
    let mut tag = [0u8; 4];
    reader.read_exact(&mut tag)?;
    if &tag[..] != expected.as_bytes() {
        return Err(WavError::UnexpectedChunk {
            expected,
            found: String::from_utf8_lossy(&tag).into_owned(),
        });
    }
    Ok(())
}

fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
