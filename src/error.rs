//! Error types for the WAV codec and mixer.

use thiserror::Error;

/// Result type for codec and mixer operations.
pub type WavResult<T> = Result<T, WavError>;

/// Broad classification of a [`WavError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller misuse: wrong open mode, empty input list, bad options.
    Config,
    /// Malformed or unsupported audio data.
    Format,
    /// Failure of the underlying byte store.
    Io,
}

/// Errors that can occur while reading, writing or merging WAV streams.
#[derive(Debug, Error)]
pub enum WavError {
    /// Invalid usage of the API.
    #[error("invalid usage: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// A chunk tag did not match the canonical RIFF/WAVE layout.
    #[error("unexpected chunk: expected '{expected}', found '{found}'")]
    UnexpectedChunk {
        /// Tag required at this position.
        expected: &'static str,
        /// Tag actually read, lossily decoded.
        found: String,
    },

    /// The fmt chunk declares a compressed or extensible encoding.
    #[error("unsupported audio format tag {tag} (only PCM = 1 is supported)")]
    NotPcm {
        /// The audio format tag read from the fmt chunk.
        tag: u16,
    },

    /// Sample width other than 8, 16 or 32 bits.
    #[error("unsupported bit depth: {bits} bits per sample")]
    UnsupportedBitDepth {
        /// The declared bits per sample.
        bits: u16,
    },

    /// An input that must be mono has more channels.
    #[error("input {index} has {channels} channels, only mono inputs can be merged")]
    NotMono {
        /// 0-based position of the input.
        index: usize,
        /// Declared channel count.
        channels: u16,
    },

    /// Two adjacent inputs disagree on bit depth, byte rate or sample rate.
    #[error("inputs {first} and {second} are not mergeable")]
    NotMergeable {
        /// 0-based index of the first input of the pair.
        first: usize,
        /// 0-based index of the second input of the pair.
        second: usize,
    },

    /// Header fields that are individually readable but inconsistent.
    #[error("invalid header: {message}")]
    InvalidHeader {
        /// Error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WavError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Returns which class of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::UnexpectedChunk { .. }
            | Self::NotPcm { .. }
            | Self::UnsupportedBitDepth { .. }
            | Self::NotMono { .. }
            | Self::NotMergeable { .. }
            | Self::InvalidHeader { .. } => ErrorKind::Format,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}
