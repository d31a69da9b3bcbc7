//! Parse, validate and merge PCM WAV recordings.
//!
//! Mono inputs opened with [`WavStream::open`] are merged by
//! [`mixer::merge`] into a single interleaved multi-channel file.

pub mod error;
pub mod mixer;
pub mod output;
pub mod wav;

pub use error::{ErrorKind, WavError, WavResult};
pub use mixer::{merge, merge_into, MergeOptions, MixPolicy};
pub use wav::{AudioFormat, OpenMode, WavStream};
