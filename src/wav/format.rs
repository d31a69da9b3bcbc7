use crate::error::{WavError, WavResult};

/// Access requested when opening or creating a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// PCM sample widths the mixer knows how to accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    Int8,
    Int16,
    Int32,
}

impl SampleWidth {
    pub fn from_bits(bits: u16) -> WavResult<Self> {
        match bits {
            8 => Ok(SampleWidth::Int8),
            16 => Ok(SampleWidth::Int16),
            32 => Ok(SampleWidth::Int32),
            _ => Err(WavError::UnsupportedBitDepth { bits }),
        }
    }

    pub fn bytes_per_sample(&self) -> u32 {
        match self {
            SampleWidth::Int8 => 1,
            SampleWidth::Int16 => 2,
            SampleWidth::Int32 => 4,
        }
    }
}

/// Encoding parameters stored in the fmt chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub channel_count: u16,
    /// Frames per second.
    pub sample_rate: u32,
    /// Bytes per second; redundant with `sample_rate * block_align`.
    pub byte_rate: u32,
    /// Bytes per frame.
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Builds a self-consistent PCM format, deriving `block_align` and `byte_rate`.
    pub fn pcm(channel_count: u16, sample_rate: u32, bits_per_sample: u16) -> Self {
        let block_align = channel_count.wrapping_mul(bits_per_sample / 8);
        Self {
            channel_count,
            sample_rate,
            byte_rate: sample_rate.wrapping_mul(block_align as u32),
            block_align,
            bits_per_sample,
        }
    }

    /// Bit depth, byte rate and sample rate agree. Channel count is not compared.
    pub fn is_mergeable_with(&self, other: &AudioFormat) -> bool {
        self.bits_per_sample == other.bits_per_sample
            && self.byte_rate == other.byte_rate
            && self.sample_rate == other.sample_rate
    }

    /// Same format with `channels` channels, scaling the per-frame fields.
    pub fn with_channels(&self, channels: u16) -> WavResult<Self> {
        let block_align = (self.block_align / self.channel_count.max(1))
            .checked_mul(channels)
            .ok_or_else(|| {
                WavError::config(format!("{} channels overflow block align", channels))
            })?;
        let byte_rate = self
            .sample_rate
            .checked_mul(block_align as u32)
            .ok_or_else(|| WavError::config(format!("{} channels overflow byte rate", channels)))?;
        Ok(Self {
            channel_count: channels,
            block_align,
            byte_rate,
            ..*self
        })
    }

    /// Checks the redundant fields against each other.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.channel_count == 0 {
            return Err("channel count is zero".to_string());
        }
        if self.sample_rate == 0 {
            return Err("sample rate is zero".to_string());
        }
        if self.bits_per_sample == 0 || self.bits_per_sample % 8 != 0 {
            return Err(format!(
                "bits per sample {} is not a whole number of bytes",
                self.bits_per_sample
            ));
        }
        let expected_align = self.channel_count as u32 * (self.bits_per_sample as u32 / 8);
        if self.block_align as u32 != expected_align {
            return Err(format!(
                "block align {} does not match {} channels of {} bits",
                self.block_align, self.channel_count, self.bits_per_sample
            ));
        }
        let expected_rate = self.sample_rate as u64 * self.block_align as u64;
        if self.byte_rate as u64 != expected_rate {
            return Err(format!(
                "byte rate {} does not match sample rate {} x block align {}",
                self.byte_rate, self.sample_rate, self.block_align
            ));
        }
        Ok(())
    }
}
