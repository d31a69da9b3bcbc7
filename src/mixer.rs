//! Merging mono streams into one interleaved multi-channel stream.

use std::io::{Read, Seek, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{WavError, WavResult};
use crate::wav::{AudioFormat, OpenMode, Sample, SampleWidth, WavFileWriter, WavStream};

/// How inputs are combined into output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixPolicy {
    /// Input `j` is summed into channel `j % channels`. Sums wrap in the sample width.
    #[default]
    SumAndRoute,
    /// Inputs are split into contiguous groups, one per channel, and averaged.
    SumAndAverage,
}

impl MixPolicy {
    /// For each output channel, the indices of the inputs feeding it.
    ///
    /// When there are fewer inputs than channels, every channel still gets a
    /// source: a channel left without one repeats an input instead of
    /// staying silent.
    pub fn routes(&self, inputs: usize, channels: usize) -> Vec<Vec<usize>> {
        match self {
            MixPolicy::SumAndRoute => (0..channels)
                .map(|c| {
                    let sources: Vec<usize> = (0..inputs).filter(|j| j % channels == c).collect();
                    if sources.is_empty() {
                        vec![c % inputs]
                    } else {
                        sources
                    }
                })
                .collect(),
            MixPolicy::SumAndAverage => (0..channels)
                .map(|c| {
                    if inputs >= channels {
                        (c * inputs / channels..(c + 1) * inputs / channels).collect()
                    } else {
                        vec![c * inputs / channels]
                    }
                })
                .collect(),
        }
    }
}

/// Parameters of a merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeOptions {
    /// Output channel count.
    pub channels: u16,
    /// Applied to every mixed sample; 1.0 leaves samples unscaled.
    pub amplitude: f64,
    pub policy: MixPolicy,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            channels: 2,
            amplitude: 1.0,
            policy: MixPolicy::default(),
        }
    }
}

/// Everything decided before the first output byte is written.
#[derive(Debug)]
struct MergePlan {
    format: AudioFormat,
    data_size: u32,
    frames: u32,
    width: SampleWidth,
    routes: Vec<Vec<usize>>,
}

impl MergePlan {
    fn new<R>(inputs: &[WavStream<R>], options: &MergeOptions) -> WavResult<Self> {
        let first = inputs
            .first()
            .ok_or_else(|| WavError::config("no input streams to merge"))?;
        if options.channels == 0 {
            return Err(WavError::config("output channel count must be at least 1"));
        }
        if !options.amplitude.is_finite() {
            return Err(WavError::config(format!(
                "amplitude multiplier {} is not finite",
                options.amplitude
            )));
        }

        let mut max_data_size = 0u32;
        for (i, input) in inputs.iter().enumerate() {
            if input.channel_count() != 1 {
                return Err(WavError::NotMono {
                    index: i,
                    channels: input.channel_count(),
                });
            }
            if let Some(next) = inputs.get(i + 1) {
                if !input.is_mergeable_with(next) {
                    return Err(WavError::NotMergeable {
                        first: i,
                        second: i + 1,
                    });
                }
            }
            max_data_size = max_data_size.max(input.data_size());
        }

        let width = SampleWidth::from_bits(first.bits_per_sample())?;
        let format = first.format().with_channels(options.channels)?;
        let data_size = max_data_size
            .checked_mul(options.channels as u32)
            .ok_or_else(|| {
                WavError::config(format!(
                    "{} channels of {} bytes overflow the data chunk",
                    options.channels, max_data_size
                ))
            })?;
        let routes = options
            .policy
            .routes(inputs.len(), options.channels as usize);

        Ok(Self {
            format,
            data_size,
            frames: max_data_size / width.bytes_per_sample(),
            width,
            routes,
        })
    }
}

/// Merges `inputs` into a new file at `output`.
///
/// All validation happens before `output` is created, so a rejected merge
/// leaves nothing behind. Inputs are rewound to their payload first and
/// read sequentially; they are not otherwise modified.
pub fn merge<P, R>(
    output: P,
    inputs: &mut [WavStream<R>],
    options: &MergeOptions,
) -> WavResult<WavFileWriter>
where
    P: AsRef<Path>,
    R: Read + Seek,
{
    let plan = MergePlan::new(inputs, options)?;
    let mut out = WavStream::create(output, OpenMode::Write, plan.format, plan.data_size)?;
    mix(&plan, inputs, &mut out, options)?;
    Ok(out)
}

/// Like [`merge`], writing into an arbitrary store.
pub fn merge_into<W, R>(
    store: W,
    inputs: &mut [WavStream<R>],
    options: &MergeOptions,
) -> WavResult<WavStream<W>>
where
    W: Write,
    R: Read + Seek,
{
    let plan = MergePlan::new(inputs, options)?;
    let mut out = WavStream::write_to(store, plan.format, plan.data_size)?;
    mix(&plan, inputs, &mut out, options)?;
    Ok(out)
}

fn mix<R, W>(
    plan: &MergePlan,
    inputs: &mut [WavStream<R>],
    out: &mut WavStream<W>,
    options: &MergeOptions,
) -> WavResult<()>
where
    R: Read + Seek,
    W: Write,
{
    debug!(
        inputs = inputs.len(),
        channels = options.channels,
        frames = plan.frames,
        policy = ?options.policy,
        routes = ?plan.routes,
        "mixing"
    );

    for input in inputs.iter_mut() {
        input.rewind_to_data()?;
    }
    match plan.width {
        SampleWidth::Int8 => mix_frames::<u8, R, W>(plan, inputs, out, options)?,
        SampleWidth::Int16 => mix_frames::<i16, R, W>(plan, inputs, out, options)?,
        SampleWidth::Int32 => mix_frames::<i32, R, W>(plan, inputs, out, options)?,
    }
    out.finish()
}

fn mix_frames<T, R, W>(
    plan: &MergePlan,
    inputs: &mut [WavStream<R>],
    out: &mut WavStream<W>,
    options: &MergeOptions,
) -> WavResult<()>
where
    T: Sample,
    R: Read,
    W: Write,
{
    // One sample per input per frame; `None` once an input has run out.
    let mut current: Vec<Option<i64>> = vec![None; inputs.len()];

    for frame in 0..plan.frames as u64 {
        let offset = frame * T::WIDTH as u64;
        for (slot, input) in current.iter_mut().zip(inputs.iter_mut()) {
            *slot = if (input.data_size() as u64) > offset {
                Some(input.read_sample::<T>()?.to_i64())
            } else {
                None
            };
        }

        for sources in &plan.routes {
            let (sum, count) = sources
                .iter()
                .filter_map(|&j| current[j])
                .fold((0i64, 0i64), |(sum, count), v| (sum.wrapping_add(v), count + 1));
            let mixed = match options.policy {
                MixPolicy::SumAndRoute => T::wrap_from_i64(sum),
                MixPolicy::SumAndAverage => T::wrap_from_i64(sum / count.max(1)),
            };
            out.write_sample(mixed.scale(options.amplitude))?;
        }
    }
    Ok(())
}
