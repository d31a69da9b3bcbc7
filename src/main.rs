use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use wav_merge::output::default_output_path;
use wav_merge::{merge, MergeOptions, MixPolicy, OpenMode, WavStream};

/// Merge mono PCM WAV files into one interleaved multi-channel file
#[derive(Parser, Debug)]
#[command(name = "wav-merge")]
#[command(version, about, long_about = None)]
struct Args {
    /// Mono WAV files to merge, in channel order
    #[arg(value_name = "INPUTS", required = true)]
    inputs: Vec<PathBuf>,

    /// Output WAV file (default: timestamped name in --output-dir)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Directory for the generated output name
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Number of output channels
    #[arg(short, long, default_value = "2")]
    channels: u16,

    /// Amplitude multiplier applied after mixing (overflow wraps)
    #[arg(short, long, default_value = "1.0")]
    amplitude: f64,

    /// Mixing policy: route (round-robin sum per channel) or average (contiguous groups)
    #[arg(long, default_value = "route")]
    policy: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let policy = match args.policy.to_lowercase().as_str() {
        "route" => MixPolicy::SumAndRoute,
        "average" => MixPolicy::SumAndAverage,
        _ => {
            eprintln!("Error: Invalid policy '{}'. Use: route, average", args.policy);
            std::process::exit(1);
        }
    };
    let options = MergeOptions {
        channels: args.channels,
        amplitude: args.amplitude,
        policy,
    };

    let mut inputs = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let stream = WavStream::open(path, OpenMode::Read)
            .with_context(|| format!("Failed to open input: {}", path.display()))?;
        tracing::debug!(
            "{}: {} Hz, {} bit, {} frames",
            path.display(),
            stream.sample_rate(),
            stream.bits_per_sample(),
            stream.frame_count()
        );
        inputs.push(stream);
    }

    let output = match args.output {
        Some(path) => path,
        None => {
            std::fs::create_dir_all(&args.output_dir).with_context(|| {
                format!("Failed to create output directory: {}", args.output_dir.display())
            })?;
            default_output_path(&args.output_dir, args.channels, &Local::now())
        }
    };

    tracing::info!(
        "Merging {} input(s) into {} channel(s) ({:?}, amplitude {})",
        inputs.len(),
        options.channels,
        options.policy,
        options.amplitude
    );
    let merged = merge(&output, &mut inputs, &options)
        .with_context(|| format!("Failed to merge into {}", output.display()))?;

    println!(
        "Wrote {} ({} channels, {} Hz, {} bit, {:.2}s)",
        output.display(),
        merged.channel_count(),
        merged.sample_rate(),
        merged.bits_per_sample(),
        merged.frame_count() as f64 / merged.sample_rate() as f64
    );

    Ok(())
}
