use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Generate output filename for a merge run
pub fn generate_filename<Tz>(channels: u16, base_time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "merged_{}ch_{}.wav",
        channels,
        base_time.format("%Y-%m-%d_%H-%M-%S")
    )
}

/// Default destination when no explicit output path is given
pub fn default_output_path<Tz>(
    output_dir: &Path,
    channels: u16,
    base_time: &DateTime<Tz>,
) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    output_dir.join(generate_filename(channels, base_time))
}
