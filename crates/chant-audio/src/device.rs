//! Output device discovery and the stream format the cues play at.
//!
//! Cues are decoded and resampled once when the player opens, so the format
//! choice tries hard to avoid the resampler entirely and otherwise to lose as
//! little of the cue as possible.

use std::cmp::Reverse;

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};

/// Rate and channel count of the first decoded cue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CueFormat {
    pub rate: u32,
    pub channels: usize,
}

/// Resolve the `device` filter to an output device.
///
/// A name equal to the filter (ignoring case) wins over one that only
/// contains it. With no filter the host default is used.
pub fn pick_device(host: &cpal::Host, filter: Option<&str>) -> Result<cpal::Device> {
    let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) else {
        return host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default output device"));
    };

    let named: Vec<(String, cpal::Device)> = host
        .output_devices()
        .context("enumerate output devices")?
        .filter_map(|d| d.description().ok().map(|desc| (desc.name().to_string(), d)))
        .collect();
    let names: Vec<&str> = named.iter().map(|(name, _)| name.as_str()).collect();
    let index = best_name_match(&names, filter).ok_or_else(|| {
        anyhow!(
            "no output device matches {filter:?}; available: {}",
            if names.is_empty() { "none".to_string() } else { names.join(", ") }
        )
    })?;
    named
        .into_iter()
        .nth(index)
        .map(|(_, device)| device)
        .ok_or_else(|| anyhow!("output device list changed while matching {filter:?}"))
}

/// Index of the device name that best matches `filter`.
fn best_name_match(names: &[&str], filter: &str) -> Option<usize> {
    let filter = filter.to_lowercase();
    let lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
    lowered
        .iter()
        .position(|n| *n == filter)
        .or_else(|| lowered.iter().position(|n| n.contains(&filter)))
}

/// Choose the stream config for playing `cue`.
///
/// With no cue loaded the device's default config is used as is.
pub fn pick_output_config(
    device: &cpal::Device,
    cue: Option<CueFormat>,
) -> Result<cpal::SupportedStreamConfig> {
    let Some(cue) = cue else {
        return device
            .default_output_config()
            .context("query default output config");
    };

    device
        .supported_output_configs()
        .context("query output configs")?
        .map(|range| {
            let rate = rate_for_cue(range.min_sample_rate(), range.max_sample_rate(), cue.rate);
            let fit = Fit::new(cue, rate, usize::from(range.channels()), range.sample_format());
            (fit, range.with_sample_rate(rate))
        })
        .max_by_key(|(fit, _)| *fit)
        .map(|(_, config)| config)
        .ok_or_else(|| anyhow!("device reports no output configs"))
}

/// The cue's own rate when the range allows it, else the nearest bound.
fn rate_for_cue(min: u32, max: u32, cue_rate: u32) -> u32 {
    cue_rate.clamp(min, max.max(min))
}

/// How well one stream config suits a cue. Fields compare in order, so a
/// config that skips resampling beats any that needs it, and upsampling
/// beats dropping the top of the cue's band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Fit {
    native_rate: bool,
    covers_channels: bool,
    keeps_band: bool,
    rate_distance: Reverse<u32>,
    format_cost: Reverse<u8>,
}

impl Fit {
    fn new(cue: CueFormat, rate: u32, channels: usize, format: cpal::SampleFormat) -> Self {
        Self {
            native_rate: rate == cue.rate,
            covers_channels: channels >= cue.channels,
            keeps_band: rate >= cue.rate,
            rate_distance: Reverse(rate.abs_diff(cue.rate)),
            format_cost: Reverse(format_cost(format)),
        }
    }
}

/// Cues are mixed as f32; formats that need no narrowing cost least.
fn format_cost(format: cpal::SampleFormat) -> u8 {
    match format {
        cpal::SampleFormat::F32 => 0,
        cpal::SampleFormat::I32 => 1,
        cpal::SampleFormat::I16 => 2,
        cpal::SampleFormat::U16 => 3,
        _ => u8::MAX,
    }
}

/// Print the host's output devices, one per line.
pub fn list_devices(host: &cpal::Host) -> Result<()> {
    let devices = host.output_devices().context("enumerate output devices")?;
    for (i, d) in devices.enumerate() {
        println!("#{i}: {}", d.description()?);
    }
    Ok(())
}

/// `list_devices` on the default host.
pub fn list_default_host_devices() -> Result<()> {
    list_devices(&cpal::default_host())
}
