//! One-shot cue resampling.
//!
//! Uses Rubato to convert a decoded cue to the output device rate before it is
//! handed to the playback stream. Runs on the caller's thread; cues are small.

use anyhow::{Result, anyhow};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async, FixedAsync, Indexing, Resampler, SincInterpolationParameters, SincInterpolationType,
    WindowFunction, calculate_cutoff,
};

use crate::decode::DecodedCue;

/// Return `cue` converted to `dst_rate`. A cue already at that rate is
/// returned unchanged.
pub fn resample_cue(cue: DecodedCue, dst_rate: u32, chunk_frames: usize) -> Result<DecodedCue> {
    if cue.rate == dst_rate || cue.frames() == 0 {
        return Ok(cue);
    }
    let channels = cue.channels;
    let f_ratio = dst_rate as f64 / cue.rate as f64;

    let sinc_len = 128;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window,
    };

    let chunk_in_frames = chunk_frames.max(1);
    let mut resampler = Async::<f32>::new_sinc(
        f_ratio,
        1.1,
        &params,
        chunk_in_frames,
        channels,
        FixedAsync::Input,
    )
    .map_err(|e| anyhow!("resampler init error: {e}"))?;

    let out_capacity_frames = output_capacity_frames(chunk_in_frames, f_ratio);
    let mut out_interleaved = vec![0.0f32; channels * out_capacity_frames];
    let mut indexing = Indexing {
        input_offset: 0,
        output_offset: 0,
        active_channels_mask: None,
        partial_len: None,
    };

    let expected_frames = (cue.frames() as f64 * f_ratio).ceil() as usize;
    let delay_frames = resampler.output_delay();
    let mut samples = Vec::with_capacity((expected_frames + delay_frames + 1) * channels);

    for chunk in cue.samples.chunks(chunk_in_frames * channels) {
        let frames = chunk.len() / channels;
        if frames == 0 {
            continue;
        }
        indexing.partial_len = (frames < chunk_in_frames).then_some(frames);
        let produced = process_chunk(
            &mut resampler,
            chunk,
            channels,
            frames,
            &indexing,
            &mut out_interleaved,
            out_capacity_frames,
        )?;
        samples.extend_from_slice(&out_interleaved[..produced * channels]);
    }

    // Flush the filter tail with empty input until the delayed end of the cue is out.
    let silence = vec![0.0f32; chunk_in_frames * channels];
    indexing.partial_len = Some(0);
    while samples.len() / channels < delay_frames + expected_frames {
        let produced = process_chunk(
            &mut resampler,
            &silence,
            channels,
            chunk_in_frames,
            &indexing,
            &mut out_interleaved,
            out_capacity_frames,
        )?;
        if produced == 0 {
            break;
        }
        samples.extend_from_slice(&out_interleaved[..produced * channels]);
    }
    samples.drain(..(delay_frames * channels).min(samples.len()));
    samples.truncate(expected_frames * channels);

    tracing::debug!(
        from_hz = cue.rate,
        to_hz = dst_rate,
        frames = samples.len() / channels,
        "resampled cue"
    );

    Ok(DecodedCue {
        rate: dst_rate,
        channels,
        samples,
    })
}

fn process_chunk(
    resampler: &mut Async<f32>,
    input: &[f32],
    channels: usize,
    frames: usize,
    indexing: &Indexing,
    out_interleaved: &mut [f32],
    out_capacity_frames: usize,
) -> Result<usize> {
    let input_adapter = InterleavedSlice::new(input, channels, frames)
        .map_err(|e| anyhow!("interleaved slice (input) error: {e}"))?;
    let mut output_adapter = InterleavedSlice::new_mut(out_interleaved, channels, out_capacity_frames)
        .map_err(|e| anyhow!("interleaved slice (output) error: {e}"))?;
    let (_nbr_in, nbr_out) = resampler
        .process_into_buffer(&input_adapter, &mut output_adapter, Some(indexing))
        .map_err(|e| anyhow!("resampler process error: {e}"))?;
    Ok(nbr_out)
}

/// Output buffer size for one input chunk, with headroom for the async
/// resampler's ratio slack.
fn output_capacity_frames(chunk_in_frames: usize, f_ratio: f64) -> usize {
    (chunk_in_frames as f64 * f_ratio * 1.1).ceil() as usize + chunk_in_frames
}
