//! ALSA PCM device wrappers for adapter render and capture streams.

use alsa::pcm::{Access, HwParams, PCM};
use alsa::{Direction, ValueOr};

use super::format::{self, PcmHwParams};
use crate::error::Result;

/// Parameters negotiated with the ALSA hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedParams {
    /// Actual sample rate after negotiation
    pub sample_rate: u32,
    /// Actual number of channels
    pub channels: u32,
    /// Period size in frames (one frame = channels × sample_width)
    pub period_size: usize,
}

fn dir_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Playback => "Playback",
        Direction::Capture => "Capture",
    }
}

/// Open `device` (usually `plughw:C,D`) and apply `params`.
pub fn open_pcm(
    device: &str,
    direction: Direction,
    params: &PcmHwParams,
) -> Result<(PCM, NegotiatedParams)> {
    let alsa_format = format::to_alsa_format(params.format, params.big_endian)?;

    let pcm = PCM::new(device, direction, false).map_err(|e| {
        log::error!(
            "Failed to open PCM device '{}' for {}: {}",
            device,
            dir_name(direction),
            e
        );
        e
    })?;

    // Configure hardware parameters
    {
        let hwp = HwParams::any(&pcm)?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(alsa_format)?;
        hwp.set_channels(params.channels)?;
        hwp.set_rate_near(params.rate, ValueOr::Nearest)?;
        if let Some(ps) = params.period_size {
            hwp.set_period_size_near(ps as alsa::pcm::Frames, ValueOr::Nearest)?;
        }
        pcm.hw_params(&hwp)?;
    }

    // Read back actual negotiated parameters
    let negotiated = {
        let hwp = pcm.hw_params_current()?;
        NegotiatedParams {
            sample_rate: hwp.get_rate()?,
            channels: hwp.get_channels()?,
            period_size: hwp.get_period_size()? as usize,
        }
    };

    log::info!(
        "ALSA {}: device={}, format={:?}, rate={}, channels={}, period_size={}",
        dir_name(direction),
        device,
        alsa_format,
        negotiated.sample_rate,
        negotiated.channels,
        negotiated.period_size,
    );

    Ok((pcm, negotiated))
}
