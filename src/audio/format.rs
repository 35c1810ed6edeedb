//! Abstract audio formats and their ALSA PCM counterparts.

use alsa::pcm::Format;

use crate::error::{HalError, Result};

/// Sample formats a client may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Pcm8Bit,
    Pcm16Bit,
    Pcm24Bit,
    Pcm32Bit,
    AacMain,
    AacLc,
    AacLd,
    AacEld,
    AacHeV1,
    AacHeV2,
    G711A,
    G711U,
    G726,
}

impl AudioFormat {
    pub fn is_pcm(self) -> bool {
        matches!(
            self,
            Self::Pcm8Bit | Self::Pcm16Bit | Self::Pcm24Bit | Self::Pcm32Bit
        )
    }
}

/// Hardware parameters requested for a PCM stream.
#[derive(Debug, Clone)]
pub struct PcmHwParams {
    pub format: AudioFormat,
    pub channels: u32,
    pub rate: u32,
    /// Period size in frames, `None` lets ALSA decide
    pub period_size: Option<usize>,
    pub big_endian: bool,
}

impl Default for PcmHwParams {
    fn default() -> Self {
        Self {
            format: AudioFormat::Pcm16Bit,
            channels: 2,
            rate: 48000,
            period_size: None,
            big_endian: false,
        }
    }
}

/// Map an abstract format onto the ALSA format constant.
///
/// 8-bit samples have no byte order, so both endiannesses give `S8`.
pub fn to_alsa_format(format: AudioFormat, big_endian: bool) -> Result<Format> {
    let alsa_format = match (format, big_endian) {
        (AudioFormat::Pcm8Bit, _) => Format::S8,
        (AudioFormat::Pcm16Bit, false) => Format::S16LE,
        (AudioFormat::Pcm16Bit, true) => Format::S16BE,
        (AudioFormat::Pcm24Bit, false) => Format::S24LE,
        (AudioFormat::Pcm24Bit, true) => Format::S24BE,
        (AudioFormat::Pcm32Bit, false) => Format::S32LE,
        (AudioFormat::Pcm32Bit, true) => Format::S32BE,
        (other, _) => return Err(HalError::UnsupportedFormat(format!("{:?}", other))),
    };
    Ok(alsa_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_formats() {
        assert_eq!(to_alsa_format(AudioFormat::Pcm8Bit, false).unwrap(), Format::S8);
        assert_eq!(to_alsa_format(AudioFormat::Pcm16Bit, false).unwrap(), Format::S16LE);
        assert_eq!(to_alsa_format(AudioFormat::Pcm24Bit, false).unwrap(), Format::S24LE);
        assert_eq!(to_alsa_format(AudioFormat::Pcm32Bit, false).unwrap(), Format::S32LE);
    }

    #[test]
    fn big_endian_formats() {
        assert_eq!(to_alsa_format(AudioFormat::Pcm8Bit, true).unwrap(), Format::S8);
        assert_eq!(to_alsa_format(AudioFormat::Pcm16Bit, true).unwrap(), Format::S16BE);
        assert_eq!(to_alsa_format(AudioFormat::Pcm24Bit, true).unwrap(), Format::S24BE);
        assert_eq!(to_alsa_format(AudioFormat::Pcm32Bit, true).unwrap(), Format::S32BE);
    }

    #[test]
    fn compressed_formats_are_rejected() {
        for format in [AudioFormat::AacLc, AudioFormat::G711A, AudioFormat::G726] {
            assert!(!format.is_pcm());
            assert!(matches!(
                to_alsa_format(format, false),
                Err(HalError::UnsupportedFormat(_))
            ));
        }
    }
}
