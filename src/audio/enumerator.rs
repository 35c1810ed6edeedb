//! Discovery of the PCM devices actually present on the ALSA bus.

use alsa::card::Iter as CardIter;
use alsa::ctl::{Ctl, DeviceIter};
use alsa::Direction;

use super::adapter_config::MAX_CARD_NUM;
use super::mixer::{AlsaMixer, MixerControl};
use crate::error::{HalError, Result};

/// PCM id reported by the USB audio class driver.
pub const USB_AUDIO_PCM_ID: &str = "USB Audio";

const ENOENT: i32 = 2;

/// One PCM device found on a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmDeviceEntry {
    pub card: i32,
    pub device: i32,
    pub card_id: String,
    pub pcm_id: String,
}

/// Flat table of discovered PCM devices, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct CardsList {
    entries: Vec<PcmDeviceEntry>,
}

impl CardsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: PcmDeviceEntry) -> Result<()> {
        if entry.card_id.is_empty() {
            return Err(HalError::InvalidName(entry.card_id));
        }
        if self.entries.len() >= MAX_CARD_NUM {
            log::error!("A maximum of {} sound cards are supported!", MAX_CARD_NUM);
            return Err(HalError::TooManyCards(MAX_CARD_NUM));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[PcmDeviceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First device of the card with `card_id` and the given device number.
    pub fn find_by_card_id(&self, card_id: &str, device: i32) -> Option<&PcmDeviceEntry> {
        self.entries
            .iter()
            .find(|e| e.card_id == card_id && e.device == device)
    }

    /// First device exposed by a USB audio class codec.
    pub fn first_usb(&self) -> Option<&PcmDeviceEntry> {
        self.entries.iter().find(|e| e.pcm_id == USB_AUDIO_PCM_ID)
    }

    pub fn usb_inserted(&self) -> bool {
        self.first_usb().is_some()
    }
}

impl FromIterator<PcmDeviceEntry> for CardsList {
    /// Collects up to `MAX_CARD_NUM` entries, dropping the rest.
    fn from_iter<I: IntoIterator<Item = PcmDeviceEntry>>(iter: I) -> Self {
        let mut list = CardsList::new();
        for entry in iter {
            if list.push(entry).is_err() {
                break;
            }
        }
        list
    }
}

/// Access to the sound hardware: the PCM table and card mixers.
pub trait HardwareProbe {
    /// List every PCM device that has a stream in `direction`.
    fn scan(&self, direction: Direction) -> Result<CardsList>;

    /// Open the simple mixer of the control device `ctrl_name` (`hw:N`).
    fn open_mixer(&self, ctrl_name: &str) -> Result<Box<dyn MixerControl>>;
}

/// Walks the ALSA control interfaces of all cards.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlsaProbe;

impl AlsaProbe {
    fn scan_card(index: i32, direction: Direction, list: &mut CardsList) -> Result<()> {
        let ctl = Ctl::new(&format!("hw:{}", index), false)?;
        let info = ctl.card_info()?;
        let card_id = info.get_id()?.to_string();

        for device in DeviceIter::new(&ctl) {
            let pcm_info = match ctl.pcm_info(device as u32, 0, direction) {
                Ok(pcm_info) => pcm_info,
                Err(e) => {
                    if e.errno() != ENOENT {
                        log::warn!("control digital audio info ({}): {}", index, e);
                    }
                    continue;
                }
            };
            let pcm_id = pcm_info.get_id()?.to_string();
            log::debug!(
                "card {} ({}) device {}: {}",
                index,
                card_id,
                device,
                pcm_id
            );
            list.push(PcmDeviceEntry {
                card: index,
                device,
                card_id: card_id.clone(),
                pcm_id,
            })?;
        }
        Ok(())
    }
}

impl HardwareProbe for AlsaProbe {
    fn scan(&self, direction: Direction) -> Result<CardsList> {
        let mut list = CardsList::new();
        let mut seen = 0;

        for card in CardIter::new() {
            let card = match card {
                Ok(card) => card,
                Err(e) => {
                    log::error!("snd_card_next error: {}", e);
                    break;
                }
            };
            seen += 1;
            let index = card.get_index();
            match Self::scan_card(index, direction, &mut list) {
                Ok(()) => {}
                Err(HalError::TooManyCards(_)) => break,
                Err(e) => log::warn!("Skipping card {}: {}", index, e),
            }
        }

        if seen == 0 {
            log::warn!("No soundcards found");
        }
        Ok(list)
    }

    fn open_mixer(&self, ctrl_name: &str) -> Result<Box<dyn MixerControl>> {
        Ok(Box::new(AlsaMixer::open(ctrl_name)?))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use crate::audio::mixer::tests::FakeMixer;

    /// Fixed hardware table for tests. Every card gets a fresh mixer with
    /// the same element names.
    pub(crate) struct FakeProbe {
        pub entries: Vec<PcmDeviceEntry>,
        pub mixer_elements: Vec<&'static str>,
    }

    impl HardwareProbe for FakeProbe {
        fn scan(&self, _direction: Direction) -> Result<CardsList> {
            Ok(self.entries.iter().cloned().collect())
        }

        fn open_mixer(&self, _ctrl_name: &str) -> Result<Box<dyn MixerControl>> {
            Ok(Box::new(FakeMixer::with(&self.mixer_elements)))
        }
    }

    pub(crate) fn entry(card: i32, device: i32, card_id: &str, pcm_id: &str) -> PcmDeviceEntry {
        PcmDeviceEntry {
            card,
            device,
            card_id: card_id.to_string(),
            pcm_id: pcm_id.to_string(),
        }
    }

    #[test]
    fn usb_detection_uses_pcm_id() {
        let list: CardsList = vec![
            entry(0, 0, "rockchipes8388", "ff890000.i2s-ES8323 HiFi es8323.1-0011-0"),
            entry(1, 0, "Device", USB_AUDIO_PCM_ID),
        ]
        .into_iter()
        .collect();
        assert!(list.usb_inserted());
        assert_eq!(list.first_usb().unwrap().card, 1);

        let list: CardsList = vec![entry(0, 0, "Device", "USB Audio #1")]
            .into_iter()
            .collect();
        assert!(!list.usb_inserted());
    }

    #[test]
    fn find_matches_card_id_and_device() {
        let list: CardsList = vec![
            entry(0, 1, "rockchipes8388", "pcm1"),
            entry(0, 0, "rockchipes8388", "pcm0"),
        ]
        .into_iter()
        .collect();
        assert_eq!(list.entries()[0].pcm_id, "pcm1");
        assert_eq!(list.find_by_card_id("rockchipes8388", 0).unwrap().pcm_id, "pcm0");
        assert!(list.find_by_card_id("rockchipes8388", 2).is_none());
        assert!(list.find_by_card_id("rockchiphdmi", 0).is_none());
    }

    #[test]
    fn push_is_bounded() {
        let mut list = CardsList::new();
        for i in 0..MAX_CARD_NUM as i32 {
            list.push(entry(i, 0, "card", "pcm")).unwrap();
        }
        assert!(matches!(
            list.push(entry(99, 0, "card", "pcm")),
            Err(HalError::TooManyCards(_))
        ));
        assert_eq!(list.len(), MAX_CARD_NUM);
    }

    #[test]
    fn empty_card_id_is_rejected() {
        let mut list = CardsList::new();
        assert!(list.push(entry(0, 0, "", "pcm")).is_err());
        assert!(list.is_empty());
    }
}
