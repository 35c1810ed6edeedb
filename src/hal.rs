//! The adapter HAL: config table, hardware scan and open card sessions
//! behind one handle.

use alsa::Direction;

use crate::audio::adapter_config::{load_adapter_config, AdapterTable};
use crate::audio::alsa_device::{self, NegotiatedParams};
use crate::audio::ctl_write::{self, CtlId, CtlValue};
use crate::audio::descriptor::{build_descriptors, AdapterDescriptor};
use crate::audio::enumerator::{AlsaProbe, CardsList, HardwareProbe};
use crate::audio::format::PcmHwParams;
use crate::audio::mixer::{bind_elements, MixerBinding, MixerControl, VolumeRange};
use crate::audio::registry::{CardInstance, CardRegistry};
use crate::audio::resolver::{self, AdapterKind, SelectedCard};
use crate::config::Config;
use crate::error::{HalError, Result};

pub struct AlsaHal<P: HardwareProbe = AlsaProbe> {
    config: Config,
    probe: P,
    /// Parsed on first use, kept until `destroy`.
    table: Option<AdapterTable>,
    cards: CardsList,
    registry: CardRegistry,
}

impl AlsaHal<AlsaProbe> {
    pub fn new(config: Config) -> Self {
        Self::with_probe(config, AlsaProbe)
    }
}

/// Parse the adapter file unless a table is already cached in `slot`.
fn load_table<'a>(slot: &'a mut Option<AdapterTable>, config: &Config) -> Result<&'a AdapterTable> {
    let table = match slot.take() {
        Some(table) => table,
        None => load_adapter_config(&config.adapter_config_file, config.adapter_config_max_bytes)
            .map_err(|e| {
                log::error!(
                    "Failed to load adapter config {}: {}",
                    config.adapter_config_file.display(),
                    e
                );
                e
            })?,
    };
    Ok(slot.insert(table))
}

impl<P: HardwareProbe> AlsaHal<P> {
    pub fn with_probe(config: Config, probe: P) -> Self {
        Self {
            config,
            probe,
            table: None,
            cards: CardsList::new(),
            registry: CardRegistry::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Devices seen by the last scan.
    pub fn cards(&self) -> &CardsList {
        &self.cards
    }

    pub fn registry(&self) -> &CardRegistry {
        &self.registry
    }

    /// Stream parameters from the build-time defaults.
    pub fn default_stream_params(&self) -> PcmHwParams {
        PcmHwParams {
            rate: self.config.stream_sample_rate,
            channels: self.config.stream_channels,
            period_size: Some(self.config.stream_period_size),
            ..PcmHwParams::default()
        }
    }

    fn volume_range(&self) -> VolumeRange {
        VolumeRange {
            min: self.config.volume_min,
            max: self.config.volume_max,
        }
    }

    /// Every adapter the board can offer right now.
    pub fn all_adapters(&mut self) -> Result<Vec<AdapterDescriptor>> {
        let table = load_table(&mut self.table, &self.config)?;
        self.cards = self.probe.scan(Direction::Playback)?;
        let descs = build_descriptors(table, self.cards.usb_inserted());
        // Hot-plug state may change; re-read the file on the next listing.
        self.table = None;
        log::info!("{} adapter(s) available", descs.len());
        Ok(descs)
    }

    /// Open (or take another reference on) the session for `card_name`.
    pub fn card_instance(&mut self, card_name: &str) -> Result<&mut CardInstance> {
        self.registry.acquire(card_name)
    }

    fn instance_mut(&mut self, card_name: &str) -> Result<&mut CardInstance> {
        self.registry
            .get_mut(card_name)
            .ok_or_else(|| HalError::UnknownInstance(card_name.to_string()))
    }

    fn selected<'a>(instance: &'a CardInstance, card_name: &str) -> Result<&'a SelectedCard> {
        instance.selected.as_ref().ok_or_else(|| {
            log::error!("{}: no card selected, call card_info first", card_name);
            HalError::NoMatchingCard(card_name.to_string())
        })
    }

    /// Rescan `direction` and pick the card serving `card_name`.
    pub fn card_info(&mut self, card_name: &str, direction: Direction) -> Result<SelectedCard> {
        if self.registry.get(card_name).is_none() {
            return Err(HalError::UnknownInstance(card_name.to_string()));
        }
        let table = load_table(&mut self.table, &self.config)?;
        self.cards = self.probe.scan(direction)?;
        let selected = resolver::resolve(card_name, table, &self.cards, self.config.default_device)?;

        self.instance_mut(card_name)?.selected = Some(selected.clone());
        Ok(selected)
    }

    /// Bind and normalize the volume controls of `card_name` for `direction`.
    pub fn init_mixer(&mut self, card_name: &str, direction: Direction) -> Result<()> {
        let kind = AdapterKind::from_adapter_name(card_name)?;
        let range = self.volume_range();
        let entry = match kind {
            AdapterKind::Primary => {
                let table = load_table(&mut self.table, &self.config)?;
                resolver::match_primary(table, card_name).cloned()
            }
            _ => None,
        };

        let instance = self
            .registry
            .get_mut(card_name)
            .ok_or_else(|| HalError::UnknownInstance(card_name.to_string()))?;
        let ctrl_name = Self::selected(instance, card_name)?.ctrl_name.clone();
        let mixer = match instance.mixer.take() {
            Some(mixer) => mixer,
            None => self.probe.open_mixer(&ctrl_name)?,
        };

        let binding = bind_elements(kind, entry.as_ref(), &*mixer, direction, range);
        instance.mixer = Some(mixer);
        let binding = binding?;
        log::info!(
            "{} {:?}: {} volume element(s) on {}",
            card_name,
            direction,
            binding.elements.len(),
            ctrl_name
        );
        instance.set_binding(binding);
        Ok(())
    }

    /// Open the PCM of `card_name` for `direction` and keep it on the session.
    pub fn open_stream(
        &mut self,
        card_name: &str,
        direction: Direction,
        params: &PcmHwParams,
    ) -> Result<NegotiatedParams> {
        let instance = self.instance_mut(card_name)?;
        let dev_name = Self::selected(instance, card_name)?.dev_name.clone();
        let (pcm, negotiated) = alsa_device::open_pcm(&dev_name, direction, params)?;
        instance.set_pcm(direction, pcm);
        Ok(negotiated)
    }

    fn binding(
        &self,
        card_name: &str,
        direction: Direction,
    ) -> Result<(&dyn MixerControl, &MixerBinding)> {
        let instance = self
            .registry
            .get(card_name)
            .ok_or_else(|| HalError::UnknownInstance(card_name.to_string()))?;
        let mixer = instance
            .mixer
            .as_deref()
            .ok_or_else(|| HalError::NotSupported(format!("{} has no mixer open", card_name)))?;
        let binding = instance.binding(direction).ok_or_else(|| {
            HalError::NotSupported(format!("{} has no {:?} mixer binding", card_name, direction))
        })?;
        Ok((mixer, binding))
    }

    pub fn set_volume(&self, card_name: &str, direction: Direction, value: i64) -> Result<()> {
        let (mixer, binding) = self.binding(card_name, direction)?;
        binding.set_volume(mixer, value)?;
        log::debug!("{} {:?} volume -> {}", card_name, direction, value);
        Ok(())
    }

    pub fn get_volume(&self, card_name: &str, direction: Direction) -> Result<i64> {
        let (mixer, binding) = self.binding(card_name, direction)?;
        binding.volume(mixer)
    }

    pub fn set_mute(&self, card_name: &str, direction: Direction, mute: bool) -> Result<()> {
        let (mixer, binding) = self.binding(card_name, direction)?;
        binding.set_mute(mixer, mute)
    }

    /// Write a raw control element on the card selected for `card_name`.
    pub fn write_control(&self, card_name: &str, id: &CtlId, value: CtlValue) -> Result<()> {
        let instance = self
            .registry
            .get(card_name)
            .ok_or_else(|| HalError::UnknownInstance(card_name.to_string()))?;
        let selected = Self::selected(instance, card_name)?;
        ctl_write::write_ctl_element(&selected.ctrl_name, id, value)
    }

    /// Drop one reference on `card_name`; returns the references left.
    pub fn release(&mut self, card_name: &str) -> Result<u32> {
        self.registry.release(card_name)
    }

    /// Tear everything down. Fails while a session is still referenced.
    pub fn destroy(&mut self) -> Result<()> {
        self.registry.destroy()?;
        self.table = None;
        self.cards = CardsList::new();
        log::info!("ALSA adapter HAL destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::enumerator::tests::{entry, FakeProbe};
    use crate::audio::enumerator::USB_AUDIO_PCM_ID;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ADAPTERS: &str = r#"{ "adapters": [
        { "name": "primary", "cardId": "rockchipes8388", "daiId": "i2s0",
          "simple_mixer_ctl_volume": {
            "playback": [ { "name": "DACL" }, { "name": "DACR" } ],
            "capture": [ { "name": "ADC PGA Gain" } ] } },
        { "name": "hdmi", "cardId": "rockchiphdmi" }
    ] }"#;

    fn config_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn hal(file: &NamedTempFile, usb: bool) -> AlsaHal<FakeProbe> {
        let mut entries = vec![
            entry(0, 0, "rockchipes8388", "es8323"),
            entry(1, 0, "rockchiphdmi", "i2s-hdmi"),
        ];
        if usb {
            entries.push(entry(2, 0, "Device", USB_AUDIO_PCM_ID));
        }
        let probe = FakeProbe {
            entries,
            mixer_elements: vec!["Headphone", "DACL", "DACR", "ADC PGA Gain", "PCM", "Mic"],
        };
        AlsaHal::with_probe(Config::default().with_adapter_config_file(file.path()), probe)
    }

    #[test]
    fn lists_configured_and_hotplugged_adapters() {
        let file = config_file(ADAPTERS);
        let names = |descs: Vec<AdapterDescriptor>| {
            descs.into_iter().map(|d| d.adapter_name).collect::<Vec<_>>()
        };

        assert_eq!(names(hal(&file, true).all_adapters().unwrap()), ["primary", "hdmi", "usb"]);
        assert_eq!(names(hal(&file, false).all_adapters().unwrap()), ["primary", "hdmi"]);
    }

    #[test]
    fn listing_rereads_the_config_file() {
        let file = config_file(ADAPTERS);
        let mut hal = hal(&file, false);
        assert_eq!(hal.all_adapters().unwrap().len(), 2);

        std::fs::write(file.path(), r#"{ "adapters": [ { "name": "hdmi", "cardId": "rockchiphdmi" } ] }"#)
            .unwrap();
        let descs = hal.all_adapters().unwrap();
        assert_eq!(descs.len(), 1);
        assert_eq!(descs[0].adapter_name, "hdmi");
    }

    #[test]
    fn primary_session_volume_and_mute() {
        let file = config_file(ADAPTERS);
        let mut hal = hal(&file, false);
        let max = hal.config().volume_max;

        assert_eq!(hal.card_instance("primary").unwrap().ref_count(), 1);
        let selected = hal.card_info("primary", Direction::Playback).unwrap();
        assert_eq!(selected.dev_name, "plughw:0,0");
        assert_eq!(selected.ctrl_name, "hw:0");

        hal.init_mixer("primary", Direction::Playback).unwrap();
        hal.init_mixer("primary", Direction::Capture).unwrap();

        hal.set_volume("primary", Direction::Playback, max).unwrap();
        assert_eq!(hal.get_volume("primary", Direction::Playback).unwrap(), max);
        assert!(matches!(
            hal.set_volume("primary", Direction::Playback, max + 1),
            Err(HalError::VolumeOutOfRange { .. })
        ));
        hal.set_volume("primary", Direction::Capture, 0).unwrap();
        assert_eq!(hal.get_volume("primary", Direction::Capture).unwrap(), 0);
        hal.set_mute("primary", Direction::Playback, true).unwrap();

        assert_eq!(hal.release("primary").unwrap(), 0);
        assert!(hal.registry().is_empty());
        hal.destroy().unwrap();
    }

    #[test]
    fn init_mixer_reuses_the_open_mixer() {
        let file = config_file(ADAPTERS);
        let mut hal = hal(&file, false);
        hal.card_instance("primary").unwrap();
        hal.card_info("primary", Direction::Playback).unwrap();

        hal.init_mixer("primary", Direction::Playback).unwrap();
        hal.set_volume("primary", Direction::Playback, 42).unwrap();

        // A freshly opened mixer would report its power-on level again.
        hal.init_mixer("primary", Direction::Playback).unwrap();
        hal.init_mixer("primary", Direction::Capture).unwrap();
        assert_eq!(hal.get_volume("primary", Direction::Playback).unwrap(), 42);
    }

    #[test]
    fn usb_without_volume_control_fails_mixer_init() {
        let file = config_file(ADAPTERS);
        let mut hal = AlsaHal::with_probe(
            Config::default().with_adapter_config_file(file.path()),
            FakeProbe {
                entries: vec![entry(2, 0, "Device", USB_AUDIO_PCM_ID)],
                mixer_elements: vec!["Clock Source"],
            },
        );
        hal.card_instance("usb").unwrap();
        hal.card_info("usb", Direction::Playback).unwrap();
        assert!(matches!(
            hal.init_mixer("usb", Direction::Playback),
            Err(HalError::ElementNotFound(_))
        ));
    }

    #[test]
    fn usb_session_uses_fallback_controls() {
        let file = config_file(ADAPTERS);
        let mut hal = hal(&file, true);

        hal.card_instance("usb").unwrap();
        assert_eq!(hal.card_info("usb", Direction::Capture).unwrap().dev_name, "plughw:2,0");
        hal.init_mixer("usb", Direction::Capture).unwrap();
        hal.set_volume("usb", Direction::Capture, 10).unwrap();
        assert_eq!(hal.get_volume("usb", Direction::Capture).unwrap(), 10);
    }

    #[test]
    fn hdmi_has_no_volume() {
        let file = config_file(ADAPTERS);
        let mut hal = hal(&file, false);

        hal.card_instance("hdmi").unwrap();
        assert_eq!(hal.card_info("hdmi", Direction::Playback).unwrap().card, 1);
        hal.init_mixer("hdmi", Direction::Playback).unwrap();
        assert!(matches!(
            hal.set_volume("hdmi", Direction::Playback, 1),
            Err(HalError::NotSupported(_))
        ));
    }

    #[test]
    fn operations_need_a_session_and_a_selection() {
        let file = config_file(ADAPTERS);
        let mut hal = hal(&file, false);

        assert!(matches!(
            hal.card_info("primary", Direction::Playback),
            Err(HalError::UnknownInstance(_))
        ));
        hal.card_instance("primary").unwrap();
        assert!(matches!(
            hal.init_mixer("primary", Direction::Playback),
            Err(HalError::NoMatchingCard(_))
        ));
        assert!(matches!(
            hal.get_volume("primary", Direction::Playback),
            Err(HalError::NotSupported(_))
        ));
        let params = hal.default_stream_params();
        assert!(matches!(
            hal.open_stream("primary", Direction::Playback, &params),
            Err(HalError::NoMatchingCard(_))
        ));
    }

    #[test]
    fn usb_missing_from_bus_fails_resolution() {
        let file = config_file(ADAPTERS);
        let mut hal = hal(&file, false);
        hal.card_instance("usb").unwrap();
        assert!(matches!(
            hal.card_info("usb", Direction::Playback),
            Err(HalError::NoMatchingCard(_))
        ));
    }

    #[test]
    fn destroy_waits_for_release() {
        let file = config_file(ADAPTERS);
        let mut hal = hal(&file, false);
        hal.card_instance("primary").unwrap();
        hal.card_instance("primary").unwrap();

        assert!(matches!(hal.destroy(), Err(HalError::DeviceBusy(_))));
        assert_eq!(hal.release("primary").unwrap(), 1);
        assert_eq!(hal.release("primary").unwrap(), 0);
        hal.destroy().unwrap();
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default().with_adapter_config_file(dir.path().join("absent.json"));
        let mut hal = AlsaHal::with_probe(
            config,
            FakeProbe {
                entries: Vec::new(),
                mixer_elements: Vec::new(),
            },
        );
        assert!(matches!(hal.all_adapters(), Err(HalError::Io(_))));
    }
}
