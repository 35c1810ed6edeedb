//! Reference-counted table of open card sessions, keyed by adapter name.

use alsa::pcm::PCM;
use alsa::Direction;

use super::adapter_config::MAX_CARD_NUM;
use super::mixer::{MixerBinding, MixerControl};
use super::resolver::SelectedCard;
use crate::error::{HalError, Result};

/// One adapter in use by one or more streams.
pub struct CardInstance {
    card_name: String,
    ref_count: u32,
    pub selected: Option<SelectedCard>,
    pub render_pcm: Option<PCM>,
    pub capture_pcm: Option<PCM>,
    pub mixer: Option<Box<dyn MixerControl>>,
    pub render_binding: Option<MixerBinding>,
    pub capture_binding: Option<MixerBinding>,
}

impl CardInstance {
    fn new(card_name: &str) -> Self {
        Self {
            card_name: card_name.to_string(),
            ref_count: 1,
            selected: None,
            render_pcm: None,
            capture_pcm: None,
            mixer: None,
            render_binding: None,
            capture_binding: None,
        }
    }

    pub fn card_name(&self) -> &str {
        &self.card_name
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn binding(&self, direction: Direction) -> Option<&MixerBinding> {
        match direction {
            Direction::Playback => self.render_binding.as_ref(),
            Direction::Capture => self.capture_binding.as_ref(),
        }
    }

    pub fn set_binding(&mut self, binding: MixerBinding) {
        match binding.direction {
            Direction::Playback => self.render_binding = Some(binding),
            Direction::Capture => self.capture_binding = Some(binding),
        }
    }

    pub fn set_pcm(&mut self, direction: Direction, pcm: PCM) {
        match direction {
            Direction::Playback => self.render_pcm = Some(pcm),
            Direction::Capture => self.capture_pcm = Some(pcm),
        }
    }

    /// Drop every ALSA handle held by the session.
    fn close(&mut self) {
        if self.render_pcm.take().is_some() {
            log::debug!("{}: render PCM closed", self.card_name);
        }
        if self.capture_pcm.take().is_some() {
            log::debug!("{}: capture PCM closed", self.card_name);
        }
        self.render_binding = None;
        self.capture_binding = None;
        self.mixer = None;
        self.selected = None;
    }
}

impl std::fmt::Debug for CardInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardInstance")
            .field("card_name", &self.card_name)
            .field("ref_count", &self.ref_count)
            .field("selected", &self.selected)
            .field("render_pcm", &self.render_pcm.is_some())
            .field("capture_pcm", &self.capture_pcm.is_some())
            .field("mixer", &self.mixer.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct CardRegistry {
    instances: Vec<CardInstance>,
}

impl CardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a reference on `card_name`, creating the session if needed.
    ///
    /// Every call counts, including the one that finds an existing session,
    /// so each `acquire` must be paired with one `release`.
    pub fn acquire(&mut self, card_name: &str) -> Result<&mut CardInstance> {
        if card_name.is_empty() {
            log::error!("Invalid cardName!");
            return Err(HalError::InvalidName(card_name.to_string()));
        }

        if let Some(pos) = self.position(card_name) {
            let instance = &mut self.instances[pos];
            instance.ref_count += 1;
            return Ok(instance);
        }

        if self.instances.len() >= MAX_CARD_NUM {
            log::error!("Failed to add card instance {}", card_name);
            return Err(HalError::TooManyCards(MAX_CARD_NUM));
        }
        self.instances.push(CardInstance::new(card_name));
        log::debug!("Card instance {} created", card_name);
        let last = self.instances.len() - 1;
        Ok(&mut self.instances[last])
    }

    fn position(&self, card_name: &str) -> Option<usize> {
        self.instances.iter().position(|i| i.card_name == card_name)
    }

    pub fn get(&self, card_name: &str) -> Option<&CardInstance> {
        self.instances.iter().find(|i| i.card_name == card_name)
    }

    pub fn get_mut(&mut self, card_name: &str) -> Option<&mut CardInstance> {
        self.instances.iter_mut().find(|i| i.card_name == card_name)
    }

    /// Drop one reference; the session is closed and removed at zero.
    /// Returns the references still held.
    pub fn release(&mut self, card_name: &str) -> Result<u32> {
        let pos = self
            .position(card_name)
            .ok_or_else(|| HalError::UnknownInstance(card_name.to_string()))?;

        let instance = &mut self.instances[pos];
        instance.ref_count = instance.ref_count.saturating_sub(1);
        let remaining = instance.ref_count;
        if remaining == 0 {
            instance.close();
            self.instances.remove(pos);
            log::info!("Card instance {} released", card_name);
        }
        Ok(remaining)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Tear the registry down; refused while any session is referenced.
    pub fn destroy(&mut self) -> Result<()> {
        if let Some(busy) = self.instances.iter().find(|i| i.ref_count != 0) {
            log::error!("refCount is not zero, Sound card {} in use!", busy.card_name);
            return Err(HalError::DeviceBusy(busy.card_name.clone()));
        }
        self.instances.clear();
        Ok(())
    }
}
