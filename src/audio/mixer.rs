//! Binding of adapter volume controls to ALSA simple mixer elements.
//!
//! Elements are looked up by name once, when a stream is set up, and their
//! volume ranges are normalized so callers can work in one fixed range
//! whatever the codec reports.

use alsa::mixer::{Mixer, Selem, SelemChannelId, SelemId};
use alsa::Direction;

use super::adapter_config::AdapterEntry;
use super::resolver::AdapterKind;
use crate::error::{HalError, Result};

/// Index of the last element scanned before a name lookup gives up.
pub const MAX_ELEMENT: usize = 100;

/// Fallback render controls probed on USB codecs, in priority order of the scan.
pub const USB_RENDER_CONTROLS: [&str; 5] = ["Earpiece", "Speaker", "Headphone", "PCM", "Mic"];
pub const USB_CAPTURE_CONTROLS: [&str; 4] = ["Earpiece", "Headset", "Headphone", "Mic"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeRange {
    pub min: i64,
    pub max: i64,
}

impl VolumeRange {
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Operations the binder needs from a mixer.
pub trait MixerControl {
    /// Simple element names, in mixer order.
    fn element_names(&self) -> Vec<String>;
    fn has_volume(&self, name: &str, direction: Direction) -> Result<bool>;
    fn volume_range(&self, name: &str, direction: Direction) -> Result<VolumeRange>;
    fn set_volume_range(&self, name: &str, direction: Direction, range: VolumeRange) -> Result<()>;
    fn volume(&self, name: &str, direction: Direction) -> Result<i64>;
    fn set_volume(&self, name: &str, direction: Direction, value: i64) -> Result<()>;
    /// Returns `false` when the element has no switch in `direction`.
    fn set_switch(&self, name: &str, direction: Direction, on: bool) -> Result<bool>;
}

/// An ALSA mixer attached to one card's control device.
pub struct AlsaMixer {
    mixer: Mixer,
}

impl AlsaMixer {
    /// Open, attach, register simple elements and load, on `hw:N`.
    pub fn open(ctrl_name: &str) -> Result<Self> {
        let mixer = Mixer::new(ctrl_name, false).map_err(|e| {
            log::error!("Failed to open mixer {}: {}", ctrl_name, e);
            e
        })?;
        log::debug!("Mixer {} loaded", ctrl_name);
        Ok(Self { mixer })
    }

    fn selem(&self, name: &str) -> Result<Selem<'_>> {
        self.mixer
            .find_selem(&SelemId::new(name, 0))
            .ok_or_else(|| HalError::ElementNotFound(name.to_string()))
    }
}

impl MixerControl for AlsaMixer {
    fn element_names(&self) -> Vec<String> {
        self.mixer
            .iter()
            .filter_map(Selem::new)
            .filter_map(|selem| {
                let id = selem.get_id();
                id.get_name().ok().map(str::to_string)
            })
            .collect()
    }

    fn has_volume(&self, name: &str, direction: Direction) -> Result<bool> {
        let selem = self.selem(name)?;
        Ok(match direction {
            Direction::Playback => selem.has_playback_volume(),
            Direction::Capture => selem.has_capture_volume(),
        })
    }

    fn volume_range(&self, name: &str, direction: Direction) -> Result<VolumeRange> {
        let selem = self.selem(name)?;
        let (min, max) = match direction {
            Direction::Playback => selem.get_playback_volume_range(),
            Direction::Capture => selem.get_capture_volume_range(),
        };
        Ok(VolumeRange { min, max })
    }

    fn set_volume_range(&self, name: &str, direction: Direction, range: VolumeRange) -> Result<()> {
        let selem = self.selem(name)?;
        match direction {
            Direction::Playback => selem.set_playback_volume_range(range.min, range.max)?,
            Direction::Capture => selem.set_capture_volume_range(range.min, range.max)?,
        }
        Ok(())
    }

    fn volume(&self, name: &str, direction: Direction) -> Result<i64> {
        let selem = self.selem(name)?;
        let value = match direction {
            Direction::Playback => selem.get_playback_volume(SelemChannelId::FrontLeft)?,
            Direction::Capture => selem.get_capture_volume(SelemChannelId::FrontLeft)?,
        };
        Ok(value)
    }

    fn set_volume(&self, name: &str, direction: Direction, value: i64) -> Result<()> {
        let selem = self.selem(name)?;
        match direction {
            Direction::Playback => selem.set_playback_volume_all(value)?,
            Direction::Capture => {
                for channel in SelemChannelId::all() {
                    if selem.has_capture_channel(*channel) {
                        selem.set_capture_volume(*channel, value)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn set_switch(&self, name: &str, direction: Direction, on: bool) -> Result<bool> {
        let selem = self.selem(name)?;
        let value = if on { 1 } else { 0 };
        match direction {
            Direction::Playback if selem.has_playback_switch() => {
                selem.set_playback_switch_all(value)?
            }
            Direction::Capture if selem.has_capture_switch() => {
                selem.set_capture_switch_all(value)?
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// A configured control and whether the mixer actually has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundElement {
    pub name: String,
    pub present: bool,
}

/// Volume elements bound for one stream direction of an adapter.
#[derive(Debug, Clone)]
pub struct MixerBinding {
    pub direction: Direction,
    pub range: VolumeRange,
    pub elements: Vec<BoundElement>,
}

/// Exact-name lookup over elements `0..=MAX_ELEMENT`.
pub fn find_element<M: MixerControl + ?Sized>(mixer: &M, name: &str) -> Option<String> {
    let found = mixer
        .element_names()
        .into_iter()
        .take(MAX_ELEMENT + 1)
        .find(|elem| elem == name);
    if found.is_none() {
        log::error!("Mixer element {} not found", name);
    }
    found
}

/// First element, in mixer order, whose name is one of the USB fallback controls.
pub fn find_usb_element<M: MixerControl + ?Sized>(mixer: &M, direction: Direction) -> Option<String> {
    let candidates: &[&str] = match direction {
        Direction::Playback => &USB_RENDER_CONTROLS,
        Direction::Capture => &USB_CAPTURE_CONTROLS,
    };
    mixer
        .element_names()
        .into_iter()
        .take(MAX_ELEMENT + 1)
        .find(|elem| candidates.contains(&elem.as_str()))
}

fn normalize_range<M: MixerControl + ?Sized>(
    mixer: &M,
    name: &str,
    direction: Direction,
    range: VolumeRange,
) -> Result<()> {
    if !mixer.has_volume(name, direction)? {
        log::debug!("{} has no {:?} volume, leaving range alone", name, direction);
        return Ok(());
    }
    let current = mixer.volume_range(name, direction)?;
    if current != range {
        log::debug!(
            "{}: volume range {}..{} -> {}..{}",
            name,
            current.min,
            current.max,
            range.min,
            range.max
        );
        mixer.set_volume_range(name, direction, range)?;
    }
    Ok(())
}

/// Bind the volume elements of an adapter for `direction` and normalize their ranges.
///
/// `entry` is the configured adapter; only primary adapters need one.
pub fn bind_elements<M: MixerControl + ?Sized>(
    kind: AdapterKind,
    entry: Option<&AdapterEntry>,
    mixer: &M,
    direction: Direction,
    range: VolumeRange,
) -> Result<MixerBinding> {
    let elements = match kind {
        AdapterKind::Primary => {
            let entry = entry.ok_or_else(|| HalError::NoMatchingCard("primary".into()))?;
            let names = match direction {
                Direction::Playback => &entry.render_controls,
                Direction::Capture => &entry.capture_controls,
            };
            names
                .iter()
                .map(|name| BoundElement {
                    name: name.clone(),
                    present: find_element(mixer, name).is_some(),
                })
                .collect()
        }
        AdapterKind::Usb => match find_usb_element(mixer, direction) {
            Some(name) => vec![BoundElement {
                name,
                present: true,
            }],
            None => {
                log::error!("USB codec exposes no known {:?} volume control", direction);
                return Err(HalError::ElementNotFound(format!("USB {:?} volume", direction)));
            }
        },
        AdapterKind::Hdmi => {
            log::info!("HDMI not ctlElement.");
            Vec::new()
        }
        AdapterKind::A2dp => return Err(HalError::NotSupported("A2DP mixer".into())),
    };

    for element in &elements {
        if !element.present {
            return Err(HalError::ElementNotFound(element.name.clone()));
        }
        normalize_range(mixer, &element.name, direction, range)?;
    }

    Ok(MixerBinding {
        direction,
        range,
        elements,
    })
}

impl MixerBinding {
    fn present(&self) -> impl Iterator<Item = &BoundElement> {
        self.elements.iter().filter(|e| e.present)
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    pub fn set_volume<M: MixerControl + ?Sized>(&self, mixer: &M, value: i64) -> Result<()> {
        if !self.range.contains(value) {
            return Err(HalError::VolumeOutOfRange {
                value,
                min: self.range.min,
                max: self.range.max,
            });
        }
        if self.is_empty() {
            return Err(HalError::NotSupported("no volume control bound".into()));
        }
        for element in self.present() {
            mixer.set_volume(&element.name, self.direction, value)?;
        }
        Ok(())
    }

    /// Volume of the first bound element.
    pub fn volume<M: MixerControl + ?Sized>(&self, mixer: &M) -> Result<i64> {
        let element = self
            .present()
            .next()
            .ok_or_else(|| HalError::NotSupported("no volume control bound".into()))?;
        mixer.volume(&element.name, self.direction)
    }

    pub fn set_mute<M: MixerControl + ?Sized>(&self, mixer: &M, mute: bool) -> Result<()> {
        let mut switched = false;
        for element in self.present() {
            switched |= mixer.set_switch(&element.name, self.direction, !mute)?;
        }
        if !switched {
            return Err(HalError::NotSupported("no mute switch bound".into()));
        }
        Ok(())
    }
}
