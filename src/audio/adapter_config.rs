//! Adapter configuration file loader.
//!
//! The JSON file lists the adapters a board exposes. Each entry names its
//! class (`primary`, `hdmi`, `usb`, `bt`), the ALSA card id it lives on,
//! an optional DAI id and, for the primary codec, the simple mixer controls
//! used for render and capture volume.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{HalError, Result};

/// Upper bound on configured adapters (and on most other card tables).
pub const MAX_CARD_NUM: usize = 8;
/// Upper bound on adapters of a single class.
pub const AUDIO_MAX_CARD_NUM: usize = 8;
/// Names must be strictly shorter than this.
pub const CARD_ID_LEN_MAX: usize = 32;
pub const MIXER_CTL_MAX_NUM: usize = 64;
/// Mixer control names must be strictly shorter than this.
pub const ALSA_CTL_NAME_LEN: usize = 64;

const MIXER_CTL_VOLUME: &str = "simple_mixer_ctl_volume";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardClass {
    Primary,
    Hdmi,
    Usb,
    Bt,
}

impl CardClass {
    pub const ALL: [CardClass; 4] = [Self::Primary, Self::Hdmi, Self::Usb, Self::Bt];

    /// Exact class names only; `"primary0"` is not a class.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "primary" => Some(Self::Primary),
            "hdmi" => Some(Self::Hdmi),
            "usb" => Some(Self::Usb),
            "bt" => Some(Self::Bt),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Hdmi => "hdmi",
            Self::Usb => "usb",
            Self::Bt => "bt",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Hdmi => 1,
            Self::Usb => 2,
            Self::Bt => 3,
        }
    }
}

impl fmt::Display for CardClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterEntry {
    pub name: String,
    /// ALSA card id (`/proc/asound/cards` short name)
    pub card_id: String,
    pub dai_id: Option<String>,
    pub render_controls: Vec<String>,
    pub capture_controls: Vec<String>,
}

/// Configured adapters grouped by class, in file order within a class.
#[derive(Debug, Clone, Default)]
pub struct AdapterTable {
    slots: [Vec<AdapterEntry>; 4],
    configured: usize,
}

#[derive(Deserialize)]
struct RawDocument {
    adapters: Option<Value>,
}

#[derive(Deserialize)]
struct RawAdapter {
    name: Option<Value>,
    #[serde(rename = "cardId")]
    card_id: Option<Value>,
    #[serde(rename = "daiId")]
    dai_id: Option<Value>,
    #[serde(rename = "simple_mixer_ctl_volume")]
    volume: Option<Value>,
}

#[derive(Deserialize)]
struct RawVolumeControls {
    playback: Option<Vec<RawControl>>,
    capture: Option<Vec<RawControl>>,
}

#[derive(Deserialize)]
struct RawControl {
    name: String,
}

/// Read and parse the adapter file at `path`.
///
/// Files that are empty or larger than `max_bytes` are refused before parsing.
pub fn load_adapter_config(path: &Path, max_bytes: u64) -> Result<AdapterTable> {
    let path = fs::canonicalize(path)?;
    let size = fs::metadata(&path)?.len();
    if size == 0 {
        return Err(HalError::InvalidConfig(format!(
            "{} is empty",
            path.display()
        )));
    }
    if size > max_bytes {
        return Err(HalError::InvalidConfig(format!(
            "{} is {} bytes, limit is {}",
            path.display(),
            size,
            max_bytes
        )));
    }

    let text = fs::read_to_string(&path)?;
    let table = AdapterTable::from_json_str(&text)?;
    log::info!(
        "Loaded {} adapter(s) from {}",
        table.configured_count(),
        path.display()
    );
    Ok(table)
}

/// Names start with a letter and continue with letters, digits, `_` or `-`.
pub fn check_name(name: &str) -> Result<()> {
    let len = name.len();
    if len == 0 || len >= CARD_ID_LEN_MAX {
        return Err(HalError::InvalidName(name.to_string()));
    }
    let mut chars = name.chars();
    let leading_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if leading_alpha && rest_ok {
        Ok(())
    } else {
        Err(HalError::InvalidName(name.to_string()))
    }
}

fn required_name(value: Option<&Value>, field: &str) -> Result<String> {
    let text = value
        .and_then(Value::as_str)
        .ok_or_else(|| HalError::InvalidConfig(format!("missing string field {}", field)))?;
    check_name(text)?;
    Ok(text.to_string())
}

fn control_names(list: Option<Vec<RawControl>>, stream: &str) -> Result<Vec<String>> {
    let list = list.ok_or_else(|| {
        HalError::InvalidConfig(format!("{} has no {} list", MIXER_CTL_VOLUME, stream))
    })?;
    if list.len() > MIXER_CTL_MAX_NUM {
        return Err(HalError::InvalidConfig(format!(
            "{} {} controls, at most {} supported",
            list.len(),
            stream,
            MIXER_CTL_MAX_NUM
        )));
    }
    list.into_iter()
        .map(|ctl| {
            if ctl.name.len() >= ALSA_CTL_NAME_LEN {
                Err(HalError::InvalidConfig(format!(
                    "mixer control name too long: {}",
                    ctl.name
                )))
            } else {
                Ok(ctl.name)
            }
        })
        .collect()
}

impl AdapterTable {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let doc: RawDocument = serde_json::from_str(text)?;
        let adapters = match doc.adapters {
            Some(Value::Array(adapters)) => adapters,
            Some(_) => return Err(HalError::InvalidConfig("adapters is not an array".into())),
            None => return Err(HalError::InvalidConfig("no adapters object".into())),
        };
        if adapters.is_empty() {
            return Err(HalError::InvalidConfig("adapters array is empty".into()));
        }
        if adapters.len() > MAX_CARD_NUM {
            log::error!(
                "Read {} adapters, the limit is {}",
                adapters.len(),
                MAX_CARD_NUM
            );
            return Err(HalError::TooManyCards(MAX_CARD_NUM));
        }

        let mut table = Self::default();
        for (i, adapter) in adapters.into_iter().enumerate() {
            let entry = parse_adapter(adapter).map_err(|e| {
                log::error!("Adapter {} rejected: {}", i, e);
                e
            })?;
            table.insert(entry)?;
        }
        table.configured = table.slots.iter().map(Vec::len).sum();
        log::debug!("Configured adapters: {}", table.configured);
        Ok(table)
    }

    fn insert(&mut self, entry: AdapterEntry) -> Result<()> {
        let class = CardClass::from_name(&entry.name)
            .ok_or_else(|| HalError::UnknownAdapter(entry.name.clone()))?;
        let slots = &mut self.slots[class.index()];
        if slots.len() >= AUDIO_MAX_CARD_NUM {
            return Err(HalError::InvalidConfig(format!(
                "at most {} {} adapters are supported",
                AUDIO_MAX_CARD_NUM, class
            )));
        }
        slots.push(entry);
        Ok(())
    }

    pub fn class_slots(&self, class: CardClass) -> &[AdapterEntry] {
        &self.slots[class.index()]
    }

    pub fn configured_count(&self) -> usize {
        self.configured
    }

    pub fn is_empty(&self) -> bool {
        self.configured == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (CardClass, &AdapterEntry)> {
        CardClass::ALL
            .into_iter()
            .flat_map(move |class| self.class_slots(class).iter().map(move |e| (class, e)))
    }
}

fn parse_adapter(value: Value) -> Result<AdapterEntry> {
    let raw: RawAdapter = serde_json::from_value(value)?;
    let name = required_name(raw.name.as_ref(), "name")?;
    let card_id = required_name(raw.card_id.as_ref(), "cardId")?;
    // Not all cards have a DAI id; a bad one is simply ignored.
    let dai_id = raw
        .dai_id
        .as_ref()
        .and_then(Value::as_str)
        .filter(|dai| check_name(dai).is_ok())
        .map(str::to_string);

    let class =
        CardClass::from_name(&name).ok_or_else(|| HalError::UnknownAdapter(name.clone()))?;

    let (render_controls, capture_controls) = if class == CardClass::Primary {
        let volume = raw.volume.ok_or_else(|| {
            HalError::InvalidConfig(format!("primary adapter has no {}", MIXER_CTL_VOLUME))
        })?;
        let controls: RawVolumeControls = serde_json::from_value(volume)?;
        (
            control_names(controls.playback, "playback")?,
            control_names(controls.capture, "capture")?,
        )
    } else {
        (Vec::new(), Vec::new())
    };

    Ok(AdapterEntry {
        name,
        card_id,
        dai_id,
        render_controls,
        capture_controls,
    })
}
