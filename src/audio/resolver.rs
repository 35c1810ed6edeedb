//! Picks the concrete card/device pair for a requested adapter.

use super::adapter_config::{AdapterEntry, AdapterTable, CardClass};
use super::enumerator::{CardsList, PcmDeviceEntry};
use crate::error::{HalError, Result};

/// How a requested adapter name is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Primary,
    Usb,
    Hdmi,
    A2dp,
}

impl AdapterKind {
    /// Classify by prefix, so `"primary"` and `"primary_ext"` both map to `Primary`.
    pub fn from_adapter_name(name: &str) -> Result<Self> {
        if name.starts_with("primary") {
            Ok(Self::Primary)
        } else if name.starts_with("usb") {
            Ok(Self::Usb)
        } else if name.starts_with("hdmi") {
            Ok(Self::Hdmi)
        } else if name.starts_with("a2dp") {
            Ok(Self::A2dp)
        } else {
            Err(HalError::UnknownAdapter(name.to_string()))
        }
    }
}

/// The ALSA names an adapter resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedCard {
    /// PCM device name, `plughw:C,D`
    pub dev_name: String,
    /// Control/mixer name, `hw:C`
    pub ctrl_name: String,
    pub alsa_card_id: String,
    pub card: i32,
    pub device: i32,
}

impl From<&PcmDeviceEntry> for SelectedCard {
    fn from(entry: &PcmDeviceEntry) -> Self {
        Self {
            dev_name: format!("plughw:{},{}", entry.card, entry.device),
            ctrl_name: format!("hw:{}", entry.card),
            alsa_card_id: entry.card_id.clone(),
            card: entry.card,
            device: entry.device,
        }
    }
}

/// Configured primary adapter whose name starts with `adapter_name`.
pub fn match_primary<'a>(table: &'a AdapterTable, adapter_name: &str) -> Option<&'a AdapterEntry> {
    if !adapter_name.starts_with(CardClass::Primary.as_str()) {
        log::error!("The user sound card name {} is incorrect!", adapter_name);
        return None;
    }
    table
        .class_slots(CardClass::Primary)
        .iter()
        .find(|entry| entry.name.starts_with(adapter_name))
}

/// First configured HDMI adapter.
pub fn match_hdmi<'a>(table: &'a AdapterTable, adapter_name: &str) -> Option<&'a AdapterEntry> {
    if !adapter_name.starts_with(CardClass::Hdmi.as_str()) {
        log::error!("The user sound card name {} is incorrect!", adapter_name);
        return None;
    }
    table.class_slots(CardClass::Hdmi).first()
}

fn on_bus(
    adapter_name: &str,
    configured: Option<&AdapterEntry>,
    cards: &CardsList,
    device: i32,
) -> Result<SelectedCard> {
    let configured = configured.ok_or_else(|| {
        log::error!("No sound card selected by the user is matched from the configuration file.");
        HalError::NoMatchingCard(adapter_name.to_string())
    })?;
    cards
        .find_by_card_id(&configured.card_id, device)
        .map(SelectedCard::from)
        .ok_or_else(|| {
            log::error!(
                "Card {} (device {}) for {} is not on the bus",
                configured.card_id,
                device,
                adapter_name
            );
            HalError::NoMatchingCard(adapter_name.to_string())
        })
}

/// Resolve `adapter_name` against the configured table and the discovered cards.
pub fn resolve(
    adapter_name: &str,
    table: &AdapterTable,
    cards: &CardsList,
    device: i32,
) -> Result<SelectedCard> {
    let selected = match AdapterKind::from_adapter_name(adapter_name)? {
        AdapterKind::Primary => on_bus(adapter_name, match_primary(table, adapter_name), cards, device)?,
        AdapterKind::Hdmi => on_bus(adapter_name, match_hdmi(table, adapter_name), cards, device)?,
        AdapterKind::Usb => cards
            .first_usb()
            .map(SelectedCard::from)
            .ok_or_else(|| HalError::NoMatchingCard(adapter_name.to_string()))?,
        AdapterKind::A2dp => {
            log::error!("Currently not supported A2DP, please check!");
            return Err(HalError::NotSupported("A2DP".into()));
        }
    };
    log::info!(
        "Adapter {} -> {} ({})",
        adapter_name,
        selected.dev_name,
        selected.alsa_card_id
    );
    Ok(selected)
}
