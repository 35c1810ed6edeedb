//! Adapter descriptors reported to the audio framework.

use serde::Serialize;

use super::adapter_config::{AdapterTable, CardClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Out,
    In,
    OutIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioPort {
    pub dir: PortDirection,
    pub port_id: u32,
    pub port_name: String,
}

impl AudioPort {
    fn new(dir: PortDirection) -> Self {
        let port_name = match dir {
            PortDirection::Out => "AOP",
            PortDirection::In => "AIP",
            PortDirection::OutIn => "AIOP",
        };
        Self {
            dir,
            port_id: 0,
            port_name: port_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterDescriptor {
    pub adapter_name: String,
    pub ports: Vec<AudioPort>,
}

impl AdapterDescriptor {
    /// Ports a class of adapter supports; `None` for classes not exposed.
    pub fn for_class(class: CardClass) -> Option<Self> {
        let dirs: &[PortDirection] = match class {
            // render, capture, render & capture
            CardClass::Primary => &[PortDirection::Out, PortDirection::In, PortDirection::OutIn],
            CardClass::Hdmi => &[PortDirection::Out],
            CardClass::Usb => &[PortDirection::Out, PortDirection::In],
            CardClass::Bt => return None,
        };
        Some(Self {
            adapter_name: class.as_str().to_string(),
            ports: dirs.iter().copied().map(AudioPort::new).collect(),
        })
    }
}

/// One descriptor per configured primary/HDMI adapter, then `usb` if a USB
/// codec is plugged in.
pub fn build_descriptors(table: &AdapterTable, usb_inserted: bool) -> Vec<AdapterDescriptor> {
    let mut descs = Vec::with_capacity(table.configured_count() + 1);
    for (class, entry) in table.iter() {
        match class {
            CardClass::Primary | CardClass::Hdmi => {
                descs.extend(AdapterDescriptor::for_class(class));
            }
            CardClass::Usb | CardClass::Bt => {
                log::warn!(
                    "Configured {} adapter ({}) is skipped, USB is reported only when plugged",
                    entry.name,
                    entry.card_id
                );
            }
        }
    }
    if usb_inserted {
        descs.extend(AdapterDescriptor::for_class(CardClass::Usb));
    }
    descs
}
