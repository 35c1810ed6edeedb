//! audio - ALSA adapter backend
//!
//! Reads the board's adapter table, matches it against the cards present on
//! the ALSA bus and keeps per-adapter sessions with their mixer bindings and
//! PCM handles.

pub mod adapter_config;
pub mod alsa_device;
pub mod ctl_write;
pub mod descriptor;
pub mod enumerator;
pub mod format;
pub mod mixer;
pub mod registry;
pub mod resolver;

pub use adapter_config::{load_adapter_config, AdapterEntry, AdapterTable, CardClass};
pub use descriptor::{AdapterDescriptor, AudioPort, PortDirection};
pub use enumerator::{AlsaProbe, CardsList, HardwareProbe, PcmDeviceEntry};
pub use format::{AudioFormat, PcmHwParams};
pub use registry::{CardInstance, CardRegistry};
pub use resolver::{AdapterKind, SelectedCard};
