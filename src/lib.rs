pub mod audio;
pub mod config;
pub mod error;
pub mod hal;

pub use config::Config;
pub use error::{HalError, Result};
pub use hal::AlsaHal;
