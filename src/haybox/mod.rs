//! HayBox wire format support
//!
//! Serde model of the firmware's JSON wire config, the factory default
//! document, the wire ↔ internal transcoder, and a file-backed emulator.

pub mod buttons;
pub mod defaults;
pub mod emulated;
pub mod transcoder;
pub mod wire;

pub use buttons::WireButton;
pub use defaults::default_wire_config;
pub use emulated::{EmulatedConnector, EmulatedDevice};
pub use transcoder::Transcoder;
pub use wire::WireConfig;
