//! padlab - configuration editor for HayBox-style controller firmware
//!
//! Connect a device (or the built-in emulator), read its configuration,
//! edit button bindings, SOCD pairs and per-game options through per-mode
//! profile views, and write the result back without clobbering wire fields
//! the editor does not model.

pub mod bindings;
pub mod cli;
pub mod config;
pub mod device;
pub mod editor;
pub mod haybox;
pub mod layout;
pub mod manager;
pub mod modes;
pub mod profile;
pub mod socd;

pub use bindings::{binding_to_physical, physical_to_binding, Binding, PhysicalButton};
pub use config::{Config, DeviceInfo, GameModeConfig};
pub use haybox::{Transcoder, WireConfig};
pub use layout::{Layout, LayoutCatalog};
pub use manager::{ConnectionManager, ConnectionState};
pub use modes::GameMode;
pub use profile::ProfileState;
pub use socd::{SocdPair, SocdType};
