//! Internal device configuration model
//!
//! Binding-oriented view of a full device configuration, decoupled from both
//! the wire format (see `haybox`) and any particular layout. Limits mirror
//! the firmware's wire-format constraints and must be respected when writing.

use crate::bindings::{Binding, PhysicalButton};
use crate::modes::GameMode;
use crate::socd::SocdPair;
use serde::{Deserialize, Serialize};

// Wire-format limits, from the firmware's config schema.
pub const NAME_MAX_LEN: usize = 17;
pub const BUTTON_REMAPPING_MAX_LEN: usize = 60;
pub const SOCDS_MAX_LEN: usize = 10;
pub const ACTIVATION_BINDING_MAX_LEN: usize = 4;

pub const CUSTOM_AIRDODGE_MIN: f64 = 0.0;
pub const CUSTOM_AIRDODGE_MAX: f64 = 100.0;

/// Identity reported by a connected device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_name: String,
    pub firmware_name: String,
    pub firmware_version: String,
}

/// One physical-button → binding override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub physical: PhysicalButton,
    pub binding: Binding,
}

/// Per-mode configuration block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameModeConfig {
    pub id: GameMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub socd_pairs: Vec<SocdPair>,
    pub button_remapping: Vec<ButtonBinding>,
    /// Chord of physical buttons that switches the device into this mode
    pub activation_binding: Vec<PhysicalButton>,
}

/// 2D coordinate override, percent units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
}

/// Project M ruleset options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMOptions {
    pub enabled: bool,
    pub true_z_press: bool,
    pub disable_ledgedash_socd_override: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_airdodge: Option<Coords>,
}

/// Melee ruleset options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeleeOptions {
    pub enabled: bool,
    pub crouch_walk_os: bool,
    pub disable_ledgedash_socd_override: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_airdodge: Option<Coords>,
}

/// Full internal device configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub game_modes: Vec<GameModeConfig>,
    pub default_mode: GameMode,
    pub project_m_options: ProjectMOptions,
    pub melee_options: MeleeOptions,
}

impl Config {
    /// Look up a mode's config block by id
    pub fn mode(&self, id: GameMode) -> Option<&GameModeConfig> {
        self.game_modes.iter().find(|m| m.id == id)
    }

    pub fn mode_mut(&mut self, id: GameMode) -> Option<&mut GameModeConfig> {
        self.game_modes.iter_mut().find(|m| m.id == id)
    }
}
