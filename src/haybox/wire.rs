//! Device-native wire configuration model
//!
//! Serde mirror of the firmware's protobuf JSON shape. Every struct carries
//! a flattened passthrough map so fields this crate does not model survive a
//! read/persist/write cycle untouched. Wire indices (`default_backend_config`,
//! `default_mode_config`) are 1-based.

use super::buttons::WireButton;
use crate::modes::GameMode;
use crate::socd::SocdType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire game mode identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireGameModeId {
    #[serde(rename = "MODE_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "MODE_MELEE")]
    Melee,
    #[serde(rename = "MODE_PROJECT_M")]
    ProjectM,
    #[serde(rename = "MODE_ULTIMATE")]
    Ultimate,
    #[serde(rename = "MODE_FGC")]
    Fgc,
    #[serde(rename = "MODE_RIVALS_OF_AETHER")]
    RivalsOfAether,
    #[serde(rename = "MODE_KEYBOARD")]
    Keyboard,
    #[serde(rename = "MODE_CUSTOM")]
    Custom,
}

impl From<WireGameModeId> for GameMode {
    fn from(id: WireGameModeId) -> Self {
        match id {
            WireGameModeId::Unspecified => GameMode::Unspecified,
            WireGameModeId::Melee => GameMode::Melee,
            WireGameModeId::ProjectM => GameMode::ProjectM,
            WireGameModeId::Ultimate => GameMode::Ultimate,
            WireGameModeId::Fgc => GameMode::Fgc,
            WireGameModeId::RivalsOfAether => GameMode::RivalsOfAether,
            WireGameModeId::Keyboard => GameMode::Keyboard,
            WireGameModeId::Custom => GameMode::Custom,
        }
    }
}

impl From<GameMode> for WireGameModeId {
    fn from(mode: GameMode) -> Self {
        match mode {
            GameMode::Unspecified => WireGameModeId::Unspecified,
            GameMode::Melee => WireGameModeId::Melee,
            GameMode::ProjectM => WireGameModeId::ProjectM,
            GameMode::Ultimate => WireGameModeId::Ultimate,
            GameMode::Fgc => WireGameModeId::Fgc,
            GameMode::RivalsOfAether => WireGameModeId::RivalsOfAether,
            GameMode::Keyboard => WireGameModeId::Keyboard,
            GameMode::Custom => WireGameModeId::Custom,
        }
    }
}

/// Wire SOCD resolution type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireSocdType {
    #[serde(rename = "SOCD_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "SOCD_NEUTRAL")]
    Neutral,
    #[serde(rename = "SOCD_2IP")]
    SecondInput,
    #[serde(rename = "SOCD_2IP_NO_REAC")]
    SecondInputNoReactivation,
    #[serde(rename = "SOCD_DIR1_PRIORITY")]
    Direction1Priority,
    #[serde(rename = "SOCD_DIR2_PRIORITY")]
    Direction2Priority,
}

impl From<WireSocdType> for SocdType {
    fn from(t: WireSocdType) -> Self {
        match t {
            WireSocdType::Unspecified => SocdType::Unspecified,
            WireSocdType::Neutral => SocdType::Neutral,
            WireSocdType::SecondInput => SocdType::SecondInput,
            WireSocdType::SecondInputNoReactivation => SocdType::SecondInputNoReactivation,
            WireSocdType::Direction1Priority => SocdType::Direction1Priority,
            WireSocdType::Direction2Priority => SocdType::Direction2Priority,
        }
    }
}

impl From<SocdType> for WireSocdType {
    fn from(t: SocdType) -> Self {
        match t {
            SocdType::Unspecified => WireSocdType::Unspecified,
            SocdType::Neutral => WireSocdType::Neutral,
            SocdType::SecondInput => WireSocdType::SecondInput,
            SocdType::SecondInputNoReactivation => WireSocdType::SecondInputNoReactivation,
            SocdType::Direction1Priority => WireSocdType::Direction1Priority,
            SocdType::Direction2Priority => WireSocdType::Direction2Priority,
        }
    }
}

/// Wire communication backend identifier
///
/// Unknown ids from newer firmware deserialize as `Unknown` instead of
/// failing the whole read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireBackendId {
    #[serde(rename = "COMMS_BACKEND_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "COMMS_BACKEND_XINPUT")]
    XInput,
    #[serde(rename = "COMMS_BACKEND_DINPUT")]
    DInput,
    #[serde(rename = "COMMS_BACKEND_NINTENDO_SWITCH")]
    NintendoSwitch,
    #[serde(rename = "COMMS_BACKEND_GAMECUBE")]
    GameCube,
    #[serde(rename = "COMMS_BACKEND_N64")]
    N64,
    #[serde(rename = "COMMS_BACKEND_NES")]
    Nes,
    #[serde(rename = "COMMS_BACKEND_SNES")]
    Snes,
    #[serde(rename = "COMMS_BACKEND_CONFIGURATOR")]
    Configurator,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSocdPair {
    pub button_dir1: WireButton,
    pub button_dir2: WireButton,
    pub socd_type: WireSocdType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireButtonRemap {
    pub physical_button: WireButton,
    /// Button whose default action the physical button now activates
    pub activates: WireButton,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGameModeConfig {
    pub mode_id: WireGameModeId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub socd_pairs: Vec<WireSocdPair>,
    #[serde(default)]
    pub button_remapping: Vec<WireButtonRemap>,
    #[serde(default)]
    pub activation_binding: Vec<WireButton>,
    /// 1-based index into `custom_modes`; 0 when unused
    #[serde(default)]
    pub custom_mode_config: u32,
    /// 1-based index into `keyboard_modes`; 0 when unused
    #[serde(default)]
    pub keyboard_mode_config: u32,
    /// 1-based index into `rgb_configs`; 0 when unused
    #[serde(default)]
    pub rgb_config: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBackendConfig {
    pub backend_id: WireBackendId,
    /// 1-based index into `game_mode_configs`
    #[serde(default)]
    pub default_mode_config: u32,
    #[serde(default)]
    pub activation_binding: Vec<WireButton>,
    #[serde(default)]
    pub secondary_backends: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCoords {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMeleeOptions {
    #[serde(default)]
    pub crouch_walk_os: bool,
    #[serde(default)]
    pub disable_ledgedash_socd_override: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_airdodge: Option<WireCoords>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireProjectMOptions {
    #[serde(default)]
    pub true_z_press: bool,
    #[serde(default)]
    pub disable_ledgedash_socd_override: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_airdodge: Option<WireCoords>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full device configuration as the firmware exposes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireConfig {
    #[serde(default)]
    pub game_mode_configs: Vec<WireGameModeConfig>,
    #[serde(default)]
    pub communication_backend_configs: Vec<WireBackendConfig>,
    #[serde(default)]
    pub custom_modes: Vec<Value>,
    #[serde(default)]
    pub keyboard_modes: Vec<Value>,
    #[serde(default)]
    pub rgb_configs: Vec<Value>,
    /// 1-based index into `communication_backend_configs`
    #[serde(default)]
    pub default_backend_config: u32,
    /// 1-based index into `communication_backend_configs`
    #[serde(default)]
    pub default_usb_backend_config: u32,
    #[serde(default)]
    pub rgb_brightness: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub melee_options: Option<WireMeleeOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_m_options: Option<WireProjectMOptions>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_round_trip() {
        let json = serde_json::json!({
            "gameModeConfigs": [{
                "modeId": "MODE_MELEE",
                "name": "",
                "rgbProfileHint": 3
            }],
            "communicationBackendConfigs": [],
            "defaultBackendConfig": 1,
            "futureKnob": { "a": 1 }
        })
        .to_string();

        let wire: WireConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(wire.extra.get("futureKnob").unwrap()["a"], 1);
        assert_eq!(wire.game_mode_configs[0].extra["rgbProfileHint"], 3);

        let back = serde_json::to_string(&wire).unwrap();
        let reparsed: WireConfig = serde_json::from_str(&back).unwrap();
        assert_eq!(wire, reparsed);
    }

    #[test]
    fn unknown_backend_id_does_not_fail_the_read() {
        let json = serde_json::json!({
            "backendId": "COMMS_BACKEND_FROM_THE_FUTURE",
            "defaultModeConfig": 1
        })
        .to_string();
        let backend: WireBackendConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(backend.backend_id, WireBackendId::Unknown);
    }
}
