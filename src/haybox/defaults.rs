//! Factory-default wire configuration
//!
//! Seeds the emulated device on first use. Values mirror the firmware's
//! shipped defaults: per-mode SOCD pairs on the stick axes, mode activation
//! chords, and one keyboard mode table.

use super::buttons::WireButton;
use super::wire::*;
use serde_json::{json, Map, Value};

fn socd(dir1: WireButton, dir2: WireButton, socd_type: WireSocdType) -> WireSocdPair {
    WireSocdPair {
        button_dir1: dir1,
        button_dir2: dir2,
        socd_type,
    }
}

fn mode(
    mode_id: WireGameModeId,
    socd_pairs: Vec<WireSocdPair>,
    button_remapping: Vec<WireButtonRemap>,
    activation_binding: Vec<WireButton>,
    keyboard_mode_config: u32,
) -> WireGameModeConfig {
    WireGameModeConfig {
        mode_id,
        name: String::new(),
        socd_pairs,
        button_remapping,
        activation_binding,
        custom_mode_config: 0,
        keyboard_mode_config,
        rgb_config: 0,
        extra: Map::new(),
    }
}

fn backend(
    backend_id: WireBackendId,
    default_mode_config: u32,
    activation_binding: Vec<WireButton>,
) -> WireBackendConfig {
    WireBackendConfig {
        backend_id,
        default_mode_config,
        activation_binding,
        secondary_backends: Vec::new(),
        extra: Map::new(),
    }
}

/// Stick-axis SOCD pairs shared by the smash-style modes
fn stick_socds(socd_type: WireSocdType) -> Vec<WireSocdPair> {
    vec![
        socd(WireButton::LF3, WireButton::LF1, socd_type),
        socd(WireButton::LF2, WireButton::RF4, socd_type),
        socd(WireButton::RT3, WireButton::RT5, socd_type),
        socd(WireButton::RT2, WireButton::RT4, socd_type),
    ]
}

fn default_keyboard_mode() -> Value {
    let buttons = [
        WireButton::LF4,
        WireButton::LF3,
        WireButton::LF2,
        WireButton::LF1,
        WireButton::LT1,
        WireButton::LT2,
        WireButton::MB3,
        WireButton::MB1,
        WireButton::MB2,
        WireButton::RF5,
        WireButton::RF6,
        WireButton::RF7,
        WireButton::RF8,
        WireButton::RF1,
        WireButton::RF2,
        WireButton::RF3,
        WireButton::RF4,
        WireButton::RT4,
        WireButton::RT3,
        WireButton::RT5,
        WireButton::RT1,
        WireButton::RT2,
    ];
    // HID keycodes for a..v, matching the firmware defaults
    let mappings: Vec<Value> = buttons
        .iter()
        .enumerate()
        .map(|(i, b)| json!({ "button": b.0, "keycode": 4 + i as u32 }))
        .collect();

    json!({ "id": 0, "buttonsToKeycodes": mappings })
}

/// Factory default configuration
pub fn default_wire_config() -> WireConfig {
    let game_mode_configs = vec![
        mode(
            WireGameModeId::Melee,
            stick_socds(WireSocdType::SecondInputNoReactivation),
            vec![],
            vec![WireButton::LT1, WireButton::MB1, WireButton::LF4],
            0,
        ),
        mode(
            WireGameModeId::ProjectM,
            stick_socds(WireSocdType::SecondInputNoReactivation),
            vec![],
            vec![WireButton::LT1, WireButton::MB1, WireButton::LF3],
            0,
        ),
        mode(
            WireGameModeId::Ultimate,
            stick_socds(WireSocdType::SecondInput),
            vec![],
            vec![WireButton::LT1, WireButton::MB1, WireButton::LF2],
            0,
        ),
        mode(
            WireGameModeId::Fgc,
            vec![
                socd(WireButton::LF3, WireButton::LF1, WireSocdType::Neutral),
                socd(WireButton::LF2, WireButton::LT1, WireSocdType::Neutral),
            ],
            vec![WireButtonRemap {
                physical_button: WireButton::RT4,
                activates: WireButton::LT1,
            }],
            vec![WireButton::LT1, WireButton::MB1, WireButton::LF1],
            0,
        ),
        mode(
            WireGameModeId::RivalsOfAether,
            stick_socds(WireSocdType::SecondInputNoReactivation),
            vec![],
            vec![WireButton::LT1, WireButton::MB1, WireButton::RF1],
            0,
        ),
        mode(
            WireGameModeId::Keyboard,
            vec![
                socd(WireButton::LF3, WireButton::LF1, WireSocdType::SecondInput),
                socd(WireButton::LT1, WireButton::RT4, WireSocdType::SecondInput),
            ],
            vec![],
            vec![WireButton::LT2, WireButton::MB1, WireButton::LF4],
            1,
        ),
    ];

    let communication_backend_configs = vec![
        backend(WireBackendId::XInput, 1, vec![]),
        backend(WireBackendId::DInput, 1, vec![WireButton::RF3]),
        backend(WireBackendId::NintendoSwitch, 3, vec![WireButton::RF2]),
        backend(WireBackendId::GameCube, 1, vec![]),
        backend(WireBackendId::N64, 1, vec![]),
        backend(WireBackendId::Nes, 1, vec![WireButton::LT1]),
        backend(WireBackendId::Snes, 1, vec![WireButton::LT2]),
        backend(WireBackendId::Configurator, 0, vec![WireButton::RT2]),
    ];

    WireConfig {
        game_mode_configs,
        communication_backend_configs,
        custom_modes: vec![],
        keyboard_modes: vec![default_keyboard_mode()],
        rgb_configs: vec![],
        default_backend_config: 1,
        default_usb_backend_config: 1,
        rgb_brightness: 0,
        melee_options: None,
        project_m_options: None,
        extra: Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_internally_consistent() {
        let wire = default_wire_config();

        // Indices are 1-based; the default backend must resolve.
        let backend_idx = wire.default_backend_config as usize;
        assert!(backend_idx >= 1 && backend_idx <= wire.communication_backend_configs.len());

        let backend = &wire.communication_backend_configs[backend_idx - 1];
        let mode_idx = backend.default_mode_config as usize;
        assert!(mode_idx >= 1 && mode_idx <= wire.game_mode_configs.len());
        assert_eq!(
            wire.game_mode_configs[mode_idx - 1].mode_id,
            WireGameModeId::Melee
        );
    }

    #[test]
    fn keyboard_mode_points_at_the_shipped_table() {
        let wire = default_wire_config();
        let kb = wire
            .game_mode_configs
            .iter()
            .find(|m| m.mode_id == WireGameModeId::Keyboard)
            .unwrap();
        assert_eq!(kb.keyboard_mode_config as usize, wire.keyboard_modes.len());
    }
}
