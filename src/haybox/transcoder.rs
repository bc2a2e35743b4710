//! Wire ↔ internal configuration transcoding
//!
//! The transcoder retains the last full wire config read from a device and
//! uses it as the template for writes, so sub-configs the internal model does
//! not carry (custom/keyboard/RGB profile indices, backend configs, firmware
//! metadata) survive a write-back unchanged. The merge itself is a pure
//! function over that snapshot.

use super::buttons::WireButton;
use super::wire::*;
use crate::bindings::{binding_to_physical, physical_to_binding};
use crate::config::{
    ButtonBinding, Config, Coords, GameModeConfig, MeleeOptions, ProjectMOptions,
    ACTIVATION_BINDING_MAX_LEN, BUTTON_REMAPPING_MAX_LEN, CUSTOM_AIRDODGE_MAX,
    CUSTOM_AIRDODGE_MIN, NAME_MAX_LEN, SOCDS_MAX_LEN,
};
use crate::layout::Layout;
use crate::modes::GameMode;
use crate::socd::SocdPair;
use anyhow::{bail, ensure, Context, Result};
use tracing::warn;

/// Stateful wire ↔ internal adapter for one connection
#[derive(Debug, Default)]
pub struct Transcoder {
    previous: Option<WireConfig>,
}

impl Transcoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a wire snapshot is retained (a config has been read)
    pub fn has_snapshot(&self) -> bool {
        self.previous.is_some()
    }

    /// Decode a freshly read wire config, retaining it as the write template
    pub fn decode(&mut self, layout: &Layout, wire: WireConfig) -> Result<Config> {
        let config = decode_config(layout, &wire)?;
        self.previous = Some(wire);
        Ok(config)
    }

    /// Encode an internal config against the retained snapshot
    pub fn encode(&self, layout: &Layout, config: &Config) -> Result<WireConfig> {
        let previous = self
            .previous
            .as_ref()
            .context("no wire snapshot retained; a config must be read before writing")?;
        merge(previous, layout, config)
    }

    /// Adopt a successfully written wire config as the new baseline
    pub fn commit(&mut self, wire: WireConfig) {
        self.previous = Some(wire);
    }

    /// Drop the retained snapshot (disconnect)
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// Resolve a 1-based wire index into a slice.
///
/// The wire format is protobuf-shaped and indexes from 1; 0 means "unset"
/// and must never silently read element -1.
fn wire_index<'a, T>(slice: &'a [T], index: u32, what: &str) -> Result<&'a T> {
    ensure!(index >= 1, "{what}: wire indices are 1-based, got 0");
    slice.get(index as usize - 1).with_context(|| {
        format!(
            "{what}: index {} out of range ({} entries)",
            index,
            slice.len()
        )
    })
}

fn decode_socd(layout: &Layout, mode: GameMode, pair: &WireSocdPair) -> SocdPair {
    SocdPair {
        a: physical_to_binding(layout, mode, pair.button_dir1.to_physical()),
        b: physical_to_binding(layout, mode, pair.button_dir2.to_physical()),
        kind: pair.socd_type.into(),
    }
}

fn decode_remap(layout: &Layout, mode: GameMode, remap: &WireButtonRemap) -> ButtonBinding {
    ButtonBinding {
        physical: remap.physical_button.to_physical(),
        binding: physical_to_binding(layout, mode, remap.activates.to_physical()),
    }
}

fn decode_mode(layout: &Layout, wire: &WireGameModeConfig) -> GameModeConfig {
    let id: GameMode = wire.mode_id.into();
    GameModeConfig {
        id,
        name: Some(wire.name.clone()),
        socd_pairs: wire
            .socd_pairs
            .iter()
            .map(|p| decode_socd(layout, id, p))
            .collect(),
        button_remapping: wire
            .button_remapping
            .iter()
            .map(|r| decode_remap(layout, id, r))
            .collect(),
        activation_binding: wire
            .activation_binding
            .iter()
            .map(|b| b.to_physical())
            .collect(),
    }
}

fn decode_melee_options(layout: &Layout, wire: Option<&WireMeleeOptions>) -> MeleeOptions {
    match wire {
        Some(opts) => MeleeOptions {
            enabled: true,
            crouch_walk_os: opts.crouch_walk_os,
            disable_ledgedash_socd_override: opts.disable_ledgedash_socd_override,
            custom_airdodge: opts.custom_airdodge.map(|c| Coords {
                x: c.x as f64,
                y: c.y as f64,
            }),
        },
        // A device that never customized the block still needs a value to
        // show; fall back to the connecting layout's declared defaults.
        None => layout.options.melee.clone(),
    }
}

fn decode_project_m_options(layout: &Layout, wire: Option<&WireProjectMOptions>) -> ProjectMOptions {
    match wire {
        Some(opts) => ProjectMOptions {
            enabled: true,
            true_z_press: opts.true_z_press,
            disable_ledgedash_socd_override: opts.disable_ledgedash_socd_override,
            custom_airdodge: opts.custom_airdodge.map(|c| Coords {
                x: c.x as f64,
                y: c.y as f64,
            }),
        },
        None => layout.options.project_m.clone(),
    }
}

/// Decode a full wire config against a layout
pub fn decode_config(layout: &Layout, wire: &WireConfig) -> Result<Config> {
    // The default mode hides behind two levels of 1-based indirection:
    // default backend -> that backend's default mode config -> game mode.
    let backend = wire_index(
        &wire.communication_backend_configs,
        wire.default_backend_config,
        "defaultBackendConfig",
    )?;
    let default_mode_config = wire_index(
        &wire.game_mode_configs,
        backend.default_mode_config,
        "defaultModeConfig",
    )?;

    Ok(Config {
        game_modes: wire
            .game_mode_configs
            .iter()
            .map(|m| decode_mode(layout, m))
            .collect(),
        default_mode: default_mode_config.mode_id.into(),
        project_m_options: decode_project_m_options(layout, wire.project_m_options.as_ref()),
        melee_options: decode_melee_options(layout, wire.melee_options.as_ref()),
    })
}

fn encode_socd(layout: &Layout, mode: GameMode, pair: &SocdPair) -> WireSocdPair {
    WireSocdPair {
        button_dir1: binding_to_physical(layout, mode, pair.a).into(),
        button_dir2: binding_to_physical(layout, mode, pair.b).into(),
        socd_type: pair.kind.into(),
    }
}

fn encode_remap(layout: &Layout, mode: GameMode, remap: &ButtonBinding) -> WireButtonRemap {
    WireButtonRemap {
        physical_button: remap.physical.into(),
        activates: binding_to_physical(layout, mode, remap.binding).into(),
    }
}

fn truncated<T: Clone>(items: &[T], max: usize, mode: GameMode, what: &str) -> Vec<T> {
    if items.len() > max {
        warn!(
            "{}: {} {what} entries exceed the wire limit of {max}; truncating",
            mode.string_id(),
            items.len()
        );
    }
    items.iter().take(max).cloned().collect()
}

fn encode_mode(
    layout: &Layout,
    mode: &GameModeConfig,
    previous: Option<&WireGameModeConfig>,
) -> Result<WireGameModeConfig> {
    // A missing name is a programming error upstream (every decoded mode
    // carries one), not a user state to paper over.
    let Some(name) = &mode.name else {
        bail!("game mode {} has no name; refusing to write", mode.id);
    };
    // Truncate per character, not per byte; a multibyte name must not split.
    let name: String = name.chars().take(NAME_MAX_LEN).collect();

    let socd_pairs = truncated(&mode.socd_pairs, SOCDS_MAX_LEN, mode.id, "SOCD pair")
        .iter()
        .map(|p| encode_socd(layout, mode.id, p))
        .collect();
    let button_remapping = truncated(
        &mode.button_remapping,
        BUTTON_REMAPPING_MAX_LEN,
        mode.id,
        "remap",
    )
    .iter()
    .map(|r| encode_remap(layout, mode.id, r))
    .collect();
    let activation_binding = truncated(
        &mode.activation_binding,
        ACTIVATION_BINDING_MAX_LEN,
        mode.id,
        "activation chord",
    )
    .iter()
    .map(|b| WireButton::from_physical(*b))
    .collect();

    Ok(WireGameModeConfig {
        mode_id: mode.id.into(),
        name,
        socd_pairs,
        button_remapping,
        activation_binding,
        // Wire-only sub-config indices come from the previous snapshot.
        custom_mode_config: previous.map_or(0, |p| p.custom_mode_config),
        keyboard_mode_config: previous.map_or(0, |p| p.keyboard_mode_config),
        rgb_config: previous.map_or(0, |p| p.rgb_config),
        extra: previous.map_or_else(Default::default, |p| p.extra.clone()),
    })
}

/// Clamp a coordinate override to the firmware range and round to the
/// nearest integer. Applied on every write, whether or not the edit surface
/// already enforced it.
fn clamp_coord(v: f64) -> u32 {
    v.clamp(CUSTOM_AIRDODGE_MIN, CUSTOM_AIRDODGE_MAX).round() as u32
}

fn encode_coords(coords: Coords) -> WireCoords {
    WireCoords {
        x: clamp_coord(coords.x),
        y: clamp_coord(coords.y),
    }
}

fn encode_melee_options(
    options: &MeleeOptions,
    previous: Option<&WireMeleeOptions>,
) -> Option<WireMeleeOptions> {
    // A disabled block is wire-absence, not a record with a disabled flag.
    if !options.enabled {
        return None;
    }
    Some(WireMeleeOptions {
        crouch_walk_os: options.crouch_walk_os,
        disable_ledgedash_socd_override: options.disable_ledgedash_socd_override,
        custom_airdodge: options.custom_airdodge.map(encode_coords),
        extra: previous.map_or_else(Default::default, |p| p.extra.clone()),
    })
}

fn encode_project_m_options(
    options: &ProjectMOptions,
    previous: Option<&WireProjectMOptions>,
) -> Option<WireProjectMOptions> {
    if !options.enabled {
        return None;
    }
    Some(WireProjectMOptions {
        true_z_press: options.true_z_press,
        disable_ledgedash_socd_override: options.disable_ledgedash_socd_override,
        custom_airdodge: options.custom_airdodge.map(encode_coords),
        extra: previous.map_or_else(Default::default, |p| p.extra.clone()),
    })
}

/// Merge an internal config into the previously read wire config.
///
/// Pure: neither input is mutated. Fields the internal model does not own
/// are carried over from `previous`.
pub fn merge(previous: &WireConfig, layout: &Layout, config: &Config) -> Result<WireConfig> {
    let mut wire = previous.clone();

    wire.game_mode_configs = config
        .game_modes
        .iter()
        .map(|mode| {
            let prev = previous
                .game_mode_configs
                .iter()
                .find(|c| c.mode_id == WireGameModeId::from(mode.id));
            encode_mode(layout, mode, prev)
        })
        .collect::<Result<Vec<_>>>()?;

    // Point the default backend at the selected default mode (1-based).
    if let Some(pos) = wire
        .game_mode_configs
        .iter()
        .position(|m| GameMode::from(m.mode_id) == config.default_mode)
    {
        let backend_idx = wire.default_backend_config;
        if backend_idx >= 1 && (backend_idx as usize) <= wire.communication_backend_configs.len() {
            wire.communication_backend_configs[backend_idx as usize - 1].default_mode_config =
                pos as u32 + 1;
        } else {
            warn!("defaultBackendConfig {backend_idx} unresolvable; default mode not written");
        }
    } else {
        warn!(
            "default mode {} has no game mode config; default mode not written",
            config.default_mode.string_id()
        );
    }

    wire.melee_options = encode_melee_options(&config.melee_options, previous.melee_options.as_ref());
    wire.project_m_options =
        encode_project_m_options(&config.project_m_options, previous.project_m_options.as_ref());

    Ok(wire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{Binding, PhysicalButton};
    use crate::haybox::defaults::default_wire_config;
    use crate::layout::test_layout;
    use crate::socd::SocdType;

    fn decoded() -> (Layout, Transcoder, Config) {
        let layout = test_layout();
        let mut transcoder = Transcoder::new();
        let config = transcoder.decode(&layout, default_wire_config()).unwrap();
        (layout, transcoder, config)
    }

    #[test]
    fn one_based_boundary_resolves_to_element_zero() {
        let (_, _, config) = decoded();
        // defaultBackendConfig == 1 -> XInput backend -> mode config 1 -> Melee
        assert_eq!(config.default_mode, GameMode::Melee);
    }

    #[test]
    fn zero_wire_index_is_an_error_not_minus_one() {
        let layout = test_layout();
        let mut wire = default_wire_config();
        wire.default_backend_config = 0;
        let err = decode_config(&layout, &wire).unwrap_err();
        assert!(err.to_string().contains("1-based"));
    }

    #[test]
    fn out_of_range_wire_index_is_an_error() {
        let layout = test_layout();
        let mut wire = default_wire_config();
        wire.default_backend_config = 99;
        assert!(decode_config(&layout, &wire).is_err());
    }

    #[test]
    fn decode_resolves_socd_pairs_through_the_layout() {
        let (_, _, config) = decoded();
        let melee = config.mode(GameMode::Melee).unwrap();
        assert_eq!(
            melee.socd_pairs[0],
            crate::socd::SocdPair {
                a: Binding::LeftStickLeft,
                b: Binding::LeftStickRight,
                kind: SocdType::SecondInputNoReactivation,
            }
        );
    }

    #[test]
    fn decode_falls_back_to_layout_option_defaults() {
        let (_, _, config) = decoded();
        // The factory config carries no option blocks.
        assert!(!config.melee_options.enabled);
        assert!(!config.project_m_options.enabled);
    }

    #[test]
    fn encode_requires_a_snapshot() {
        let layout = test_layout();
        let transcoder = Transcoder::new();
        let (_, _, config) = decoded();
        assert!(transcoder.encode(&layout, &config).is_err());
    }

    #[test]
    fn encode_preserves_wire_only_fields() {
        let layout = test_layout();
        let mut wire = default_wire_config();
        wire.game_mode_configs[0].rgb_config = 7;
        wire.game_mode_configs[0]
            .extra
            .insert("futureField".into(), serde_json::json!(true));
        wire.extra
            .insert("firmwareMeta".into(), serde_json::json!({ "serial": "x1" }));

        let mut transcoder = Transcoder::new();
        let config = transcoder.decode(&layout, wire).unwrap();
        let out = transcoder.encode(&layout, &config).unwrap();

        assert_eq!(out.game_mode_configs[0].rgb_config, 7);
        assert_eq!(out.game_mode_configs[0].extra["futureField"], true);
        assert_eq!(out.extra["firmwareMeta"]["serial"], "x1");
        // Keyboard mode table untouched
        assert_eq!(out.keyboard_modes.len(), 1);
    }

    #[test]
    fn encode_round_trips_bindings_through_the_layout() {
        let (layout, mut transcoder, mut config) = decoded();
        {
            let melee = config.mode_mut(GameMode::Melee).unwrap();
            // Rebind slot 19 (default "a") to "x".
            melee.button_remapping.push(ButtonBinding {
                physical: PhysicalButton::Slot(19),
                binding: Binding::X,
            });
        }

        let out = transcoder.encode(&layout, &config).unwrap();
        let melee_wire = &out.game_mode_configs[0];
        assert_eq!(melee_wire.button_remapping.len(), 1);
        assert_eq!(
            melee_wire.button_remapping[0].physical_button,
            WireButton(19)
        );
        // "x" lives on slot 12 in the layout.
        assert_eq!(melee_wire.button_remapping[0].activates, WireButton(12));

        // And decoding the written config resolves back to the binding.
        let config2 = transcoder.decode(&layout, out).unwrap();
        let melee2 = config2.mode(GameMode::Melee).unwrap();
        assert_eq!(melee2.button_remapping[0].binding, Binding::X);
    }

    #[test]
    fn null_mode_name_fails_loudly() {
        let (layout, transcoder, mut config) = decoded();
        config.game_modes[0].name = None;
        let err = transcoder.encode(&layout, &config).unwrap_err();
        assert!(err.to_string().contains("no name"));
    }

    #[test]
    fn coordinate_clamp_applies_on_write() {
        let (layout, transcoder, mut config) = decoded();
        config.melee_options = MeleeOptions {
            enabled: true,
            crouch_walk_os: true,
            disable_ledgedash_socd_override: false,
            custom_airdodge: Some(Coords { x: 150.0, y: -20.0 }),
        };

        let out = transcoder.encode(&layout, &config).unwrap();
        let melee = out.melee_options.unwrap();
        assert_eq!(melee.custom_airdodge, Some(WireCoords { x: 100, y: 0 }));
    }

    #[test]
    fn disabled_options_are_wire_absent() {
        let (layout, transcoder, mut config) = decoded();
        config.melee_options.enabled = false;
        config.project_m_options.enabled = false;
        let out = transcoder.encode(&layout, &config).unwrap();
        assert!(out.melee_options.is_none());
        assert!(out.project_m_options.is_none());
    }

    #[test]
    fn default_mode_selection_is_written_back() {
        let (layout, mut transcoder, mut config) = decoded();
        config.default_mode = GameMode::Ultimate;
        let out = transcoder.encode(&layout, &config).unwrap();

        // Re-decode: the double indirection must now land on Ultimate.
        let config2 = transcoder.decode(&layout, out).unwrap();
        assert_eq!(config2.default_mode, GameMode::Ultimate);
    }

    #[test]
    fn overlong_name_is_truncated_to_wire_limit() {
        let (layout, transcoder, mut config) = decoded();
        config.game_modes[0].name = Some("a".repeat(NAME_MAX_LEN + 10));
        let out = transcoder.encode(&layout, &config).unwrap();
        assert_eq!(out.game_mode_configs[0].name.len(), NAME_MAX_LEN);
    }

    #[test]
    fn multibyte_name_truncates_on_a_char_boundary() {
        let (layout, transcoder, mut config) = decoded();
        // Nine two-byte chars fit the limit untouched; twenty do not.
        config.game_modes[0].name = Some("é".repeat(9));
        let out = transcoder.encode(&layout, &config).unwrap();
        assert_eq!(out.game_mode_configs[0].name, "é".repeat(9));

        config.game_modes[0].name = Some("é".repeat(20));
        let out = transcoder.encode(&layout, &config).unwrap();
        assert_eq!(out.game_mode_configs[0].name, "é".repeat(NAME_MAX_LEN));
    }
}
