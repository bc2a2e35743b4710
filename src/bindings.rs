//! Binding and physical-button vocabulary
//!
//! A `Binding` is an abstract, layout-independent action name ("a",
//! "left_stick_up", ...). A `PhysicalButton` identifies an input slot on a
//! specific piece of hardware; the same binding may live on different slots
//! depending on the layout and game mode.

use crate::layout::Layout;
use crate::modes::GameMode;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Abstract action binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    A,
    B,
    X,
    Y,
    Z,

    LeftShoulder,
    RightShoulder,

    LeftTrigger,
    RightTrigger,

    Start,
    Select,
    Home,
    Capture,

    Mx,
    My,

    DpadMod,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,

    LeftStickClick,
    LeftStickUp,
    LeftStickDown,
    LeftStickLeft,
    LeftStickRight,

    RightStickClick,
    RightStickUp,
    RightStickDown,
    RightStickLeft,
    RightStickRight,

    LightShield,
    MediumShield,

    KbA,
    KbB,
    KbC,
    KbD,
    KbE,
    KbF,
    KbG,
    KbH,
    KbI,
    KbJ,
    KbK,
    KbL,
    KbM,
    KbN,
    KbO,
    KbP,
    KbQ,
    KbR,
    KbS,
    KbT,
    KbU,
    KbV,
    KbW,
    KbX,
    KbY,
    KbZ,

    Unspecified,
}

impl Binding {
    /// Every binding, in declaration order
    pub const ALL: [Binding; 59] = [
        Binding::A,
        Binding::B,
        Binding::X,
        Binding::Y,
        Binding::Z,
        Binding::LeftShoulder,
        Binding::RightShoulder,
        Binding::LeftTrigger,
        Binding::RightTrigger,
        Binding::Start,
        Binding::Select,
        Binding::Home,
        Binding::Capture,
        Binding::Mx,
        Binding::My,
        Binding::DpadMod,
        Binding::DpadUp,
        Binding::DpadDown,
        Binding::DpadLeft,
        Binding::DpadRight,
        Binding::LeftStickClick,
        Binding::LeftStickUp,
        Binding::LeftStickDown,
        Binding::LeftStickLeft,
        Binding::LeftStickRight,
        Binding::RightStickClick,
        Binding::RightStickUp,
        Binding::RightStickDown,
        Binding::RightStickLeft,
        Binding::RightStickRight,
        Binding::LightShield,
        Binding::MediumShield,
        Binding::KbA,
        Binding::KbB,
        Binding::KbC,
        Binding::KbD,
        Binding::KbE,
        Binding::KbF,
        Binding::KbG,
        Binding::KbH,
        Binding::KbI,
        Binding::KbJ,
        Binding::KbK,
        Binding::KbL,
        Binding::KbM,
        Binding::KbN,
        Binding::KbO,
        Binding::KbP,
        Binding::KbQ,
        Binding::KbR,
        Binding::KbS,
        Binding::KbT,
        Binding::KbU,
        Binding::KbV,
        Binding::KbW,
        Binding::KbX,
        Binding::KbY,
        Binding::KbZ,
        Binding::Unspecified,
    ];

    /// Canonical snake_case name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Binding::A => "a",
            Binding::B => "b",
            Binding::X => "x",
            Binding::Y => "y",
            Binding::Z => "z",
            Binding::LeftShoulder => "left_shoulder",
            Binding::RightShoulder => "right_shoulder",
            Binding::LeftTrigger => "left_trigger",
            Binding::RightTrigger => "right_trigger",
            Binding::Start => "start",
            Binding::Select => "select",
            Binding::Home => "home",
            Binding::Capture => "capture",
            Binding::Mx => "mx",
            Binding::My => "my",
            Binding::DpadMod => "dpad_mod",
            Binding::DpadUp => "dpad_up",
            Binding::DpadDown => "dpad_down",
            Binding::DpadLeft => "dpad_left",
            Binding::DpadRight => "dpad_right",
            Binding::LeftStickClick => "left_stick_click",
            Binding::LeftStickUp => "left_stick_up",
            Binding::LeftStickDown => "left_stick_down",
            Binding::LeftStickLeft => "left_stick_left",
            Binding::LeftStickRight => "left_stick_right",
            Binding::RightStickClick => "right_stick_click",
            Binding::RightStickUp => "right_stick_up",
            Binding::RightStickDown => "right_stick_down",
            Binding::RightStickLeft => "right_stick_left",
            Binding::RightStickRight => "right_stick_right",
            Binding::LightShield => "light_shield",
            Binding::MediumShield => "medium_shield",
            Binding::KbA => "kb_a",
            Binding::KbB => "kb_b",
            Binding::KbC => "kb_c",
            Binding::KbD => "kb_d",
            Binding::KbE => "kb_e",
            Binding::KbF => "kb_f",
            Binding::KbG => "kb_g",
            Binding::KbH => "kb_h",
            Binding::KbI => "kb_i",
            Binding::KbJ => "kb_j",
            Binding::KbK => "kb_k",
            Binding::KbL => "kb_l",
            Binding::KbM => "kb_m",
            Binding::KbN => "kb_n",
            Binding::KbO => "kb_o",
            Binding::KbP => "kb_p",
            Binding::KbQ => "kb_q",
            Binding::KbR => "kb_r",
            Binding::KbS => "kb_s",
            Binding::KbT => "kb_t",
            Binding::KbU => "kb_u",
            Binding::KbV => "kb_v",
            Binding::KbW => "kb_w",
            Binding::KbX => "kb_x",
            Binding::KbY => "kb_y",
            Binding::KbZ => "kb_z",
            Binding::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static BINDING_BY_NAME: Lazy<HashMap<&'static str, Binding>> =
    Lazy::new(|| Binding::ALL.iter().map(|b| (b.as_str(), *b)).collect());

impl FromStr for Binding {
    type Err = UnknownBinding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BINDING_BY_NAME
            .get(s)
            .copied()
            .ok_or_else(|| UnknownBinding(s.to_string()))
    }
}

/// Parse error for binding / physical-button tokens
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown binding: {0}")]
pub struct UnknownBinding(pub String);

/// Physical input slot on a specific hardware layout
///
/// Slots carry the firmware's 1-based button code; code 0 is the
/// "unspecified" sentinel. Slot identity is only meaningful relative to a
/// layout, never portable across layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhysicalButton {
    Unspecified,
    Slot(u8),
}

impl PhysicalButton {
    /// Numeric wire code (0 for unspecified)
    pub fn code(&self) -> u8 {
        match self {
            PhysicalButton::Unspecified => 0,
            PhysicalButton::Slot(n) => *n,
        }
    }

    /// Build from a wire code; 0 maps to the sentinel
    pub fn from_code(code: u8) -> Self {
        if code == 0 {
            PhysicalButton::Unspecified
        } else {
            PhysicalButton::Slot(code)
        }
    }
}

impl fmt::Display for PhysicalButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalButton::Unspecified => f.write_str("unspecified"),
            PhysicalButton::Slot(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for PhysicalButton {
    type Err = UnknownBinding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "unspecified" {
            return Ok(PhysicalButton::Unspecified);
        }
        s.parse::<u8>()
            .map(PhysicalButton::from_code)
            .map_err(|_| UnknownBinding(s.to_string()))
    }
}

// Export form: a slot is its numeric code, the sentinel is the literal token.
impl Serialize for PhysicalButton {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PhysicalButton::Unspecified => serializer.serialize_str("unspecified"),
            PhysicalButton::Slot(n) => serializer.serialize_u8(*n),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PhysicalButtonRepr {
    Code(u8),
    Token(String),
}

impl<'de> Deserialize<'de> for PhysicalButton {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match PhysicalButtonRepr::deserialize(deserializer)? {
            PhysicalButtonRepr::Code(n) => Ok(PhysicalButton::from_code(n)),
            PhysicalButtonRepr::Token(s) => s
                .parse()
                .map_err(|e| serde::de::Error::custom(format!("{}", e))),
        }
    }
}

/// Resolve the binding assigned to a physical button in a mode's table.
///
/// First match wins; a layout that maps one slot twice is ambiguous and the
/// earlier entry is silently picked. Absent modes resolve to `Unspecified`.
pub fn physical_to_binding(layout: &Layout, mode: GameMode, button: PhysicalButton) -> Binding {
    layout
        .modes
        .get(&mode)
        .and_then(|m| m.bindings.iter().find(|slot| slot.physical == button))
        .map(|slot| slot.binding)
        .unwrap_or(Binding::Unspecified)
}

/// Inverse lookup: the physical button carrying a binding in a mode's table.
///
/// Same first-match / sentinel-fallback behavior as [`physical_to_binding`].
pub fn binding_to_physical(layout: &Layout, mode: GameMode, binding: Binding) -> PhysicalButton {
    layout
        .modes
        .get(&mode)
        .and_then(|m| m.bindings.iter().find(|slot| slot.binding == binding))
        .map(|slot| slot.physical)
        .unwrap_or(PhysicalButton::Unspecified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::test_layout;

    #[test]
    fn binding_names_round_trip() {
        for b in Binding::ALL {
            assert_eq!(b.as_str().parse::<Binding>().unwrap(), b);
        }
    }

    #[test]
    fn binding_serde_matches_as_str() {
        let json = serde_json::to_string(&Binding::LeftStickUp).unwrap();
        assert_eq!(json, "\"left_stick_up\"");
        let parsed: Binding = serde_json::from_str("\"kb_q\"").unwrap();
        assert_eq!(parsed, Binding::KbQ);
    }

    #[test]
    fn physical_button_export_form() {
        assert_eq!(serde_json::to_string(&PhysicalButton::Slot(3)).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&PhysicalButton::Unspecified).unwrap(),
            "\"unspecified\""
        );
        assert_eq!(
            serde_json::from_str::<PhysicalButton>("7").unwrap(),
            PhysicalButton::Slot(7)
        );
        assert_eq!(
            serde_json::from_str::<PhysicalButton>("\"unspecified\"").unwrap(),
            PhysicalButton::Unspecified
        );
        // Code 0 collapses to the sentinel
        assert_eq!(
            serde_json::from_str::<PhysicalButton>("0").unwrap(),
            PhysicalButton::Unspecified
        );
    }

    #[test]
    fn lookup_round_trip_on_unique_mapping() {
        let layout = test_layout();
        let mode = GameMode::Melee;
        for slot in &layout.modes[&mode].bindings {
            let binding = physical_to_binding(&layout, mode, slot.physical);
            assert_eq!(binding_to_physical(&layout, mode, binding), slot.physical);
        }
    }

    #[test]
    fn lookup_falls_back_to_unspecified() {
        let layout = test_layout();
        assert_eq!(
            physical_to_binding(&layout, GameMode::Custom, PhysicalButton::Slot(1)),
            Binding::Unspecified
        );
        assert_eq!(
            binding_to_physical(&layout, GameMode::Melee, Binding::KbQ),
            PhysicalButton::Unspecified
        );
    }

    #[test]
    fn duplicate_mapping_picks_first() {
        let mut layout = test_layout();
        let mode = GameMode::Melee;
        // Map slot 1 a second time; the earlier entry must keep winning.
        let first = layout.modes[&mode].bindings[0].clone();
        layout
            .modes
            .get_mut(&mode)
            .unwrap()
            .bindings
            .push(crate::layout::BindingSlot {
                physical: first.physical,
                binding: Binding::Home,
                hidden: false,
            });
        assert_eq!(
            physical_to_binding(&layout, mode, first.physical),
            first.binding
        );
    }
}
