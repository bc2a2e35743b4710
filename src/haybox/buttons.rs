//! Wire button codes
//!
//! The firmware addresses buttons by a fixed numeric code. Physical slots in
//! a layout carry the same numbering, so the conversion is a thin table; the
//! named constants and `name()` exist for diagnostics and log output.

use crate::bindings::PhysicalButton;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Firmware button code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireButton(pub u8);

impl WireButton {
    pub const UNSPECIFIED: WireButton = WireButton(0);

    // Left-hand finger row
    pub const LF1: WireButton = WireButton(1);
    pub const LF2: WireButton = WireButton(2);
    pub const LF3: WireButton = WireButton(3);
    pub const LF4: WireButton = WireButton(4);
    pub const LF5: WireButton = WireButton(5);

    // Left thumb cluster
    pub const LT1: WireButton = WireButton(6);
    pub const LT2: WireButton = WireButton(7);

    // Middle buttons
    pub const MB1: WireButton = WireButton(8);
    pub const MB2: WireButton = WireButton(9);
    pub const MB3: WireButton = WireButton(10);

    // Right-hand finger rows
    pub const RF1: WireButton = WireButton(11);
    pub const RF2: WireButton = WireButton(12);
    pub const RF3: WireButton = WireButton(13);
    pub const RF4: WireButton = WireButton(14);
    pub const RF5: WireButton = WireButton(15);
    pub const RF6: WireButton = WireButton(16);
    pub const RF7: WireButton = WireButton(17);
    pub const RF8: WireButton = WireButton(18);

    // Right thumb cluster
    pub const RT1: WireButton = WireButton(19);
    pub const RT2: WireButton = WireButton(20);
    pub const RT3: WireButton = WireButton(21);
    pub const RT4: WireButton = WireButton(22);
    pub const RT5: WireButton = WireButton(23);

    /// Firmware-style name for diagnostics ("BTN_LF3")
    pub fn name(&self) -> String {
        match *self {
            WireButton::UNSPECIFIED => "BTN_UNSPECIFIED".to_string(),
            WireButton(n @ 1..=5) => format!("BTN_LF{}", n),
            WireButton(n @ 6..=7) => format!("BTN_LT{}", n - 5),
            WireButton(n @ 8..=10) => format!("BTN_MB{}", n - 7),
            WireButton(n @ 11..=18) => format!("BTN_RF{}", n - 10),
            WireButton(n @ 19..=23) => format!("BTN_RT{}", n - 18),
            WireButton(n) => format!("BTN_{}", n),
        }
    }

    pub fn to_physical(self) -> PhysicalButton {
        PhysicalButton::from_code(self.0)
    }

    pub fn from_physical(button: PhysicalButton) -> Self {
        WireButton(button.code())
    }
}

impl fmt::Display for WireButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<PhysicalButton> for WireButton {
    fn from(button: PhysicalButton) -> Self {
        WireButton::from_physical(button)
    }
}

impl From<WireButton> for PhysicalButton {
    fn from(button: WireButton) -> Self {
        button.to_physical()
    }
}
