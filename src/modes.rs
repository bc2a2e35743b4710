//! Game mode enumeration
//!
//! Modes name the firmware ruleset a configuration block applies to. Their
//! gameplay semantics live firmware-side; this crate only routes per-mode
//! configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported firmware game modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Unspecified,
    Melee,
    ProjectM,
    Ultimate,
    Fgc,
    RivalsOfAether,
    Keyboard,
    Custom,
}

impl GameMode {
    pub const ALL: [GameMode; 8] = [
        GameMode::Unspecified,
        GameMode::Melee,
        GameMode::ProjectM,
        GameMode::Ultimate,
        GameMode::Fgc,
        GameMode::RivalsOfAether,
        GameMode::Keyboard,
        GameMode::Custom,
    ];

    /// Human-facing name
    pub fn display_name(&self) -> &'static str {
        match self {
            GameMode::Unspecified => "Unspecified",
            GameMode::Melee => "Melee",
            GameMode::ProjectM => "Project M",
            GameMode::Ultimate => "Ultimate",
            GameMode::Fgc => "FGC",
            GameMode::RivalsOfAether => "Rivals",
            GameMode::Keyboard => "Keyboard",
            GameMode::Custom => "Custom",
        }
    }

    /// Stable lowercase identifier derived from the display name
    pub fn string_id(&self) -> String {
        self.display_name().replace(' ', "_").to_lowercase()
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown game mode {0:?}")]
pub struct UnknownGameMode(pub String);

impl std::str::FromStr for GameMode {
    type Err = UnknownGameMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|m| m.string_id() == s)
            .copied()
            .ok_or_else(|| UnknownGameMode(s.to_string()))
    }
}
