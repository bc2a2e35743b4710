//! SOCD (simultaneous opposing cardinal direction) vocabulary

use crate::bindings::Binding;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolution policy for a simultaneous-opposing-direction conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocdType {
    Unspecified,
    Neutral,
    SecondInput,
    SecondInputNoReactivation,
    Direction1Priority,
    Direction2Priority,
}

impl SocdType {
    pub const ALL: [SocdType; 6] = [
        SocdType::Unspecified,
        SocdType::Neutral,
        SocdType::SecondInput,
        SocdType::SecondInputNoReactivation,
        SocdType::Direction1Priority,
        SocdType::Direction2Priority,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            SocdType::Unspecified => "Unspecified",
            SocdType::Neutral => "Neutral",
            SocdType::SecondInput => "Second Input",
            SocdType::SecondInputNoReactivation => "Second Input (No Reactivation)",
            SocdType::Direction1Priority => "Direction 1 Priority",
            SocdType::Direction2Priority => "Direction 2 Priority",
        }
    }

    /// Stable snake_case identifier, matching the serde form
    pub fn string_id(&self) -> &'static str {
        match self {
            SocdType::Unspecified => "unspecified",
            SocdType::Neutral => "neutral",
            SocdType::SecondInput => "second_input",
            SocdType::SecondInputNoReactivation => "second_input_no_reactivation",
            SocdType::Direction1Priority => "direction1_priority",
            SocdType::Direction2Priority => "direction2_priority",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown SOCD type {0:?}")]
pub struct UnknownSocdType(pub String);

impl std::str::FromStr for SocdType {
    type Err = UnknownSocdType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.string_id() == s)
            .copied()
            .ok_or_else(|| UnknownSocdType(s.to_string()))
    }
}

impl fmt::Display for SocdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Declares `a` and `b` as an opposing pair, resolved per `kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocdPair {
    pub a: Binding,
    pub b: Binding,
    #[serde(rename = "type")]
    pub kind: SocdType,
}

impl SocdPair {
    /// Whether either side of the pair carries this binding
    pub fn references(&self, binding: Binding) -> bool {
        self.a == binding || self.b == binding
    }
}
