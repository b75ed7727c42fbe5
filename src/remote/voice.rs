//! The closed catalogue of narration voices.
//!
//! Adding a voice means adding a variant here; every match below is
//! exhaustive, so the compiler points at each place that needs the new
//! display metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A speech-synthesis voice identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    /// Technical and balanced.
    #[default]
    Alloy,
    /// Confident and serious.
    Echo,
    /// Friendly mechanic.
    Fable,
    /// Deep technician voice.
    Onyx,
}

/// Returned by [`Voice::from_str`] for identifiers outside the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown voice '{0}' (expected one of: alloy, echo, fable, onyx)")]
pub struct UnknownVoice(pub String);

impl Voice {
    /// Every voice, in display order.
    pub const ALL: [Voice; 4] = [Voice::Alloy, Voice::Echo, Voice::Fable, Voice::Onyx];

    /// Wire identifier sent to the speech endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
        }
    }

    /// Capitalised name for UI labels.
    pub fn display_name(&self) -> &'static str {
        match self {
            Voice::Alloy => "Alloy",
            Voice::Echo => "Echo",
            Voice::Fable => "Fable",
            Voice::Onyx => "Onyx",
        }
    }

    /// Theme colour as a `#RRGGBB` string.
    pub fn color(&self) -> &'static str {
        match self {
            Voice::Alloy => "#4A90E2",
            Voice::Echo => "#00796B",
            Voice::Fable => "#F9A825",
            Voice::Onyx => "#37474F",
        }
    }

    /// Material icon name shown next to the voice.
    pub fn icon(&self) -> &'static str {
        match self {
            Voice::Alloy => "build",
            Voice::Echo => "warning",
            Voice::Fable => "local-gas-station",
            Voice::Onyx => "car-repair",
        }
    }

    /// One-line tone description.
    pub fn description(&self) -> &'static str {
        match self {
            Voice::Alloy => "Technical and balanced tone",
            Voice::Echo => "Confident and serious tone",
            Voice::Fable => "Friendly, helpful mechanic vibe",
            Voice::Onyx => "Deep, reliable technician voice",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = UnknownVoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Voice::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| UnknownVoice(s.to_string()))
    }
}
