// ============================================================
// Layer 3 — Training Modes
// ============================================================
// Two binary switches fixed when the model is built:
//
//   FineTuneMode  — is the shared encoder trained or frozen?
//   EncodingMode  — do paired tasks encode one sentence or both?
//
// Both parse from the same strings used on the command line,
// so an unknown value fails before any model is constructed.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::error::ModeParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FineTuneMode {
    /// Encoder parameters are frozen; only the task heads learn
    LastLinearLayer,
    /// Encoder and heads are all updated
    FullModel,
}

impl FineTuneMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FineTuneMode::LastLinearLayer => "last-linear-layer",
            FineTuneMode::FullModel       => "full-model",
        }
    }

    pub fn encoder_trainable(self) -> bool {
        matches!(self, FineTuneMode::FullModel)
    }
}

impl FromStr for FineTuneMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last-linear-layer" => Ok(FineTuneMode::LastLinearLayer),
            "full-model"        => Ok(FineTuneMode::FullModel),
            other => Err(ModeParseError::FineTune(other.to_string())),
        }
    }
}

impl fmt::Display for FineTuneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncodingMode {
    /// Paired tasks encode only the first sentence.
    /// Predictions do not depend on the second sentence at all.
    Single,
    /// Paired tasks encode both sentences through the shared
    /// encoder and concatenate the pooled vectors.
    Dual,
}

impl EncodingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EncodingMode::Single => "single",
            EncodingMode::Dual   => "dual",
        }
    }

    /// How many pooled vectors feed a paired task's head
    pub fn pooled_inputs(self) -> usize {
        match self {
            EncodingMode::Single => 1,
            EncodingMode::Dual   => 2,
        }
    }
}

impl FromStr for EncodingMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(EncodingMode::Single),
            "dual"   => Ok(EncodingMode::Dual),
            other => Err(ModeParseError::Encoding(other.to_string())),
        }
    }
}

impl fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
