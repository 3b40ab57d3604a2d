use std::fmt;

use serde::{Deserialize, Serialize};

/// Guided exercises offered next to free chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Reflection,
    Gratitude,
    Reframe,
    Grounding,
}

impl PromptKind {
    pub const ALL: [PromptKind; 4] = [
        Self::Reflection,
        Self::Gratitude,
        Self::Reframe,
        Self::Grounding,
    ];
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reflection => write!(f, "reflection"),
            Self::Gratitude => write!(f, "gratitude"),
            Self::Reframe => write!(f, "reframe"),
            Self::Grounding => write!(f, "grounding"),
        }
    }
}

impl std::str::FromStr for PromptKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reflection" => Ok(Self::Reflection),
            "gratitude" => Ok(Self::Gratitude),
            "reframe" => Ok(Self::Reframe),
            "grounding" => Ok(Self::Grounding),
            _ => Err(format!("unknown promptType: {s}")),
        }
    }
}
