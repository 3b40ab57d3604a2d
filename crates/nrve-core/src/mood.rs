//! Mood check-in: a weather label mapped to a scripted acknowledgment.

use std::fmt;

use crate::error::{NrveError, NrveResult};

pub const FALLBACK_ACK: &str = "Thank you for sharing how you're feeling. I'm here to listen.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Sunny,
    Cloudy,
    Rainy,
    Stormy,
}

impl Mood {
    pub fn acknowledgment(self) -> &'static str {
        match self {
            Self::Sunny => "That's wonderful! I'm glad you're feeling bright and positive today. What's contributing to this sunny mood?",
            Self::Cloudy => "I understand. Sometimes we have those overcast days. What's on your mind that might be creating those clouds?",
            Self::Rainy => "I hear you. Rainy days can be tough. Would you like to talk about what's bringing on the rain?",
            Self::Stormy => "I'm here with you through the storm. What's feeling particularly challenging right now?",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sunny => write!(f, "sunny"),
            Self::Cloudy => write!(f, "cloudy"),
            Self::Rainy => write!(f, "rainy"),
            Self::Stormy => write!(f, "stormy"),
        }
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sunny" => Ok(Self::Sunny),
            "cloudy" => Ok(Self::Cloudy),
            "rainy" => Ok(Self::Rainy),
            "stormy" => Ok(Self::Stormy),
            _ => Err(format!("unknown mood: {s}")),
        }
    }
}

/// Acknowledge a mood check-in. Unknown labels get the generic reply.
pub fn respond_to_mood(label: &str) -> NrveResult<&'static str> {
    if label.trim().is_empty() {
        return Err(NrveError::Validation("mood required".into()));
    }
    Ok(label
        .parse::<Mood>()
        .map(Mood::acknowledgment)
        .unwrap_or(FALLBACK_ACK))
}
