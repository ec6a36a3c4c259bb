use serde::{Deserialize, Serialize};

/// How a user turn is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// One request with the raw query
    #[default]
    Direct,
    /// Split into sub-queries answered in sequence
    Decompose,
}

impl ResponseMode {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Decompose
        } else {
            Self::Direct
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            Self::Direct => Self::Decompose,
            Self::Decompose => Self::Direct,
        }
    }

    pub fn is_decompose(&self) -> bool {
        matches!(self, Self::Decompose)
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Direct => "Direct",
            Self::Decompose => "Smart Split",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Direct => "Sends your message to the model as is",
            Self::Decompose => "Breaks complex questions into parts answered in order",
        }
    }

    /// Parse mode from a command argument
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "on" | "true" | "split" | "decompose" | "smart" => Some(Self::Decompose),
            "off" | "false" | "direct" => Some(Self::Direct),
            _ => None,
        }
    }

    pub fn to_str(&self) -> &str {
        match self {
            Self::Direct => "direct",
            Self::Decompose => "decompose",
        }
    }
}
