//! Priority levels for queued requests

use serde::{Deserialize, Serialize};

/// Urgency of a request. Higher values are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    pub const MIN: Priority = Priority(u8::MIN);
    pub const MAX: Priority = Priority(u8::MAX);

    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    pub const fn level(self) -> u8 {
        self.0
    }
}

impl From<u8> for Priority {
    fn from(level: u8) -> Self {
        Self(level)
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map(Self)
            .map_err(|_| format!("Unknown priority: {}", s))
    }
}
