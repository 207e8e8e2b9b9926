use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The closed set of enemy species.
///
/// Species only select a decision tree and a tuning profile; the agent state machine is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Species {
    /// Wanders and runs from the player once aware.
    PatrolFlee,
    /// Wanders, chases the player once aware and attacks in melee range.
    PatrolChaseAttack,
    /// Never moves; tracks the player with its vision cone and fires when it has a clear line.
    StationarySentinel,
}

impl Species {
    pub const ALL: [Species; 3] = [
        Species::PatrolFlee,
        Species::PatrolChaseAttack,
        Species::StationarySentinel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Species::PatrolFlee => "patrol-flee",
            Species::PatrolChaseAttack => "patrol-chase-attack",
            Species::StationarySentinel => "stationary-sentinel",
        }
    }

    pub fn is_mobile(self) -> bool {
        !matches!(self, Species::StationarySentinel)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Species {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Species::ALL
            .into_iter()
            .find(|species| species.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownSpecies(s.to_string()))
    }
}
