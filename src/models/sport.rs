use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sports the catalogue knows about. Selects the market taxonomy for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Football,
    Basketball,
    Tennis,
    Cricket,
    Rugby,
    Hockey,
    Volleyball,
    Baseball,
    AmericanFootball,
    Boxing,
    MixedMartialArts,
}

impl Sport {
    pub const ALL: [Sport; 11] = [
        Sport::Football,
        Sport::Basketball,
        Sport::Tennis,
        Sport::Cricket,
        Sport::Rugby,
        Sport::Hockey,
        Sport::Volleyball,
        Sport::Baseball,
        Sport::AmericanFootball,
        Sport::Boxing,
        Sport::MixedMartialArts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Football => "football",
            Sport::Basketball => "basketball",
            Sport::Tennis => "tennis",
            Sport::Cricket => "cricket",
            Sport::Rugby => "rugby",
            Sport::Hockey => "hockey",
            Sport::Volleyball => "volleyball",
            Sport::Baseball => "baseball",
            Sport::AmericanFootball => "american_football",
            Sport::Boxing => "boxing",
            Sport::MixedMartialArts => "mixed_martial_arts",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a sport name is not one of [`Sport::ALL`]
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown sport: {0}")]
pub struct UnknownSport(pub String);

impl FromStr for Sport {
    type Err = UnknownSport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Sport::ALL
            .into_iter()
            .find(|sport| sport.as_str() == wanted)
            .ok_or_else(|| UnknownSport(s.to_string()))
    }
}
