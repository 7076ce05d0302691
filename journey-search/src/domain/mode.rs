//! Transport modes.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::DomainError;

/// How a leg of a journey is travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TransportMode {
    Tram,
    Bus,
    Train,
    Subway,
    Ferry,
    RailReplacementBus,
    /// Walking between a position and a station.
    Walk,
    /// Walking between two neighbouring stations.
    Connect,
}

impl TransportMode {
    /// All vehicle modes, in a stable order.
    pub const VEHICLES: [TransportMode; 6] = [
        TransportMode::Tram,
        TransportMode::Bus,
        TransportMode::Train,
        TransportMode::Subway,
        TransportMode::Ferry,
        TransportMode::RailReplacementBus,
    ];

    /// True for modes that involve boarding a scheduled vehicle.
    pub fn is_vehicle(&self) -> bool {
        !matches!(self, TransportMode::Walk | TransportMode::Connect)
    }

    /// Longest path (in graph relationships) worth exploring for this mode.
    ///
    /// Returns `None` for walking modes.
    pub fn max_path_length(&self) -> Option<usize> {
        match self {
            TransportMode::Tram => Some(400),
            TransportMode::Bus => Some(1000),
            TransportMode::Train | TransportMode::RailReplacementBus => Some(2000),
            TransportMode::Subway => Some(400),
            TransportMode::Ferry => Some(200),
            TransportMode::Walk | TransportMode::Connect => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Tram => "tram",
            TransportMode::Bus => "bus",
            TransportMode::Train => "train",
            TransportMode::Subway => "subway",
            TransportMode::Ferry => "ferry",
            TransportMode::RailReplacementBus => "rail-replacement-bus",
            TransportMode::Walk => "walk",
            TransportMode::Connect => "connect",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tram" => Ok(TransportMode::Tram),
            "bus" => Ok(TransportMode::Bus),
            "train" => Ok(TransportMode::Train),
            "subway" => Ok(TransportMode::Subway),
            "ferry" => Ok(TransportMode::Ferry),
            "rail-replacement-bus" => Ok(TransportMode::RailReplacementBus),
            "walk" => Ok(TransportMode::Walk),
            "connect" => Ok(TransportMode::Connect),
            _ => Err(DomainError::UnknownMode(s.to_string())),
        }
    }
}
