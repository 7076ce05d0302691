//! Identifier newtypes.
//!
//! Each identifier is a non-empty string without whitespace, shared by
//! reference count so cloning into branch-local journey state stays cheap.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Error returned when parsing an invalid identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id: {reason}")]
pub struct InvalidId {
    kind: &'static str,
    reason: &'static str,
}

fn validate(kind: &'static str, s: &str) -> Result<(), InvalidId> {
    if s.is_empty() {
        return Err(InvalidId {
            kind,
            reason: "must not be empty",
        });
    }
    if s.chars().any(char::is_whitespace) {
        return Err(InvalidId {
            kind,
            reason: "must not contain whitespace",
        });
    }
    Ok(())
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Parse an identifier, rejecting empty strings and whitespace.
            pub fn parse(s: &str) -> Result<Self, InvalidId> {
                validate($kind, s)?;
                Ok(Self(Arc::from(s)))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }
    };
}

define_id!(
    /// A station (stop) in the network.
    StationId,
    "station"
);
define_id!(
    /// A named route, the unit the interchange matrix works with.
    RouteId,
    "route"
);
define_id!(
    /// A service: a calendar plus the trips that run on it.
    ServiceId,
    "service"
);
define_id!(
    /// A single vehicle run along a route.
    TripId,
    "trip"
);
define_id!(
    /// A group of stations treated as one location (e.g. a city centre).
    StationGroupId,
    "station group"
);
define_id!(
    /// A platform within a station.
    PlatformId,
    "platform"
);

/// Any location a query can start or finish at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocationId {
    Station(StationId),
    Group(StationGroupId),
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationId::Station(id) => write!(f, "station {id}"),
            LocationId::Group(id) => write!(f, "group {id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid() {
        let id = StationId::parse("9400ZZMAALT").unwrap();
        assert_eq!(id.as_str(), "9400ZZMAALT");
        assert_eq!(id.to_string(), "9400ZZMAALT");
        assert_eq!(format!("{id:?}"), "StationId(9400ZZMAALT)");
    }

    #[test]
    fn parse_rejects_empty_and_whitespace() {
        let err = RouteId::parse("").unwrap_err();
        assert_eq!(err.to_string(), "invalid route id: must not be empty");

        let err = TripId::parse("trip 1").unwrap_err();
        assert_eq!(err.to_string(), "invalid trip id: must not contain whitespace");
    }

    #[test]
    fn clones_compare_equal() {
        let a = ServiceId::parse("svc").unwrap();
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a, ServiceId::parse("svc").unwrap());
    }

    #[test]
    fn location_display() {
        let station = LocationId::Station(StationId::parse("ALT").unwrap());
        assert_eq!(station.to_string(), "station ALT");
        let group = LocationId::Group(StationGroupId::parse("CENTRE").unwrap());
        assert_eq!(group.to_string(), "group CENTRE");
    }
}
