//! Logical offset boundaries.

use std::fmt;
use std::str::FromStr;

use crate::error::KafkaTypesError;

/// Which end of a partition's log to resolve when an offset is out of range.
///
/// The string forms `"smallest"` and `"largest"` are the ones used in
/// consumer configuration (`auto.offset.reset`-style settings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetMarker {
    /// The earliest offset still retained by the broker
    Smallest,
    /// The offset that the next produced record will receive
    Largest,
}

impl OffsetMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smallest => "smallest",
            Self::Largest => "largest",
        }
    }
}

impl fmt::Display for OffsetMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OffsetMarker {
    type Err = KafkaTypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smallest" => Ok(Self::Smallest),
            "largest" => Ok(Self::Largest),
            other => Err(KafkaTypesError::InvalidOffsetMarker(other.to_string())),
        }
    }
}
