//! Replica identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::SyncError;

/// One of the two replicas being kept in sync.
///
/// Each side writes only its own outbox and reads only its peer's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Side {
    /// Replica number 1.
    One,
    /// Replica number 2.
    Two,
}

impl Side {
    /// The other replica.
    pub fn peer(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// Numeric form used in settings files and commit messages.
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Directory name of this side's outbox inside the exchange area.
    pub fn dir_name(self) -> String {
        format!("side-{}", self.number())
    }
}

impl TryFrom<u8> for Side {
    type Error = SyncError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(SyncError::InvalidSide(other)),
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> Self {
        side.number()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "side {}", self.number())
    }
}
