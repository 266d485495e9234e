//! Snapshot versions

use crate::error::CommonError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Semantic snapshot version, rendered as `vMAJOR.MINOR.PATCH`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Which component to increment when suggesting the next version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBump {
    Major,
    Minor,
    Patch,
}

impl SnapshotVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn bump(self, bump: VersionBump) -> Self {
        match bump {
            VersionBump::Major => Self::new(self.major + 1, 0, 0),
            VersionBump::Minor => Self::new(self.major, self.minor + 1, 0),
            VersionBump::Patch => Self::new(self.major, self.minor, self.patch + 1),
        }
    }
}

impl std::fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SnapshotVersion {
    type Err = CommonError;

    /// Accepts `v1.2.3` and `1.2.3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CommonError::InvalidVersion(s.to_string());
        let digits = s.strip_prefix('v').unwrap_or(s);

        let mut parts = digits.split('.');
        let mut next = || -> Result<u32, CommonError> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };

        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl FromStr for VersionBump {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "major" => Ok(VersionBump::Major),
            "minor" => Ok(VersionBump::Minor),
            "patch" => Ok(VersionBump::Patch),
            _ => Err(CommonError::unknown_variant("version bump", s)),
        }
    }
}

impl Serialize for SnapshotVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SnapshotVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
