//! Entity identity - prefixed ULID identifiers
//!
//! Every record carries an id of the form `PREFIX-ULID` (e.g. `MAT-01HQ5V2K...`).
//! Ids are generated once and never reused.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Entity type prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityPrefix {
    /// Equipment (owned or shadow)
    Mat,
    /// Person
    Per,
    /// Storage location
    Sto,
    /// Worksite
    Site,
    /// Loan of equipment to a person
    Loan,
    /// Object borrowed from a person
    Brw,
    /// Rental of equipment to a renter
    Rent,
    /// Incoming rental (equipment rented from an agency)
    Rin,
    /// Repair
    Rep,
    /// Accounting entry
    Acc,
}

impl EntityPrefix {
    /// All known prefixes
    pub fn all() -> &'static [EntityPrefix] {
        &[
            EntityPrefix::Mat,
            EntityPrefix::Per,
            EntityPrefix::Sto,
            EntityPrefix::Site,
            EntityPrefix::Loan,
            EntityPrefix::Brw,
            EntityPrefix::Rent,
            EntityPrefix::Rin,
            EntityPrefix::Rep,
            EntityPrefix::Acc,
        ]
    }

    /// Prefix as it appears in ids
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Mat => "MAT",
            EntityPrefix::Per => "PER",
            EntityPrefix::Sto => "STO",
            EntityPrefix::Site => "SITE",
            EntityPrefix::Loan => "LOAN",
            EntityPrefix::Brw => "BRW",
            EntityPrefix::Rent => "RENT",
            EntityPrefix::Rin => "RIN",
            EntityPrefix::Rep => "REP",
            EntityPrefix::Acc => "ACC",
        }
    }
}

impl fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityPrefix {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityPrefix::all()
            .iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| IdParseError::UnknownPrefix(s.to_string()))
    }
}

impl Serialize for EntityPrefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntityPrefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors produced when parsing an entity id
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("Missing '-' separator in id: {0}")]
    MissingSeparator(String),

    #[error("Unknown entity prefix: {0}")]
    UnknownPrefix(String),

    #[error("Invalid ULID '{0}'")]
    InvalidUlid(String),
}

/// Unique entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    prefix: EntityPrefix,
    ulid: Ulid,
}

impl EntityId {
    /// Generate a fresh id for the given entity type
    pub fn new(prefix: EntityPrefix) -> Self {
        Self {
            prefix,
            ulid: Ulid::new(),
        }
    }

    pub fn prefix(&self) -> EntityPrefix {
        self.prefix
    }

    pub fn ulid(&self) -> Ulid {
        self.ulid
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.ulid)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, ulid) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingSeparator(s.to_string()))?;
        let prefix = prefix.parse()?;
        let ulid = Ulid::from_string(ulid).map_err(|_| IdParseError::InvalidUlid(ulid.to_string()))?;
        Ok(Self { prefix, ulid })
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_parse() {
        let id = EntityId::new(EntityPrefix::Mat);
        let s = id.to_string();
        assert!(s.starts_with("MAT-"));
        assert_eq!(s.len(), 4 + 26);

        let parsed: EntityId = s.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_multi_char_prefix() {
        let id = EntityId::new(EntityPrefix::Site);
        let parsed: EntityId = id.to_string().parse().unwrap();
        assert_eq!(parsed.prefix(), EntityPrefix::Site);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "MAT01ABC".parse::<EntityId>(),
            Err(IdParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            "XYZ-01HQ5V2KRMJ0B9XYZ3NTWPGQ4E".parse::<EntityId>(),
            Err(IdParseError::UnknownPrefix(_))
        ));
        assert!(matches!(
            "MAT-notaulid".parse::<EntityId>(),
            Err(IdParseError::InvalidUlid(_))
        ));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = EntityId::new(EntityPrefix::Loan);
        let b = EntityId::new(EntityPrefix::Loan);
        assert_ne!(a, b);
    }

    #[test]
    fn test_serde_as_string() {
        let id = EntityId::new(EntityPrefix::Per);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
