//! Equipment entity type - owned items and shadow stand-ins for external objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// Category given to a shadow record created from a borrow
pub const SHADOW_CATEGORY_BORROWED: &str = "Borrowed";

/// Category given to a shadow record created from an incoming rental
pub const SHADOW_CATEGORY_RENTED: &str = "Rented";

/// A piece of equipment
///
/// Shadow records (created to stand in for a borrowed or rented-in object) are
/// stored exactly like owned equipment. They are recognised only by the
/// borrow or incoming rental holding their id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    /// Unique identifier
    pub id: EntityId,

    /// Display name
    pub name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Category (e.g. "Power tools")
    #[serde(default)]
    pub category: String,

    /// Where the item is stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location_id: Option<EntityId>,

    /// Acquisition date
    #[serde(
        default,
        with = "crate::core::dates::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub acquired: Option<DateTime<Utc>>,

    /// Monetary value
    #[serde(default)]
    pub value: f64,

    /// Photo bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,

    /// Invoice scan bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Creation timestamp
    #[serde(with = "crate::core::dates")]
    pub created: DateTime<Utc>,
}

impl Entity for Equipment {
    const PREFIX: EntityPrefix = EntityPrefix::Mat;
    const LIST_KEY: &'static str = "equipment";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl Equipment {
    /// Create a new equipment record
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Mat),
            name: name.into(),
            description: String::new(),
            category: category.into(),
            storage_location_id: None,
            acquired: None,
            value: 0.0,
            image: None,
            invoice: None,
            notes: None,
            created: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equipment_creation() {
        let eq = Equipment::new("Drill", "Power tools");
        assert!(eq.id.to_string().starts_with("MAT-"));
        assert_eq!(eq.title(), "Drill");
        assert!(eq.storage_location_id.is_none());
    }

    #[test]
    fn test_equipment_optional_fields_omitted() {
        let eq = Equipment::new("Ladder", "Access");
        let json = serde_json::to_string(&eq).unwrap();
        assert!(!json.contains("image"));
        assert!(!json.contains("storage_location_id"));
    }
}
