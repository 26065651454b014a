//! Entity trait - common interface for all entity types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};

/// Common trait for all stored records
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// The entity type prefix
    const PREFIX: EntityPrefix;

    /// Storage key of the list holding this entity type
    const LIST_KEY: &'static str;

    /// Get the entity's unique ID
    fn id(&self) -> &EntityId;

    /// Human-readable label used in listings and ledger descriptions
    fn title(&self) -> String;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;
}

/// Records with an open/closed lifecycle (loans, borrows, rentals, repairs)
pub trait Lifecycle {
    /// When the record was closed (returned, completed), if it was
    fn closed_at(&self) -> Option<DateTime<Utc>>;

    /// An open record has no closing timestamp
    fn is_open(&self) -> bool {
        self.closed_at().is_none()
    }
}

/// Find a record by id in a slice
pub fn find<'a, T: Entity>(items: &'a [T], id: &EntityId) -> Option<&'a T> {
    items.iter().find(|item| item.id() == id)
}

/// Find a record by id in a slice, mutably
pub fn find_mut<'a, T: Entity>(items: &'a mut [T], id: &EntityId) -> Option<&'a mut T> {
    items.iter_mut().find(|item| item.id() == id)
}
