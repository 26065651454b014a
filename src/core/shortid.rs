//! Short ids for easier entity selection on the command line
//!
//! Every listed entity gets a stable alias `PREFIX@N` (`MAT@1`, `PER@3`),
//! numbered per prefix in the order entities were first listed. The index is
//! stored next to the entity lists under the `shortids` key.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::persistence::{ListStore, PersistenceError};

/// Storage key of the index
pub const INDEX_KEY: &str = "shortids";

/// Mapping of `PREFIX@N` aliases to entity ids
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ShortIdIndex {
    /// "MAT@1" -> full id
    entries: BTreeMap<String, EntityId>,
    /// Next number per prefix
    next_ids: BTreeMap<EntityPrefix, u32>,
    #[serde(skip)]
    reverse: HashMap<EntityId, String>,
}

impl ShortIdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index, or start empty if it is missing or unreadable
    pub fn load<S: ListStore>(store: &S) -> Self {
        match store.load_value::<ShortIdIndex>(INDEX_KEY) {
            Ok(Some(mut index)) => {
                index.reverse = index
                    .entries
                    .iter()
                    .map(|(alias, id)| (*id, alias.clone()))
                    .collect();
                index
            }
            Ok(None) => Self::new(),
            Err(e) => {
                warn!(error = %e, "short id index unreadable, starting over");
                Self::new()
            }
        }
    }

    pub fn save<S: ListStore>(&self, store: &S) -> Result<(), PersistenceError> {
        store.save_value(INDEX_KEY, self)
    }

    /// Alias of `id`, assigning the next number for its prefix if new
    pub fn add(&mut self, id: EntityId) -> String {
        if let Some(alias) = self.reverse.get(&id) {
            return alias.clone();
        }
        let next = self.next_ids.entry(id.prefix()).or_insert(1);
        let alias = format!("{}@{}", id.prefix(), next);
        *next += 1;
        self.entries.insert(alias.clone(), id);
        self.reverse.insert(id, alias.clone());
        alias
    }

    /// Register every id of a listing, in order
    pub fn extend(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        for id in ids {
            self.add(id);
        }
    }

    /// Resolve `PREFIX@N` (prefix case-insensitive) to an entity id
    pub fn resolve(&self, reference: &str) -> Option<EntityId> {
        let (prefix, number) = reference.split_once('@')?;
        let prefix: EntityPrefix = prefix.parse().ok()?;
        let number: u32 = number.parse().ok()?;
        self.entries.get(&format!("{}@{}", prefix, number)).copied()
    }

    pub fn alias_of(&self, id: &EntityId) -> Option<&str> {
        self.reverse.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether a reference looks like a short id
pub fn is_short_id(reference: &str) -> bool {
    reference
        .split_once('@')
        .is_some_and(|(prefix, n)| !prefix.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}
