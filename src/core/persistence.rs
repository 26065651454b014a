//! Persistence bridge - one JSON list per entity category
//!
//! A [`ListStore`] only moves strings by key. Typed loading goes through the
//! date decode chain in [`crate::core::dates`], so lists written by older
//! versions with numeric dates still load.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::dates::{decode_json, DateStrategy, DecodeError};
use crate::core::entity::Entity;
use crate::core::inventory::Inventory;
use crate::core::ledger::Ledger;
use crate::core::quota::{LifetimeCounters, QuotaGate};
use crate::entities::{
    AccountingEntry, Borrow, Equipment, Loan, MyRental, Person, Rental, Repair, StorageLocation,
    Worksite,
};

/// Key under which the lifetime quota counters are stored
pub const QUOTA_KEY: &str = "quota_counters";

#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    #[diagnostic(code(materiel::persistence::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON encoding failed: {0}")]
    #[diagnostic(code(materiel::persistence::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not read list '{key}'")]
    #[diagnostic(
        code(materiel::persistence::decode),
        help("The file may be corrupted; restore it from an export")
    )]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },
}

/// Keyed string storage for entity lists
pub trait ListStore: Send + Sync {
    /// Raw content stored under `key`, if any
    fn load_raw(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn save_raw(&self, key: &str, content: &str) -> Result<(), PersistenceError>;

    /// Load a typed list; a missing key is an empty list
    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, PersistenceError>
    where
        Self: Sized,
    {
        self.load_value(key).map(Option::unwrap_or_default)
    }

    fn save_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), PersistenceError>
    where
        Self: Sized,
    {
        self.save_value(key, &items)
    }

    /// Load any JSON value through the date decode chain
    fn load_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PersistenceError>
    where
        Self: Sized,
    {
        let Some(content) = self.load_raw(key)? else {
            return Ok(None);
        };
        let (value, strategy) = decode_json::<T>(&content).map_err(|source| {
            PersistenceError::Decode {
                key: key.to_string(),
                source,
            }
        })?;
        if strategy != DateStrategy::Iso8601 {
            info!(key, %strategy, "list read with legacy date encoding");
        }
        Ok(Some(value))
    }

    fn save_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PersistenceError>
    where
        Self: Sized,
    {
        let content = serde_json::to_string_pretty(value)?;
        self.save_raw(key, &content)
    }
}

/// One `<key>.json` file per list in a directory
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    /// Open (and create if needed) a data directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| PersistenceError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl ListStore for JsonDirStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| PersistenceError::Io { path, source })
    }

    /// Written to a temporary file first, then renamed over the target
    fn save_raw(&self, key: &str, content: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        let tmp = self.root.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, content).map_err(|source| PersistenceError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = content.len(), "list written");
        Ok(())
    }
}

/// In-memory store, counting writes
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    lists: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, content: impl Into<String>) {
        self.inner.lock().lists.insert(key.to_string(), content.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().lists.get(key).cloned()
    }

    /// Number of `save_raw` calls so far
    pub fn writes(&self) -> usize {
        self.inner.lock().writes
    }
}

impl ListStore for MemoryStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.get(key))
    }

    fn save_raw(&self, key: &str, content: &str) -> Result<(), PersistenceError> {
        let mut inner = self.inner.lock();
        inner.lists.insert(key.to_string(), content.to_string());
        inner.writes += 1;
        Ok(())
    }
}

/// Owned copy of everything that is persisted
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub version: u64,
    pub equipment: Vec<Equipment>,
    pub persons: Vec<Person>,
    pub storage_locations: Vec<StorageLocation>,
    pub worksites: Vec<Worksite>,
    pub loans: Vec<Loan>,
    pub borrows: Vec<Borrow>,
    pub rentals: Vec<Rental>,
    pub my_rentals: Vec<MyRental>,
    pub repairs: Vec<Repair>,
    pub accounting: Vec<AccountingEntry>,
    pub counters: LifetimeCounters,
}

impl Snapshot {
    /// Write every list and the quota counters
    pub fn save<S: ListStore>(&self, store: &S) -> Result<(), PersistenceError> {
        store.save_list(Equipment::LIST_KEY, &self.equipment)?;
        store.save_list(Person::LIST_KEY, &self.persons)?;
        store.save_list(StorageLocation::LIST_KEY, &self.storage_locations)?;
        store.save_list(Worksite::LIST_KEY, &self.worksites)?;
        store.save_list(Loan::LIST_KEY, &self.loans)?;
        store.save_list(Borrow::LIST_KEY, &self.borrows)?;
        store.save_list(Rental::LIST_KEY, &self.rentals)?;
        store.save_list(MyRental::LIST_KEY, &self.my_rentals)?;
        store.save_list(Repair::LIST_KEY, &self.repairs)?;
        store.save_list(AccountingEntry::LIST_KEY, &self.accounting)?;
        store.save_value(QUOTA_KEY, &self.counters)?;
        info!(version = self.version, "inventory saved");
        Ok(())
    }
}

impl Inventory {
    /// Load every list from `store`
    ///
    /// Stored counters replace the ones in `quota`; zero counters are then
    /// seeded from the loaded data.
    pub fn load<S: ListStore>(store: &S, quota: QuotaGate) -> Result<Self, PersistenceError> {
        let counters: LifetimeCounters = store.load_value(QUOTA_KEY)?.unwrap_or_default();
        let mut inventory = Inventory::new(quota.with_counters(counters));
        inventory.equipment = store.load_list(Equipment::LIST_KEY)?;
        inventory.persons = store.load_list(Person::LIST_KEY)?;
        inventory.storage_locations = store.load_list(StorageLocation::LIST_KEY)?;
        inventory.worksites = store.load_list(Worksite::LIST_KEY)?;
        inventory.loans = store.load_list(Loan::LIST_KEY)?;
        inventory.borrows = store.load_list(Borrow::LIST_KEY)?;
        inventory.rentals = store.load_list(Rental::LIST_KEY)?;
        inventory.my_rentals = store.load_list(MyRental::LIST_KEY)?;
        inventory.repairs = store.load_list(Repair::LIST_KEY)?;
        inventory.ledger = Ledger::from_entries(store.load_list(AccountingEntry::LIST_KEY)?);
        inventory.reconcile_quota();
        debug!(
            equipment = inventory.equipment.len(),
            persons = inventory.persons.len(),
            "inventory loaded"
        );
        Ok(inventory)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version(),
            equipment: self.equipment.clone(),
            persons: self.persons.clone(),
            storage_locations: self.storage_locations.clone(),
            worksites: self.worksites.clone(),
            loans: self.loans.clone(),
            borrows: self.borrows.clone(),
            rentals: self.rentals.clone(),
            my_rentals: self.my_rentals.clone(),
            repairs: self.repairs.clone(),
            accounting: self.ledger.all().to_vec(),
            counters: self.quota.counters().clone(),
        }
    }

    pub fn save<S: ListStore>(&self, store: &S) -> Result<(), PersistenceError> {
        self.snapshot().save(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quota::{QuotaCategory, QuotaLimits};
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_roundtrip_keeps_counters() {
        let store = MemoryStore::new();
        let mut inv = Inventory::new(QuotaGate::new(false, QuotaLimits::default()));
        let now = Utc::now();
        let eq = inv.add_equipment(Equipment::new("Mixer", "Concrete")).unwrap();
        let gone = inv.add_equipment(Equipment::new("Old", "Concrete")).unwrap();
        let p = inv.add_person(Person::new("Ana", "Lima")).unwrap();
        inv.create_loan(&eq, &p, now, now + Duration::days(1)).unwrap();
        inv.delete_equipment(&gone).unwrap();
        inv.save(&store).unwrap();

        let loaded = Inventory::load(&store, QuotaGate::new(false, QuotaLimits::default())).unwrap();
        assert_eq!(loaded.equipment().len(), 1);
        assert_eq!(loaded.loans().len(), 1);
        assert_eq!(loaded.quota().lifetime(QuotaCategory::Equipment), 2);
        assert_eq!(loaded.get_loan(&loaded.loans()[0].id).unwrap().person_id, p);
    }

    #[test]
    fn test_load_seeds_counters_for_existing_data() {
        let store = MemoryStore::new();
        let mut inv = Inventory::new(QuotaGate::unlimited());
        inv.add_person(Person::new("Ana", "Lima")).unwrap();
        inv.add_person(Person::new("Luc", "Roux")).unwrap();
        store
            .save_list(Person::LIST_KEY, inv.persons())
            .unwrap();

        let loaded = Inventory::load(&store, QuotaGate::new(false, QuotaLimits::default())).unwrap();
        assert_eq!(loaded.quota().lifetime(QuotaCategory::Person), 2);
    }

    #[test]
    fn test_load_legacy_epoch_dates() {
        let store = MemoryStore::new();
        let id = crate::core::identity::EntityId::new(crate::core::identity::EntityPrefix::Sto);
        store.insert(
            StorageLocation::LIST_KEY,
            format!(r#"[{{"id":"{}","name":"Shed","created":1700000000}}]"#, id),
        );
        let locations: Vec<StorageLocation> = store.load_list(StorageLocation::LIST_KEY).unwrap();
        assert_eq!(locations[0].created.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_corrupt_list_is_reported() {
        let store = MemoryStore::new();
        store.insert(Equipment::LIST_KEY, "{not json");
        let err = Inventory::load(&store, QuotaGate::unlimited()).unwrap_err();
        assert!(matches!(err, PersistenceError::Decode { ref key, .. } if key == "equipment"));
    }

    #[test]
    fn test_json_dir_store_writes_atomically() {
        let dir = tempdir().unwrap();
        let store = JsonDirStore::open(dir.path().join("data")).unwrap();
        store.save_raw("persons", "[]").unwrap();
        assert!(store.path_for("persons").exists());
        assert!(!dir.path().join("data").join(".persons.json.tmp").exists());
        assert_eq!(store.load_raw("persons").unwrap().as_deref(), Some("[]"));
        assert_eq!(store.load_raw("missing").unwrap(), None);
    }
}
