//! Core module - the inventory aggregate and the machinery around it

pub mod autosave;
pub mod config;
pub mod dates;
pub mod dedup;
pub mod entity;
pub mod identity;
pub mod inventory;
pub mod ledger;
pub mod linkage;
pub mod persistence;
pub mod quota;
pub mod shortid;
pub mod status;
pub mod transfer;

pub use autosave::{Session, SessionError};
pub use config::{Config, ConfigError};
pub use dedup::{DuplicateGroup, MergeOutcome};
pub use entity::{Entity, Lifecycle};
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use inventory::{Inventory, InventoryError, InventoryResult};
pub use ledger::{Ledger, LedgerPeriod, LedgerSummary};
pub use linkage::{LinkState, OwnerRef};
pub use persistence::{JsonDirStore, ListStore, MemoryStore, PersistenceError};
pub use quota::{QuotaCategory, QuotaGate, QuotaLimits};
pub use shortid::ShortIdIndex;
pub use status::EquipmentStatus;
pub use transfer::{ExportDocument, ImportReport, TransferError};
