//! Export and import of the whole inventory as one JSON document
//!
//! Import is an ordered list of decode attempts: the wrapped document first,
//! then a bare array of equipment as written by the first versions, each under
//! every date strategy. The first attempt that decodes wins. Merging happens
//! only after a successful decode, in dependency order, skipping ids that
//! already exist.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::dates::{decode_json, DateStrategy};
use crate::core::entity::{find, Entity};
use crate::core::inventory::Inventory;
use crate::entities::{
    AccountingEntry, Borrow, Equipment, Loan, MyRental, Person, Rental, Repair, StorageLocation,
    Worksite,
};

#[derive(Debug, Error, Diagnostic)]
pub enum TransferError {
    #[error("Import file could not be decoded")]
    #[diagnostic(
        code(materiel::transfer::decode),
        help("Expected an export document or a JSON array of equipment")
    )]
    Decode { attempts: Vec<String> },

    #[error("Export encoding failed: {0}")]
    #[diagnostic(code(materiel::transfer::json))]
    Json(#[from] serde_json::Error),
}

/// Document written by export; every list is optional on import
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_locations: Option<Vec<StorageLocation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worksites: Option<Vec<Worksite>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persons: Option<Vec<Person>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Vec<Equipment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loans: Option<Vec<Loan>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrows: Option<Vec<Borrow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rentals: Option<Vec<Rental>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_rentals: Option<Vec<MyRental>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repairs: Option<Vec<Repair>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounting: Option<Vec<AccountingEntry>>,
    #[serde(
        default,
        with = "crate::core::dates::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

/// Layout an import file was recognised as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportShape {
    Document,
    LegacyEquipmentArray,
}

impl ImportShape {
    /// Decode attempts, in order
    pub const ATTEMPTS: [ImportShape; 2] = [ImportShape::Document, ImportShape::LegacyEquipmentArray];

    fn decode(&self, content: &str) -> Result<(ExportDocument, DateStrategy), Vec<String>> {
        match self {
            ImportShape::Document => decode_json::<ExportDocument>(content)
                .map_err(|e| e.attempts),
            ImportShape::LegacyEquipmentArray => decode_json::<Vec<Equipment>>(content)
                .map(|(equipment, strategy)| {
                    let document = ExportDocument {
                        equipment: Some(equipment),
                        ..Default::default()
                    };
                    (document, strategy)
                })
                .map_err(|e| e.attempts),
        }
    }
}

impl std::fmt::Display for ImportShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportShape::Document => write!(f, "document"),
            ImportShape::LegacyEquipmentArray => write!(f, "legacy equipment array"),
        }
    }
}

/// Counts for one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeCount {
    pub added: usize,
    pub skipped: usize,
}

/// What an import did
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub shape: ImportShape,
    #[serde(serialize_with = "serialize_strategy")]
    pub strategy: DateStrategy,
    pub counts: BTreeMap<&'static str, MergeCount>,
}

fn serialize_strategy<S: serde::Serializer>(
    strategy: &DateStrategy,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(strategy)
}

impl ImportReport {
    pub fn added(&self) -> usize {
        self.counts.values().map(|c| c.added).sum()
    }

    pub fn skipped(&self) -> usize {
        self.counts.values().map(|c| c.skipped).sum()
    }
}

/// Decode an import file, trying each known layout in order
pub fn decode_import(content: &str) -> Result<(ExportDocument, ImportShape, DateStrategy), TransferError> {
    let mut attempts = Vec::new();
    for shape in ImportShape::ATTEMPTS {
        match shape.decode(content) {
            Ok((document, strategy)) => return Ok((document, shape, strategy)),
            Err(errors) => attempts.extend(errors.into_iter().map(|e| format!("{}: {}", shape, e))),
        }
    }
    warn!(attempts = attempts.len(), "import file not recognised");
    Err(TransferError::Decode { attempts })
}

fn merge_by_id<T: Entity>(target: &mut Vec<T>, incoming: Option<Vec<T>>) -> MergeCount {
    let mut count = MergeCount::default();
    for item in incoming.unwrap_or_default() {
        if find(target, item.id()).is_some() {
            count.skipped += 1;
        } else {
            target.push(item);
            count.added += 1;
        }
    }
    count
}

impl Inventory {
    /// Full export document
    pub fn export_document(&self) -> ExportDocument {
        ExportDocument {
            storage_locations: Some(self.storage_locations.clone()),
            worksites: Some(self.worksites.clone()),
            persons: Some(self.persons.clone()),
            equipment: Some(self.equipment.clone()),
            loans: Some(self.loans.clone()),
            borrows: Some(self.borrows.clone()),
            rentals: Some(self.rentals.clone()),
            my_rentals: Some(self.my_rentals.clone()),
            repairs: Some(self.repairs.clone()),
            accounting: Some(self.ledger.all().to_vec()),
            exported_at: Some(Utc::now()),
            app_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }
    }

    pub fn export_json(&self) -> Result<String, TransferError> {
        Ok(serde_json::to_string_pretty(&self.export_document())?)
    }

    /// Merge a decoded document, referenced records before referencing ones
    ///
    /// Existing ids are kept as they are. Imported records do not consume
    /// creation quota.
    pub fn merge_document(&mut self, document: ExportDocument) -> BTreeMap<&'static str, MergeCount> {
        let mut counts = BTreeMap::new();
        counts.insert(
            StorageLocation::LIST_KEY,
            merge_by_id(&mut self.storage_locations, document.storage_locations),
        );
        counts.insert(
            Worksite::LIST_KEY,
            merge_by_id(&mut self.worksites, document.worksites),
        );
        counts.insert(Person::LIST_KEY, merge_by_id(&mut self.persons, document.persons));
        counts.insert(
            Equipment::LIST_KEY,
            merge_by_id(&mut self.equipment, document.equipment),
        );
        counts.insert(Loan::LIST_KEY, merge_by_id(&mut self.loans, document.loans));
        counts.insert(Borrow::LIST_KEY, merge_by_id(&mut self.borrows, document.borrows));
        counts.insert(Rental::LIST_KEY, merge_by_id(&mut self.rentals, document.rentals));
        counts.insert(
            MyRental::LIST_KEY,
            merge_by_id(&mut self.my_rentals, document.my_rentals),
        );
        counts.insert(Repair::LIST_KEY, merge_by_id(&mut self.repairs, document.repairs));

        let mut accounting = MergeCount::default();
        for entry in document.accounting.unwrap_or_default() {
            if self.ledger.push(entry) {
                accounting.added += 1;
            } else {
                accounting.skipped += 1;
            }
        }
        counts.insert(AccountingEntry::LIST_KEY, accounting);

        if counts.values().any(|c| c.added > 0) {
            self.touch();
        }
        counts
    }

    /// Decode and merge an import file; nothing changes if decoding fails
    pub fn import_json(&mut self, content: &str) -> Result<ImportReport, TransferError> {
        let (document, shape, strategy) = decode_import(content)?;
        let counts = self.merge_document(document);
        let report = ImportReport {
            shape,
            strategy,
            counts,
        };
        info!(
            %shape,
            %strategy,
            added = report.added(),
            skipped = report.skipped(),
            "import finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quota::{QuotaCategory, QuotaGate, QuotaLimits};
    use chrono::Duration;

    fn populated() -> Inventory {
        let mut inv = Inventory::new(QuotaGate::unlimited());
        let now = Utc::now();
        let shed = inv.add_storage_location(StorageLocation::new("Shed")).unwrap();
        let mut eq = Equipment::new("Mixer", "Concrete");
        eq.storage_location_id = Some(shed);
        let eq = inv.add_equipment(eq).unwrap();
        let p = inv.add_person(Person::new("Ana", "Lima")).unwrap();
        inv.create_loan(&eq, &p, now, now + Duration::days(1)).unwrap();
        inv.add_borrow(Borrow::new("Ladder", p, now)).unwrap();
        inv
    }

    #[test]
    fn test_export_then_import_into_empty() {
        let source = populated();
        let json = source.export_json().unwrap();

        let mut target = Inventory::new(QuotaGate::new(false, QuotaLimits::uniform(0)));
        let report = target.import_json(&json).unwrap();

        assert_eq!(report.shape, ImportShape::Document);
        assert_eq!(report.strategy, DateStrategy::Iso8601);
        assert_eq!(report.added(), 5);
        assert_eq!(target.equipment().len(), 1);
        assert_eq!(target.loans().len(), 1);
        assert_eq!(target.loans()[0].id, source.loans()[0].id);
        // Quota is not consumed by imports
        assert_eq!(target.quota().lifetime(QuotaCategory::Equipment), 0);
    }

    #[test]
    fn test_import_twice_is_idempotent() {
        let source = populated();
        let json = source.export_json().unwrap();
        let mut target = Inventory::new(QuotaGate::unlimited());
        target.import_json(&json).unwrap();
        let version = target.version();

        let report = target.import_json(&json).unwrap();
        assert_eq!(report.added(), 0);
        assert_eq!(report.skipped(), 5);
        assert_eq!(target.persons().len(), 1);
        assert_eq!(target.version(), version);
    }

    #[test]
    fn test_existing_records_win() {
        let source = populated();
        let mut doc = source.export_document();
        let mut renamed = source.persons()[0].clone();
        renamed.first_name = "Changed".into();
        doc.persons = Some(vec![renamed]);

        let mut target = populated();
        target.persons = source.persons.clone();
        target.merge_document(doc);
        assert_eq!(target.persons()[0].first_name, "Ana");
    }

    #[test]
    fn test_legacy_equipment_array() {
        let id = crate::core::identity::EntityId::new(crate::core::identity::EntityPrefix::Mat);
        let json = format!(
            r#"[{{"id":"{}","name":"Old drill","category":"Tools","created":1600000000}}]"#,
            id
        );
        let mut inv = Inventory::new(QuotaGate::unlimited());
        let report = inv.import_json(&json).unwrap();
        assert_eq!(report.shape, ImportShape::LegacyEquipmentArray);
        assert_eq!(report.strategy, DateStrategy::EpochSeconds);
        assert_eq!(inv.get_equipment(&id).unwrap().name, "Old drill");
    }

    #[test]
    fn test_mixed_date_encodings_rejected() {
        let id = crate::core::identity::EntityId::new(crate::core::identity::EntityPrefix::Sto);
        let json = format!(
            r#"{{"storage_locations":[{{"id":"{}","name":"Depot","created":0}}],"exported_at":"2024-01-01"}}"#,
            id
        );
        // Mixed encodings fail under a single strategy
        assert!(decode_import(&json).is_err());

        let json = format!(
            r#"{{"storage_locations":[{{"id":"{}","name":"Depot","created":0.5}}]}}"#,
            id
        );
        let (doc, _, strategy) = decode_import(&json).unwrap();
        assert_eq!(strategy, DateStrategy::EpochSeconds);
        assert_eq!(doc.storage_locations.unwrap().len(), 1);
    }

    #[test]
    fn test_garbage_leaves_inventory_untouched() {
        let mut inv = populated();
        let version = inv.version();
        let err = inv.import_json("not json at all").unwrap_err();
        match err {
            TransferError::Decode { attempts } => assert_eq!(attempts.len(), 6),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(inv.version(), version);
        assert_eq!(inv.equipment().len(), 1);
    }
}
