//! Storage locations and worksites

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// A place where equipment is kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageLocation {
    pub id: EntityId,

    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    #[serde(with = "crate::core::dates")]
    pub created: DateTime<Utc>,
}

impl Entity for StorageLocation {
    const PREFIX: EntityPrefix = EntityPrefix::Sto;
    const LIST_KEY: &'static str = "storage_locations";

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

impl StorageLocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Sto),
            name: name.into(),
            notes: String::new(),
            created: Utc::now(),
        }
    }
}

/// Derived worksite status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorksiteStatus {
    Planned,
    Active,
    Finished,
}

impl std::fmt::Display for WorksiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorksiteStatus::Planned => write!(f, "planned"),
            WorksiteStatus::Active => write!(f, "active"),
            WorksiteStatus::Finished => write!(f, "finished"),
        }
    }
}

/// A worksite employees can be assigned to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worksite {
    pub id: EntityId,

    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,

    /// On-site contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_person_id: Option<EntityId>,

    #[serde(with = "crate::core::dates")]
    pub start: DateTime<Utc>,

    #[serde(
        default,
        with = "crate::core::dates::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<DateTime<Utc>>,

    /// Manually marked as finished
    #[serde(default)]
    pub finished: bool,

    #[serde(with = "crate::core::dates")]
    pub created: DateTime<Utc>,
}

impl Entity for Worksite {
    const PREFIX: EntityPrefix = EntityPrefix::Site;
    const LIST_KEY: &'static str = "worksites";

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

impl Worksite {
    pub fn new(name: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Site),
            name: name.into(),
            address: String::new(),
            contact_person_id: None,
            start,
            end: None,
            finished: false,
            created: Utc::now(),
        }
    }

    /// Status at `now`: the flag or a past end date finishes a site
    pub fn status_at(&self, now: DateTime<Utc>) -> WorksiteStatus {
        if self.finished || self.end.is_some_and(|end| end < now) {
            WorksiteStatus::Finished
        } else if self.start > now {
            WorksiteStatus::Planned
        } else {
            WorksiteStatus::Active
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_worksite_status() {
        let now = Utc::now();
        let mut site = Worksite::new("Riverside", now - Duration::days(3));
        assert_eq!(site.status_at(now), WorksiteStatus::Active);

        site.start = now + Duration::days(2);
        assert_eq!(site.status_at(now), WorksiteStatus::Planned);

        site.start = now - Duration::days(10);
        site.end = Some(now - Duration::days(1));
        assert_eq!(site.status_at(now), WorksiteStatus::Finished);

        site.end = None;
        site.finished = true;
        assert_eq!(site.status_at(now), WorksiteStatus::Finished);
    }
}
