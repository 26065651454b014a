//! Person entity type - clients, mechanics, employees and rental agencies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// What a person is to the business
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersonRole {
    #[default]
    Unassigned,
    Client,
    Mechanic,
    /// Employee, optionally assigned to a worksite
    Employee {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worksite_id: Option<EntityId>,
    },
    RentalAgency,
}

impl std::fmt::Display for PersonRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersonRole::Unassigned => write!(f, "unassigned"),
            PersonRole::Client => write!(f, "client"),
            PersonRole::Mechanic => write!(f, "mechanic"),
            PersonRole::Employee { .. } => write!(f, "employee"),
            PersonRole::RentalAgency => write!(f, "rental_agency"),
        }
    }
}

/// A Person entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    /// Unique identifier
    pub id: EntityId,

    /// First name
    pub first_name: String,

    /// Family name
    #[serde(default)]
    pub surname: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,

    /// Company or organization
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub organization: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    #[serde(default)]
    pub role: PersonRole,

    /// Last time this person was contacted
    #[serde(
        default,
        with = "crate::core::dates::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_contacted: Option<DateTime<Utc>>,

    /// Creation timestamp
    #[serde(with = "crate::core::dates")]
    pub created: DateTime<Utc>,
}

impl Entity for Person {
    const PREFIX: EntityPrefix = EntityPrefix::Per;
    const LIST_KEY: &'static str = "persons";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> String {
        self.full_name()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl Person {
    /// Create a new person
    pub fn new(first_name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Per),
            first_name: first_name.into(),
            surname: surname.into(),
            email: String::new(),
            phone: String::new(),
            organization: String::new(),
            address: String::new(),
            notes: String::new(),
            role: PersonRole::default(),
            last_contacted: None,
            created: Utc::now(),
        }
    }

    /// "First Last", trimmed
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.surname.trim())
            .trim()
            .to_string()
    }

    /// Worksite this person is assigned to (employees only)
    pub fn worksite_id(&self) -> Option<EntityId> {
        match &self.role {
            PersonRole::Employee { worksite_id } => *worksite_id,
            _ => None,
        }
    }

    /// Key used to detect duplicates: `surname_firstname`, lowercased and trimmed
    pub fn dedup_key(&self) -> String {
        format!(
            "{}_{}",
            self.surname.trim().to_lowercase(),
            self.first_name.trim().to_lowercase()
        )
    }

    /// How complete the contact details are (email and phone weigh more)
    pub fn completeness_score(&self) -> u32 {
        let mut score = 0;
        if !self.email.trim().is_empty() {
            score += 2;
        }
        if !self.phone.trim().is_empty() {
            score += 2;
        }
        if !self.organization.trim().is_empty() {
            score += 1;
        }
        score
    }
}
