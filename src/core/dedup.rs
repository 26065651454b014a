//! Duplicate person detection and merging, plus orphan handling

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::info;

use crate::core::entity::find_mut;
use crate::core::identity::EntityId;
use crate::core::inventory::{not_found, Inventory, InventoryError, InventoryResult};
use crate::entities::{Borrow, Loan, Person, PersonRole};

/// Persons sharing the same normalized name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// `surname_firstname`, lowercased
    pub key: String,
    /// Members in insertion order
    pub person_ids: Vec<EntityId>,
}

/// Result of a merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub survivor: EntityId,
    pub removed: Vec<EntityId>,
    /// Foreign keys rewritten to the survivor
    pub repointed: usize,
}

impl Inventory {
    /// Groups of two or more persons with the same normalized name, by surname
    pub fn find_duplicate_groups(&self) -> Vec<DuplicateGroup> {
        let mut by_key: BTreeMap<String, Vec<&Person>> = BTreeMap::new();
        for person in &self.persons {
            let key = person.dedup_key();
            if key == "_" {
                continue;
            }
            by_key.entry(key).or_default().push(person);
        }

        let mut groups: Vec<(String, DuplicateGroup)> = by_key
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(key, members)| {
                let surname = members[0].surname.trim().to_lowercase();
                let group = DuplicateGroup {
                    key,
                    person_ids: members.iter().map(|p| p.id).collect(),
                };
                (surname, group)
            })
            .collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));
        groups.into_iter().map(|(_, group)| group).collect()
    }

    /// Merge persons into the most complete one
    ///
    /// The survivor is the member with the best completeness score, earliest in
    /// `ids` on ties. Its empty fields are filled from the other members, best
    /// score first. Every reference to a removed member is rewritten to the
    /// survivor. Nothing is changed if any id is unknown.
    pub fn merge_persons(&mut self, ids: &[EntityId]) -> InventoryResult<MergeOutcome> {
        let mut seen = HashSet::new();
        let ids: Vec<EntityId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if ids.len() < 2 {
            return Err(InventoryError::InvalidMerge(
                "at least two distinct persons are needed".to_string(),
            ));
        }

        let members = ids
            .iter()
            .map(|id| self.get_person(id).cloned())
            .collect::<InventoryResult<Vec<Person>>>()?;

        let mut best = 0;
        for (index, member) in members.iter().enumerate() {
            if member.completeness_score() > members[best].completeness_score() {
                best = index;
            }
        }

        let mut donors: Vec<&Person> = members
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != best)
            .map(|(_, p)| p)
            .collect();
        // Stable: equal scores keep the given order
        donors.sort_by(|a, b| b.completeness_score().cmp(&a.completeness_score()));

        let mut survivor = members[best].clone();
        for donor in &donors {
            back_fill(&mut survivor, donor);
        }
        let survivor_id = survivor.id;
        let removed: Vec<EntityId> = donors.iter().map(|p| p.id).collect();

        // Mutation starts here; every lookup above has succeeded
        let mut repointed = 0;
        let mut repoint = |slot: &mut EntityId| {
            if removed.contains(slot) {
                *slot = survivor_id;
                repointed += 1;
            }
        };
        for loan in &mut self.loans {
            repoint(&mut loan.person_id);
        }
        for borrow in &mut self.borrows {
            repoint(&mut borrow.lender_id);
        }
        for rental in &mut self.rentals {
            repoint(&mut rental.renter_id);
        }
        for rental in &mut self.my_rentals {
            repoint(&mut rental.agency_id);
        }
        for repair in &mut self.repairs {
            if let Some(repairer) = &mut repair.repairer_id {
                repoint(repairer);
            }
        }
        for worksite in &mut self.worksites {
            if let Some(contact) = &mut worksite.contact_person_id {
                repoint(contact);
            }
        }

        if let Some(slot) = find_mut(&mut self.persons, &survivor_id) {
            *slot = survivor;
        }
        self.persons.retain(|p| !removed.contains(&p.id));

        info!(survivor = %survivor_id, removed = removed.len(), repointed, "persons merged");
        self.touch();
        Ok(MergeOutcome {
            survivor: survivor_id,
            removed,
            repointed,
        })
    }

    // =========================================================================
    // Orphans
    // =========================================================================

    /// Loans whose person no longer exists
    pub fn orphaned_loans(&self) -> Vec<&Loan> {
        self.loans
            .iter()
            .filter(|l| self.get_person(&l.person_id).is_err())
            .collect()
    }

    /// Borrows whose lender no longer exists
    pub fn orphaned_borrows(&self) -> Vec<&Borrow> {
        self.borrows
            .iter()
            .filter(|b| self.get_person(&b.lender_id).is_err())
            .collect()
    }

    pub fn reassign_loan(&mut self, loan_id: &EntityId, person_id: &EntityId) -> InventoryResult<()> {
        self.get_person(person_id)?;
        let loan = find_mut(&mut self.loans, loan_id).ok_or_else(|| not_found("Loan", loan_id))?;
        loan.person_id = *person_id;
        info!(loan = %loan_id, person = %person_id, "loan reassigned");
        self.touch();
        Ok(())
    }

    pub fn reassign_borrow(
        &mut self,
        borrow_id: &EntityId,
        person_id: &EntityId,
    ) -> InventoryResult<()> {
        self.get_person(person_id)?;
        let borrow =
            find_mut(&mut self.borrows, borrow_id).ok_or_else(|| not_found("Borrow", borrow_id))?;
        borrow.lender_id = *person_id;
        info!(borrow = %borrow_id, person = %person_id, "borrow reassigned");
        self.touch();
        Ok(())
    }
}

fn fill(target: &mut String, source: &str) {
    if target.trim().is_empty() && !source.trim().is_empty() {
        *target = source.to_string();
    }
}

fn back_fill(survivor: &mut Person, donor: &Person) {
    fill(&mut survivor.email, &donor.email);
    fill(&mut survivor.phone, &donor.phone);
    fill(&mut survivor.organization, &donor.organization);
    fill(&mut survivor.address, &donor.address);
    fill(&mut survivor.notes, &donor.notes);
    if survivor.role == PersonRole::Unassigned {
        survivor.role = donor.role.clone();
    }
    if survivor.last_contacted < donor.last_contacted {
        survivor.last_contacted = donor.last_contacted;
    }
}
