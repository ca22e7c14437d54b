//! In-memory diary store.
//!
//! # Responsibility
//! - Reference `DiaryStore` implementation backed by plain vectors.
//!
//! # Invariants
//! - All collections live in one `DiaryTables` aggregate behind one mutex.
//! - The tables mutex covers id assignment and recompute only; it is released
//!   before observers run, so observers may read the store.
//! - `publish_order` is held from mutation to the end of delivery, so
//!   projections reach observers in mutation order.
//! - Ids follow `max(existing) + 1` (0 when empty) but never fall below the
//!   collection's high-water mark, so removed ids are not handed out again.

use crate::model::date::{Clock, DiaryDate, SystemClock};
use crate::model::entity::{
    ContactPerson, ContactPersonEncounter, ContactPersonId, EncounterId, Location, LocationId,
    LocationVisit, VisitId,
};
use crate::model::day::DiaryDay;
use crate::store::projection::project_diary_days;
use crate::store::publisher::DiaryDaysPublisher;
use crate::store::{DiaryStore, StoreResult};
use chrono::NaiveDate;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct IdSequence {
    next: i64,
}

impl IdSequence {
    fn assign(&mut self, existing: impl Iterator<Item = i64>) -> i64 {
        let from_existing = existing.max().map_or(0, |max| max + 1);
        let id = from_existing.max(self.next);
        self.next = id + 1;
        id
    }
}

#[derive(Debug, Default)]
struct DiaryTables {
    contact_persons: Vec<ContactPerson>,
    locations: Vec<Location>,
    contact_person_encounters: Vec<ContactPersonEncounter>,
    location_visits: Vec<LocationVisit>,
    contact_person_ids: IdSequence,
    location_ids: IdSequence,
    encounter_ids: IdSequence,
    visit_ids: IdSequence,
}

/// Diary store keeping everything in process memory.
pub struct MemoryDiaryStore {
    tables: Mutex<DiaryTables>,
    publish_order: Mutex<()>,
    clock: Arc<dyn Clock>,
    publisher: DiaryDaysPublisher,
}

impl MemoryDiaryStore {
    /// Creates an empty store anchored on the device's local calendar.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store and publishes its initial (empty-entry) window.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let store = Self {
            tables: Mutex::new(DiaryTables::default()),
            publish_order: Mutex::new(()),
            clock,
            publisher: DiaryDaysPublisher::new(),
        };
        store.republish();
        store
    }

    fn lock_tables(&self) -> MutexGuard<'_, DiaryTables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_publish_order(&self) -> MutexGuard<'_, ()> {
        self.publish_order
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one mutation and publishes the recomputed projection.
    fn mutate<T>(&self, op: &'static str, apply: impl FnOnce(&mut DiaryTables) -> T) -> T {
        let _order = self.lock_publish_order();
        let (result, days) = {
            let mut tables = self.lock_tables();
            let result = apply(&mut tables);
            (result, self.project(&tables))
        };
        debug!("event=store_mutation module=memory_store status=ok op={op}");
        self.publisher.publish(days);
        result
    }

    fn republish(&self) {
        let _order = self.lock_publish_order();
        let days = self.project(&self.lock_tables());
        self.publisher.publish(days);
    }

    fn project(&self, tables: &DiaryTables) -> Vec<DiaryDay> {
        project_diary_days(
            self.clock.today(),
            &tables.contact_persons,
            &tables.locations,
            |person_id, date| {
                tables
                    .contact_person_encounters
                    .iter()
                    .find(|encounter| {
                        encounter.contact_person_id == person_id && encounter.date == date
                    })
                    .map(|encounter| encounter.id)
            },
            |location_id, date| {
                tables
                    .location_visits
                    .iter()
                    .find(|visit| visit.location_id == location_id && visit.date == date)
                    .map(|visit| visit.id)
            },
        )
    }
}

impl Default for MemoryDiaryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DiaryStore for MemoryDiaryStore {
    fn add_contact_person(&self, name: &str) -> StoreResult<ContactPersonId> {
        Ok(self.mutate("add_contact_person", |tables| {
            let id = tables
                .contact_person_ids
                .assign(tables.contact_persons.iter().map(|person| person.id));
            tables.contact_persons.push(ContactPerson {
                id,
                name: name.to_string(),
            });
            id
        }))
    }

    fn add_location(&self, name: &str) -> StoreResult<LocationId> {
        Ok(self.mutate("add_location", |tables| {
            let id = tables
                .location_ids
                .assign(tables.locations.iter().map(|location| location.id));
            tables.locations.push(Location {
                id,
                name: name.to_string(),
            });
            id
        }))
    }

    fn add_contact_person_encounter(
        &self,
        contact_person_id: ContactPersonId,
        date: DiaryDate,
    ) -> StoreResult<EncounterId> {
        Ok(self.mutate("add_contact_person_encounter", |tables| {
            let id = tables.encounter_ids.assign(
                tables
                    .contact_person_encounters
                    .iter()
                    .map(|encounter| encounter.id),
            );
            tables
                .contact_person_encounters
                .push(ContactPersonEncounter {
                    id,
                    date,
                    contact_person_id,
                });
            id
        }))
    }

    fn add_location_visit(
        &self,
        location_id: LocationId,
        date: DiaryDate,
    ) -> StoreResult<VisitId> {
        Ok(self.mutate("add_location_visit", |tables| {
            let id = tables
                .visit_ids
                .assign(tables.location_visits.iter().map(|visit| visit.id));
            tables.location_visits.push(LocationVisit {
                id,
                date,
                location_id,
            });
            id
        }))
    }

    fn update_contact_person(&self, id: ContactPersonId, name: &str) -> StoreResult<()> {
        self.mutate("update_contact_person", |tables| {
            if let Some(person) = tables.contact_persons.iter_mut().find(|p| p.id == id) {
                person.name = name.to_string();
            }
        });
        Ok(())
    }

    fn update_location(&self, id: LocationId, name: &str) -> StoreResult<()> {
        self.mutate("update_location", |tables| {
            if let Some(location) = tables.locations.iter_mut().find(|l| l.id == id) {
                location.name = name.to_string();
            }
        });
        Ok(())
    }

    fn remove_contact_person(&self, id: ContactPersonId) -> StoreResult<()> {
        self.mutate("remove_contact_person", |tables| {
            tables.contact_persons.retain(|person| person.id != id);
        });
        Ok(())
    }

    fn remove_location(&self, id: LocationId) -> StoreResult<()> {
        self.mutate("remove_location", |tables| {
            tables.locations.retain(|location| location.id != id);
        });
        Ok(())
    }

    fn remove_contact_person_encounter(&self, id: EncounterId) -> StoreResult<()> {
        self.mutate("remove_contact_person_encounter", |tables| {
            tables
                .contact_person_encounters
                .retain(|encounter| encounter.id != id);
        });
        Ok(())
    }

    fn remove_location_visit(&self, id: VisitId) -> StoreResult<()> {
        self.mutate("remove_location_visit", |tables| {
            tables.location_visits.retain(|visit| visit.id != id);
        });
        Ok(())
    }

    fn remove_all_contact_persons(&self) -> StoreResult<()> {
        self.mutate("remove_all_contact_persons", |tables| {
            tables.contact_persons.clear();
        });
        Ok(())
    }

    fn remove_all_locations(&self) -> StoreResult<()> {
        self.mutate("remove_all_locations", |tables| {
            tables.locations.clear();
        });
        Ok(())
    }

    fn contact_persons(&self) -> StoreResult<Vec<ContactPerson>> {
        Ok(self.lock_tables().contact_persons.clone())
    }

    fn locations(&self) -> StoreResult<Vec<Location>> {
        Ok(self.lock_tables().locations.clone())
    }

    fn contact_person_encounters(&self) -> StoreResult<Vec<ContactPersonEncounter>> {
        Ok(self.lock_tables().contact_person_encounters.clone())
    }

    fn location_visits(&self) -> StoreResult<Vec<LocationVisit>> {
        Ok(self.lock_tables().location_visits.clone())
    }

    fn refresh(&self) -> StoreResult<()> {
        self.republish();
        Ok(())
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn publisher(&self) -> &DiaryDaysPublisher {
        &self.publisher
    }
}

#[cfg(test)]
mod tests {
    use super::IdSequence;

    #[test]
    fn id_sequence_starts_at_zero_and_follows_max() {
        let mut sequence = IdSequence::default();
        assert_eq!(sequence.assign(std::iter::empty()), 0);
        assert_eq!(sequence.assign([0, 5].into_iter()), 6);
    }

    #[test]
    fn id_sequence_does_not_reuse_removed_max() {
        let mut sequence = IdSequence::default();
        assert_eq!(sequence.assign(std::iter::empty()), 0);
        assert_eq!(sequence.assign([0].into_iter()), 1);
        // id 1 was removed again
        assert_eq!(sequence.assign([0].into_iter()), 2);
    }
}
