//! Single-day diary operations.
//!
//! # Responsibility
//! - Track one day of the projection across publishes.
//! - Select, deselect and add entries for that day.
//!
//! # Invariants
//! - The held day is replaced only by a published day with the same date
//!   string; when the date leaves the window the last value is kept and the
//!   service reports itself expired.
//! - `deselect` of an unselected entry never touches the store.

use crate::model::date::DiaryDate;
use crate::model::day::{DiaryDay, DiaryEntry, NewDiaryEntry};
use crate::store::{DiaryStore, StoreResult, SubscriptionId};
use log::warn;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct TrackedDay {
    day: DiaryDay,
    expired: bool,
}

/// Façade scoped to one `DiaryDay`.
pub struct DiaryDayService<S: DiaryStore + ?Sized> {
    store: Arc<S>,
    tracked: Arc<Mutex<TrackedDay>>,
    subscription: SubscriptionId,
}

impl<S: DiaryStore + ?Sized> DiaryDayService<S> {
    /// Starts tracking `day`; it is refreshed on every store publish.
    pub fn new(store: Arc<S>, day: DiaryDay) -> Self {
        let tracked = Arc::new(Mutex::new(TrackedDay {
            day,
            expired: false,
        }));
        let sink = Arc::clone(&tracked);
        let subscription = store.subscribe(Box::new(move |days: &[DiaryDay]| {
            let mut tracked = lock(&sink);
            match days
                .iter()
                .find(|candidate| candidate.date_string == tracked.day.date_string)
            {
                Some(fresh) => {
                    tracked.day = fresh.clone();
                    tracked.expired = false;
                }
                None => tracked.expired = true,
            }
        }));

        Self {
            store,
            tracked,
            subscription,
        }
    }

    /// Latest known state of the tracked day.
    pub fn day(&self) -> DiaryDay {
        lock(&self.tracked).day.clone()
    }

    /// `true` once the tracked date has dropped out of the published window.
    pub fn is_expired(&self) -> bool {
        lock(&self.tracked).expired
    }

    /// Records a visit/encounter for the entry on this day.
    pub fn select(&self, entry: &DiaryEntry) -> StoreResult<()> {
        let date = self.day_date();
        match entry {
            DiaryEntry::Location(location) => {
                self.store.add_location_visit(location.id, date)?;
            }
            DiaryEntry::ContactPerson(person) => {
                self.store.add_contact_person_encounter(person.id, date)?;
            }
        }
        Ok(())
    }

    /// Removes the entry's visit/encounter. Unselected entries are a logged no-op.
    pub fn deselect(&self, entry: &DiaryEntry) -> StoreResult<()> {
        match entry {
            DiaryEntry::Location(location) => match location.visit_id {
                Some(visit_id) => self.store.remove_location_visit(visit_id),
                None => {
                    warn!(
                        "event=deselect module=diary_day_service status=skipped reason=no_visit_id location_id={}",
                        location.id
                    );
                    Ok(())
                }
            },
            DiaryEntry::ContactPerson(person) => match person.encounter_id {
                Some(encounter_id) => self.store.remove_contact_person_encounter(encounter_id),
                None => {
                    warn!(
                        "event=deselect module=diary_day_service status=skipped reason=no_encounter_id contact_person_id={}",
                        person.id
                    );
                    Ok(())
                }
            },
        }
    }

    /// Creates a person/location and selects it for this day.
    ///
    /// Returns the new entity id. Publishes twice: once per store call.
    pub fn add(&self, new_entry: &NewDiaryEntry) -> StoreResult<i64> {
        let date = self.day_date();
        match new_entry {
            NewDiaryEntry::Location { name } => {
                let id = self.store.add_location(name.as_str())?;
                self.store.add_location_visit(id, date)?;
                Ok(id)
            }
            NewDiaryEntry::ContactPerson { name } => {
                let id = self.store.add_contact_person(name.as_str())?;
                self.store.add_contact_person_encounter(id, date)?;
                Ok(id)
            }
        }
    }

    /// Parses the tracked date, falling back to the store's today.
    fn day_date(&self) -> DiaryDate {
        let date_string = lock(&self.tracked).day.date_string.clone();
        match DiaryDate::parse(date_string.as_str()) {
            Ok(date) => date,
            Err(err) => {
                let today = DiaryDate::new(self.store.today());
                warn!(
                    "event=day_date module=diary_day_service status=fallback fallback={today} error={err}"
                );
                today
            }
        }
    }
}

impl<S: DiaryStore + ?Sized> Drop for DiaryDayService<S> {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

fn lock(tracked: &Mutex<TrackedDay>) -> MutexGuard<'_, TrackedDay> {
    tracked.lock().unwrap_or_else(PoisonError::into_inner)
}
