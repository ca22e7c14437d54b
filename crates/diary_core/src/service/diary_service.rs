//! Whole-entry diary operations.
//!
//! # Responsibility
//! - Mirror the store's published day list for UI reads.
//! - Dispatch update/remove/remove-all by entry kind.

use crate::model::day::{DiaryDay, DiaryEntry, DiaryEntryType};
use crate::store::{DiaryObserver, DiaryStore, StoreResult, SubscriptionId};
use std::sync::{Arc, Mutex, PoisonError};

/// Façade over a diary store for list screens.
pub struct DiaryService<S: DiaryStore + ?Sized> {
    store: Arc<S>,
    days: Arc<Mutex<Arc<Vec<DiaryDay>>>>,
    subscription: SubscriptionId,
}

impl<S: DiaryStore + ?Sized> DiaryService<S> {
    /// Creates the façade and starts mirroring the store's projection.
    pub fn new(store: Arc<S>) -> Self {
        let days = Arc::new(Mutex::new(Arc::new(Vec::new())));
        let mirror = Arc::clone(&days);
        let subscription = store.subscribe(Box::new(move |published: &[DiaryDay]| {
            *mirror.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(published.to_vec());
        }));

        Self {
            store,
            days,
            subscription,
        }
    }

    /// Latest day list, newest first.
    pub fn diary_days(&self) -> Arc<Vec<DiaryDay>> {
        Arc::clone(&self.days.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Forwards a UI observer to the store.
    pub fn subscribe(&self, observer: DiaryObserver) -> SubscriptionId {
        self.store.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    /// Renames the entry's person or location to `entry.name()`.
    pub fn update(&self, entry: &DiaryEntry) -> StoreResult<()> {
        match entry {
            DiaryEntry::Location(location) => {
                self.store.update_location(location.id, location.name.as_str())
            }
            DiaryEntry::ContactPerson(person) => self
                .store
                .update_contact_person(person.id, person.name.as_str()),
        }
    }

    /// Removes the entry's person or location. Its encounters/visits stay.
    pub fn remove(&self, entry: &DiaryEntry) -> StoreResult<()> {
        match entry {
            DiaryEntry::Location(location) => self.store.remove_location(location.id),
            DiaryEntry::ContactPerson(person) => self.store.remove_contact_person(person.id),
        }
    }

    pub fn remove_all(&self, entry_type: DiaryEntryType) -> StoreResult<()> {
        match entry_type {
            DiaryEntryType::Location => self.store.remove_all_locations(),
            DiaryEntryType::ContactPerson => self.store.remove_all_contact_persons(),
        }
    }
}

impl<S: DiaryStore + ?Sized> Drop for DiaryService<S> {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}
