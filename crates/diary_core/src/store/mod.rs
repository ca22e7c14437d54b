//! Diary store contract and implementations.
//!
//! # Responsibility
//! - Own the four diary collections behind one serialization boundary.
//! - Recompute and publish the day projection after every mutation.
//!
//! # Invariants
//! - Every mutating call publishes exactly one full projection, even when it
//!   turns out to be a no-op (unknown id).
//! - Unknown ids in update/remove calls are silent no-ops, never errors.
//! - Join records are not validated against their person/location and are
//!   not cascaded on delete.

use crate::db::DbError;
use crate::model::date::DiaryDate;
use crate::model::day::DiaryDay;
use crate::model::entity::{
    ContactPerson, ContactPersonEncounter, ContactPersonId, EncounterId, Location, LocationId,
    LocationVisit, VisitId,
};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod memory;
pub mod projection;
pub mod publisher;
pub mod sqlite;

pub use publisher::{DiaryDaysPublisher, DiaryObserver, SubscriptionId};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a store backend. The in-memory store never produces one.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted diary data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage capability used by the diary façades.
pub trait DiaryStore: Send + Sync {
    fn add_contact_person(&self, name: &str) -> StoreResult<ContactPersonId>;
    fn add_location(&self, name: &str) -> StoreResult<LocationId>;
    fn add_contact_person_encounter(
        &self,
        contact_person_id: ContactPersonId,
        date: DiaryDate,
    ) -> StoreResult<EncounterId>;
    fn add_location_visit(&self, location_id: LocationId, date: DiaryDate)
        -> StoreResult<VisitId>;

    fn update_contact_person(&self, id: ContactPersonId, name: &str) -> StoreResult<()>;
    fn update_location(&self, id: LocationId, name: &str) -> StoreResult<()>;

    fn remove_contact_person(&self, id: ContactPersonId) -> StoreResult<()>;
    fn remove_location(&self, id: LocationId) -> StoreResult<()>;
    fn remove_contact_person_encounter(&self, id: EncounterId) -> StoreResult<()>;
    fn remove_location_visit(&self, id: VisitId) -> StoreResult<()>;
    fn remove_all_contact_persons(&self) -> StoreResult<()>;
    fn remove_all_locations(&self) -> StoreResult<()>;

    fn contact_persons(&self) -> StoreResult<Vec<ContactPerson>>;
    fn locations(&self) -> StoreResult<Vec<Location>>;
    fn contact_person_encounters(&self) -> StoreResult<Vec<ContactPersonEncounter>>;
    fn location_visits(&self) -> StoreResult<Vec<LocationVisit>>;

    /// Recomputes and publishes without mutating, e.g. after midnight.
    fn refresh(&self) -> StoreResult<()>;

    /// Local calendar day anchoring the projection window.
    fn today(&self) -> NaiveDate;

    fn publisher(&self) -> &DiaryDaysPublisher;

    /// Latest published projection.
    fn diary_days(&self) -> Arc<Vec<DiaryDay>> {
        self.publisher().current()
    }

    /// Registers an observer; it receives the current projection immediately.
    fn subscribe(&self, observer: DiaryObserver) -> SubscriptionId {
        self.publisher().subscribe(observer)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.publisher().unsubscribe(id)
    }
}
