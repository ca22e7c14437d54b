//! Stored diary entities.
//!
//! # Responsibility
//! - Define the four record kinds owned by a diary store.
//!
//! # Invariants
//! - Encounters and visits are immutable once created.
//! - A join record's referenced id is not guaranteed to exist; deleting a
//!   person or location leaves its join records in place.

use crate::model::date::DiaryDate;
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a contact person.
pub type ContactPersonId = i64;
/// Store-assigned identifier of a location.
pub type LocationId = i64;
/// Store-assigned identifier of a contact person encounter.
pub type EncounterId = i64;
/// Store-assigned identifier of a location visit.
pub type VisitId = i64;

/// A person the user may have been in contact with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPerson {
    pub id: ContactPersonId,
    pub name: String,
}

/// A place the user may have visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
}

/// "I was near this person on this day."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPersonEncounter {
    pub id: EncounterId,
    pub date: DiaryDate,
    pub contact_person_id: ContactPersonId,
}

/// "I was at this place on this day."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationVisit {
    pub id: VisitId,
    pub date: DiaryDate,
    pub location_id: LocationId,
}
