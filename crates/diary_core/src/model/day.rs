//! Derived per-day projection types.
//!
//! # Responsibility
//! - Define the shape published to the UI shell after every mutation.
//! - Give the UI one uniform entry type for persons and locations.
//!
//! # Invariants
//! - An entry is selected iff it carries an encounter/visit id.
//! - Person entries always precede location entries within a day.

use crate::model::date::{DateParseError, DiaryDate};
use crate::model::entity::{ContactPersonId, EncounterId, LocationId, VisitId};
use serde::{Deserialize, Serialize};

/// A contact person as seen on one diary day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryContactPerson {
    pub id: ContactPersonId,
    pub name: String,
    /// First encounter recorded with this person on the day, if any.
    pub encounter_id: Option<EncounterId>,
}

/// A location as seen on one diary day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryLocation {
    pub id: LocationId,
    pub name: String,
    /// First visit recorded at this location on the day, if any.
    pub visit_id: Option<VisitId>,
}

/// Tag of a [`DiaryEntry`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiaryEntryType {
    ContactPerson,
    Location,
}

/// One row of a diary day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiaryEntry {
    ContactPerson(DiaryContactPerson),
    Location(DiaryLocation),
}

impl DiaryEntry {
    pub fn entry_type(&self) -> DiaryEntryType {
        match self {
            Self::ContactPerson(_) => DiaryEntryType::ContactPerson,
            Self::Location(_) => DiaryEntryType::Location,
        }
    }

    /// Entity id (person or location id, not the encounter/visit id).
    pub fn id(&self) -> i64 {
        match self {
            Self::ContactPerson(person) => person.id,
            Self::Location(location) => location.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::ContactPerson(person) => person.name.as_str(),
            Self::Location(location) => location.name.as_str(),
        }
    }

    /// Encounter or visit id linking the entity to its day.
    pub fn selection_id(&self) -> Option<i64> {
        match self {
            Self::ContactPerson(person) => person.encounter_id,
            Self::Location(location) => location.visit_id,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selection_id().is_some()
    }

    /// Returns a copy carrying `name`, keeping id and selection.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        let mut renamed = self.clone();
        match &mut renamed {
            Self::ContactPerson(person) => person.name = name.into(),
            Self::Location(location) => location.name = name.into(),
        }
        renamed
    }
}

/// Input for creating an entity from a day screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NewDiaryEntry {
    ContactPerson { name: String },
    Location { name: String },
}

impl NewDiaryEntry {
    pub fn entry_type(&self) -> DiaryEntryType {
        match self {
            Self::ContactPerson { .. } => DiaryEntryType::ContactPerson,
            Self::Location { .. } => DiaryEntryType::Location,
        }
    }
}

/// All known persons and locations with their selection state for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryDay {
    /// `YYYY-MM-DD`.
    pub date_string: String,
    pub entries: Vec<DiaryEntry>,
}

impl DiaryDay {
    pub fn new(date: DiaryDate, entries: Vec<DiaryEntry>) -> Self {
        Self {
            date_string: date.to_iso_string(),
            entries,
        }
    }

    pub fn date(&self) -> Result<DiaryDate, DateParseError> {
        DiaryDate::parse(self.date_string.as_str())
    }

    pub fn selected_entries(&self) -> impl Iterator<Item = &DiaryEntry> {
        self.entries.iter().filter(|entry| entry.is_selected())
    }
}
