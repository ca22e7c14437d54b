//! Day-projection algorithm shared by all diary stores.
//!
//! # Responsibility
//! - Build the full window of diary days from stored entities.
//!
//! # Invariants
//! - The window always holds `DIARY_WINDOW_DAYS` distinct dates, newest first,
//!   ending at the anchor day.
//! - Within a day, persons come first (store order), then locations.
//! - When several join records match one (entity, date) pair, the first one
//!   in store order wins.

use crate::model::date::DiaryDate;
use crate::model::day::{DiaryContactPerson, DiaryDay, DiaryEntry, DiaryLocation};
use crate::model::entity::{
    ContactPerson, ContactPersonEncounter, ContactPersonId, EncounterId, Location, LocationId,
    LocationVisit, VisitId,
};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

/// Number of days covered by every published projection.
pub const DIARY_WINDOW_DAYS: u32 = 15;

/// Returns the window dates for `today`, newest first.
pub fn window_dates(today: NaiveDate) -> Vec<DiaryDate> {
    (0..DIARY_WINDOW_DAYS)
        .map(|offset| DiaryDate::new(today - Duration::days(i64::from(offset))))
        .collect()
}

/// Rebuilds the whole projection.
///
/// `encounter_for` / `visit_for` resolve the selection id of one entity on one
/// date; stores choose a linear scan or an index.
pub fn project_diary_days<E, V>(
    today: NaiveDate,
    contact_persons: &[ContactPerson],
    locations: &[Location],
    mut encounter_for: E,
    mut visit_for: V,
) -> Vec<DiaryDay>
where
    E: FnMut(ContactPersonId, DiaryDate) -> Option<EncounterId>,
    V: FnMut(LocationId, DiaryDate) -> Option<VisitId>,
{
    window_dates(today)
        .into_iter()
        .map(|date| {
            let person_entries = contact_persons.iter().map(|person| {
                DiaryEntry::ContactPerson(DiaryContactPerson {
                    id: person.id,
                    name: person.name.clone(),
                    encounter_id: encounter_for(person.id, date),
                })
            });
            let mut entries: Vec<DiaryEntry> = person_entries.collect();
            entries.extend(locations.iter().map(|location| {
                DiaryEntry::Location(DiaryLocation {
                    id: location.id,
                    name: location.name.clone(),
                    visit_id: visit_for(location.id, date),
                })
            }));
            DiaryDay::new(date, entries)
        })
        .collect()
}

/// `(entity id, date) -> first join record id` lookup table.
#[derive(Debug, Default)]
pub struct JoinIndex {
    entries: HashMap<(i64, DiaryDate), i64>,
}

impl JoinIndex {
    pub fn from_encounters(encounters: &[ContactPersonEncounter]) -> Self {
        Self::build(
            encounters
                .iter()
                .map(|encounter| (encounter.contact_person_id, encounter.date, encounter.id)),
        )
    }

    pub fn from_visits(visits: &[LocationVisit]) -> Self {
        Self::build(
            visits
                .iter()
                .map(|visit| (visit.location_id, visit.date, visit.id)),
        )
    }

    /// Records must arrive in store order so the first match is kept.
    fn build(records: impl Iterator<Item = (i64, DiaryDate, i64)>) -> Self {
        let mut entries = HashMap::new();
        for (entity_id, date, record_id) in records {
            entries.entry((entity_id, date)).or_insert(record_id);
        }
        Self { entries }
    }

    pub fn get(&self, entity_id: i64, date: DiaryDate) -> Option<i64> {
        self.entries.get(&(entity_id, date)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::{project_diary_days, window_dates, JoinIndex, DIARY_WINDOW_DAYS};
    use crate::model::date::DiaryDate;
    use crate::model::entity::{ContactPerson, LocationVisit};
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn window_spans_fifteen_days_newest_first_across_month_boundary() {
        let dates = window_dates(today());
        assert_eq!(dates.len(), DIARY_WINDOW_DAYS as usize);
        assert_eq!(dates[0].to_string(), "2024-03-01");
        assert_eq!(dates[1].to_string(), "2024-02-29");
        assert_eq!(dates[14].to_string(), "2024-02-16");
        assert!(dates.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn join_index_keeps_first_record_per_pair() {
        let date = DiaryDate::new(today());
        let visits = vec![
            LocationVisit {
                id: 3,
                date,
                location_id: 1,
            },
            LocationVisit {
                id: 7,
                date,
                location_id: 1,
            },
        ];
        let index = JoinIndex::from_visits(&visits);
        assert_eq!(index.get(1, date), Some(3));
        assert_eq!(index.get(2, date), None);
    }

    #[test]
    fn projection_lists_persons_before_locations() {
        let persons = vec![ContactPerson {
            id: 0,
            name: "Alice".to_string(),
        }];
        let locations = vec![crate::model::entity::Location {
            id: 0,
            name: "Park".to_string(),
        }];
        let days = project_diary_days(today(), &persons, &locations, |_, _| None, |_, _| None);

        assert_eq!(days.len(), 15);
        for day in &days {
            assert_eq!(day.entries.len(), 2);
            assert_eq!(day.entries[0].name(), "Alice");
            assert_eq!(day.entries[1].name(), "Park");
        }
    }
}
