//! SQLite-backed diary store.
//!
//! # Responsibility
//! - Persist the four diary collections across app launches.
//! - Publish the same projection shape as `MemoryDiaryStore`.
//!
//! # Invariants
//! - Each mutation and its projection run in one transaction: a failed
//!   recompute rolls the write back, so callers never see `Err` for a
//!   committed change.
//! - The connection mutex is released before observers run; `publish_order`
//!   keeps deliveries in mutation order.
//! - Join rows with an unparsable date are skipped (and logged) by the
//!   projection; raw reads still report them as `InvalidData`.
//! - Ids come from `id_sequences` high-water marks combined with
//!   `MAX(id) + 1`, so they are never reused.
//! - Projection lookups use a `(entity id, date)` index over the join rows of
//!   the current window.
//!
//! # See also
//! - `db/migrations/0001_diary.sql`

use crate::db::{open_db, open_db_in_memory};
use crate::model::date::{Clock, DiaryDate, SystemClock};
use crate::model::day::DiaryDay;
use crate::model::entity::{
    ContactPerson, ContactPersonEncounter, ContactPersonId, EncounterId, Location, LocationId,
    LocationVisit, VisitId,
};
use crate::store::projection::{project_diary_days, window_dates, JoinIndex};
use crate::store::publisher::DiaryDaysPublisher;
use crate::store::{DiaryStore, StoreError, StoreResult};
use chrono::NaiveDate;
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tables with an id sequence row. Names are fixed SQL identifiers.
#[derive(Debug, Clone, Copy)]
enum DiaryTable {
    ContactPersons,
    Locations,
    ContactPersonEncounters,
    LocationVisits,
}

impl DiaryTable {
    fn name(self) -> &'static str {
        match self {
            Self::ContactPersons => "contact_persons",
            Self::Locations => "locations",
            Self::ContactPersonEncounters => "contact_person_encounters",
            Self::LocationVisits => "location_visits",
        }
    }
}

/// Diary store persisted in a SQLite database.
pub struct SqliteDiaryStore {
    conn: Mutex<Connection>,
    publish_order: Mutex<()>,
    clock: Arc<dyn Clock>,
    publisher: DiaryDaysPublisher,
}

impl SqliteDiaryStore {
    /// Opens (or creates) a diary database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_connection(open_db(path)?, Arc::new(SystemClock))
    }

    /// Opens a throwaway in-memory diary database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(open_db_in_memory()?, Arc::new(SystemClock))
    }

    /// Wraps a migrated connection and publishes the stored state.
    pub fn from_connection(conn: Connection, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            publish_order: Mutex::new(()),
            clock,
            publisher: DiaryDaysPublisher::new(),
        };
        store.refresh()?;
        Ok(store)
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_publish_order(&self) -> MutexGuard<'_, ()> {
        self.publish_order
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one write transaction with its recompute, then publishes.
    fn mutate<T>(
        &self,
        op: &'static str,
        apply: impl FnOnce(&Transaction<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let _order = self.lock_publish_order();
        let outcome = {
            let mut conn = self.lock_conn();
            self.run_in_transaction(&mut conn, apply)
        };
        match outcome {
            Ok((value, days)) => {
                debug!("event=store_mutation module=sqlite_store status=ok op={op}");
                self.publisher.publish(days);
                Ok(value)
            }
            Err(err) => {
                error!(
                    "event=store_mutation module=sqlite_store status=error op={op} error={err}"
                );
                Err(err)
            }
        }
    }

    fn run_in_transaction<T>(
        &self,
        conn: &mut Connection,
        apply: impl FnOnce(&Transaction<'_>) -> StoreResult<T>,
    ) -> StoreResult<(T, Vec<DiaryDay>)> {
        let tx = conn.transaction()?;
        let value = apply(&tx)?;
        let days = self.project(&tx)?;
        tx.commit()?;
        Ok((value, days))
    }

    fn project(&self, conn: &Connection) -> StoreResult<Vec<DiaryDay>> {
        let today = self.clock.today();
        let window = window_dates(today);
        let newest = window.first().map(DiaryDate::to_iso_string);
        let oldest = window.last().map(DiaryDate::to_iso_string);

        let persons = load_contact_persons(conn)?;
        let locations = load_locations(conn)?;
        let encounters = JoinIndex::from_encounters(&load_encounters_between(
            conn,
            oldest.as_deref(),
            newest.as_deref(),
            BadDateRows::Skip,
        )?);
        let visits = JoinIndex::from_visits(&load_visits_between(
            conn,
            oldest.as_deref(),
            newest.as_deref(),
            BadDateRows::Skip,
        )?);

        Ok(project_diary_days(
            today,
            &persons,
            &locations,
            |person_id, date| encounters.get(person_id, date),
            |location_id, date| visits.get(location_id, date),
        ))
    }
}

impl DiaryStore for SqliteDiaryStore {
    fn add_contact_person(&self, name: &str) -> StoreResult<ContactPersonId> {
        self.mutate("add_contact_person", |tx| {
            let id = next_id(tx, DiaryTable::ContactPersons)?;
            tx.execute(
                "INSERT INTO contact_persons (id, name) VALUES (?1, ?2);",
                params![id, name],
            )?;
            Ok(id)
        })
    }

    fn add_location(&self, name: &str) -> StoreResult<LocationId> {
        self.mutate("add_location", |tx| {
            let id = next_id(tx, DiaryTable::Locations)?;
            tx.execute(
                "INSERT INTO locations (id, name) VALUES (?1, ?2);",
                params![id, name],
            )?;
            Ok(id)
        })
    }

    fn add_contact_person_encounter(
        &self,
        contact_person_id: ContactPersonId,
        date: DiaryDate,
    ) -> StoreResult<EncounterId> {
        self.mutate("add_contact_person_encounter", |tx| {
            let id = next_id(tx, DiaryTable::ContactPersonEncounters)?;
            tx.execute(
                "INSERT INTO contact_person_encounters (id, contact_person_id, date)
                 VALUES (?1, ?2, ?3);",
                params![id, contact_person_id, date.to_iso_string()],
            )?;
            Ok(id)
        })
    }

    fn add_location_visit(
        &self,
        location_id: LocationId,
        date: DiaryDate,
    ) -> StoreResult<VisitId> {
        self.mutate("add_location_visit", |tx| {
            let id = next_id(tx, DiaryTable::LocationVisits)?;
            tx.execute(
                "INSERT INTO location_visits (id, location_id, date) VALUES (?1, ?2, ?3);",
                params![id, location_id, date.to_iso_string()],
            )?;
            Ok(id)
        })
    }

    fn update_contact_person(&self, id: ContactPersonId, name: &str) -> StoreResult<()> {
        self.mutate("update_contact_person", |tx| {
            tx.execute(
                "UPDATE contact_persons SET name = ?2 WHERE id = ?1;",
                params![id, name],
            )?;
            Ok(())
        })
    }

    fn update_location(&self, id: LocationId, name: &str) -> StoreResult<()> {
        self.mutate("update_location", |tx| {
            tx.execute(
                "UPDATE locations SET name = ?2 WHERE id = ?1;",
                params![id, name],
            )?;
            Ok(())
        })
    }

    fn remove_contact_person(&self, id: ContactPersonId) -> StoreResult<()> {
        self.mutate("remove_contact_person", |tx| {
            tx.execute("DELETE FROM contact_persons WHERE id = ?1;", [id])?;
            Ok(())
        })
    }

    fn remove_location(&self, id: LocationId) -> StoreResult<()> {
        self.mutate("remove_location", |tx| {
            tx.execute("DELETE FROM locations WHERE id = ?1;", [id])?;
            Ok(())
        })
    }

    fn remove_contact_person_encounter(&self, id: EncounterId) -> StoreResult<()> {
        self.mutate("remove_contact_person_encounter", |tx| {
            tx.execute("DELETE FROM contact_person_encounters WHERE id = ?1;", [id])?;
            Ok(())
        })
    }

    fn remove_location_visit(&self, id: VisitId) -> StoreResult<()> {
        self.mutate("remove_location_visit", |tx| {
            tx.execute("DELETE FROM location_visits WHERE id = ?1;", [id])?;
            Ok(())
        })
    }

    fn remove_all_contact_persons(&self) -> StoreResult<()> {
        self.mutate("remove_all_contact_persons", |tx| {
            tx.execute("DELETE FROM contact_persons;", [])?;
            Ok(())
        })
    }

    fn remove_all_locations(&self) -> StoreResult<()> {
        self.mutate("remove_all_locations", |tx| {
            tx.execute("DELETE FROM locations;", [])?;
            Ok(())
        })
    }

    fn contact_persons(&self) -> StoreResult<Vec<ContactPerson>> {
        load_contact_persons(&self.lock_conn())
    }

    fn locations(&self) -> StoreResult<Vec<Location>> {
        load_locations(&self.lock_conn())
    }

    fn contact_person_encounters(&self) -> StoreResult<Vec<ContactPersonEncounter>> {
        load_encounters_between(&self.lock_conn(), None, None, BadDateRows::Fail)
    }

    fn location_visits(&self) -> StoreResult<Vec<LocationVisit>> {
        load_visits_between(&self.lock_conn(), None, None, BadDateRows::Fail)
    }

    fn refresh(&self) -> StoreResult<()> {
        let _order = self.lock_publish_order();
        let days = self.project(&self.lock_conn())?;
        self.publisher.publish(days);
        Ok(())
    }

    fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn publisher(&self) -> &DiaryDaysPublisher {
        &self.publisher
    }
}

fn next_id(tx: &Transaction<'_>, table: DiaryTable) -> StoreResult<i64> {
    let name = table.name();
    let high_water: i64 = tx
        .query_row(
            "SELECT next_id FROM id_sequences WHERE name = ?1;",
            [name],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let max_existing: Option<i64> =
        tx.query_row(&format!("SELECT MAX(id) FROM {name};"), [], |row| row.get(0))?;

    let id = max_existing.map_or(0, |max| max + 1).max(high_water);
    tx.execute(
        "INSERT INTO id_sequences (name, next_id) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET next_id = excluded.next_id;",
        params![name, id + 1],
    )?;
    Ok(id)
}

fn load_contact_persons(conn: &Connection) -> StoreResult<Vec<ContactPerson>> {
    let mut stmt = conn.prepare("SELECT id, name FROM contact_persons ORDER BY id ASC;")?;
    let rows = stmt.query_map([], |row| {
        Ok(ContactPerson {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    })?;
    let persons = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(persons)
}

fn load_locations(conn: &Connection) -> StoreResult<Vec<Location>> {
    let mut stmt = conn.prepare("SELECT id, name FROM locations ORDER BY id ASC;")?;
    let rows = stmt.query_map([], |row| {
        Ok(Location {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    })?;
    let locations = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(locations)
}

/// What a join-row load does with a `date` column that does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BadDateRows {
    Fail,
    Skip,
}

/// Loads encounters, optionally restricted to `[from, to]` ISO dates.
fn load_encounters_between(
    conn: &Connection,
    from: Option<&str>,
    to: Option<&str>,
    bad_rows: BadDateRows,
) -> StoreResult<Vec<ContactPersonEncounter>> {
    let mut stmt = conn.prepare(
        "SELECT id, contact_person_id, date
         FROM contact_person_encounters
         WHERE (?1 IS NULL OR date >= ?1)
           AND (?2 IS NULL OR date <= ?2)
         ORDER BY id ASC;",
    )?;
    let mut rows = stmt.query(params![from, to])?;
    let mut encounters = Vec::new();
    while let Some(row) = rows.next()? {
        let Some(date) = date_column(row, "contact_person_encounters", bad_rows)? else {
            continue;
        };
        encounters.push(ContactPersonEncounter {
            id: row.get("id")?,
            date,
            contact_person_id: row.get("contact_person_id")?,
        });
    }
    Ok(encounters)
}

/// Loads visits, optionally restricted to `[from, to]` ISO dates.
fn load_visits_between(
    conn: &Connection,
    from: Option<&str>,
    to: Option<&str>,
    bad_rows: BadDateRows,
) -> StoreResult<Vec<LocationVisit>> {
    let mut stmt = conn.prepare(
        "SELECT id, location_id, date
         FROM location_visits
         WHERE (?1 IS NULL OR date >= ?1)
           AND (?2 IS NULL OR date <= ?2)
         ORDER BY id ASC;",
    )?;
    let mut rows = stmt.query(params![from, to])?;
    let mut visits = Vec::new();
    while let Some(row) = rows.next()? {
        let Some(date) = date_column(row, "location_visits", bad_rows)? else {
            continue;
        };
        visits.push(LocationVisit {
            id: row.get("id")?,
            date,
            location_id: row.get("location_id")?,
        });
    }
    Ok(visits)
}

fn date_column(
    row: &Row<'_>,
    table: &str,
    bad_rows: BadDateRows,
) -> StoreResult<Option<DiaryDate>> {
    let text: String = row.get("date")?;
    match DiaryDate::parse(text.as_str()) {
        Ok(date) => Ok(Some(date)),
        Err(err) if bad_rows == BadDateRows::Skip => {
            let id: i64 = row.get("id")?;
            error!(
                "event=projection_row module=sqlite_store status=skipped table={table} id={id} error={err}"
            );
            Ok(None)
        }
        Err(err) => Err(StoreError::InvalidData(format!(
            "invalid date `{text}` in {table}.date: {err}"
        ))),
    }
}
