//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `diary_core` linkage without a UI shell.
//! - Print a deterministic sample projection for quick sanity checks.

use chrono::NaiveDate;
use diary_core::{
    DiaryDayService, DiaryService, DiaryStore, FixedClock, MemoryDiaryStore, NewDiaryEntry,
    StoreResult,
};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    println!("diary_core version={}", diary_core::core_version());
    match run_sample() {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("sample failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_sample() -> Result<String, Box<dyn std::error::Error>> {
    let today = NaiveDate::from_ymd_opt(2024, 1, 15).ok_or("invalid sample date")?;
    let store = Arc::new(MemoryDiaryStore::with_clock(Arc::new(FixedClock(today))));
    let service = DiaryService::new(Arc::clone(&store));

    seed(&store)?;
    let days = service.diary_days();
    let first_day = days.first().cloned().ok_or("empty projection")?;
    let day_service = DiaryDayService::new(Arc::clone(&store), first_day);
    day_service.add(&NewDiaryEntry::ContactPerson {
        name: "Bob".to_string(),
    })?;

    Ok(serde_json::to_string_pretty(&day_service.day())?)
}

fn seed(store: &MemoryDiaryStore) -> StoreResult<()> {
    store.add_contact_person("Alice")?;
    let park = store.add_location("Park")?;
    store.add_location_visit(park, store.today().into())?;
    Ok(())
}
