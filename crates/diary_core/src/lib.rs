//! Core data layer of the contact diary.
//! The UI shell renders what this crate publishes and calls back into it for
//! every user action.

pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::date::{Clock, DateParseError, DiaryDate, FixedClock, SystemClock};
pub use model::day::{
    DiaryContactPerson, DiaryDay, DiaryEntry, DiaryEntryType, DiaryLocation, NewDiaryEntry,
};
pub use model::entity::{
    ContactPerson, ContactPersonEncounter, ContactPersonId, EncounterId, Location, LocationId,
    LocationVisit, VisitId,
};
pub use service::diary_day_service::DiaryDayService;
pub use service::diary_service::DiaryService;
pub use store::memory::MemoryDiaryStore;
pub use store::projection::DIARY_WINDOW_DAYS;
pub use store::sqlite::SqliteDiaryStore;
pub use store::{
    DiaryDaysPublisher, DiaryObserver, DiaryStore, StoreError, StoreResult, SubscriptionId,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
