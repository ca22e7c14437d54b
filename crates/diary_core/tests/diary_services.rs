use chrono::{Duration, NaiveDate};
use diary_core::{
    Clock, DiaryDay, DiaryDayService, DiaryEntry, DiaryEntryType, DiaryService, DiaryStore,
    FixedClock, MemoryDiaryStore, NewDiaryEntry,
};
use std::sync::{Arc, Mutex};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

fn store() -> Arc<MemoryDiaryStore> {
    Arc::new(MemoryDiaryStore::with_clock(Arc::new(FixedClock(today()))))
}

fn entry_named<'a>(day: &'a DiaryDay, name: &str) -> &'a DiaryEntry {
    day.entries
        .iter()
        .find(|entry| entry.name() == name)
        .expect("entry should be listed")
}

#[test]
fn alice_and_park_scenario() {
    let store = store();
    let service = DiaryService::new(Arc::clone(&store));

    assert_eq!(store.add_contact_person("Alice").unwrap(), 0);
    assert_eq!(store.add_location("Park").unwrap(), 0);

    let today_day = service.diary_days()[0].clone();
    let day_service = DiaryDayService::new(Arc::clone(&store), today_day);
    let park = entry_named(&day_service.day(), "Park").clone();
    day_service.select(&park).unwrap();

    let days = service.diary_days();
    let today_day = &days[0];
    assert_eq!(today_day.date_string, "2024-06-10");
    assert_eq!(today_day.entries.len(), 2);
    assert_eq!(entry_named(today_day, "Alice").selection_id(), None);
    assert_eq!(entry_named(today_day, "Park").selection_id(), Some(0));

    let yesterday = &days[1];
    assert_eq!(yesterday.date_string, "2024-06-09");
    assert!(yesterday.entries.iter().all(|entry| !entry.is_selected()));

    assert_eq!(day_service.day(), *today_day);
}

#[test]
fn service_mirror_follows_every_publish() {
    let store = store();
    let service = DiaryService::new(Arc::clone(&store));
    assert!(service.diary_days()[0].entries.is_empty());

    store.add_location("Park").unwrap();
    assert_eq!(service.diary_days()[0].entries.len(), 1);
}

#[test]
fn update_and_remove_dispatch_by_entry_kind() {
    let store = store();
    let service = DiaryService::new(Arc::clone(&store));
    store.add_contact_person("Alice").unwrap();
    store.add_location("Park").unwrap();

    let day = service.diary_days()[0].clone();
    let alice = entry_named(&day, "Alice");
    let park = entry_named(&day, "Park");

    service.update(&alice.with_name("Alicia")).unwrap();
    assert_eq!(store.contact_persons().unwrap()[0].name, "Alicia");
    assert_eq!(store.locations().unwrap()[0].name, "Park");

    service.remove(park).unwrap();
    assert!(store.locations().unwrap().is_empty());
    assert_eq!(store.contact_persons().unwrap().len(), 1);
}

#[test]
fn remove_all_only_clears_requested_kind() {
    let store = store();
    let service = DiaryService::new(Arc::clone(&store));
    store.add_contact_person("Alice").unwrap();
    store.add_contact_person("Bob").unwrap();
    store.add_location("Park").unwrap();

    service.remove_all(DiaryEntryType::ContactPerson).unwrap();
    assert!(store.contact_persons().unwrap().is_empty());
    assert_eq!(store.locations().unwrap().len(), 1);

    service.remove_all(DiaryEntryType::Location).unwrap();
    assert!(store.locations().unwrap().is_empty());
    assert!(service.diary_days().iter().all(|day| day.entries.is_empty()));
}

#[test]
fn deselect_removes_selection() {
    let store = store();
    store.add_contact_person("Alice").unwrap();
    let day_service = DiaryDayService::new(Arc::clone(&store), store.diary_days()[2].clone());

    let alice = entry_named(&day_service.day(), "Alice").clone();
    day_service.select(&alice).unwrap();
    let selected = entry_named(&day_service.day(), "Alice").clone();
    assert!(selected.is_selected());
    assert_eq!(
        store.contact_person_encounters().unwrap()[0].date.to_string(),
        "2024-06-08"
    );

    day_service.deselect(&selected).unwrap();
    assert!(!entry_named(&day_service.day(), "Alice").is_selected());
    assert!(store.contact_person_encounters().unwrap().is_empty());
}

#[test]
fn deselect_of_unselected_entry_is_a_no_op() {
    let store = store();
    let park = store.add_location("Park").unwrap();
    store
        .add_location_visit(park, diary_core::DiaryDate::new(today() - Duration::days(1)))
        .unwrap();
    let day_service = DiaryDayService::new(Arc::clone(&store), store.diary_days()[0].clone());

    let publishes = Arc::new(Mutex::new(0_usize));
    let counter = Arc::clone(&publishes);
    store.subscribe(Box::new(move |_: &[DiaryDay]| {
        *counter.lock().unwrap() += 1;
    }));

    let unselected = entry_named(&day_service.day(), "Park").clone();
    assert!(!unselected.is_selected());
    day_service.deselect(&unselected).unwrap();
    day_service.deselect(&unselected).unwrap();

    assert_eq!(*publishes.lock().unwrap(), 1);
    assert_eq!(store.location_visits().unwrap().len(), 1);
}

#[test]
fn selecting_twice_then_deselecting_once_is_safe() {
    let store = store();
    store.add_location("Park").unwrap();
    let day_service = DiaryDayService::new(Arc::clone(&store), store.diary_days()[0].clone());

    let park = entry_named(&day_service.day(), "Park").clone();
    day_service.select(&park).unwrap();
    day_service.select(&park).unwrap();
    assert_eq!(store.location_visits().unwrap().len(), 2);

    let selected = entry_named(&day_service.day(), "Park").clone();
    assert_eq!(selected.selection_id(), Some(0));
    day_service.deselect(&selected).unwrap();

    // the duplicate visit now surfaces as the selection
    assert_eq!(
        entry_named(&day_service.day(), "Park").selection_id(),
        Some(1)
    );
}

#[test]
fn add_creates_and_selects_in_two_publishes() {
    let store = store();
    let day_service = DiaryDayService::new(Arc::clone(&store), store.diary_days()[0].clone());

    let publishes = Arc::new(Mutex::new(0_usize));
    let counter = Arc::clone(&publishes);
    store.subscribe(Box::new(move |_: &[DiaryDay]| {
        *counter.lock().unwrap() += 1;
    }));

    let id = day_service
        .add(&NewDiaryEntry::Location {
            name: "Museum".to_string(),
        })
        .unwrap();
    assert_eq!(id, 0);
    assert_eq!(*publishes.lock().unwrap(), 3);

    let museum = entry_named(&day_service.day(), "Museum").clone();
    assert_eq!(museum.entry_type(), DiaryEntryType::Location);
    assert!(museum.is_selected());

    day_service
        .add(&NewDiaryEntry::ContactPerson {
            name: "Bob".to_string(),
        })
        .unwrap();
    let day = day_service.day();
    assert!(matches!(day.entries[0], DiaryEntry::ContactPerson(_)));
    assert!(day.entries[0].is_selected());
}

#[test]
fn invalid_day_date_falls_back_to_today() {
    let store = store();
    let park = store.add_location("Park").unwrap();
    let broken = DiaryDay {
        date_string: "not-a-date".to_string(),
        entries: Vec::new(),
    };
    let day_service = DiaryDayService::new(Arc::clone(&store), broken);

    day_service
        .select(&DiaryEntry::Location(diary_core::DiaryLocation {
            id: park,
            name: "Park".to_string(),
            visit_id: None,
        }))
        .unwrap();

    let visits = store.location_visits().unwrap();
    assert_eq!(visits[0].date.to_string(), "2024-06-10");
}

#[test]
fn day_service_freezes_and_flags_expired_day() {
    struct SwitchClock(Mutex<NaiveDate>);
    impl Clock for SwitchClock {
        fn today(&self) -> NaiveDate {
            *self.0.lock().unwrap()
        }
    }

    let clock = Arc::new(SwitchClock(Mutex::new(today())));
    let store = Arc::new(MemoryDiaryStore::with_clock(clock.clone()));
    store.add_location("Park").unwrap();
    let oldest = store.diary_days()[14].clone();
    let day_service = DiaryDayService::new(Arc::clone(&store), oldest.clone());
    assert!(!day_service.is_expired());

    *clock.0.lock().unwrap() = today() + Duration::days(1);
    store.add_location("Cafe").unwrap();

    assert!(day_service.is_expired());
    assert_eq!(day_service.day(), oldest);
}

#[test]
fn dropping_services_releases_subscriptions() {
    let store = store();
    let baseline = store.publisher().observer_count();
    {
        let _service = DiaryService::new(Arc::clone(&store));
        let _day = DiaryDayService::new(Arc::clone(&store), store.diary_days()[0].clone());
        assert_eq!(store.publisher().observer_count(), baseline + 2);
    }
    assert_eq!(store.publisher().observer_count(), baseline);
}
