//! Current-value publisher for diary day projections.
//!
//! # Responsibility
//! - Hold the latest published projection.
//! - Deliver every new projection synchronously to registered observers.
//!
//! # Invariants
//! - A new observer receives the current projection before `subscribe` returns.
//! - Each `publish` call notifies every observer exactly once, in
//!   registration order.
//! - Lock order is `registry` then `current`; `current` is only swapped while
//!   the registry is held.
//! - Observers must not subscribe/unsubscribe or mutate the owning store from
//!   inside their callback. Reading the store is fine.

use crate::model::day::DiaryDay;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Callback receiving the full projection after each mutation.
pub type DiaryObserver = Box<dyn Fn(&[DiaryDay]) + Send + Sync>;

/// Handle identifying one registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(SubscriptionId, DiaryObserver)>,
}

/// Observer registry plus the last published value.
#[derive(Default)]
pub struct DiaryDaysPublisher {
    current: Mutex<Arc<Vec<DiaryDay>>>,
    registry: Mutex<ObserverRegistry>,
}

impl DiaryDaysPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last published projection (empty before the first publish).
    pub fn current(&self) -> Arc<Vec<DiaryDay>> {
        Arc::clone(&lock(&self.current))
    }

    /// Registers `observer` and immediately replays the current projection.
    pub fn subscribe(&self, observer: DiaryObserver) -> SubscriptionId {
        let mut registry = lock(&self.registry);
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;

        let current = self.current();
        observer(current.as_slice());
        registry.observers.push((id, observer));

        debug!(
            "event=subscribe module=publisher status=ok subscription_id={} observers={}",
            id.0,
            registry.observers.len()
        );
        id
    }

    /// Removes one observer. Returns `false` when `id` is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = lock(&self.registry);
        let before = registry.observers.len();
        registry.observers.retain(|(existing, _)| *existing != id);
        let removed = registry.observers.len() != before;
        debug!(
            "event=unsubscribe module=publisher status={} subscription_id={}",
            if removed { "ok" } else { "unknown" },
            id.0
        );
        removed
    }

    /// Replaces the current projection and notifies all observers.
    ///
    /// The registry lock is taken before `current` is swapped, so a concurrent
    /// `subscribe` sees either the old value followed by this notification or
    /// the new value and no notification.
    pub fn publish(&self, days: Vec<DiaryDay>) {
        let snapshot = Arc::new(days);
        let registry = lock(&self.registry);
        *lock(&self.current) = Arc::clone(&snapshot);

        for (_, observer) in &registry.observers {
            observer(snapshot.as_slice());
        }
        debug!(
            "event=publish module=publisher status=ok days={} observers={}",
            snapshot.len(),
            registry.observers.len()
        );
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.registry).observers.len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::DiaryDaysPublisher;
    use crate::model::date::DiaryDate;
    use crate::model::day::DiaryDay;
    use std::sync::{Arc, Mutex};
    use std::thread;

    fn day(value: &str) -> DiaryDay {
        DiaryDay::new(DiaryDate::parse(value).unwrap(), Vec::new())
    }

    #[test]
    fn subscribe_replays_current_value() {
        let publisher = DiaryDaysPublisher::new();
        publisher.publish(vec![day("2024-05-01")]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        publisher.subscribe(Box::new(move |days: &[DiaryDay]| {
            sink.lock().unwrap().push(days[0].date_string.clone());
        }));

        assert_eq!(*seen.lock().unwrap(), vec!["2024-05-01".to_string()]);
    }

    #[test]
    fn each_publish_notifies_once_until_unsubscribed() {
        let publisher = DiaryDaysPublisher::new();
        let calls = Arc::new(Mutex::new(0_usize));
        let counter = Arc::clone(&calls);
        let id = publisher.subscribe(Box::new(move |_: &[DiaryDay]| {
            *counter.lock().unwrap() += 1;
        }));

        publisher.publish(vec![day("2024-05-01")]);
        publisher.publish(vec![day("2024-05-02")]);
        assert_eq!(*calls.lock().unwrap(), 3);

        assert!(publisher.unsubscribe(id));
        assert!(!publisher.unsubscribe(id));
        publisher.publish(vec![day("2024-05-03")]);
        assert_eq!(*calls.lock().unwrap(), 3);
        assert_eq!(publisher.observer_count(), 0);
        assert_eq!(publisher.current()[0].date_string, "2024-05-03");
    }

    #[test]
    fn subscribe_racing_publish_sees_each_snapshot_once() {
        let publisher = Arc::new(DiaryDaysPublisher::new());
        publisher.publish(vec![day("2024-01-01")]);

        let writer = Arc::clone(&publisher);
        let publishing = thread::spawn(move || {
            let start = DiaryDate::parse("2024-01-02").unwrap().naive();
            for offset in 0..200 {
                let date = DiaryDate::new(start + chrono::Duration::days(offset));
                writer.publish(vec![DiaryDay::new(date, Vec::new())]);
            }
        });

        let logs: Vec<Arc<Mutex<Vec<String>>>> = (0..50)
            .map(|_| {
                let seen = Arc::new(Mutex::new(Vec::new()));
                let sink = Arc::clone(&seen);
                publisher.subscribe(Box::new(move |days: &[DiaryDay]| {
                    sink.lock().unwrap().push(days[0].date_string.clone());
                }));
                seen
            })
            .collect();
        publishing.join().unwrap();

        for seen in logs {
            let seen = seen.lock().unwrap();
            assert!(!seen.is_empty());
            assert!(
                seen.windows(2).all(|pair| pair[0] < pair[1]),
                "snapshot delivered twice or out of order: {seen:?}"
            );
        }
    }
}
