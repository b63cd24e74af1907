//! 두 드라이버가 같은 저장소 계약을 따르는지 검증합니다.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use logwarden_core::error::StorageError;
use logwarden_core::store::AccessLogStore;
use logwarden_core::types::{AccessEvent, TimeWindow, WindowDuration};
use logwarden_storage::{MemoryStore, SqliteStore};

fn drivers() -> Vec<Arc<dyn AccessLogStore>> {
    vec![
        Arc::new(MemoryStore::new()),
        Arc::new(SqliteStore::open_in_memory().unwrap()),
    ]
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 1, 1, hour, minute, 0).unwrap()
}

fn event(ip: &str, time: DateTime<Utc>) -> AccessEvent {
    AccessEvent::new(time, ip, "\"GET / HTTP/1.1\"", 200)
}

#[test]
fn duplicate_event_is_reported_as_duplicate() {
    for store in drivers() {
        let agent = store.insert_agent("curl/7.0").unwrap();
        let e = event("192.168.1.1", at(13, 0)).with_agent(Some(agent));
        store.insert_event(&e).unwrap();
        let err = store.insert_event(&e).unwrap_err();
        assert!(err.is_duplicate(), "{}: {err:?}", store.driver_name());
        assert_eq!(store.event_count().unwrap(), 1);
    }
}

#[test]
fn window_is_half_open() {
    for store in drivers() {
        store.insert_event(&event("10.0.0.1", at(13, 0))).unwrap();
        store.insert_event(&event("10.0.0.1", at(13, 59))).unwrap();
        store.insert_event(&event("10.0.0.1", at(14, 0))).unwrap();
        store.insert_event(&event("10.0.0.1", at(12, 59))).unwrap();

        let window = TimeWindow::new(at(13, 0), WindowDuration::Hourly);
        let counts = store.count_by_ip(&window, 0).unwrap();
        assert_eq!(counts.len(), 1, "{}", store.driver_name());
        assert_eq!(counts[0].count, 2, "{}", store.driver_name());
    }
}

#[test]
fn counts_are_ordered_and_filtered() {
    for store in drivers() {
        for minute in 0..4 {
            store.insert_event(&event("10.0.0.3", at(13, minute))).unwrap();
        }
        for minute in 0..2 {
            store.insert_event(&event("10.0.0.2", at(13, minute))).unwrap();
            store.insert_event(&event("10.0.0.1", at(13, minute))).unwrap();
        }
        store.insert_event(&event("10.0.0.4", at(13, 0))).unwrap();

        let window = TimeWindow::new(at(13, 0), WindowDuration::Hourly);
        let counts = store.count_by_ip(&window, 2).unwrap();
        let got: Vec<_> = counts.iter().map(|c| (c.ip.as_str(), c.count)).collect();
        assert_eq!(
            got,
            [("10.0.0.3", 4), ("10.0.0.1", 2), ("10.0.0.2", 2)],
            "{}",
            store.driver_name()
        );
    }
}

#[test]
fn blocked_ip_is_unique() {
    for store in drivers() {
        store.insert_blocked_ip("10.9.9.9", "first").unwrap();
        let err = store.insert_blocked_ip("10.9.9.9", "second").unwrap_err();
        assert_eq!(
            err,
            StorageError::Duplicate {
                entity: "blocked ip"
            }
        );
        let blocked = store.blocked_ips().unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].reason.as_deref(), Some("first"));
    }
}

#[test]
fn concurrent_agent_inserts_leave_one_row() {
    for store in drivers() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.insert_agent("Mozilla/5.0 (X11)"))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let created = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(created, 1, "{}", store.driver_name());
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(StorageError::is_duplicate)
        );
        assert_eq!(store.agent_count().unwrap(), 1);
    }
}
