#![doc = include_str!("../README.md")]

pub mod memory;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use logwarden_core::config::{StorageConfig, StorageDriver};
use logwarden_core::error::StorageError;
use logwarden_core::store::AccessLogStore;
use logwarden_core::types::IpCount;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// 설정에 지정된 드라이버로 저장소를 엽니다.
///
/// # Errors
///
/// 데이터베이스 파일을 열 수 없거나 스키마 준비에 실패하면 `StorageError`를 반환합니다.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn AccessLogStore>, StorageError> {
    let store: Arc<dyn AccessLogStore> = match config.driver {
        StorageDriver::Sqlite => Arc::new(SqliteStore::open(
            &config.path,
            Duration::from_millis(config.busy_timeout_ms),
        )?),
        StorageDriver::Memory => Arc::new(MemoryStore::new()),
    };
    info!(driver = store.driver_name(), "storage ready");
    Ok(store)
}

/// 집계 결과를 요청 수 내림차순, IP 오름차순으로 정렬합니다.
pub(crate) fn sort_counts(counts: &mut [IpCount]) {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.ip.cmp(&b.ip)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_memory_driver() {
        let config = StorageConfig {
            driver: StorageDriver::Memory,
            ..StorageConfig::default()
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.driver_name(), "memory");
    }

    #[test]
    fn open_sqlite_driver_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let config = StorageConfig {
            driver: StorageDriver::Sqlite,
            path: path.to_string_lossy().into_owned(),
            busy_timeout_ms: 100,
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.driver_name(), "sqlite");
        assert!(path.exists());
    }

    #[test]
    fn counts_sort_by_count_then_ip() {
        let mut counts = vec![
            IpCount { ip: "b".to_owned(), count: 2 },
            IpCount { ip: "c".to_owned(), count: 5 },
            IpCount { ip: "a".to_owned(), count: 2 },
        ];
        sort_counts(&mut counts);
        let ips: Vec<_> = counts.iter().map(|c| c.ip.as_str()).collect();
        assert_eq!(ips, ["c", "a", "b"]);
    }
}
