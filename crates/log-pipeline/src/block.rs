//! IP 차단 판정 및 기록
//!
//! [`BlockDecider`]는 반개구간 윈도우 안의 IP별 요청 수를 집계하여 임계값을 넘은
//! IP를 고르고, [`BlockWriter`]는 각 IP를 차단 레코드로 저장합니다.
//! 수집이 모두 끝난 뒤에만 실행됩니다.

use std::sync::Arc;

use logwarden_core::error::StorageError;
use logwarden_core::metrics as m;
use logwarden_core::store::AccessLogStore;
use logwarden_core::types::{IpCount, ThresholdMode, TimeWindow, block_reason};
use tracing::{info, warn};

use crate::error::WriteError;
use crate::report::{BlockFailure, BlockReport};

/// 차단 대상 판정기
pub struct BlockDecider {
    store: Arc<dyn AccessLogStore>,
    mode: ThresholdMode,
}

impl BlockDecider {
    pub fn new(store: Arc<dyn AccessLogStore>, mode: ThresholdMode) -> Self {
        Self { store, mode }
    }

    /// 윈도우 안에서 임계값 조건을 만족하는 IP를 요청 수 내림차순으로 반환합니다.
    pub fn decide(
        &self,
        window: &TimeWindow,
        threshold: u64,
    ) -> Result<Vec<IpCount>, StorageError> {
        let offenders: Vec<IpCount> = self
            .store
            .count_by_ip(window, self.mode.min_count(threshold))?
            .into_iter()
            .filter(|row| self.mode.admits(row.count, threshold))
            .collect();

        info!(
            window = %window,
            threshold,
            mode = %self.mode,
            offenders = offenders.len(),
            "block decision computed"
        );
        Ok(offenders)
    }
}

/// 차단 IP 기록기
pub struct BlockWriter {
    store: Arc<dyn AccessLogStore>,
    mode: ThresholdMode,
}

impl BlockWriter {
    pub fn new(store: Arc<dyn AccessLogStore>, mode: ThresholdMode) -> Self {
        Self { store, mode }
    }

    /// IP 하나를 차단 레코드로 저장합니다.
    ///
    /// 이미 차단된 IP는 `WriteError::AlreadyBlocked`를 반환합니다.
    pub fn block(&self, ip: &str, reason: &str) -> Result<i64, WriteError> {
        self.store.insert_blocked_ip(ip, reason).map_err(|e| {
            if e.is_duplicate() {
                WriteError::AlreadyBlocked
            } else {
                WriteError::Storage(e)
            }
        })
    }

    /// 판정된 모든 IP를 차단합니다. 한 IP의 실패가 나머지 처리를 막지 않습니다.
    pub fn block_all(
        &self,
        offenders: &[IpCount],
        window: &TimeWindow,
        threshold: u64,
    ) -> BlockReport {
        let reason = block_reason(self.mode, threshold, window);
        let mut report = BlockReport::default();

        for offender in offenders {
            match self.block(&offender.ip, &reason) {
                Ok(_) => {
                    info!(ip = %offender.ip, count = offender.count, "ip blocked");
                    metrics::counter!(m::LOG_PIPELINE_IPS_BLOCKED_TOTAL).increment(1);
                    report.blocked += 1;
                    report.ips.push(offender.ip.clone());
                }
                Err(WriteError::AlreadyBlocked) => {
                    info!(ip = %offender.ip, "ip already blocked");
                    metrics::counter!(m::LOG_PIPELINE_IPS_ALREADY_BLOCKED_TOTAL).increment(1);
                    report.already_blocked += 1;
                    report.ips.push(offender.ip.clone());
                }
                Err(e) => {
                    warn!(ip = %offender.ip, error = %e, "failed to block ip");
                    report.failed.push(BlockFailure {
                        ip: offender.ip.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use logwarden_core::types::{AccessEvent, WindowDuration};
    use logwarden_storage::MemoryStore;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 1, 1, 13, 0, 0).unwrap()
    }

    fn seed(store: &MemoryStore, ip: &str, n: i64) {
        for i in 0..n {
            let time = start() + chrono::TimeDelta::seconds(i);
            store
                .insert_event(&AccessEvent::new(time, ip, "GET /", 200))
                .unwrap();
        }
    }

    #[test]
    fn exceeds_excludes_exact_threshold() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "10.0.0.1", 3);
        seed(&store, "10.0.0.2", 4);
        let decider = BlockDecider::new(store, ThresholdMode::Exceeds);
        let window = TimeWindow::new(start(), WindowDuration::Hourly);

        let ips: Vec<_> = decider
            .decide(&window, 3)
            .unwrap()
            .into_iter()
            .map(|c| c.ip)
            .collect();
        assert_eq!(ips, ["10.0.0.2"]);
    }

    #[test]
    fn at_least_includes_exact_threshold() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "10.0.0.1", 3);
        seed(&store, "10.0.0.2", 4);
        let decider = BlockDecider::new(store, ThresholdMode::AtLeast);
        let window = TimeWindow::new(start(), WindowDuration::Hourly);

        let ips: Vec<_> = decider
            .decide(&window, 3)
            .unwrap()
            .into_iter()
            .map(|c| c.ip)
            .collect();
        assert_eq!(ips, ["10.0.0.2", "10.0.0.1"]);
    }

    #[test]
    fn block_all_records_reason_and_tolerates_repeats() {
        let store = Arc::new(MemoryStore::new());
        let writer = BlockWriter::new(store.clone(), ThresholdMode::Exceeds);
        let window = TimeWindow::new(start(), WindowDuration::Daily);
        let offenders = vec![
            IpCount {
                ip: "10.0.0.1".to_owned(),
                count: 300,
            },
            IpCount {
                ip: "10.0.0.2".to_owned(),
                count: 250,
            },
        ];

        let first = writer.block_all(&offenders, &window, 200);
        assert_eq!(first.blocked, 2);
        assert_eq!(first.ips, ["10.0.0.1", "10.0.0.2"]);

        let second = writer.block_all(&offenders, &window, 200);
        assert_eq!(second.blocked, 0);
        assert_eq!(second.already_blocked, 2);
        assert!(second.failed.is_empty());

        let rows = store.blocked_ips().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].reason.as_deref(),
            Some("More than 200 access between 2017-01-01.13:00:00 and 2017-01-02.13:00:00")
        );
    }
}
