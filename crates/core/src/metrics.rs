//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! 레코더가 설치되지 않은 경우 카운터 호출은 아무 동작도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logwarden_`
//! - 모듈명: `log_pipeline_`, `storage_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logwarden_core::metrics::LOG_PIPELINE_LINES_READ_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 실패 종류 레이블 키 (decode, storage)
pub const LABEL_KIND: &str = "kind";

/// 에이전트 해석 경로 레이블 키 (cached, found, created, race_recovered)
pub const LABEL_RESOLUTION: &str = "resolution";

// ─── Log Pipeline 메트릭 ────────────────────────────────────────────

/// Log Pipeline: 읽은 전체 라인 수 (counter)
pub const LOG_PIPELINE_LINES_READ_TOTAL: &str = "logwarden_log_pipeline_lines_read_total";

/// Log Pipeline: 저장된 이벤트 수 (counter)
pub const LOG_PIPELINE_EVENTS_STORED_TOTAL: &str = "logwarden_log_pipeline_events_stored_total";

/// Log Pipeline: 이미 처리된 라인으로 건너뛴 수 (counter)
pub const LOG_PIPELINE_LINES_SKIPPED_TOTAL: &str = "logwarden_log_pipeline_lines_skipped_total";

/// Log Pipeline: 실패한 라인 수 (counter, label: kind)
pub const LOG_PIPELINE_LINE_FAILURES_TOTAL: &str = "logwarden_log_pipeline_line_failures_total";

/// Log Pipeline: 에이전트 해석 수 (counter, label: resolution)
pub const LOG_PIPELINE_AGENT_RESOLUTIONS_TOTAL: &str =
    "logwarden_log_pipeline_agent_resolutions_total";

/// Log Pipeline: 수집 소요 시간 (histogram, 초)
pub const LOG_PIPELINE_INGEST_DURATION_SECONDS: &str =
    "logwarden_log_pipeline_ingest_duration_seconds";

/// Log Pipeline: 차단된 IP 수 (counter)
pub const LOG_PIPELINE_IPS_BLOCKED_TOTAL: &str = "logwarden_log_pipeline_ips_blocked_total";

/// Log Pipeline: 이미 차단되어 건너뛴 IP 수 (counter)
pub const LOG_PIPELINE_IPS_ALREADY_BLOCKED_TOTAL: &str =
    "logwarden_log_pipeline_ips_already_blocked_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        LOG_PIPELINE_LINES_READ_TOTAL,
        "Total number of access log lines read"
    );
    describe_counter!(
        LOG_PIPELINE_EVENTS_STORED_TOTAL,
        "Total number of access events persisted"
    );
    describe_counter!(
        LOG_PIPELINE_LINES_SKIPPED_TOTAL,
        "Lines skipped because they were already processed"
    );
    describe_counter!(
        LOG_PIPELINE_LINE_FAILURES_TOTAL,
        "Lines that failed to decode or persist (label: kind)"
    );
    describe_counter!(
        LOG_PIPELINE_AGENT_RESOLUTIONS_TOTAL,
        "Agent description resolutions by path (label: resolution)"
    );
    describe_histogram!(
        LOG_PIPELINE_INGEST_DURATION_SECONDS,
        "Wall-clock duration of one ingestion run in seconds"
    );
    describe_counter!(
        LOG_PIPELINE_IPS_BLOCKED_TOTAL,
        "Total number of IPs recorded as blocked"
    );
    describe_counter!(
        LOG_PIPELINE_IPS_ALREADY_BLOCKED_TOTAL,
        "IPs skipped because they were already blocked"
    );
}
