//! 스토리지 trait — 관계형 저장소에 대한 리포지토리 인터페이스
//!
//! 파이프라인은 저장소를 블랙박스로 취급하며, 이 trait을 통해서만 접근합니다.
//! 드라이버(SQLite, 인메모리 등)는 `logwarden-storage` 크레이트에서 구현합니다.
//!
//! # 계약
//! - 모든 insert는 유니크 제약 위반을 [`StorageError::Duplicate`]로 구분하여 반환합니다.
//! - `insert_event`는 독립된 작업 단위입니다. 실패 시 행이 남지 않아야 합니다.
//! - 타임아웃은 드라이버가 소유합니다.

use crate::error::StorageError;
use crate::types::{AccessEvent, AgentId, BlockedIp, IpCount, TimeWindow};

/// 액세스 로그 저장소
///
/// 여러 워커가 동시에 호출할 수 있으므로 `Send + Sync`를 요구합니다.
pub trait AccessLogStore: Send + Sync {
    /// 드라이버 이름 (로그/리포트용)
    fn driver_name(&self) -> &str;

    /// 설명 문자열이 정확히 일치하는 에이전트를 찾습니다.
    fn find_agent(&self, description: &str) -> Result<Option<AgentId>, StorageError>;

    /// 새 에이전트를 추가합니다.
    ///
    /// 같은 설명이 이미 존재하면 `StorageError::Duplicate`를 반환합니다.
    fn insert_agent(&self, description: &str) -> Result<AgentId, StorageError>;

    /// 액세스 이벤트를 하나의 트랜잭션으로 저장하고 행 ID를 반환합니다.
    ///
    /// 동일한 내용(time, ip, request, response_code, agent)의 이벤트가 이미 있으면
    /// `StorageError::Duplicate`를 반환합니다.
    fn insert_event(&self, event: &AccessEvent) -> Result<i64, StorageError>;

    /// 차단 IP를 추가합니다. 이미 차단된 IP면 `StorageError::Duplicate`.
    fn insert_blocked_ip(&self, ip: &str, reason: &str) -> Result<i64, StorageError>;

    /// 윈도우 `[start, end)` 안의 이벤트 수를 IP별로 집계합니다.
    ///
    /// 집계 수가 `min_count` 이상인 IP만 반환하며, 집계 수 내림차순 후
    /// IP 오름차순으로 정렬합니다.
    fn count_by_ip(&self, window: &TimeWindow, min_count: u64)
    -> Result<Vec<IpCount>, StorageError>;

    /// 저장된 차단 IP 목록을 반환합니다.
    fn blocked_ips(&self) -> Result<Vec<BlockedIp>, StorageError>;

    /// 저장된 이벤트 수
    fn event_count(&self) -> Result<u64, StorageError>;

    /// 저장된 에이전트 수
    fn agent_count(&self) -> Result<u64, StorageError>;
}
