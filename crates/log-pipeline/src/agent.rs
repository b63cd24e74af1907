//! 에이전트 설명 -> ID 해석기
//!
//! 실행 동안 유지되는 캐시를 먼저 확인하고, 없으면 저장소에서 조회하거나 새로 추가합니다.
//! 동시에 같은 설명을 추가하려는 경쟁은 유니크 제약 위반을 받은 쪽이 재조회하여 해소합니다.
//!
//! ```text
//! blank? -> None
//! cache hit -> Cached
//! find -> Found
//! insert ok -> Created
//! insert duplicate -> find -> RaceRecovered
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use logwarden_core::error::StorageError;
use logwarden_core::metrics as m;
use logwarden_core::store::AccessLogStore;
use logwarden_core::types::AgentId;
use tracing::debug;

/// 에이전트 해석 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 캐시 적중 (저장소 접근 없음)
    Cached(AgentId),
    /// 저장소에 이미 존재
    Found(AgentId),
    /// 새로 추가됨
    Created(AgentId),
    /// 추가 중 유니크 제약 위반 후 재조회로 복구
    RaceRecovered(AgentId),
}

impl Resolution {
    /// 해석된 에이전트 ID
    pub fn id(self) -> AgentId {
        match self {
            Self::Cached(id) | Self::Found(id) | Self::Created(id) | Self::RaceRecovered(id) => id,
        }
    }

    /// 메트릭/로그 레이블
    pub fn label(self) -> &'static str {
        match self {
            Self::Cached(_) => "cached",
            Self::Found(_) => "found",
            Self::Created(_) => "created",
            Self::RaceRecovered(_) => "race_recovered",
        }
    }
}

/// 에이전트 해석기
///
/// 캐시는 해석기가 소유하며 실행 중 무효화되지 않습니다.
/// 여러 워커가 `Arc<AgentResolver>`로 공유합니다.
pub struct AgentResolver {
    store: Arc<dyn AccessLogStore>,
    cache: Mutex<HashMap<String, AgentId>>,
}

impl AgentResolver {
    /// 빈 캐시로 해석기를 생성합니다.
    pub fn new(store: Arc<dyn AccessLogStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 에이전트 설명을 ID로 해석합니다.
    ///
    /// 빈(공백뿐인) 설명은 캐시와 저장소를 거치지 않고 `None`을 반환합니다.
    ///
    /// # Errors
    ///
    /// 경쟁 복구 외의 스토리지 실패는 그대로 반환합니다.
    pub fn resolve(&self, description: &str) -> Result<Option<Resolution>, StorageError> {
        if description.trim().is_empty() {
            return Ok(None);
        }

        if let Some(id) = self.cache().get(description).copied() {
            metrics::counter!(m::LOG_PIPELINE_AGENT_RESOLUTIONS_TOTAL, m::LABEL_RESOLUTION => "cached")
                .increment(1);
            return Ok(Some(Resolution::Cached(id)));
        }

        let resolution = self.find_or_create(description)?;
        self.cache().insert(description.to_owned(), resolution.id());

        debug!(
            agent_id = %resolution.id(),
            resolution = resolution.label(),
            "agent resolved"
        );
        metrics::counter!(
            m::LOG_PIPELINE_AGENT_RESOLUTIONS_TOTAL,
            m::LABEL_RESOLUTION => resolution.label()
        )
        .increment(1);
        Ok(Some(resolution))
    }

    fn find_or_create(&self, description: &str) -> Result<Resolution, StorageError> {
        if let Some(id) = self.store.find_agent(description)? {
            return Ok(Resolution::Found(id));
        }

        match self.store.insert_agent(description) {
            Ok(id) => Ok(Resolution::Created(id)),
            Err(e) if e.is_duplicate() => self
                .store
                .find_agent(description)?
                .map(Resolution::RaceRecovered)
                .ok_or_else(|| {
                    StorageError::Query(
                        "agent missing after duplicate insert was reported".to_owned(),
                    )
                }),
            Err(e) => Err(e),
        }
    }

    /// 캐시에 저장된 설명 수
    pub fn cached_len(&self) -> usize {
        self.cache().len()
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, AgentId>> {
        // 캐시는 항상 완전한 항목만 담으므로 poison 상태도 그대로 사용합니다.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
