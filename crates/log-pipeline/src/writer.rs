//! 이벤트 저장기
//!
//! 한 이벤트를 하나의 작업 단위로 저장하고, 유니크 제약 위반을
//! [`WriteError::AlreadyProcessed`]로 구분합니다. 실패는 재시도하지 않습니다.

use std::sync::Arc;

use logwarden_core::store::AccessLogStore;
use logwarden_core::types::AccessEvent;

use crate::error::WriteError;

/// 액세스 이벤트 저장기
pub struct EventWriter {
    store: Arc<dyn AccessLogStore>,
}

impl EventWriter {
    pub fn new(store: Arc<dyn AccessLogStore>) -> Self {
        Self { store }
    }

    /// 이벤트를 저장하고 행 ID를 반환합니다.
    pub fn write(&self, event: &AccessEvent) -> Result<i64, WriteError> {
        self.store.insert_event(event).map_err(|e| {
            if e.is_duplicate() {
                WriteError::AlreadyProcessed
            } else {
                WriteError::Storage(e)
            }
        })
    }
}
