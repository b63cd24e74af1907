//! 인메모리 스토리지 드라이버
//!
//! 관계형 스키마와 같은 유니크 규칙(에이전트 설명, 이벤트 내용, 차단 IP)을
//! 하나의 `Mutex` 아래에서 강제합니다. 실행이 끝나면 데이터는 사라집니다.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use logwarden_core::error::StorageError;
use logwarden_core::store::AccessLogStore;
use logwarden_core::types::{AccessEvent, Agent, AgentId, BlockedIp, IpCount, TimeWindow};

use crate::sort_counts;

/// 이벤트 유니크 키: (time ms, ip, request, response_code, agent_id)
type EventKey = (i64, String, String, i32, Option<i64>);

fn event_key(event: &AccessEvent) -> EventKey {
    (
        event.time.timestamp_millis(),
        event.ip.clone(),
        event.request.clone(),
        event.response_code,
        event.agent_id.map(|id| id.0),
    )
}

#[derive(Default)]
struct Tables {
    /// id 순서의 에이전트 행
    agents: Vec<Agent>,
    /// description -> id
    agent_index: HashMap<String, AgentId>,
    events: Vec<(i64, AccessEvent)>,
    event_keys: HashSet<EventKey>,
    blocked: Vec<BlockedIp>,
    blocked_index: HashSet<String>,
}

/// 인메모리 저장소
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Connection("memory store lock poisoned".to_owned()))
    }

    /// 저장된 이벤트의 사본을 삽입 순서대로 반환합니다.
    pub fn events(&self) -> Result<Vec<AccessEvent>, StorageError> {
        Ok(self
            .lock()?
            .events
            .iter()
            .map(|(_, event)| event.clone())
            .collect())
    }
}

impl AccessLogStore for MemoryStore {
    fn driver_name(&self) -> &str {
        "memory"
    }

    fn find_agent(&self, description: &str) -> Result<Option<AgentId>, StorageError> {
        Ok(self.lock()?.agent_index.get(description).copied())
    }

    fn insert_agent(&self, description: &str) -> Result<AgentId, StorageError> {
        let mut tables = self.lock()?;
        if tables.agent_index.contains_key(description) {
            return Err(StorageError::Duplicate { entity: "agent" });
        }
        let id = AgentId(tables.agents.len() as i64 + 1);
        tables.agent_index.insert(description.to_owned(), id);
        tables.agents.push(Agent {
            id,
            description: description.to_owned(),
        });
        Ok(id)
    }

    fn insert_event(&self, event: &AccessEvent) -> Result<i64, StorageError> {
        let mut tables = self.lock()?;
        if let Some(agent_id) = event.agent_id
            && !tables.agents.iter().any(|agent| agent.id == agent_id)
        {
            return Err(StorageError::Query(format!(
                "agent {agent_id} does not exist"
            )));
        }
        if !tables.event_keys.insert(event_key(event)) {
            return Err(StorageError::Duplicate {
                entity: "access event",
            });
        }
        let id = tables.events.len() as i64 + 1;
        tables.events.push((id, event.clone()));
        Ok(id)
    }

    fn insert_blocked_ip(&self, ip: &str, reason: &str) -> Result<i64, StorageError> {
        let mut tables = self.lock()?;
        if !tables.blocked_index.insert(ip.to_owned()) {
            return Err(StorageError::Duplicate {
                entity: "blocked ip",
            });
        }
        let id = tables.blocked.len() as i64 + 1;
        tables.blocked.push(BlockedIp {
            id,
            ip: ip.to_owned(),
            reason: Some(reason.to_owned()),
        });
        Ok(id)
    }

    fn count_by_ip(
        &self,
        window: &TimeWindow,
        min_count: u64,
    ) -> Result<Vec<IpCount>, StorageError> {
        let tables = self.lock()?;
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for (_, event) in &tables.events {
            if window.contains(&event.time) {
                *counts.entry(event.ip.as_str()).or_default() += 1;
            }
        }

        let mut result: Vec<IpCount> = counts
            .into_iter()
            .filter(|(_, count)| *count >= min_count)
            .map(|(ip, count)| IpCount {
                ip: ip.to_owned(),
                count,
            })
            .collect();
        sort_counts(&mut result);
        Ok(result)
    }

    fn blocked_ips(&self) -> Result<Vec<BlockedIp>, StorageError> {
        Ok(self.lock()?.blocked.clone())
    }

    fn event_count(&self) -> Result<u64, StorageError> {
        Ok(self.lock()?.events.len() as u64)
    }

    fn agent_count(&self) -> Result<u64, StorageError> {
        Ok(self.lock()?.agents.len() as u64)
    }
}
