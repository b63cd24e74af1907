//! SQLite 스토리지 드라이버
//!
//! 하나의 연결을 `Mutex`로 감싸 공유합니다. 시간은 UTC epoch 밀리초로 저장하며,
//! 이벤트 중복은 `agent_id`가 NULL인 경우까지 포함하는 표현식 인덱스로 막습니다.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, ffi, params};
use tracing::{debug, info};

use logwarden_core::error::StorageError;
use logwarden_core::store::AccessLogStore;
use logwarden_core::types::{AccessEvent, AgentId, BlockedIp, IpCount, TimeWindow};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS agent (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS log_access (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    time          INTEGER NOT NULL,
    ip            TEXT NOT NULL,
    request       TEXT NOT NULL,
    response_code INTEGER NOT NULL,
    agent_id      INTEGER REFERENCES agent(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS ux_log_access_content
    ON log_access (time, ip, request, response_code, IFNULL(agent_id, 0));

CREATE INDEX IF NOT EXISTS ix_log_access_time_ip
    ON log_access (time, ip);

CREATE TABLE IF NOT EXISTS blocked_ip (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    ip     TEXT NOT NULL UNIQUE,
    reason TEXT
);
";

/// SQLite 저장소
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// 파일 기반 데이터베이스를 열고 스키마를 준비합니다.
    ///
    /// WAL 모드와 외래 키 검사를 활성화하며, 잠금 대기는 `busy_timeout`까지 허용합니다.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| StorageError::Connection(e.to_string()))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let journal_mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        debug!(journal_mode = %journal_mode, "sqlite journal mode set");

        let store = Self::init(conn)?;
        info!(
            path = %path.display(),
            busy_timeout_ms = busy_timeout.as_millis() as u64,
            "sqlite store opened"
        );
        Ok(store)
    }

    /// 인메모리 SQLite 데이터베이스를 엽니다. 테스트용입니다.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StorageError::Connection(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StorageError::Query(format!("schema setup failed: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Connection("sqlite connection lock poisoned".to_owned()))
    }

    fn count(&self, table: &'static str) -> Result<u64, StorageError> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .map_err(|e| map_error(e, table))?;
        Ok(u64::try_from(n).unwrap_or_default())
    }
}

/// rusqlite 에러를 스토리지 에러로 변환합니다.
///
/// 유니크/기본 키 제약 위반만 `Duplicate`로 분류합니다.
fn map_error(err: rusqlite::Error, entity: &'static str) -> StorageError {
    if let rusqlite::Error::SqliteFailure(ffi_err, _) = &err {
        if ffi_err.code == ErrorCode::ConstraintViolation
            && matches!(
                ffi_err.extended_code,
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            )
        {
            return StorageError::Duplicate { entity };
        }
        if matches!(
            ffi_err.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen
        ) {
            return StorageError::Connection(err.to_string());
        }
    }
    StorageError::Query(err.to_string())
}

fn millis(time: &DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

impl AccessLogStore for SqliteStore {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    fn find_agent(&self, description: &str) -> Result<Option<AgentId>, StorageError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id FROM agent WHERE description = ?1",
            params![description],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map(|id| id.map(AgentId))
        .map_err(|e| map_error(e, "agent"))
    }

    fn insert_agent(&self, description: &str) -> Result<AgentId, StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO agent (description) VALUES (?1)",
            params![description],
        )
        .map_err(|e| map_error(e, "agent"))?;
        Ok(AgentId(conn.last_insert_rowid()))
    }

    fn insert_event(&self, event: &AccessEvent) -> Result<i64, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| map_error(e, "access event"))?;
        tx.execute(
            "INSERT INTO log_access (time, ip, request, response_code, agent_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                millis(&event.time),
                event.ip,
                event.request,
                event.response_code,
                event.agent_id.map(|id| id.0),
            ],
        )
        .map_err(|e| map_error(e, "access event"))?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(|e| map_error(e, "access event"))?;
        debug!(id, ip = %event.ip, "access event stored");
        Ok(id)
    }

    fn insert_blocked_ip(&self, ip: &str, reason: &str) -> Result<i64, StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO blocked_ip (ip, reason) VALUES (?1, ?2)",
            params![ip, reason],
        )
        .map_err(|e| map_error(e, "blocked ip"))?;
        Ok(conn.last_insert_rowid())
    }

    fn count_by_ip(
        &self,
        window: &TimeWindow,
        min_count: u64,
    ) -> Result<Vec<IpCount>, StorageError> {
        let conn = self.lock()?;
        let min_count = i64::try_from(min_count).unwrap_or(i64::MAX);
        let mut stmt = conn
            .prepare(
                "SELECT ip, COUNT(*) AS n FROM log_access
                 WHERE time >= ?1 AND time < ?2
                 GROUP BY ip
                 HAVING n >= ?3
                 ORDER BY n DESC, ip ASC",
            )
            .map_err(|e| map_error(e, "access event"))?;
        let rows = stmt
            .query_map(
                params![millis(&window.start), millis(&window.end), min_count],
                |row| {
                    let count: i64 = row.get(1)?;
                    Ok(IpCount {
                        ip: row.get(0)?,
                        count: u64::try_from(count).unwrap_or_default(),
                    })
                },
            )
            .map_err(|e| map_error(e, "access event"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_error(e, "access event"))
    }

    fn blocked_ips(&self) -> Result<Vec<BlockedIp>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, ip, reason FROM blocked_ip ORDER BY id")
            .map_err(|e| map_error(e, "blocked ip"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BlockedIp {
                    id: row.get(0)?,
                    ip: row.get(1)?,
                    reason: row.get(2)?,
                })
            })
            .map_err(|e| map_error(e, "blocked ip"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_error(e, "blocked ip"))
    }

    fn event_count(&self) -> Result<u64, StorageError> {
        self.count("log_access")
    }

    fn agent_count(&self) -> Result<u64, StorageError> {
        self.count("agent")
    }
}
