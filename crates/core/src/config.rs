//! 설정 관리 — logwarden.toml 파싱 및 런타임 설정
//!
//! [`LogwardenConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGWARDEN_STORAGE_PATH=/var/lib/logwarden/db.sqlite` 형식)
//! 3. 설정 파일 (`logwarden.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logwarden_core::error::LogwardenError> {
//! use logwarden_core::config::LogwardenConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogwardenConfig::load("logwarden.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogwardenConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConfigError, LogwardenError};
use crate::types::ThresholdMode;

/// 워커 수 상한
pub const MAX_WORKERS: usize = 64;

/// Logwarden 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogwardenConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 스토리지 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 수집(ingestion) 설정
    #[serde(default)]
    pub ingest: IngestConfig,
    /// 차단 판정 설정
    #[serde(default)]
    pub blocking: BlockingConfig,
}

impl LogwardenConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogwardenError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값으로 대체하여 로드합니다.
    ///
    /// 파일이 존재하지만 파싱/검증에 실패하면 에러를 반환합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, LogwardenError> {
        let path = path.as_ref();
        match Self::load(path).await {
            Err(LogwardenError::Config(ConfigError::FileNotFound { .. })) => {
                info!(path = %path.display(), "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogwardenError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogwardenError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogwardenError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogwardenError> {
        toml::from_str(toml_str).map_err(|e| {
            LogwardenError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGWARDEN_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGWARDEN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGWARDEN_GENERAL_LOG_FORMAT");

        // Storage
        override_parsed(&mut self.storage.driver, "LOGWARDEN_STORAGE_DRIVER");
        override_string(&mut self.storage.path, "LOGWARDEN_STORAGE_PATH");
        override_parsed(
            &mut self.storage.busy_timeout_ms,
            "LOGWARDEN_STORAGE_BUSY_TIMEOUT_MS",
        );

        // Ingest
        override_string(&mut self.ingest.access_log, "LOGWARDEN_INGEST_ACCESS_LOG");
        override_parsed(&mut self.ingest.workers, "LOGWARDEN_INGEST_WORKERS");
        override_parsed(
            &mut self.ingest.max_line_length,
            "LOGWARDEN_INGEST_MAX_LINE_LENGTH",
        );
        override_parsed(
            &mut self.ingest.max_reported_failures,
            "LOGWARDEN_INGEST_MAX_REPORTED_FAILURES",
        );

        // Blocking
        override_parsed(
            &mut self.blocking.threshold_mode,
            "LOGWARDEN_BLOCKING_THRESHOLD_MODE",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogwardenError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.storage.driver == StorageDriver::Sqlite && self.storage.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.path".to_owned(),
                reason: "path must not be empty for the sqlite driver".to_owned(),
            }
            .into());
        }

        if self.ingest.access_log.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ingest.access_log".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.ingest.workers == 0 || self.ingest.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidValue {
                field: "ingest.workers".to_owned(),
                reason: format!("must be 1-{MAX_WORKERS}"),
            }
            .into());
        }

        if self.ingest.max_line_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ingest.max_line_length".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 스토리지 드라이버 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    /// SQLite 파일 데이터베이스
    #[default]
    Sqlite,
    /// 프로세스 메모리 (실행 종료 시 소멸)
    Memory,
}

impl FromStr for StorageDriver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidValue {
                field: "storage.driver".to_owned(),
                reason: format!("'{other}' is not one of: sqlite, memory"),
            }),
        }
    }
}

impl fmt::Display for StorageDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// 스토리지 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 드라이버 (sqlite, memory)
    pub driver: StorageDriver,
    /// SQLite 데이터베이스 파일 경로
    pub path: String,
    /// 잠금 대기 타임아웃 (밀리초)
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: StorageDriver::Sqlite,
            path: "logwarden.db".to_owned(),
            busy_timeout_ms: 5_000,
        }
    }
}

/// 수집 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 액세스 로그 파일 경로
    pub access_log: String,
    /// 저장 워커 수 (1이면 파일 순서대로 순차 처리)
    pub workers: usize,
    /// 최대 라인 길이 (바이트)
    pub max_line_length: usize,
    /// 리포트에 상세히 남길 최대 실패 라인 수
    pub max_reported_failures: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            access_log: "access.log".to_owned(),
            workers: 1,
            max_line_length: 64 * 1024, // 64KB
            max_reported_failures: 100,
        }
    }
}

/// 차단 판정 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingConfig {
    /// 임계값 비교 방식 (exceeds, at_least)
    pub threshold_mode: ThresholdMode,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T>(target: &mut T, env_key: &str)
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(e) => warn!(
                env_key,
                value = val.as_str(),
                error = %e,
                "failed to parse env var, ignoring"
            ),
        }
    }
}
