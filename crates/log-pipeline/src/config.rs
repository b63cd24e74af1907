//! 로그 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`IngestConfig`]에서 파이프라인 실행에
//! 필요한 값만 담습니다. 명령행 오버라이드는 [`PipelineConfigBuilder`]로
//! 적용하고 `build()`에서 한 번에 검증합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logwarden_core::config::LogwardenConfig;
//! use logwarden_log_pipeline::config::PipelineConfigBuilder;
//!
//! let core_config = LogwardenConfig::default();
//! let config = PipelineConfigBuilder::from_core(&core_config.ingest)
//!     .workers(4)
//!     .build()?;
//! ```

use logwarden_core::config::{IngestConfig, MAX_WORKERS};
use serde::{Deserialize, Serialize};

use crate::decoder::DEFAULT_MAX_LINE_LENGTH;
use crate::error::LogPipelineError;

/// 로그 파이프라인 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 액세스 로그 파일 경로
    pub access_log: String,
    /// 저장 워커 수 (1이면 파일 순서대로 처리)
    pub workers: usize,
    /// 최대 라인 길이 (바이트)
    pub max_line_length: usize,
    /// 리포트에 남길 최대 실패 라인 수
    pub max_reported_failures: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            access_log: "access.log".to_owned(),
            workers: 1,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            max_reported_failures: 100,
        }
    }
}

impl PipelineConfig {
    /// core 설정 섹션에서 파이프라인 설정을 생성합니다.
    pub fn from_core(ingest: &IngestConfig) -> Self {
        Self {
            access_log: ingest.access_log.clone(),
            workers: ingest.workers,
            max_line_length: ingest.max_line_length,
            max_reported_failures: ingest.max_reported_failures,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.access_log.trim().is_empty() {
            return Err(LogPipelineError::Config {
                field: "access_log".to_owned(),
                reason: "access log path must not be empty".to_owned(),
            });
        }

        if self.access_log.contains('\0') {
            return Err(LogPipelineError::Config {
                field: "access_log".to_owned(),
                reason: "access log path must not contain NUL bytes".to_owned(),
            });
        }

        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(LogPipelineError::Config {
                field: "workers".to_owned(),
                reason: format!("must be 1-{MAX_WORKERS}"),
            });
        }

        if self.max_line_length == 0 {
            return Err(LogPipelineError::Config {
                field: "max_line_length".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// `[ingest]` 섹션 값으로 시작하는 빌더를 생성합니다.
    pub fn from_core(ingest: &IngestConfig) -> Self {
        Self {
            config: PipelineConfig::from_core(ingest),
        }
    }

    /// 액세스 로그 경로를 설정합니다.
    pub fn access_log(mut self, path: impl Into<String>) -> Self {
        self.config.access_log = path.into();
        self
    }

    /// 워커 수를 설정합니다.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let ingest = IngestConfig {
            access_log: "/var/log/nginx/access.log".to_owned(),
            workers: 8,
            ..Default::default()
        };
        let config = PipelineConfig::from_core(&ingest);
        assert_eq!(config.access_log, "/var/log/nginx/access.log");
        assert_eq!(config.workers, 8);
        assert_eq!(config.max_line_length, ingest.max_line_length);
        assert_eq!(config.max_reported_failures, ingest.max_reported_failures);
    }

    #[test]
    fn validate_rejects_worker_bounds() {
        for workers in [0, MAX_WORKERS + 1] {
            let config = PipelineConfig {
                workers,
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("workers"));
        }
    }

    #[test]
    fn validate_rejects_empty_access_log() {
        let config = PipelineConfig {
            access_log: "  ".to_owned(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_overrides_ingest_values() {
        let ingest = IngestConfig {
            max_line_length: 512,
            ..Default::default()
        };
        let config = PipelineConfigBuilder::from_core(&ingest)
            .access_log("/tmp/access.log")
            .workers(4)
            .build()
            .unwrap();
        assert_eq!(config.access_log, "/tmp/access.log");
        assert_eq!(config.workers, 4);
        assert_eq!(config.max_line_length, 512);
    }

    #[test]
    fn builder_validates_on_build() {
        let ingest = IngestConfig::default();
        let result = PipelineConfigBuilder::from_core(&ingest).workers(0).build();
        assert!(result.is_err());

        let ingest = IngestConfig {
            max_line_length: 0,
            ..Default::default()
        };
        assert!(PipelineConfigBuilder::from_core(&ingest).build().is_err());
    }
}
