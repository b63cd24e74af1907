//! 로그 파이프라인 에러 타입
//!
//! 라인 단위 에러([`DecodeError`](crate::decoder::DecodeError),
//! [`WriteError`])는 리포트에 기록되고 처리를 계속합니다.
//! [`LogPipelineError`]는 실행 자체를 막는 전제 조건 실패만 표현하며,
//! `From<LogPipelineError> for LogwardenError` 변환으로 상위 레이어에 전파됩니다.

use logwarden_core::error::{ConfigError, LogwardenError, PipelineError, StorageError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 액세스 로그를 열 수 없음
    #[error("source unavailable: {path}: {reason}")]
    Source {
        /// 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 스토리지 에러 (집계 쿼리 등 라인 단위가 아닌 작업)
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 워커 태스크 실패
    #[error("worker task failed: {0}")]
    Task(String),
}

impl From<LogPipelineError> for LogwardenError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Source { path, reason } => {
                LogwardenError::Pipeline(PipelineError::SourceUnavailable { path, reason })
            }
            LogPipelineError::Config { field, reason } => {
                LogwardenError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogPipelineError::Storage(e) => LogwardenError::Storage(e),
            other @ LogPipelineError::Task(_) => {
                LogwardenError::Pipeline(PipelineError::InitFailed(other.to_string()))
            }
        }
    }
}

/// 이벤트/차단 IP 쓰기 결과 에러
///
/// `AlreadyProcessed`와 `AlreadyBlocked`는 멱등성 신호이며 실패로 취급하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    /// 같은 내용의 이벤트가 이미 저장됨
    #[error("line already processed")]
    AlreadyProcessed,

    /// 이미 차단된 IP
    #[error("ip already blocked")]
    AlreadyBlocked,

    /// 그 밖의 스토리지 실패 (재시도하지 않음)
    #[error("storage failure: {0}")]
    Storage(StorageError),
}
