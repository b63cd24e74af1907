//! 액세스 로그 라인 디코더
//!
//! `time|ip|request|responseCode|agentDescription` 형식의 한 줄을
//! [`DecodedLine`]으로 변환합니다. I/O가 없는 순수 함수이며 실패는 모두
//! [`DecodeError`]로 보고합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logwarden_log_pipeline::decoder::LineDecoder;
//!
//! let decoder = LineDecoder::default();
//! let line = decoder.decode(
//!     r#"2017-01-01 00:00:11.763|192.168.234.82|"GET / HTTP/1.1"|200|"curl/7.0""#,
//! )?;
//! assert_eq!(line.response_code, 200);
//! ```

use chrono::{DateTime, Utc};
use logwarden_core::types::{AccessEvent, AgentId, parse_log_time};
use serde::Serialize;

/// 필드 구분자
pub const FIELD_DELIMITER: char = '|';

/// 한 라인의 필드 수
pub const FIELD_COUNT: usize = 5;

/// 기본 최대 라인 길이 (64KB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// 라인 디코딩 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// 타임스탬프 형식 오류
    #[error("invalid date \"{0}\"")]
    InvalidDate(String),

    /// 응답 코드가 정수가 아님
    #[error("invalid response code \"{0}\"")]
    InvalidResponseCode(String),

    /// 필드 수 불일치
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// 최대 길이 초과
    #[error("line too long: {size} bytes (max: {max})")]
    TooLong { size: usize, max: usize },

    /// UTF-8이 아닌 입력
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// 에이전트 해석 전 디코딩 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedLine {
    pub time: DateTime<Utc>,
    pub ip: String,
    pub request: String,
    pub response_code: i32,
    /// 원본 에이전트 설명 (빈 문자열일 수 있음)
    pub agent: String,
}

impl DecodedLine {
    /// 해석된 에이전트 ID를 붙여 [`AccessEvent`]로 변환합니다.
    pub fn into_event(self, agent_id: Option<AgentId>) -> AccessEvent {
        AccessEvent::new(self.time, self.ip, self.request, self.response_code).with_agent(agent_id)
    }
}

/// 라인 디코더
#[derive(Debug, Clone)]
pub struct LineDecoder {
    max_line_length: usize,
}

impl LineDecoder {
    /// 최대 라인 길이를 지정하여 디코더를 생성합니다.
    pub fn new(max_line_length: usize) -> Self {
        Self { max_line_length }
    }

    /// 허용 최대 라인 길이 (바이트)
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// 원시 바이트를 디코딩합니다. 길이 검사를 UTF-8 검증보다 먼저 수행합니다.
    pub fn decode_bytes(&self, raw: &[u8]) -> Result<DecodedLine, DecodeError> {
        self.check_length(raw.len())?;
        let line = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)?;
        self.decode(line)
    }

    /// 한 라인을 디코딩합니다.
    ///
    /// 끝의 `\r\n`/`\n`은 제거하며, 필드 값은 다듬지 않고 그대로 보존합니다.
    pub fn decode(&self, raw: &str) -> Result<DecodedLine, DecodeError> {
        self.check_length(raw.len())?;
        let line = trim_line_ending(raw);

        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        let [time, ip, request, code, agent] = fields.as_slice() else {
            return Err(DecodeError::FieldCount {
                expected: FIELD_COUNT,
                found: fields.len(),
            });
        };

        let time =
            parse_log_time(time).ok_or_else(|| DecodeError::InvalidDate((*time).to_owned()))?;
        let response_code = code
            .parse::<i32>()
            .map_err(|_| DecodeError::InvalidResponseCode((*code).to_owned()))?;

        Ok(DecodedLine {
            time,
            ip: (*ip).to_owned(),
            request: (*request).to_owned(),
            response_code,
            agent: (*agent).to_owned(),
        })
    }

    fn check_length(&self, size: usize) -> Result<(), DecodeError> {
        if size > self.max_line_length {
            return Err(DecodeError::TooLong {
                size,
                max: self.max_line_length,
            });
        }
        Ok(())
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

/// 줄바꿈 문자를 제거합니다.
pub(crate) fn trim_line_ending(raw: &str) -> &str {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    line.strip_suffix('\r').unwrap_or(line)
}
