//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 액세스 이벤트, 에이전트 행, 차단 IP 레코드와 차단 판정에 쓰이는
//! 시간 윈도우/임계값 타입을 정의합니다.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 액세스 로그의 타임스탬프 형식 (`2017-01-01 00:01:08.028`, UTC)
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// 윈도우 시작 시각 형식 (`2017-01-01.13:00:00`, UTC)
pub const START_DATE_FORMAT: &str = "%Y-%m-%d.%H:%M:%S";

/// 윈도우 시작 시각으로 함께 허용하는 보조 형식
const START_DATE_FALLBACK_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// 에이전트 행 식별자
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AgentId(pub i64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 액세스 이벤트
///
/// 유효한 로그 라인 하나당 한 번 생성되며 이후 변경되지 않습니다.
/// `agent_id`는 원본 에이전트 문자열이 비어 있을 때만 `None`입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    /// 요청 시각 (UTC)
    pub time: DateTime<Utc>,
    /// 클라이언트 IP
    pub ip: String,
    /// HTTP 요청 라인
    pub request: String,
    /// HTTP 응답 코드
    pub response_code: i32,
    /// 에이전트 참조
    pub agent_id: Option<AgentId>,
}

impl AccessEvent {
    /// 에이전트 없는 이벤트를 생성합니다.
    pub fn new(
        time: DateTime<Utc>,
        ip: impl Into<String>,
        request: impl Into<String>,
        response_code: i32,
    ) -> Self {
        Self {
            time,
            ip: ip.into(),
            request: request.into(),
            response_code,
            agent_id: None,
        }
    }

    /// 에이전트 참조를 설정합니다.
    pub fn with_agent(mut self, agent_id: Option<AgentId>) -> Self {
        self.agent_id = agent_id;
        self
    }
}

impl fmt::Display for AccessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} \"{}\" {}",
            format_log_time(&self.time),
            self.ip,
            self.request,
            self.response_code,
        )
    }
}

/// 에이전트 행 (User-Agent 문자열의 정규화된 참조)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub description: String,
}

/// 차단된 IP 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedIp {
    pub id: i64,
    pub ip: String,
    /// 차단 사유 (임계값, 윈도우 경계)
    pub reason: Option<String>,
}

/// IP별 요청 수 집계 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpCount {
    pub ip: String,
    pub count: u64,
}

/// 차단 판정 윈도우 길이
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowDuration {
    /// 1시간
    Hourly,
    /// 24시간
    Daily,
}

impl WindowDuration {
    /// 윈도우 길이를 chrono 기간으로 변환합니다.
    pub fn as_chrono(self) -> TimeDelta {
        match self {
            Self::Hourly => TimeDelta::hours(1),
            Self::Daily => TimeDelta::hours(24),
        }
    }
}

impl FromStr for WindowDuration {
    type Err = ConfigError;

    /// 대소문자를 구분하지 않습니다.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            other => Err(ConfigError::InvalidValue {
                field: "duration".to_owned(),
                reason: format!("'{other}' is not one of: hourly, daily"),
            }),
        }
    }
}

impl fmt::Display for WindowDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hourly => write!(f, "hourly"),
            Self::Daily => write!(f, "daily"),
        }
    }
}

/// 반개구간 시간 윈도우 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// 시작 시각과 윈도우 길이로 윈도우를 만듭니다.
    pub fn new(start: DateTime<Utc>, duration: WindowDuration) -> Self {
        Self {
            start,
            end: start + duration.as_chrono(),
        }
    }

    /// 임의의 경계로 윈도우를 만듭니다. `end`는 `start`보다 커야 합니다.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ConfigError> {
        if end <= start {
            return Err(ConfigError::InvalidValue {
                field: "window".to_owned(),
                reason: format!(
                    "window end {} must be after start {}",
                    format_log_time(&end),
                    format_log_time(&start)
                ),
            });
        }
        Ok(Self { start, end })
    }

    /// `start <= time < end` 여부를 반환합니다.
    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        self.start <= *time && *time < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format(START_DATE_FORMAT),
            self.end.format(START_DATE_FORMAT)
        )
    }
}

/// 임계값 비교 방식
///
/// 기본값은 `Exceeds`(요청 수가 임계값을 초과해야 차단)입니다.
/// `AtLeast`는 임계값과 같은 경우도 차단하는 레거시 동작입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// `count > threshold`
    #[default]
    Exceeds,
    /// `count >= threshold`
    AtLeast,
}

impl ThresholdMode {
    /// 집계 수가 차단 대상인지 판정합니다.
    pub fn admits(self, count: u64, threshold: u64) -> bool {
        count >= self.min_count(threshold)
    }

    /// 차단 대상이 되는 최소 집계 수를 반환합니다.
    pub fn min_count(self, threshold: u64) -> u64 {
        match self {
            Self::Exceeds => threshold.saturating_add(1),
            Self::AtLeast => threshold,
        }
    }
}

impl FromStr for ThresholdMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exceeds" => Ok(Self::Exceeds),
            "at_least" | "at-least" => Ok(Self::AtLeast),
            other => Err(ConfigError::InvalidValue {
                field: "threshold_mode".to_owned(),
                reason: format!("'{other}' is not one of: exceeds, at_least"),
            }),
        }
    }
}

impl fmt::Display for ThresholdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exceeds => write!(f, "exceeds"),
            Self::AtLeast => write!(f, "at_least"),
        }
    }
}

/// 차단 사유 문자열을 생성합니다.
pub fn block_reason(mode: ThresholdMode, threshold: u64, window: &TimeWindow) -> String {
    let qualifier = match mode {
        ThresholdMode::Exceeds => "More than",
        ThresholdMode::AtLeast => "At least",
    };
    format!(
        "{} {} access between {} and {}",
        qualifier,
        threshold,
        window.start.format(START_DATE_FORMAT),
        window.end.format(START_DATE_FORMAT)
    )
}

/// 액세스 로그 타임스탬프를 파싱합니다 (UTC).
///
/// 밀리초 세 자리까지 정확히 `yyyy-MM-dd HH:mm:ss.SSS` 형식이어야 합니다.
/// 형식이 맞지 않으면 `None`을 반환합니다.
pub fn parse_log_time(raw: &str) -> Option<DateTime<Utc>> {
    // `%.3f`는 소수부 생략을 허용하므로 길이와 구분자를 먼저 확인
    let bytes = raw.as_bytes();
    if bytes.len() != 23 || bytes[19] != b'.' || !bytes[20..].iter().all(u8::is_ascii_digit) {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, LOG_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// 타임스탬프를 액세스 로그 형식으로 포맷합니다.
pub fn format_log_time(time: &DateTime<Utc>) -> String {
    time.format(LOG_TIME_FORMAT).to_string()
}

/// 윈도우 시작 시각을 파싱합니다 (UTC).
///
/// 기본 형식은 `yyyy-MM-dd.HH:mm:ss`이며, 공백 또는 `T` 구분자도 허용합니다.
pub fn parse_start_date(raw: &str) -> Result<DateTime<Utc>, ConfigError> {
    let raw = raw.trim();
    std::iter::once(START_DATE_FORMAT)
        .chain(START_DATE_FALLBACK_FORMATS)
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ConfigError::InvalidValue {
            field: "start_date".to_owned(),
            reason: format!("'{raw}' does not match yyyy-MM-dd.HH:mm:ss"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 1, 1, h, m, s).unwrap()
    }

    #[test]
    fn parse_log_time_keeps_millis() {
        let t = parse_log_time("2017-01-01 00:01:08.028").unwrap();
        assert_eq!(t.timestamp_millis() % 1000, 28);
        assert_eq!(format_log_time(&t), "2017-01-01 00:01:08.028");
    }

    #[test]
    fn parse_log_time_rejects_garbage() {
        assert!(parse_log_time("yesterday").is_none());
        assert!(parse_log_time("2017-13-01 00:00:00.000").is_none());
    }

    #[test]
    fn parse_log_time_requires_three_fraction_digits() {
        assert!(parse_log_time("2017-01-01 00:00:11").is_none());
        assert!(parse_log_time("2017-01-01 00:00:11.").is_none());
        assert!(parse_log_time("2017-01-01 00:00:11.7").is_none());
        assert!(parse_log_time("2017-01-01 00:00:11.763456").is_none());
        assert!(parse_log_time("2017-01-01 00:00:11.76x").is_none());
        assert!(parse_log_time("2017-01-01 00:00:11.763").is_some());
    }

    #[test]
    fn parse_start_date_accepts_dotted_format() {
        let t = parse_start_date("2017-01-01.13:00:00").unwrap();
        assert_eq!(t, at(13, 0, 0));
    }

    #[test]
    fn parse_start_date_accepts_space_separator() {
        let t = parse_start_date("2017-01-01 13:00:00").unwrap();
        assert_eq!(t, at(13, 0, 0));
    }

    #[test]
    fn parse_start_date_rejects_invalid() {
        let err = parse_start_date("01/01/2017").unwrap_err();
        assert!(err.to_string().contains("start_date"));
    }

    #[test]
    fn window_duration_from_str_is_case_insensitive() {
        assert_eq!("HOURLY".parse::<WindowDuration>().unwrap(), WindowDuration::Hourly);
        assert_eq!("daily".parse::<WindowDuration>().unwrap(), WindowDuration::Daily);
        assert!("weekly".parse::<WindowDuration>().is_err());
    }

    #[test]
    fn hourly_window_spans_one_hour() {
        let window = TimeWindow::new(at(13, 0, 0), WindowDuration::Hourly);
        assert_eq!(window.end, at(14, 0, 0));
    }

    #[test]
    fn daily_window_spans_one_day() {
        let window = TimeWindow::new(at(0, 0, 0), WindowDuration::Daily);
        assert_eq!(window.end - window.start, TimeDelta::hours(24));
    }

    #[test]
    fn window_is_half_open() {
        let window = TimeWindow::new(at(13, 0, 0), WindowDuration::Hourly);
        assert!(window.contains(&at(13, 0, 0)));
        assert!(window.contains(&at(13, 59, 59)));
        assert!(!window.contains(&at(14, 0, 0)));
        assert!(!window.contains(&at(12, 59, 59)));
    }

    #[test]
    fn between_rejects_empty_window() {
        assert!(TimeWindow::between(at(13, 0, 0), at(13, 0, 0)).is_err());
        assert!(TimeWindow::between(at(13, 0, 0), at(12, 0, 0)).is_err());
        assert!(TimeWindow::between(at(12, 0, 0), at(13, 0, 0)).is_ok());
    }

    #[test]
    fn exceeds_mode_excludes_equal_count() {
        let mode = ThresholdMode::Exceeds;
        assert!(!mode.admits(10, 10));
        assert!(mode.admits(11, 10));
    }

    #[test]
    fn at_least_mode_includes_equal_count() {
        let mode = ThresholdMode::AtLeast;
        assert!(mode.admits(10, 10));
        assert!(!mode.admits(9, 10));
    }

    #[test]
    fn exceeds_min_count_saturates() {
        assert_eq!(ThresholdMode::Exceeds.min_count(u64::MAX), u64::MAX);
    }

    #[test]
    fn threshold_mode_default_is_exceeds() {
        assert_eq!(ThresholdMode::default(), ThresholdMode::Exceeds);
        assert_eq!("at-least".parse::<ThresholdMode>().unwrap(), ThresholdMode::AtLeast);
    }

    #[test]
    fn block_reason_mentions_threshold_and_bounds() {
        let window = TimeWindow::new(at(13, 0, 0), WindowDuration::Hourly);
        let reason = block_reason(ThresholdMode::Exceeds, 100, &window);
        assert_eq!(
            reason,
            "More than 100 access between 2017-01-01.13:00:00 and 2017-01-01.14:00:00"
        );
    }

    #[test]
    fn access_event_builder_sets_agent() {
        let event = AccessEvent::new(at(0, 0, 0), "10.0.0.1", "GET / HTTP/1.1", 200)
            .with_agent(Some(AgentId(7)));
        assert_eq!(event.agent_id, Some(AgentId(7)));
        assert!(event.to_string().contains("10.0.0.1"));
    }

    #[test]
    fn threshold_mode_serializes_snake_case() {
        let json = serde_json::to_string(&ThresholdMode::AtLeast).unwrap();
        assert_eq!(json, "\"at_least\"");
    }
}
