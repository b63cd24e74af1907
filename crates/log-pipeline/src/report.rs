//! 수집/차단 결과 리포트

use serde::Serialize;

/// 라인 실패 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 디코딩 실패
    Decode,
    /// 에이전트 해석 또는 이벤트 저장 실패
    Storage,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Storage => "storage",
        }
    }
}

/// 실패한 라인 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineFailure {
    /// 1부터 시작하는 라인 번호
    pub line_number: u64,
    pub kind: FailureKind,
    pub reason: String,
}

/// 한 라인의 처리 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Stored,
    AlreadyProcessed,
    Failed(LineFailure),
}

/// 수집 실행 요약
///
/// 카운터는 항상 정확하며, `failures` 목록만 `max_reported_failures`로 잘립니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// 입력 파일 경로
    pub source: String,
    /// 읽은 라인 수 (빈 라인 포함)
    pub lines_read: u64,
    /// 건너뛴 빈 라인 수
    pub blank_lines: u64,
    /// 새로 저장된 이벤트 수
    pub stored: u64,
    /// 이미 처리된 라인 수
    pub already_processed: u64,
    pub decode_errors: u64,
    pub storage_errors: u64,
    /// 상세 실패 목록 (라인 번호 순)
    pub failures: Vec<LineFailure>,
    /// 목록에서 생략된 실패 수
    pub failures_omitted: u64,
    /// 파일 중간에서 읽기가 중단된 경우의 사유
    pub read_error: Option<String>,
    /// 소요 시간 (밀리초)
    pub elapsed_ms: u64,
}

impl IngestReport {
    /// 빈 리포트를 생성합니다.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// 라인 결과를 반영합니다.
    pub fn record(&mut self, outcome: LineOutcome, max_reported_failures: usize) {
        match outcome {
            LineOutcome::Stored => self.stored += 1,
            LineOutcome::AlreadyProcessed => self.already_processed += 1,
            LineOutcome::Failed(failure) => {
                match failure.kind {
                    FailureKind::Decode => self.decode_errors += 1,
                    FailureKind::Storage => self.storage_errors += 1,
                }
                if self.failures.len() < max_reported_failures {
                    self.failures.push(failure);
                } else {
                    self.failures_omitted += 1;
                }
            }
        }
    }

    /// 실패 목록을 라인 번호 순으로 정렬합니다.
    ///
    /// 병렬 처리 시 완료 순서가 파일 순서와 다를 수 있습니다.
    pub fn finish(&mut self, elapsed_ms: u64) {
        self.failures.sort_by_key(|f| f.line_number);
        self.elapsed_ms = elapsed_ms;
    }

    /// 실패한 라인 수 (디코딩 + 스토리지)
    pub fn failed(&self) -> u64 {
        self.decode_errors + self.storage_errors
    }

    /// 모든 라인이 저장되었거나 이미 처리된 상태인지 여부
    pub fn is_clean(&self) -> bool {
        self.failed() == 0 && self.read_error.is_none()
    }
}

/// 차단 실패 IP
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockFailure {
    pub ip: String,
    pub reason: String,
}

/// 차단 실행 요약
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockReport {
    /// 새로 차단된 IP 수
    pub blocked: u64,
    /// 이미 차단되어 있던 IP 수
    pub already_blocked: u64,
    /// 차단 기록에 실패한 IP
    pub failed: Vec<BlockFailure>,
    /// 차단 상태가 된 IP (새로 차단 + 이미 차단), 판정 순서
    pub ips: Vec<String>,
}
