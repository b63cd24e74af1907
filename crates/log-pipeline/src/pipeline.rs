//! 수집 파이프라인 오케스트레이션 -- 파일을 한 줄씩 디코딩/해석/저장합니다.
//!
//! # 내부 흐름
//! ```text
//! BufReader (순차) -> LineDecoder -> [Semaphore(workers)] -> spawn_blocking {
//!     AgentResolver -> EventWriter
//! } -> IngestReport
//! ```
//!
//! 파일 읽기는 항상 한 태스크에서 순차적으로 이루어지고, 에이전트 해석과 저장만
//! 블로킹 풀에서 최대 `workers`개까지 동시에 실행됩니다. `workers = 1`이면
//! 이전 라인의 저장이 끝난 뒤에 다음 라인을 시작하므로 파일 순서가 유지됩니다.
//! 라인 단위 실패는 리포트에 기록하고 다음 라인으로 진행합니다.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use logwarden_core::metrics as m;
use logwarden_core::store::AccessLogStore;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::agent::{AgentResolver, Resolution};
use crate::config::PipelineConfig;
use crate::decoder::{DecodeError, DecodedLine, LineDecoder};
use crate::error::{LogPipelineError, WriteError};
use crate::report::{FailureKind, IngestReport, LineFailure, LineOutcome};
use crate::writer::EventWriter;

/// 파이프라인 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IngestState {
    /// 생성됨, 아직 실행하지 않음
    Ready,
    /// 파일을 읽는 중
    Reading,
    /// 파일 끝까지 처리 완료
    Drained,
}

/// 액세스 로그 수집 파이프라인
///
/// # 사용 예시
/// ```ignore
/// use logwarden_log_pipeline::{IngestionPipeline, PipelineConfig};
///
/// let mut pipeline = IngestionPipeline::new(PipelineConfig::default(), store)?;
/// let report = pipeline.run("access.log").await?;
/// println!("stored {} events", report.stored);
/// ```
pub struct IngestionPipeline {
    config: PipelineConfig,
    state: IngestState,
    decoder: LineDecoder,
    resolver: Arc<AgentResolver>,
    writer: Arc<EventWriter>,
}

impl IngestionPipeline {
    /// 새 에이전트 캐시로 파이프라인을 생성합니다.
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn AccessLogStore>,
    ) -> Result<Self, LogPipelineError> {
        let resolver = Arc::new(AgentResolver::new(Arc::clone(&store)));
        Self::with_resolver(config, store, resolver)
    }

    /// 외부에서 소유한 에이전트 해석기(캐시)를 주입하여 파이프라인을 생성합니다.
    pub fn with_resolver(
        config: PipelineConfig,
        store: Arc<dyn AccessLogStore>,
        resolver: Arc<AgentResolver>,
    ) -> Result<Self, LogPipelineError> {
        config.validate()?;
        Ok(Self {
            decoder: LineDecoder::new(config.max_line_length),
            writer: Arc::new(EventWriter::new(store)),
            resolver,
            state: IngestState::Ready,
            config,
        })
    }

    /// 현재 상태를 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            IngestState::Ready => "ready",
            IngestState::Reading => "reading",
            IngestState::Drained => "drained",
        }
    }

    /// 에이전트 해석기에 대한 참조를 반환합니다.
    pub fn resolver(&self) -> &Arc<AgentResolver> {
        &self.resolver
    }

    /// 액세스 로그 파일 전체를 수집합니다.
    ///
    /// # Errors
    ///
    /// 파일을 열 수 없거나 일반 파일이 아니면 아무 라인도 처리하지 않고
    /// `LogPipelineError::Source`를 반환합니다. 라인 단위 실패는 에러가 아니라
    /// 리포트에 기록됩니다.
    pub async fn run(&mut self, path: impl AsRef<Path>) -> Result<IngestReport, LogPipelineError> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let file = open_source(path).await?;

        self.state = IngestState::Reading;
        info!(
            source = %source,
            workers = self.config.workers,
            "starting ingestion"
        );

        let started = Instant::now();
        let mut report = IngestReport::new(source.clone());
        let max_failures = self.config.max_reported_failures;
        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut tasks: JoinSet<LineOutcome> = JoinSet::new();

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut line_number: u64 = 0;
        let max_line_length = self.decoder.max_line_length();
        // 최대 길이에 `\r\n`까지 담을 수 있는 만큼만 버퍼에 읽음
        let read_limit = (max_line_length as u64).saturating_add(2);

        loop {
            buf.clear();
            match (&mut reader)
                .take(read_limit)
                .read_until(b'\n', &mut buf)
                .await
            {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(source = %source, line = line_number + 1, error = %e, "read failed, stopping");
                    report.read_error = Some(e.to_string());
                    break;
                }
            }
            line_number += 1;
            report.lines_read += 1;
            metrics::counter!(m::LOG_PIPELINE_LINES_READ_TOTAL).increment(1);

            if buf.len() as u64 == read_limit && !buf.ends_with(b"\n") {
                let skipped = match skip_rest_of_line(&mut reader).await {
                    Ok(skipped) => skipped,
                    Err(e) => {
                        warn!(source = %source, line = line_number, error = %e, "read failed, stopping");
                        report.read_error = Some(e.to_string());
                        break;
                    }
                };
                let e = DecodeError::TooLong {
                    size: buf.len() + skipped,
                    max: max_line_length,
                };
                debug!(line = line_number, error = %e, "invalid line, ignoring");
                record(
                    &mut report,
                    failure(line_number, FailureKind::Decode, e.to_string()),
                    max_failures,
                );
                continue;
            }

            let raw = trim_line_ending(&buf);
            if raw.is_empty() {
                report.blank_lines += 1;
                continue;
            }

            let decoded = match self.decoder.decode_bytes(raw) {
                Ok(decoded) => decoded,
                Err(e) => {
                    debug!(line = line_number, error = %e, "invalid line, ignoring");
                    record(
                        &mut report,
                        failure(line_number, FailureKind::Decode, e.to_string()),
                        max_failures,
                    );
                    continue;
                }
            };

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| LogPipelineError::Task(e.to_string()))?;
            let resolver = Arc::clone(&self.resolver);
            let writer = Arc::clone(&self.writer);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                persist_line(&resolver, &writer, line_number, decoded)
            });

            while let Some(done) = tasks.try_join_next() {
                record(&mut report, joined(done)?, max_failures);
            }
        }

        while let Some(done) = tasks.join_next().await {
            record(&mut report, joined(done)?, max_failures);
        }

        let elapsed = started.elapsed();
        report.finish(elapsed.as_millis() as u64);
        metrics::histogram!(m::LOG_PIPELINE_INGEST_DURATION_SECONDS).record(elapsed.as_secs_f64());
        self.state = IngestState::Drained;

        info!(
            source = %source,
            lines = report.lines_read,
            stored = report.stored,
            already_processed = report.already_processed,
            decode_errors = report.decode_errors,
            storage_errors = report.storage_errors,
            agents_cached = self.resolver.cached_len(),
            elapsed_ms = report.elapsed_ms,
            "ingestion finished"
        );
        Ok(report)
    }
}

/// 입력 파일을 열고 일반 파일인지 확인합니다.
async fn open_source(path: &Path) -> Result<tokio::fs::File, LogPipelineError> {
    let source_error = |reason: String| LogPipelineError::Source {
        path: path.display().to_string(),
        reason,
    };

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| source_error(e.to_string()))?;
    let metadata = file
        .metadata()
        .await
        .map_err(|e| source_error(e.to_string()))?;
    if !metadata.is_file() {
        return Err(source_error("not a regular file".to_owned()));
    }
    Ok(file)
}

/// 다음 줄바꿈까지 남은 바이트를 버퍼에 담지 않고 건너뜁니다.
///
/// 건너뛴 바이트 수를 반환하며, 줄바꿈 자체는 세지 않습니다.
async fn skip_rest_of_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<usize> {
    let mut skipped = 0;
    loop {
        let (consumed, newline) = {
            let chunk = reader.fill_buf().await?;
            if chunk.is_empty() {
                return Ok(skipped);
            }
            match chunk.iter().position(|&b| b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (chunk.len(), false),
            }
        };
        reader.consume(consumed);
        if newline {
            return Ok(skipped + consumed - 1);
        }
        skipped += consumed;
    }
}

/// 라인 하나의 에이전트를 해석하고 이벤트를 저장합니다. 블로킹 풀에서 실행됩니다.
fn persist_line(
    resolver: &AgentResolver,
    writer: &EventWriter,
    line_number: u64,
    line: DecodedLine,
) -> LineOutcome {
    let agent_id = match resolver.resolve(&line.agent) {
        Ok(resolution) => resolution.map(Resolution::id),
        Err(e) => {
            warn!(line = line_number, error = %e, "agent resolution failed");
            return failure(line_number, FailureKind::Storage, format!("agent: {e}"));
        }
    };

    let event = line.into_event(agent_id);
    match writer.write(&event) {
        Ok(_) => LineOutcome::Stored,
        Err(WriteError::AlreadyProcessed) => {
            debug!(line = line_number, "line already processed, ignoring");
            LineOutcome::AlreadyProcessed
        }
        Err(e) => {
            warn!(line = line_number, error = %e, "failed to store event");
            failure(line_number, FailureKind::Storage, e.to_string())
        }
    }
}

fn failure(line_number: u64, kind: FailureKind, reason: String) -> LineOutcome {
    LineOutcome::Failed(LineFailure {
        line_number,
        kind,
        reason,
    })
}

fn joined(result: Result<LineOutcome, JoinError>) -> Result<LineOutcome, LogPipelineError> {
    result.map_err(|e| LogPipelineError::Task(e.to_string()))
}

/// 결과를 리포트와 메트릭에 반영합니다.
fn record(report: &mut IngestReport, outcome: LineOutcome, max_failures: usize) {
    match &outcome {
        LineOutcome::Stored => {
            metrics::counter!(m::LOG_PIPELINE_EVENTS_STORED_TOTAL).increment(1);
        }
        LineOutcome::AlreadyProcessed => {
            metrics::counter!(m::LOG_PIPELINE_LINES_SKIPPED_TOTAL).increment(1);
        }
        LineOutcome::Failed(f) => {
            metrics::counter!(m::LOG_PIPELINE_LINE_FAILURES_TOTAL, m::LABEL_KIND => f.kind.as_str())
                .increment(1);
        }
    }
    report.record(outcome, max_failures);
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    line.strip_suffix(b"\r").unwrap_or(line)
}
