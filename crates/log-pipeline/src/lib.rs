#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`decoder`]: `time|ip|request|code|agent` 라인 디코더
//! - [`agent`]: 캐시 기반 에이전트 find-or-create 해석기
//! - [`writer`]: 이벤트 저장기 (중복 = 이미 처리됨)
//! - [`pipeline`]: 파일 단위 수집 오케스트레이션
//! - [`block`]: 윈도우 집계 기반 차단 판정 및 기록
//! - [`report`]: 수집/차단 결과 요약
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입

pub mod agent;
pub mod block;
pub mod config;
pub mod decoder;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod writer;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::IngestionPipeline;

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::{LogPipelineError, WriteError};

// 구성 요소
pub use agent::{AgentResolver, Resolution};
pub use block::{BlockDecider, BlockWriter};
pub use decoder::{DecodeError, DecodedLine, LineDecoder};
pub use writer::EventWriter;

// 리포트
pub use report::{BlockFailure, BlockReport, FailureKind, IngestReport, LineFailure};
