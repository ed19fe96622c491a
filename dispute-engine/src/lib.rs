//! Credit dispute pipeline.
//!
//! 1) **Resolve** the newest usable report for a subject (`resolver`)
//! 2) **Normalize and classify** it (`credit-report` crate)
//! 3) **Write cases**, skipping accounts that already have one (`writer`)
//! 4) **Schedule** pending cases into bounded rounds (`scheduler`)
//! 5) **Plan** a strategy per case, through the reasoning service or the
//!    static templates (`strategy`)
//! 6) **Draft letters** per case, bureau and tone (`letters`)
//!
//! [`DisputeEngine`] wraps all of it behind envelope-returning entry points.
//! The engine is generic over [`dispute_store::DocumentStore`] and
//! [`reasoning_service::ReasoningService`]; there is no `async-trait` and no
//! boxed store or client.

pub mod config;
pub mod errors;
pub mod letters;
pub mod pipeline;
pub mod records;
pub mod resolver;
pub mod scheduler;
pub mod strategy;
pub mod telemetry;
pub mod writer;

#[cfg(test)]
mod testutil;

pub use config::EngineConfig;
pub use errors::{EngineError, EngineResult};
pub use letters::{GeneratedLetter, LetterBatch, LetterFailure, LetterRequest, ToneSelection};
pub use pipeline::{DisputeEngine, PipelineResponse, PopulateReport};
pub use records::{CaseStatus, LetterTone};
pub use resolver::{ReportSource, ResolvedReport, ResolverBranch};
pub use scheduler::{RoundEntry, RoundManifest};
pub use strategy::StrategyOutcome;
pub use writer::{RunSummary, WriteSummary};
