//! Client for the external reasoning service.
//!
//! The dispute engine asks a language model for two things: a strategy plan
//! covering all open cases of a subject, and one letter per case and bureau.
//! This crate hides the concrete backend (OpenAI-compatible chat completions
//! or a local Ollama server) behind the [`ReasoningService`] trait so the
//! engine can be driven by a scripted stub in tests.

use std::future::Future;

pub mod client;
pub mod config;
pub mod error_handler;
pub mod services;

pub use client::ReasoningClient;
pub use error_handler::{ReasoningError, Result};

/// Per-request sampling overrides.
///
/// Values left as `None` fall back to the backend's configured defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
        }
    }
}

/// A text-completion backend: system instructions plus a user prompt in,
/// free text out.
///
/// Implementations must be cheap to share across tasks (`Send + Sync`);
/// the engine fans letter requests out with bounded concurrency.
pub trait ReasoningService: Send + Sync {
    fn complete(
        &self,
        system: &str,
        user: &str,
        opts: CompletionOptions,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Label recorded on generated artifacts.
    fn model_name(&self) -> &str {
        "ai"
    }
}

impl<T: ReasoningService> ReasoningService for std::sync::Arc<T> {
    fn complete(
        &self,
        system: &str,
        user: &str,
        opts: CompletionOptions,
    ) -> impl Future<Output = Result<String>> + Send {
        (**self).complete(system, user, opts)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
