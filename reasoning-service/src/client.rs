//! Provider-agnostic reasoning client.
//!
//! Construct once (usually via [`ReasoningClient::from_env`]) and share it;
//! clones are cheap because each provider client sits behind an `Arc`.

use std::{sync::Arc, time::Duration};

use tracing::warn;

use crate::{
    CompletionOptions, ReasoningService,
    config::{default_config::config_from_env, llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{ReasoningError, Result},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

#[derive(Debug, Clone)]
enum Backend {
    OpenAi(Arc<OpenAiService>),
    Ollama(Arc<OllamaService>),
}

/// Reasoning backend selected at startup.
///
/// `deadline` is an optional caller-side timeout applied on top of the HTTP
/// client timeout; exceeding it yields [`ReasoningError::Timeout`].
#[derive(Debug, Clone)]
pub struct ReasoningClient {
    backend: Backend,
    model: String,
    deadline: Option<Duration>,
}

impl ReasoningClient {
    /// Builds the client for `cfg.provider`.
    pub fn from_config(cfg: LlmModelConfig) -> Result<Self> {
        let model = cfg.model.clone();
        let backend = match cfg.provider {
            LlmProvider::OpenAI => Backend::OpenAi(Arc::new(OpenAiService::new(cfg)?)),
            LlmProvider::Ollama => Backend::Ollama(Arc::new(OllamaService::new(cfg)?)),
        };
        Ok(Self {
            backend,
            model,
            deadline: None,
        })
    }

    /// Loads config from the environment (see `config::default_config`).
    pub fn from_env() -> Result<Self> {
        Self::from_config(config_from_env()?)
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn dispatch(&self, system: &str, user: &str, opts: CompletionOptions) -> Result<String> {
        match &self.backend {
            Backend::OpenAi(svc) => svc.generate(system, user, opts).await,
            Backend::Ollama(svc) => svc.generate(system, user, opts).await,
        }
    }
}

impl ReasoningService for ReasoningClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str, opts: CompletionOptions) -> Result<String> {
        match self.deadline {
            None => self.dispatch(system, user, opts).await,
            Some(limit) => match tokio::time::timeout(limit, self.dispatch(system, user, opts)).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(model = %self.model, ?limit, "reasoning call exceeded deadline");
                    Err(ReasoningError::Timeout(limit))
                }
            },
        }
    }
}
