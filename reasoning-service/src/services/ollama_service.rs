//! Ollama client for text generation.
//!
//! - `POST {endpoint}/api/generate` with `stream=false`
//!
//! The system instructions travel in the dedicated `system` field so the
//! model template wraps them correctly.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::{
    CompletionOptions,
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        HttpError, Provider, ProviderError, ProviderErrorKind, ReasoningError, make_snippet,
    },
};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Thin client for a local Ollama server.
#[derive(Debug)]
pub struct OllamaService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_generate: String,
}

impl OllamaService {
    /// Creates a new [`OllamaService`] from the given config.
    ///
    /// # Errors
    /// - `InvalidProvider` if `cfg.provider` is not `Ollama`
    /// - `InvalidEndpoint` if `cfg.endpoint` is invalid
    /// - [`ReasoningError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, ReasoningError> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(
                ProviderError::new(Provider::Ollama, ProviderErrorKind::InvalidProvider).into(),
            );
        }

        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                cfg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()?;

        let url_generate = format!("{}/api/generate", endpoint.trim_end_matches('/'));

        Ok(Self {
            client,
            cfg,
            url_generate,
        })
    }

    /// Non-streaming generation via `/api/generate`.
    ///
    /// Mapped options:
    /// - `num_predict` ← `opts.max_tokens`, else `cfg.max_tokens`
    /// - `temperature` ← `opts.temperature`, else `cfg.temperature`
    /// - `top_p`       ← `cfg.top_p`
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn generate(
        &self,
        system: &str,
        prompt: &str,
        opts: CompletionOptions,
    ) -> Result<String, ReasoningError> {
        let started = Instant::now();
        let body = GenerateRequest::build(&self.cfg, system, prompt, opts);

        debug!(prompt_len = prompt.len(), "POST {}", self.url_generate);
        let resp = self
            .client
            .post(&self.url_generate)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_generate.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);
            error!(%status, %url, %snippet, "ollama generate returned non-success status");
            return Err(ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url,
                    snippet,
                }),
            )
            .into());
        }

        let out: GenerateResponse = resp.json().await.map_err(|e| {
            ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::Decode(format!("serde error: {e}; ensure `stream=false` is used")),
            )
        })?;

        if out.response.trim().is_empty() {
            return Err(ProviderError::new(Provider::Ollama, ProviderErrorKind::EmptyChoices).into());
        }

        debug!(
            latency_ms = started.elapsed().as_millis(),
            response_len = out.response.len(),
            "ollama generate completed"
        );
        Ok(out.response)
    }
}

/* ==========================
HTTP payloads & options
========================== */

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

impl<'a> GenerateRequest<'a> {
    fn build(
        cfg: &'a LlmModelConfig,
        system: &'a str,
        prompt: &'a str,
        opts: CompletionOptions,
    ) -> Self {
        Self {
            model: &cfg.model,
            system,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: opts.temperature.or(cfg.temperature),
                top_p: cfg.top_p,
                num_predict: opts.max_tokens.or(cfg.max_tokens),
            },
        }
    }
}

/// Subset of Ollama `options`.
#[derive(Debug, Default, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_carries_system_and_options() {
        let cfg = LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "qwen3:14b".into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            max_tokens: None,
            temperature: Some(0.1),
            top_p: Some(0.9),
            timeout_secs: None,
        };
        let req = GenerateRequest::build(
            &cfg,
            "be precise",
            "hello",
            CompletionOptions {
                temperature: None,
                max_tokens: Some(4000),
            },
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["system"], "be precise");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 4000);
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }
}
