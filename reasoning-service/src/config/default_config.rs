//! Reasoning-service config loaded from environment variables.
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`          = `openai` (default) or `ollama`
//! - `LLM_MAX_TOKENS`    = optional max tokens (u32)
//! - `LLM_TEMPERATURE`   = optional default temperature (0.0..=2.0)
//! - `LLM_TIMEOUT_SECS`  = optional HTTP timeout
//!
//! OpenAI-compatible:
//! - `OPENAI_API_KEY` (required)
//! - `OPENAI_URL`     (default `https://api.openai.com`)
//! - `OPENAI_MODEL`   (default `gpt-4o-mini`)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` (required)
//! - `OLLAMA_MODEL` (required)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        ConfigError, ReasoningError, env_opt, env_opt_f32, env_opt_u32, env_opt_u64, must_env,
        validate_http_endpoint, validate_range_f32,
    },
};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Builds the config for whichever provider `LLM_KIND` selects.
pub fn config_from_env() -> Result<LlmModelConfig, ReasoningError> {
    let kind = match env_opt("LLM_KIND") {
        Some(k) => k.parse::<LlmProvider>()?,
        None => LlmProvider::OpenAI,
    };
    let cfg = match kind {
        LlmProvider::OpenAI => config_openai()?,
        LlmProvider::Ollama => config_ollama()?,
    };
    validate(&cfg)?;
    Ok(cfg)
}

/// OpenAI-compatible chat completions.
pub fn config_openai() -> Result<LlmModelConfig, ReasoningError> {
    let endpoint = env_opt("OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
    let api_key = must_env("OPENAI_API_KEY")?;
    let model = env_opt("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: env_opt_f32("LLM_TEMPERATURE")?,
        top_p: None,
        timeout_secs: env_opt_u64("LLM_TIMEOUT_SECS")?,
    })
}

/// Local Ollama server.
pub fn config_ollama() -> Result<LlmModelConfig, ReasoningError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("OLLAMA_MODEL")?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: env_opt_f32("LLM_TEMPERATURE")?,
        top_p: None,
        timeout_secs: env_opt_u64("LLM_TIMEOUT_SECS")?,
    })
}

/// Resolves the Ollama endpoint.
///
/// Precedence: `OLLAMA_URL`, then `OLLAMA_PORT` → `http://localhost:{port}`.
fn ollama_endpoint() -> Result<String, ReasoningError> {
    if let Some(url) = env_opt("OLLAMA_URL") {
        return Ok(url);
    }
    if let Some(port) = env_opt("OLLAMA_PORT") {
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Err(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT").into())
}

/// Checks endpoint scheme, model name and sampling range.
pub fn validate(cfg: &LlmModelConfig) -> Result<(), ReasoningError> {
    let var = match cfg.provider {
        LlmProvider::OpenAI => "OPENAI_URL",
        LlmProvider::Ollama => "OLLAMA_URL",
    };
    validate_http_endpoint(var, cfg.endpoint.trim())?;
    if cfg.model.trim().is_empty() {
        return Err(ConfigError::EmptyModel.into());
    }
    if let Some(t) = cfg.temperature {
        validate_range_f32("temperature", t, 0.0, 2.0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(endpoint: &str, model: &str, temperature: Option<f32>) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: model.into(),
            endpoint: endpoint.into(),
            api_key: Some("sk-test".into()),
            max_tokens: None,
            temperature,
            top_p: None,
            timeout_secs: None,
        }
    }

    #[test]
    fn validate_rejects_bad_configs() {
        assert!(validate(&cfg("https://api.openai.com", "gpt-4o-mini", Some(0.3))).is_ok());
        assert!(validate(&cfg("api.openai.com", "gpt-4o-mini", None)).is_err());
        assert!(validate(&cfg("https://api.openai.com", "  ", None)).is_err());
        assert!(validate(&cfg("https://api.openai.com", "gpt-4o-mini", Some(3.0))).is_err());
    }
}
