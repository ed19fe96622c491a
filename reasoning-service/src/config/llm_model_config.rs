use crate::config::llm_provider::LlmProvider;

/// Configuration for one reasoning-service backend.
///
/// - `provider`: which backend to call (Ollama or OpenAI-compatible).
/// - `model`: model identifier (e.g. `"gpt-4o-mini"`, `"qwen3:14b"`).
/// - `endpoint`: base URL, without the `/v1/...` or `/api/...` suffix.
/// - `api_key`: bearer token for providers that require it.
/// - `max_tokens` / `temperature` / `top_p`: defaults applied when a request
///   does not override them.
/// - `timeout_secs`: HTTP client timeout. `None` means the client default.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub timeout_secs: Option<u64>,
}
