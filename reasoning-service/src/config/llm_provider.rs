use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Backend used for reasoning-service completions.
///
/// Selected via `LLM_KIND` (`openai` / `chatgpt` or `ollama`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local Ollama runtime.
    Ollama,
    /// OpenAI-compatible chat completions API.
    OpenAI,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_kinds_case_insensitively() {
        assert_eq!("OpenAI".parse::<LlmProvider>().ok(), Some(LlmProvider::OpenAI));
        assert_eq!("chatgpt".parse::<LlmProvider>().ok(), Some(LlmProvider::OpenAI));
        assert_eq!(" ollama ".parse::<LlmProvider>().ok(), Some(LlmProvider::Ollama));
        assert!("anthropic".parse::<LlmProvider>().is_err());
    }
}
