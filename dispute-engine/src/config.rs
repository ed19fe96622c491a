//! Engine configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `DISPUTE_MAX_PER_ROUND` | 7 |
//! | `DISPUTE_ROUND_SPACING_DAYS` | 30 |
//! | `DISPUTE_LETTER_CONCURRENCY` | 1 (sequential) |
//! | `DISPUTE_MIN_LETTER_CHARS` | 100 |
//! | `DISPUTE_STRATEGY_TEMPERATURE` / `DISPUTE_STRATEGY_MAX_TOKENS` | 0.3 / 4000 |
//! | `DISPUTE_LETTER_TEMPERATURE` / `DISPUTE_LETTER_MAX_TOKENS` | 0.7 / 2000 |
//! | `DISPUTE_PROMPT_DUMP_DIR` | unset (no dumps) |

use std::path::PathBuf;

use reasoning_service::{
    CompletionOptions,
    error_handler::{env_opt, env_opt_f32, env_opt_u32, validate_range_f32},
};

use crate::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_per_round: usize,
    pub round_spacing_days: u32,
    /// Outstanding letter requests; 1 keeps generation strictly sequential.
    pub letter_concurrency: usize,
    /// Responses shorter than this are not letters.
    pub min_letter_chars: usize,
    pub strategy_opts: CompletionOptions,
    pub letter_opts: CompletionOptions,
    pub prompt_dump_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_per_round: 7,
            round_spacing_days: 30,
            letter_concurrency: 1,
            min_letter_chars: 100,
            strategy_opts: CompletionOptions::new(0.3, 4000),
            letter_opts: CompletionOptions::new(0.7, 2000),
            prompt_dump_dir: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> EngineResult<Self> {
        let d = Self::default();
        let cfg = Self {
            max_per_round: env_opt_u32("DISPUTE_MAX_PER_ROUND")?
                .map_or(d.max_per_round, |v| v as usize),
            round_spacing_days: env_opt_u32("DISPUTE_ROUND_SPACING_DAYS")?
                .unwrap_or(d.round_spacing_days),
            letter_concurrency: env_opt_u32("DISPUTE_LETTER_CONCURRENCY")?
                .map_or(d.letter_concurrency, |v| v as usize),
            min_letter_chars: env_opt_u32("DISPUTE_MIN_LETTER_CHARS")?
                .map_or(d.min_letter_chars, |v| v as usize),
            strategy_opts: CompletionOptions {
                temperature: env_opt_f32("DISPUTE_STRATEGY_TEMPERATURE")?
                    .or(d.strategy_opts.temperature),
                max_tokens: env_opt_u32("DISPUTE_STRATEGY_MAX_TOKENS")?
                    .or(d.strategy_opts.max_tokens),
            },
            letter_opts: CompletionOptions {
                temperature: env_opt_f32("DISPUTE_LETTER_TEMPERATURE")?
                    .or(d.letter_opts.temperature),
                max_tokens: env_opt_u32("DISPUTE_LETTER_MAX_TOKENS")?.or(d.letter_opts.max_tokens),
            },
            prompt_dump_dir: env_opt("DISPUTE_PROMPT_DUMP_DIR").map(PathBuf::from),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.max_per_round == 0 {
            return Err(EngineError::Validation(
                "DISPUTE_MAX_PER_ROUND must be at least 1".into(),
            ));
        }
        if self.letter_concurrency == 0 {
            return Err(EngineError::Validation(
                "DISPUTE_LETTER_CONCURRENCY must be at least 1".into(),
            ));
        }
        for t in [self.strategy_opts.temperature, self.letter_opts.temperature]
            .into_iter()
            .flatten()
        {
            validate_range_f32("temperature", t, 0.0, 2.0)?;
        }
        Ok(())
    }
}
