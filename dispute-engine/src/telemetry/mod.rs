//! Log formatting for engine events, plus prompt dumps.

pub mod prompt_dump;

use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Target prefix of every event this crate emits.
pub const TARGET_PREFIX: &str = "dispute_engine";

/// RFC3339 UTC timestamps, whole seconds, `Z` suffix.
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

/// Formatting layer that renders only events emitted by the engine.
///
/// Compact single-line output with `file:line` and target. ANSI colors only
/// when stdout is a terminal. Other crates' events pass through untouched.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stdout().is_terminal();
    let only_this_crate = filter::filter_fn(|meta| meta.target().starts_with(TARGET_PREFIX));

    fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact().with_source_location(true))
        .with_filter(only_this_crate)
}

/// `dispute_engine=<level>`.
pub fn level_directive(level: Level) -> Result<Directive, ParseError> {
    Directive::from_str(&format!(
        "{TARGET_PREFIX}={}",
        level.as_str().to_lowercase()
    ))
}

/// `RUST_LOG` (or `default`) with the engine raised to `level`.
pub fn env_filter_with_level(default: &str, level: Level) -> Result<EnvFilter, ParseError> {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    Ok(base.add_directive(level_directive(level)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_targets_this_crate() {
        let d = level_directive(Level::DEBUG).unwrap();
        assert_eq!(d.to_string(), "dispute_engine=debug");
    }
}
