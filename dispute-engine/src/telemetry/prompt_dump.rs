//! Prompt dumps for offline inspection.
//!
//! When a dump directory is configured, every prompt sent to the reasoning
//! service is written to `<dir>/<contact>/<stage>/<NNN>_<name>.txt` with
//! SSN-like and long digit runs redacted. Dumping never fails the caller.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use tokio::fs;
use tracing::{debug, warn};

static SSN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid ssn regex"));
static LONG_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{9,}").expect("valid digit-run regex"));

/// Masks SSN-shaped values and digit runs of nine or more.
pub fn redact(s: &str) -> String {
    let s = SSN_RE.replace_all(s, "[REDACTED]");
    LONG_DIGITS_RE.replace_all(&s, "[REDACTED]").into_owned()
}

/// Keeps path segments to `[A-Za-z0-9._-]`.
fn sanitize_segment(s: &str) -> String {
    let out: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.chars().all(|c| c == '.') {
        "-".to_string()
    } else {
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptDump {
    dir: Option<PathBuf>,
}

impl PromptDump {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Writes one prompt. Returns the file path when something was written.
    pub async fn dump(
        &self,
        contact_id: &str,
        stage: &str,
        idx: usize,
        name: &str,
        prompt: &str,
    ) -> Option<PathBuf> {
        let root = self.dir.as_deref()?;
        let dir = stage_dir(root, contact_id, stage);
        let file = dir.join(format!("{idx:03}_{}.txt", sanitize_segment(name)));
        let content = redact(prompt);

        if let Err(e) = fs::create_dir_all(&dir).await {
            warn!(dir = %dir.display(), error = %e, "prompt dump: cannot create directory");
            return None;
        }
        if let Err(e) = fs::write(&file, &content).await {
            warn!(file = %file.display(), error = %e, "prompt dump: write failed");
            return None;
        }
        debug!(
            stage,
            idx,
            file = %file.display(),
            len = content.chars().count(),
            "prompt dumped"
        );
        Some(file)
    }
}

fn stage_dir(root: &Path, contact_id: &str, stage: &str) -> PathBuf {
    root.join(sanitize_segment(contact_id))
        .join(sanitize_segment(stage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_ssn_and_account_numbers() {
        let out = redact("SSN 123-45-6789, acct 4111111111111111, balance 500");
        assert_eq!(out, "SSN [REDACTED], acct [REDACTED], balance 500");
    }

    #[test]
    fn segments_cannot_escape() {
        assert_eq!(sanitize_segment("../etc"), ".._etc");
        assert_eq!(sanitize_segment(".."), "-");
        assert_eq!(sanitize_segment("a b/c"), "a_b_c");
    }

    #[tokio::test]
    async fn writes_under_contact_and_stage() {
        let tmp = tempfile::tempdir().unwrap();
        let dump = PromptDump::new(Some(tmp.path().to_path_buf()));
        let path = dump
            .dump("c1", "letters", 3, "d1_TU_formal", "ssn 123-45-6789")
            .await
            .unwrap();
        assert_eq!(path, tmp.path().join("c1").join("letters").join("003_d1_TU_formal.txt"));
        let body = std::fs::read_to_string(path).unwrap();
        assert_eq!(body, "ssn [REDACTED]");
    }

    #[tokio::test]
    async fn disabled_writes_nothing() {
        assert!(PromptDump::disabled().dump("c1", "s", 0, "n", "p").await.is_none());
    }
}
