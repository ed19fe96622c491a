//! Payload classification ahead of normalization.

use std::str::FromStr;

use serde_json::Value;

/// Raw report payload as it arrives from a store record or an upload.
///
/// This is the only loosely-typed report value in the workspace; it is
/// converted to a [`crate::NormalizedReport`] immediately.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Structured(Value),
    Text(String),
    Binary(Vec<u8>),
}

impl From<Value> for RawPayload {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => RawPayload::Text(s),
            other => RawPayload::Structured(other),
        }
    }
}

/// Caller-supplied format hint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatHint {
    #[default]
    Auto,
    Json,
    Html,
    Pdf,
    Image,
    /// Already-extracted plain text (OCR / PDF output).
    Text,
}

impl FormatHint {
    /// Picks a hint from a file name extension; unknown extensions stay `Auto`.
    pub fn from_file_name(name: &str) -> FormatHint {
        let lower = name.to_ascii_lowercase();
        let ext = lower.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
        match ext {
            "pdf" => FormatHint::Pdf,
            "jpg" | "jpeg" | "png" | "gif" | "bmp" => FormatHint::Image,
            "json" => FormatHint::Json,
            "html" | "htm" => FormatHint::Html,
            "txt" => FormatHint::Text,
            _ => FormatHint::Auto,
        }
    }
}

impl FromStr for FormatHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(FormatHint::Auto),
            "json" => Ok(FormatHint::Json),
            "html" => Ok(FormatHint::Html),
            "pdf" => Ok(FormatHint::Pdf),
            "image" => Ok(FormatHint::Image),
            "text" | "txt" => Ok(FormatHint::Text),
            other => Err(format!("unknown format hint: {other}")),
        }
    }
}

/// Result of format detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    Json,
    Html,
    Pdf,
    Image,
    Text,
    Unknown,
}

impl DetectedFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectedFormat::Json => "json",
            DetectedFormat::Html => "html",
            DetectedFormat::Pdf => "pdf",
            DetectedFormat::Image => "image",
            DetectedFormat::Text => "text",
            DetectedFormat::Unknown => "unknown",
        }
    }
}

/// Resolves the parser path for a payload.
///
/// An explicit hint wins. With [`FormatHint::Auto`]:
/// - structured values are JSON;
/// - strings starting with `{`/`[` are JSON if they parse, else markup;
///   strings containing `<html`, `<body` or `<div` are markup; a `%PDF`
///   prefix is PDF; anything else defaults to markup;
/// - bytes are sniffed for `%PDF`, JPEG SOI and the PNG signature, and
///   otherwise reported as unknown.
pub fn detect_format(payload: &RawPayload, hint: FormatHint) -> DetectedFormat {
    match hint {
        FormatHint::Json => return DetectedFormat::Json,
        FormatHint::Html => return DetectedFormat::Html,
        FormatHint::Pdf => return DetectedFormat::Pdf,
        FormatHint::Image => return DetectedFormat::Image,
        FormatHint::Text => return DetectedFormat::Text,
        FormatHint::Auto => {}
    }

    match payload {
        RawPayload::Structured(_) => DetectedFormat::Json,
        RawPayload::Text(s) => detect_text(s),
        RawPayload::Binary(bytes) => sniff_bytes(bytes),
    }
}

fn detect_text(s: &str) -> DetectedFormat {
    let trimmed = s.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(_) => DetectedFormat::Json,
            Err(_) => DetectedFormat::Html,
        };
    }
    if s.contains("<html") || s.contains("<body") || s.contains("<div") {
        return DetectedFormat::Html;
    }
    if s.starts_with("%PDF") {
        return DetectedFormat::Pdf;
    }
    DetectedFormat::Html
}

fn sniff_bytes(bytes: &[u8]) -> DetectedFormat {
    if bytes.starts_with(b"%PDF") {
        DetectedFormat::Pdf
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        DetectedFormat::Image
    } else if bytes.len() >= 4 && bytes[0] == 0x89 && &bytes[1..4] == b"PNG" {
        DetectedFormat::Image
    } else {
        DetectedFormat::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> RawPayload {
        RawPayload::Text(s.to_string())
    }

    #[test]
    fn auto_detects_strings() {
        assert_eq!(detect_format(&text(r#" {"a":1}"#), FormatHint::Auto), DetectedFormat::Json);
        assert_eq!(detect_format(&text("{not json"), FormatHint::Auto), DetectedFormat::Html);
        assert_eq!(detect_format(&text("<div>x</div>"), FormatHint::Auto), DetectedFormat::Html);
        assert_eq!(detect_format(&text("%PDF-1.7 ..."), FormatHint::Auto), DetectedFormat::Pdf);
        assert_eq!(detect_format(&text("plain words"), FormatHint::Auto), DetectedFormat::Html);
    }

    #[test]
    fn auto_detects_structured_and_binary() {
        assert_eq!(
            detect_format(&RawPayload::Structured(json!({"tradelines": []})), FormatHint::Auto),
            DetectedFormat::Json
        );
        let png = RawPayload::Binary(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A]);
        assert_eq!(detect_format(&png, FormatHint::Auto), DetectedFormat::Image);
        let jpeg = RawPayload::Binary(vec![0xFF, 0xD8, 0xFF, 0xE0]);
        assert_eq!(detect_format(&jpeg, FormatHint::Auto), DetectedFormat::Image);
        let pdf = RawPayload::Binary(b"%PDF-1.4".to_vec());
        assert_eq!(detect_format(&pdf, FormatHint::Auto), DetectedFormat::Pdf);
        let junk = RawPayload::Binary(vec![0, 1, 2, 3]);
        assert_eq!(detect_format(&junk, FormatHint::Auto), DetectedFormat::Unknown);
    }

    #[test]
    fn explicit_hint_wins() {
        assert_eq!(detect_format(&text("<div/>"), FormatHint::Text), DetectedFormat::Text);
        assert_eq!(
            detect_format(&RawPayload::Binary(vec![0, 0]), FormatHint::Pdf),
            DetectedFormat::Pdf
        );
    }

    #[test]
    fn hint_from_file_name() {
        assert_eq!(FormatHint::from_file_name("reports/a/Report.PDF"), FormatHint::Pdf);
        assert_eq!(FormatHint::from_file_name("scan.jpeg"), FormatHint::Image);
        assert_eq!(FormatHint::from_file_name("scan.bmp"), FormatHint::Image);
        assert_eq!(FormatHint::from_file_name("noext"), FormatHint::Auto);
        assert_eq!("IMAGE".parse::<FormatHint>(), Ok(FormatHint::Image));
    }
}
