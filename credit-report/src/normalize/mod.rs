//! Multi-format normalizer.
//!
//! Routes a [`RawPayload`] to the JSON, markup or plain-text parser and
//! always converges on a [`NormalizedReport`]. Recoverable problems are
//! reported as warnings on [`ParseOutcome::Partial`]; only an unroutable
//! payload or a malformed forced-JSON string is an error.

pub mod bureaus;
pub mod fields;
pub mod html;
pub mod json;
pub mod text;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    detect::{DetectedFormat, FormatHint, RawPayload, detect_format},
    errors::{NormalizeError, NormalizeResult},
    model::NormalizedReport,
};

pub use html::{parse_html_report, parse_html_with_regex};
pub use json::parse_json_report;
pub use text::parse_text_report;

/// OCR / PDF text extraction collaborator.
///
/// Only its plain-text output is consumed; the engine behind it is external.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8], format: DetectedFormat) -> NormalizeResult<String>;
}

/// Normalizer result: either everything parsed, or a best-effort report
/// plus a description of what was lost.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Complete(NormalizedReport),
    Partial {
        report: NormalizedReport,
        warnings: Vec<String>,
    },
}

impl ParseOutcome {
    pub fn from_parts(report: NormalizedReport, warnings: Vec<String>) -> Self {
        if warnings.is_empty() {
            ParseOutcome::Complete(report)
        } else {
            ParseOutcome::Partial { report, warnings }
        }
    }

    pub fn report(&self) -> &NormalizedReport {
        match self {
            ParseOutcome::Complete(r) => r,
            ParseOutcome::Partial { report, .. } => report,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            ParseOutcome::Complete(_) => &[],
            ParseOutcome::Partial { warnings, .. } => warnings,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, ParseOutcome::Partial { .. })
    }

    pub fn into_parts(self) -> (NormalizedReport, Vec<String>) {
        match self {
            ParseOutcome::Complete(r) => (r, Vec::new()),
            ParseOutcome::Partial { report, warnings } => (report, warnings),
        }
    }
}

/// Normalizes any supported payload.
///
/// # Errors
/// - [`NormalizeError::UnsupportedFormat`] for unrecognized binary input
/// - [`NormalizeError::InvalidJson`] when a string forced down the JSON path
///   does not parse
pub fn normalize(
    payload: &RawPayload,
    hint: FormatHint,
    extractor: Option<&dyn TextExtractor>,
) -> NormalizeResult<ParseOutcome> {
    let format = detect_format(payload, hint);
    debug!(format = format.as_str(), ?hint, "normalizing report payload");

    let mut warnings = Vec::new();
    let report = match format {
        DetectedFormat::Json => match payload {
            RawPayload::Structured(v) => parse_json_report(v, &mut warnings),
            RawPayload::Text(s) => {
                let v: Value = serde_json::from_str(s)?;
                parse_json_report(&v, &mut warnings)
            }
            RawPayload::Binary(b) => {
                let v: Value = serde_json::from_slice(b)?;
                parse_json_report(&v, &mut warnings)
            }
        },
        DetectedFormat::Html => parse_html_report(&as_text(payload, &mut warnings)),
        DetectedFormat::Text => parse_text_report(&as_text(payload, &mut warnings)),
        DetectedFormat::Pdf | DetectedFormat::Image => {
            extract_then_parse(payload, format, extractor, &mut warnings)
        }
        DetectedFormat::Unknown => {
            return Err(NormalizeError::UnsupportedFormat(
                "binary payload with no recognized signature".into(),
            ));
        }
    };

    for w in &warnings {
        warn!(format = format.as_str(), warning = %w, "partial report parse");
    }
    Ok(ParseOutcome::from_parts(report, warnings))
}

fn extract_then_parse(
    payload: &RawPayload,
    format: DetectedFormat,
    extractor: Option<&dyn TextExtractor>,
    warnings: &mut Vec<String>,
) -> NormalizedReport {
    let Some(extractor) = extractor else {
        warnings.push(format!(
            "no text extractor configured for {} input",
            format.as_str()
        ));
        return NormalizedReport::default();
    };

    let bytes: &[u8] = match payload {
        RawPayload::Binary(b) => b,
        RawPayload::Text(s) => s.as_bytes(),
        RawPayload::Structured(_) => {
            warnings.push(format!("structured payload cannot be read as {}", format.as_str()));
            return NormalizedReport::default();
        }
    };

    match extractor.extract_text(bytes, format) {
        Ok(text) => parse_text_report(&text),
        Err(e) => {
            warnings.push(e.to_string());
            NormalizedReport::default()
        }
    }
}

/// Text view of a payload for the markup and plain-text parsers.
fn as_text(payload: &RawPayload, warnings: &mut Vec<String>) -> String {
    match payload {
        RawPayload::Text(s) => s.clone(),
        RawPayload::Structured(v) => v.to_string(),
        RawPayload::Binary(b) => match String::from_utf8(b.clone()) {
            Ok(s) => s,
            Err(_) => {
                warnings.push("payload is not valid UTF-8; invalid bytes replaced".into());
                String::from_utf8_lossy(b).into_owned()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedText(&'static str);

    impl TextExtractor for FixedText {
        fn extract_text(&self, _bytes: &[u8], _format: DetectedFormat) -> NormalizeResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct Broken;

    impl TextExtractor for Broken {
        fn extract_text(&self, _bytes: &[u8], _format: DetectedFormat) -> NormalizeResult<String> {
            Err(NormalizeError::Extraction("ocr engine offline".into()))
        }
    }

    #[test]
    fn same_account_through_every_format() {
        let json = RawPayload::Structured(json!({
            "tradelines": [{
                "creditorName": "MIDLAND FUNDING",
                "accountNumber": "****1234",
                "accountType": "Collection",
                "balance": "$500.00"
            }]
        }));
        let html = RawPayload::Text(
            r#"<div class="tradeline"><h3>MIDLAND FUNDING</h3><table>
                 <tr><td>Account #</td><td>****1234</td></tr>
                 <tr><td>Balance</td><td>$500.00</td></tr>
               </table></div>"#
                .to_string(),
        );
        let text = RawPayload::Text(
            "Creditor: MIDLAND FUNDING\nAccount Number: ****1234\nBalance: $500.00\nStatus: Collection\n"
                .to_string(),
        );

        let reports = [
            normalize(&json, FormatHint::Auto, None).unwrap(),
            normalize(&html, FormatHint::Auto, None).unwrap(),
            normalize(&text, FormatHint::Text, None).unwrap(),
        ];
        for outcome in &reports {
            let r = outcome.report();
            assert!(!outcome.is_partial());
            assert_eq!(r.account_summary.total_accounts, 1);
            assert!((r.tradelines[0].balance - 500.0).abs() < 0.01);
            assert_eq!(r.tradelines[0].account_number, "****1234");
        }
    }

    #[test]
    fn pdf_without_extractor_is_partial_and_empty() {
        let pdf = RawPayload::Binary(b"%PDF-1.7 binary".to_vec());
        let outcome = normalize(&pdf, FormatHint::Auto, None).unwrap();
        assert!(outcome.is_partial());
        assert_eq!(outcome.report(), &NormalizedReport::default());
        assert!(outcome.warnings()[0].contains("pdf"));
    }

    #[test]
    fn image_goes_through_extractor() {
        let png = RawPayload::Binary(vec![0x89, b'P', b'N', b'G', 0, 0]);
        let ocr = FixedText("Creditor: ACME\nAccount #: 1111XXXX\nBalance: 75\nStatus: Charged Off\n");
        let outcome = normalize(&png, FormatHint::Auto, Some(&ocr)).unwrap();
        assert_eq!(outcome.report().tradelines.len(), 1);
        assert_eq!(outcome.report().tradelines[0].account_status, "Charged Off");
    }

    #[test]
    fn extractor_failure_is_a_warning() {
        let pdf = RawPayload::Binary(b"%PDF-1.4".to_vec());
        let outcome = normalize(&pdf, FormatHint::Auto, Some(&Broken)).unwrap();
        assert!(outcome.is_partial());
        assert!(outcome.warnings()[0].contains("ocr engine offline"));
    }

    #[test]
    fn unknown_binary_and_bad_forced_json_are_errors() {
        let junk = RawPayload::Binary(vec![1, 2, 3, 4]);
        assert!(matches!(
            normalize(&junk, FormatHint::Auto, None),
            Err(NormalizeError::UnsupportedFormat(_))
        ));
        let bad = RawPayload::Text("{ not json".into());
        assert!(matches!(
            normalize(&bad, FormatHint::Json, None),
            Err(NormalizeError::InvalidJson(_))
        ));
    }

    #[test]
    fn malformed_json_structure_is_partial_not_error() {
        let v = RawPayload::Structured(json!({ "tradelines": "oops", "scores": { "tu": 640 } }));
        let outcome = normalize(&v, FormatHint::Auto, None).unwrap();
        assert!(outcome.is_partial());
        assert_eq!(outcome.report().scores.transunion, 640);
        assert!(outcome.report().tradelines.is_empty());
    }
}
