//! Plain-text path for OCR / PDF-extracted report text.
//!
//! Lower fidelity than the structured paths: scores come from labeled
//! patterns, accounts and inquiries from composite multi-group patterns.
//! Zero matches is a normal outcome and yields an all-default report.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::{
    bureau::Bureau,
    model::{CreditScores, Inquiry, MASKED_ACCOUNT, NormalizedReport, Tradeline, UNKNOWN},
    normalize::fields::parse_amount,
};

/// Which score a labeled pattern feeds.
#[derive(Debug, Clone, Copy)]
enum ScoreTarget {
    Bureau(Bureau),
    /// Unattributed score; fills bureaus that are still unknown.
    Generic,
}

static SCORE_PATTERNS: LazyLock<Vec<(ScoreTarget, Regex)>> = LazyLock::new(|| {
    [
        (ScoreTarget::Bureau(Bureau::TransUnion), r"(?i)\bTransUnion[:\s]+(\d{3})\b"),
        (ScoreTarget::Bureau(Bureau::TransUnion), r"(?i)\bTU[:\s]+(\d{3})\b"),
        (ScoreTarget::Bureau(Bureau::Experian), r"(?i)\bExperian[:\s]+(\d{3})\b"),
        (ScoreTarget::Bureau(Bureau::Experian), r"(?i)\bEXP[:\s]+(\d{3})\b"),
        (ScoreTarget::Bureau(Bureau::Equifax), r"(?i)\bEquifax[:\s]+(\d{3})\b"),
        (ScoreTarget::Bureau(Bureau::Equifax), r"(?i)\bEQF[:\s]+(\d{3})\b"),
        (ScoreTarget::Generic, r"(?i)\bFICO[:\s]+(\d{3})\b"),
        (ScoreTarget::Generic, r"(?i)\bVantageScore[:\s]+(\d{3})\b"),
        (ScoreTarget::Generic, r"(?i)\bCredit Score[:\s]+(\d{3})\b"),
    ]
    .into_iter()
    .map(|(target, pat)| (target, Regex::new(pat).expect("score pattern")))
    .collect()
});

static ACCOUNT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:Account|Creditor)[:\s]+([^\n]+)",
        r"[\s\S]*?Account\s*(?:#|Number)[:\s]*([\dXx*\-]{4,})",
        r"[\s\S]*?Balance[:\s]*\$?([\d,]+(?:\.\d{1,2})?)",
        r"[\s\S]*?Status[:\s]*([^\n]+)",
    ))
    .expect("account block pattern")
});

static INQUIRY_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Inquiry|Hard Pull)[:\s]+([^\n]+)[\s\S]*?Date[:\s]*(\d{1,2}/\d{1,2}/\d{2,4})")
        .expect("inquiry block pattern")
});

/// Builds a report from plain text. Never fails.
pub fn parse_text_report(text: &str) -> NormalizedReport {
    let mut report = NormalizedReport {
        scores: extract_text_scores(text),
        ..NormalizedReport::default()
    };

    for cap in ACCOUNT_BLOCK.captures_iter(text) {
        let group = |i: usize| {
            cap.get(i)
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
        };
        report.push_tradeline(Tradeline {
            creditor_name: group(1).unwrap_or_else(|| UNKNOWN.into()),
            account_number: group(2).unwrap_or_else(|| MASKED_ACCOUNT.into()),
            balance: group(3).and_then(|b| parse_amount(&b)).unwrap_or(0.0),
            account_status: group(4).unwrap_or_else(|| UNKNOWN.into()),
            ..Tradeline::default()
        });
    }

    for cap in INQUIRY_BLOCK.captures_iter(text) {
        report.inquiries.push(Inquiry {
            creditor_name: cap
                .get(1)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_else(|| UNKNOWN.into()),
            inquiry_date: cap.get(2).map(|m| m.as_str().to_string()),
            ..Inquiry::default()
        });
    }

    debug!(
        text_len = text.len(),
        tradelines = report.tradelines.len(),
        inquiries = report.inquiries.len(),
        "text report parsed"
    );
    report
}

/// Applies the labeled score patterns in order.
///
/// For each bureau the first labeled match wins (`TransUnion 640` beats a
/// later `TU 600`). Unattributed scores (`FICO`, `VantageScore`,
/// `Credit Score`) only fill bureaus still at zero.
pub fn extract_text_scores(text: &str) -> CreditScores {
    let mut scores = CreditScores::default();
    let mut generic = None;

    for (target, re) in SCORE_PATTERNS.iter() {
        let Some(score) = re
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        else {
            continue;
        };
        match target {
            ScoreTarget::Bureau(b) if scores.get(*b) == 0 => scores.set(*b, score),
            ScoreTarget::Bureau(_) => {}
            ScoreTarget::Generic => {
                generic.get_or_insert(score);
            }
        }
    }

    if let Some(score) = generic {
        for b in Bureau::ALL {
            if scores.get(b) == 0 {
                scores.set(b, score);
            }
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
CREDIT REPORT
TransUnion: 612  Experian: 598  Equifax 605

Creditor: MIDLAND FUNDING
Account Number: ****1234
Balance: $1,500.25
Status: Collection

Creditor: CAPITAL ONE
Account #: 5291XXXX
Balance: $0
Status: Open

Inquiry: AUTO LENDER LLC
Date: 03/14/2024
";

    #[test]
    fn recovers_scores_accounts_and_inquiries() {
        let r = parse_text_report(SAMPLE);
        assert_eq!(r.scores.transunion, 612);
        assert_eq!(r.scores.experian, 598);
        assert_eq!(r.scores.equifax, 605);

        assert_eq!(r.tradelines.len(), 2);
        let first = &r.tradelines[0];
        assert_eq!(first.creditor_name, "MIDLAND FUNDING");
        assert_eq!(first.account_number, "****1234");
        assert_eq!(first.balance, 1500.25);
        assert_eq!(first.account_status, "Collection");
        assert_eq!(first.bureaus, Bureau::ALL.to_vec());
        assert_eq!(r.tradelines[1].account_number, "5291XXXX");
        assert_eq!(r.account_summary.total_accounts, 2);
        assert_eq!(r.account_summary.collection_accounts, 1);

        assert_eq!(r.inquiries.len(), 1);
        assert_eq!(r.inquiries[0].creditor_name, "AUTO LENDER LLC");
        assert_eq!(r.inquiries[0].inquiry_date.as_deref(), Some("03/14/2024"));
    }

    #[test]
    fn zero_matches_is_all_default() {
        let r = parse_text_report("nothing useful here");
        assert_eq!(r, NormalizedReport::default());
    }

    #[test]
    fn generic_score_fills_only_unknown_bureaus() {
        let s = extract_text_scores("Experian 700\nFICO: 650");
        assert_eq!(s.experian, 700);
        assert_eq!(s.transunion, 650);
        assert_eq!(s.equifax, 650);
    }

    #[test]
    fn labels_need_word_boundaries() {
        let s = extract_text_scores("STATUS 123 and SETUP 456");
        assert!(s.is_empty());
    }
}
