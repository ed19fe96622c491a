//! Negative-item classification.
//!
//! Tradelines go through a fixed, ordered rule cascade where the first
//! matching rule wins. Recent inquiries beyond the fifth are flagged, and
//! every public record is flagged. Output order: tradeline items in source
//! order, then excess inquiries, then public records.

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    bureau::Bureau,
    model::{Inquiry, NormalizedReport, PublicRecord, Tradeline},
};

/// Recent inquiries a consumer can reasonably have before they are disputable.
pub const EXEMPT_INQUIRIES: usize = 5;
/// Inquiries older than this many months are ignored.
pub const INQUIRY_LOOKBACK_MONTHS: u32 = 24;

pub const NOT_APPLICABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Collection,
    ChargeOff,
    LatePayment,
    Other,
    Inquiry,
    PublicRecord,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Collection => "collection",
            Category::ChargeOff => "chargeOff",
            Category::LatePayment => "latePayment",
            Category::Other => "other",
            Category::Inquiry => "inquiry",
            Category::PublicRecord => "publicRecord",
        }
    }
}

/// Dispute priority. Declaration order is scheduling order (high first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemType {
    Tradeline,
    Inquiry,
    PublicRecord,
}

/// Estimated score gain range if the item is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreImpact {
    pub min: u32,
    pub max: u32,
}

impl ScoreImpact {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f64 {
        (f64::from(self.min) + f64::from(self.max)) / 2.0
    }
}

/// The report entry a negative item was derived from.
#[derive(Debug, Clone, PartialEq)]
pub enum NegativeSubject {
    Tradeline(Tradeline),
    Inquiry(Inquiry),
    PublicRecord(PublicRecord),
}

/// A classified, not-yet-persisted dispute candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct NegativeItem {
    pub subject: NegativeSubject,
    pub creditor_name: String,
    pub account_number: String,
    pub account_type: String,
    pub balance: f64,
    pub payment_status: String,
    pub bureaus: Vec<Bureau>,
    pub negative_reason: String,
    pub category: Category,
    pub priority: Priority,
    pub estimated_score_impact: ScoreImpact,
    pub recommended_strategy: String,
    pub suggested_dispute_reason: String,
}

impl NegativeItem {
    pub fn item_type(&self) -> ItemType {
        match self.subject {
            NegativeSubject::Tradeline(_) => ItemType::Tradeline,
            NegativeSubject::Inquiry(_) => ItemType::Inquiry,
            NegativeSubject::PublicRecord(_) => ItemType::PublicRecord,
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Tradeline cascade                                                         */
/* ------------------------------------------------------------------------- */

/// Outcome of a matching tradeline rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub category: Category,
    pub priority: Priority,
    pub impact: ScoreImpact,
    pub reason: String,
    pub strategy: &'static str,
    pub dispute_reason: &'static str,
}

/// Lowercased text fields the rules look at.
struct Signals<'a> {
    kind: String,
    status: String,
    pay: String,
    tradeline: &'a Tradeline,
}

type Rule = fn(&Signals<'_>) -> Option<Verdict>;

/// Evaluation order matters: a collection that also reports late payments
/// is a collection.
const TRADELINE_RULES: [Rule; 5] = [
    collection_rule,
    charge_off_rule,
    late_status_rule,
    late_count_rule,
    derogatory_rule,
];

fn collection_rule(s: &Signals<'_>) -> Option<Verdict> {
    let hit = [&s.kind, &s.status, &s.pay]
        .iter()
        .any(|t| t.contains("collection"));
    hit.then(|| Verdict {
        category: Category::Collection,
        priority: Priority::High,
        impact: ScoreImpact::new(50, 100),
        reason: "Collection Account".into(),
        strategy: "Request debt validation, dispute accuracy of amount and dates",
        dispute_reason: "This collection account is not accurate. Please provide complete \
            documentation including the original creditor agreement, chain of custody, and \
            itemized accounting of the balance claimed.",
    })
}

fn charge_off_rule(s: &Signals<'_>) -> Option<Verdict> {
    const MARKERS: [&str; 3] = ["chargeoff", "charge-off", "charge off"];
    let hit = MARKERS
        .iter()
        .any(|m| s.pay.contains(m) || s.status.contains(m))
        || s.status.contains("charged off");
    hit.then(|| Verdict {
        category: Category::ChargeOff,
        priority: Priority::High,
        impact: ScoreImpact::new(40, 80),
        reason: "Charge-Off".into(),
        strategy: "Dispute balance accuracy, request validation of debt",
        dispute_reason: "This charge-off is being reported inaccurately. The balance, dates, \
            and payment history contain errors that require investigation and correction.",
    })
}

fn late_status_rule(s: &Signals<'_>) -> Option<Verdict> {
    const MARKERS: [&str; 6] = ["late", "past due", "30 days", "60 days", "90 days", "120 days"];
    MARKERS.iter().any(|m| s.pay.contains(m)).then(|| Verdict {
        category: Category::LatePayment,
        priority: Priority::Medium,
        impact: ScoreImpact::new(15, 40),
        reason: "Late Payment History".into(),
        strategy: "Request goodwill adjustment or dispute accuracy of reported late payments",
        dispute_reason: "The late payment(s) reported on this account are not accurate. \
            Please verify the payment dates and provide documentation supporting the reported \
            delinquency.",
    })
}

fn late_count_rule(s: &Signals<'_>) -> Option<Verdict> {
    let total = s.tradeline.late_payments.total();
    (total > 0).then(|| Verdict {
        category: Category::LatePayment,
        priority: if total > 3 {
            Priority::High
        } else {
            Priority::Medium
        },
        impact: ScoreImpact::new(total.saturating_mul(10), total.saturating_mul(25)),
        reason: format!("{total} Late Payment(s) Reported"),
        strategy: "Request goodwill adjustment or dispute payment reporting dates",
        dispute_reason: "The late payment history on this account contains inaccuracies. \
            Please provide complete payment records to verify the reported delinquencies.",
    })
}

fn derogatory_rule(s: &Signals<'_>) -> Option<Verdict> {
    (s.status.contains("derogatory") || s.status.contains("negative")).then(|| Verdict {
        category: Category::Other,
        priority: Priority::Medium,
        impact: ScoreImpact::new(20, 50),
        reason: "Derogatory Status".into(),
        strategy: "Request full account verification and documentation",
        dispute_reason: "This account is reporting a derogatory status that I believe to be \
            inaccurate. Please investigate and provide documentation supporting this status.",
    })
}

/// First matching rule for a tradeline, or `None` if it is not negative.
pub fn evaluate_tradeline(t: &Tradeline) -> Option<Verdict> {
    let signals = Signals {
        kind: t.account_type.to_lowercase(),
        status: t.account_status.to_lowercase(),
        pay: t.payment_status.to_lowercase(),
        tradeline: t,
    };
    TRADELINE_RULES.iter().find_map(|rule| rule(&signals))
}

/* ------------------------------------------------------------------------- */
/* Entry points                                                              */
/* ------------------------------------------------------------------------- */

/// Classifies against today's UTC date.
pub fn classify(report: &NormalizedReport) -> Vec<NegativeItem> {
    classify_at(report, Utc::now().date_naive())
}

/// Classifies with an explicit "today" for the inquiry lookback window.
pub fn classify_at(report: &NormalizedReport, today: NaiveDate) -> Vec<NegativeItem> {
    let mut items = Vec::new();

    for t in &report.tradelines {
        if let Some(v) = evaluate_tradeline(t) {
            items.push(NegativeItem {
                creditor_name: t.creditor_name.clone(),
                account_number: t.account_number.clone(),
                account_type: t.account_type.clone(),
                balance: t.balance,
                payment_status: t.payment_status.clone(),
                bureaus: t.bureaus.clone(),
                negative_reason: v.reason,
                category: v.category,
                priority: v.priority,
                estimated_score_impact: v.impact,
                recommended_strategy: v.strategy.into(),
                suggested_dispute_reason: v.dispute_reason.into(),
                subject: NegativeSubject::Tradeline(t.clone()),
            });
        }
    }
    let tradeline_hits = items.len();

    let cutoff = today.checked_sub_months(Months::new(INQUIRY_LOOKBACK_MONTHS));
    let excess = report
        .inquiries
        .iter()
        .filter(|inq| is_recent(inq, cutoff))
        .skip(EXEMPT_INQUIRIES);
    for inq in excess {
        items.push(NegativeItem {
            creditor_name: inq.creditor_name.clone(),
            account_number: NOT_APPLICABLE.into(),
            account_type: "Hard Inquiry".into(),
            balance: 0.0,
            payment_status: String::new(),
            bureaus: inq.bureaus.clone(),
            negative_reason: "Excessive Hard Inquiry".into(),
            category: Category::Inquiry,
            priority: Priority::Low,
            estimated_score_impact: ScoreImpact::new(2, 5),
            recommended_strategy: "Dispute unauthorized inquiry".into(),
            suggested_dispute_reason: "I do not recall authorizing this inquiry. Please provide \
                proof of authorization or remove this inquiry from my credit report."
                .into(),
            subject: NegativeSubject::Inquiry(inq.clone()),
        });
    }

    for rec in &report.public_records {
        items.push(NegativeItem {
            creditor_name: rec.court.clone().unwrap_or_else(|| "Public Record".into()),
            account_number: NOT_APPLICABLE.into(),
            account_type: rec.record_type.clone(),
            balance: 0.0,
            payment_status: rec.status.clone(),
            bureaus: rec.bureaus.clone(),
            negative_reason: format!("Public Record: {}", rec.record_type),
            category: Category::PublicRecord,
            priority: Priority::High,
            estimated_score_impact: ScoreImpact::new(50, 150),
            recommended_strategy: "Verify accuracy of all details, request court documentation"
                .into(),
            suggested_dispute_reason: "This public record contains inaccuracies and should be \
                investigated. Please verify all details with the court records."
                .into(),
            subject: NegativeSubject::PublicRecord(rec.clone()),
        });
    }

    debug!(
        tradelines = tradeline_hits,
        total = items.len(),
        "negative items identified"
    );
    items
}

/// Undated inquiries count as recent; unparseable dates do not.
fn is_recent(inq: &Inquiry, cutoff: Option<NaiveDate>) -> bool {
    let Some(raw) = inq.inquiry_date.as_deref() else {
        return true;
    };
    match (parse_report_date(raw), cutoff) {
        (Some(date), Some(cutoff)) => date > cutoff,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Accepts the date spellings seen in bureau feeds: ISO dates and
/// timestamps, and US `MM/DD/YYYY` / `MM/DD/YY`.
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    s.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LatePayments;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn tradeline(kind: &str, status: &str, pay: &str, late: (u32, u32, u32)) -> Tradeline {
        Tradeline {
            creditor_name: "CREDITOR".into(),
            account_number: "1234XXXX".into(),
            account_type: kind.into(),
            account_status: status.into(),
            payment_status: pay.into(),
            late_payments: LatePayments {
                days30: late.0,
                days60: late.1,
                days90: late.2,
            },
            ..Tradeline::default()
        }
    }

    fn inquiries(n: usize, date: Option<&str>) -> Vec<Inquiry> {
        (0..n)
            .map(|i| Inquiry {
                creditor_name: format!("LENDER {i}"),
                inquiry_date: date.map(str::to_string),
                ..Inquiry::default()
            })
            .collect()
    }

    fn report_with_inquiries(list: Vec<Inquiry>) -> NormalizedReport {
        NormalizedReport {
            inquiries: list,
            ..NormalizedReport::default()
        }
    }

    #[test]
    fn collection_beats_late_payment() {
        let t = tradeline("Open Account", "Collection", "90 days late", (0, 0, 2));
        let v = evaluate_tradeline(&t).unwrap();
        assert_eq!(v.category, Category::Collection);
        assert_eq!(v.priority, Priority::High);
        assert_eq!(v.impact, ScoreImpact::new(50, 100));
    }

    #[test]
    fn charge_off_beats_late_status() {
        let t = tradeline("Revolving", "Closed", "Charge-off, 120 days late", (0, 0, 0));
        assert_eq!(evaluate_tradeline(&t).unwrap().category, Category::ChargeOff);
        let t = tradeline("Revolving", "Charged Off", "Unknown", (0, 0, 0));
        assert_eq!(evaluate_tradeline(&t).unwrap().category, Category::ChargeOff);
    }

    #[test]
    fn late_count_severity_boundary() {
        let three = evaluate_tradeline(&tradeline("Auto", "Open", "Current", (1, 1, 1))).unwrap();
        assert_eq!(three.category, Category::LatePayment);
        assert_eq!(three.priority, Priority::Medium);
        assert_eq!(three.impact, ScoreImpact::new(30, 75));
        assert_eq!(three.reason, "3 Late Payment(s) Reported");

        let four = evaluate_tradeline(&tradeline("Auto", "Open", "Current", (0, 0, 4))).unwrap();
        assert_eq!(four.priority, Priority::High);
        assert_eq!(four.impact, ScoreImpact::new(40, 100));
    }

    #[test]
    fn huge_late_counts_saturate() {
        let t = tradeline("Revolving", "Open", "Current", (200_000_000, u32::MAX, 5));
        assert_eq!(t.late_payments.total(), u32::MAX);
        let v = evaluate_tradeline(&t).unwrap();
        assert_eq!(v.category, Category::LatePayment);
        assert_eq!(v.impact, ScoreImpact::new(u32::MAX, u32::MAX));
        assert_eq!(v.impact.midpoint(), f64::from(u32::MAX));
    }

    #[test]
    fn derogatory_applies_when_no_late_counts() {
        let v = evaluate_tradeline(&tradeline("Mortgage", "Derogatory", "Unknown", (0, 0, 0)))
            .unwrap();
        assert_eq!(v.category, Category::Other);
        assert_eq!(v.priority, Priority::Medium);
    }

    #[test]
    fn clean_tradeline_is_dropped() {
        assert!(evaluate_tradeline(&tradeline("Revolving", "Open", "Pays as agreed", (0, 0, 0))).is_none());
    }

    #[test]
    fn inquiry_exemption_boundary() {
        for (n, expected) in [(5, 0), (6, 1), (8, 3)] {
            let r = report_with_inquiries(inquiries(n, Some("2025-01-15")));
            let items = classify_at(&r, today());
            assert_eq!(items.len(), expected, "{n} inquiries");
            assert!(items.iter().all(|i| i.priority == Priority::Low));
        }
    }

    #[test]
    fn old_and_unparseable_inquiries_are_not_recent() {
        let mut list = inquiries(5, None);
        list.extend(inquiries(3, Some("01/10/2021")));
        list.extend(inquiries(2, Some("sometime")));
        list.extend(inquiries(1, Some("2024-12-01T10:00:00Z")));
        let items = classify_at(&report_with_inquiries(list), today());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].account_number, "N/A");
        assert_eq!(items[0].item_type(), ItemType::Inquiry);
    }

    #[test]
    fn every_public_record_is_flagged_last() {
        let r = NormalizedReport {
            tradelines: vec![tradeline("Collection", "Open", "", (0, 0, 0))],
            public_records: vec![
                PublicRecord {
                    record_type: "Bankruptcy".into(),
                    court: Some("US Bankruptcy Court".into()),
                    ..PublicRecord::default()
                },
                PublicRecord::default(),
            ],
            ..NormalizedReport::default()
        };
        let items = classify_at(&r, today());
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].category, Category::Collection);
        assert_eq!(items[1].creditor_name, "US Bankruptcy Court");
        assert_eq!(items[1].negative_reason, "Public Record: Bankruptcy");
        assert_eq!(items[2].creditor_name, "Public Record");
        assert_eq!(items[2].estimated_score_impact, ScoreImpact::new(50, 150));
    }

    #[test]
    fn all_default_report_yields_nothing() {
        assert!(classify_at(&NormalizedReport::default(), today()).is_empty());
    }

    #[test]
    fn date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        assert_eq!(parse_report_date("2024-03-14"), Some(d));
        assert_eq!(parse_report_date("03/14/2024"), Some(d));
        assert_eq!(parse_report_date("3/14/24"), Some(d));
        assert_eq!(parse_report_date("2024-03-14T08:00:00.000Z"), Some(d));
        assert_eq!(parse_report_date("March"), None);
    }
}
