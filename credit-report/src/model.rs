//! Canonical, source-agnostic credit-report shape.
//!
//! Every parser path (JSON, markup, plain text) produces a
//! [`NormalizedReport`]. All numeric fields are always present and default to
//! zero, so downstream code never branches on a missing field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bureau::Bureau;

/// Per-bureau scores; `0` means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreditScores {
    pub transunion: u32,
    pub experian: u32,
    pub equifax: u32,
}

impl CreditScores {
    pub fn get(&self, bureau: Bureau) -> u32 {
        match bureau {
            Bureau::TransUnion => self.transunion,
            Bureau::Experian => self.experian,
            Bureau::Equifax => self.equifax,
        }
    }

    pub fn set(&mut self, bureau: Bureau, score: u32) {
        match bureau {
            Bureau::TransUnion => self.transunion = score,
            Bureau::Experian => self.experian = score,
            Bureau::Equifax => self.equifax = score,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transunion == 0 && self.experian == 0 && self.equifax == 0
    }
}

/// Account counts derived from the tradeline list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountSummary {
    pub total_accounts: u32,
    pub open_accounts: u32,
    pub closed_accounts: u32,
    pub delinquent_accounts: u32,
    pub derogatory_accounts: u32,
    pub collection_accounts: u32,
}

impl AccountSummary {
    /// Counts one tradeline into the summary.
    ///
    /// A tradeline can land in several buckets at once (for example a closed
    /// collection is both `closed` and `collection`).
    pub fn tally(&mut self, t: &Tradeline) {
        let status = t.account_status.to_lowercase();
        let pay = t.payment_status.to_lowercase();
        let kind = t.account_type.to_lowercase();

        self.total_accounts += 1;

        if status.contains("open") || status.contains("active") {
            self.open_accounts += 1;
        } else if status.contains("closed") {
            self.closed_accounts += 1;
        }

        if status.contains("delinquent") || pay.contains("late") || pay.contains("past due") {
            self.delinquent_accounts += 1;
        }

        if status.contains("derogatory")
            || status.contains("negative")
            || pay.contains("chargeoff")
            || pay.contains("charge-off")
            || pay.contains("collection")
        {
            self.derogatory_accounts += 1;
        }

        if kind.contains("collection") || status.contains("collection") {
            self.collection_accounts += 1;
        }
    }
}

/// Late-payment counters by bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatePayments {
    #[serde(rename = "30")]
    pub days30: u32,
    #[serde(rename = "60")]
    pub days60: u32,
    #[serde(rename = "90")]
    pub days90: u32,
}

impl LatePayments {
    pub fn total(&self) -> u32 {
        self.days30
            .saturating_add(self.days60)
            .saturating_add(self.days90)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tradeline {
    pub creditor_name: String,
    /// Usually masked (`****1234`).
    pub account_number: String,
    pub account_type: String,
    pub account_status: String,
    pub payment_status: String,
    pub balance: f64,
    pub credit_limit: f64,
    pub date_opened: Option<String>,
    pub date_reported: Option<String>,
    pub last_payment_date: Option<String>,
    pub months_reviewed: u32,
    pub late_payments: LatePayments,
    pub bureaus: Vec<Bureau>,
    /// Source fragment kept for audit.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

impl Default for Tradeline {
    fn default() -> Self {
        Self {
            creditor_name: UNKNOWN.to_string(),
            account_number: MASKED_ACCOUNT.to_string(),
            account_type: UNKNOWN.to_string(),
            account_status: UNKNOWN.to_string(),
            payment_status: UNKNOWN.to_string(),
            balance: 0.0,
            credit_limit: 0.0,
            date_opened: None,
            date_reported: None,
            last_payment_date: None,
            months_reviewed: 0,
            late_payments: LatePayments::default(),
            bureaus: Bureau::ALL.to_vec(),
            raw: Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Inquiry {
    pub creditor_name: String,
    pub inquiry_date: Option<String>,
    pub inquiry_type: String,
    pub bureaus: Vec<Bureau>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

impl Default for Inquiry {
    fn default() -> Self {
        Self {
            creditor_name: UNKNOWN.to_string(),
            inquiry_date: None,
            inquiry_type: "Hard".to_string(),
            bureaus: Bureau::ALL.to_vec(),
            raw: Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublicRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub court: Option<String>,
    pub filed_date: Option<String>,
    pub status: String,
    pub bureaus: Vec<Bureau>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

impl Default for PublicRecord {
    fn default() -> Self {
        Self {
            record_type: UNKNOWN.to_string(),
            court: None,
            filed_date: None,
            status: UNKNOWN.to_string(),
            bureaus: Bureau::ALL.to_vec(),
            raw: Value::Null,
        }
    }
}

pub const UNKNOWN: &str = "Unknown";
pub const MASKED_ACCOUNT: &str = "****";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NormalizedReport {
    pub scores: CreditScores,
    pub account_summary: AccountSummary,
    pub tradelines: Vec<Tradeline>,
    pub inquiries: Vec<Inquiry>,
    pub public_records: Vec<PublicRecord>,
}

impl NormalizedReport {
    /// Appends a tradeline and counts it into `account_summary`.
    pub fn push_tradeline(&mut self, t: Tradeline) {
        self.account_summary.tally(&t);
        self.tradelines.push(t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tl(kind: &str, status: &str, pay: &str) -> Tradeline {
        Tradeline {
            account_type: kind.into(),
            account_status: status.into(),
            payment_status: pay.into(),
            ..Tradeline::default()
        }
    }

    #[test]
    fn tally_counts_overlapping_buckets() {
        let mut report = NormalizedReport::default();
        report.push_tradeline(tl("Collection", "Closed", "Collection"));
        report.push_tradeline(tl("Revolving", "Open", "30 days late"));
        report.push_tradeline(tl("Installment", "Derogatory", "Charge-off"));

        let s = report.account_summary;
        assert_eq!(s.total_accounts, 3);
        assert_eq!(s.open_accounts, 1);
        assert_eq!(s.closed_accounts, 1);
        assert_eq!(s.delinquent_accounts, 1);
        assert_eq!(s.derogatory_accounts, 2);
        assert_eq!(s.collection_accounts, 1);
    }

    #[test]
    fn empty_report_serializes_every_count() {
        let v = serde_json::to_value(NormalizedReport::default()).unwrap();
        assert_eq!(v["scores"]["transunion"], 0);
        assert_eq!(v["accountSummary"]["collectionAccounts"], 0);
        assert!(v["tradelines"].as_array().unwrap().is_empty());
    }

    #[test]
    fn late_payment_keys_are_bucket_numbers() {
        let lp = LatePayments {
            days30: 1,
            days60: 0,
            days90: 2,
        };
        let v = serde_json::to_value(lp).unwrap();
        assert_eq!(v["30"], 1);
        assert_eq!(v["90"], 2);
        assert_eq!(lp.total(), 3);
    }
}
