//! Persisted record shapes and collection names.
//!
//! Everything here is written to the document store as camelCase JSON.

use chrono::{SecondsFormat, Utc};
use credit_report::{
    AccountSummary, Bureau, Category, CreditScores, ItemType, Priority, ScoreImpact,
};
use dispute_store::{Document, DocumentStore, Query};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::EngineResult;

pub mod collections {
    pub const CREDIT_REPORTS: &str = "creditReports";
    pub const ENROLLMENTS: &str = "enrollments";
    pub const ANALYSES: &str = "creditReportAnalysis";
    pub const CASES: &str = "disputes";
    pub const CONTACTS: &str = "contacts";
    pub const STRATEGIES: &str = "disputeStrategies";
    pub const LETTERS: &str = "disputeLetters";
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/* ------------------------------------------------------------------------- */
/* Case                                                                      */
/* ------------------------------------------------------------------------- */

/// Case lifecycle. Declaration order is the forward direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pending,
    StrategyAssigned,
    LettersGenerated,
    Sent,
    Resolved,
    /// Absorbing; only ever set when a case is first persisted.
    SkippedDuplicate,
}

impl CaseStatus {
    fn rank(self) -> Option<u8> {
        match self {
            CaseStatus::Pending => Some(0),
            CaseStatus::StrategyAssigned => Some(1),
            CaseStatus::LettersGenerated => Some(2),
            CaseStatus::Sent => Some(3),
            CaseStatus::Resolved => Some(4),
            CaseStatus::SkippedDuplicate => None,
        }
    }

    /// Whether a status write from `self` to `next` keeps the lifecycle
    /// monotonic. Re-writing the current status is allowed.
    pub fn can_advance_to(self, next: CaseStatus) -> bool {
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to >= from,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CaseStatus::Pending => "pending",
            CaseStatus::StrategyAssigned => "strategy_assigned",
            CaseStatus::LettersGenerated => "letters_generated",
            CaseStatus::Sent => "sent",
            CaseStatus::Resolved => "resolved",
            CaseStatus::SkippedDuplicate => "skipped_duplicate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterTone {
    Formal,
    Consumer,
    Aggressive,
}

impl LetterTone {
    pub const ALL: [LetterTone; 3] = [LetterTone::Formal, LetterTone::Consumer, LetterTone::Aggressive];

    pub fn as_str(self) -> &'static str {
        match self {
            LetterTone::Formal => "formal",
            LetterTone::Consumer => "consumer",
            LetterTone::Aggressive => "aggressive",
        }
    }

    /// Tone used when nothing more specific was assigned.
    pub fn default_for(priority: Priority) -> Self {
        match priority {
            Priority::High => LetterTone::Aggressive,
            _ => LetterTone::Formal,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "formal" => Some(LetterTone::Formal),
            "consumer" | "friendly" => Some(LetterTone::Consumer),
            "aggressive" | "firm" => Some(LetterTone::Aggressive),
            _ => None,
        }
    }
}

/// A persisted dispute case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub contact_id: String,
    #[serde(default)]
    pub credit_report_id: Option<String>,
    #[serde(default)]
    pub analysis_id: Option<String>,

    pub creditor_name: String,
    pub account_number: String,
    pub account_type: String,
    pub balance: f64,
    pub payment_status: String,
    pub negative_reason: String,
    pub category: Category,
    pub item_type: ItemType,
    pub bureaus: Vec<Bureau>,

    pub priority: Priority,
    pub estimated_score_impact: ScoreImpact,
    pub recommended_strategy: String,
    pub suggested_dispute_reason: String,

    pub status: CaseStatus,
    pub stage: String,
    #[serde(default)]
    pub dispute_round: Option<u32>,

    #[serde(default)]
    pub strategy_plan_id: Option<String>,
    #[serde(default)]
    pub disputability_score: Option<u8>,
    #[serde(default)]
    pub primary_strategy: Option<String>,
    #[serde(default)]
    pub secondary_strategy: Option<String>,
    #[serde(default)]
    pub legal_basis: Vec<String>,
    #[serde(default)]
    pub success_probability: Option<f64>,
    #[serde(default)]
    pub letter_tone: Option<LetterTone>,
    #[serde(default)]
    pub special_instructions: Option<String>,

    pub created_at: String,
    pub updated_at: String,
    pub source: String,
    pub scan_source: String,
}

/// A case loaded from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub id: String,
    pub record: CaseRecord,
}

impl Case {
    /// One-line description used in round manifests and logs.
    pub fn describe(&self) -> String {
        format!(
            "{} ({}) - {}",
            self.record.creditor_name, self.record.account_number, self.record.negative_reason
        )
    }
}

/// Loads a subject's cases, optionally restricted to some statuses.
///
/// Documents that no longer deserialize as cases are skipped with a warning.
pub async fn load_cases<S: DocumentStore>(
    store: &S,
    contact_id: &str,
    statuses: &[CaseStatus],
) -> EngineResult<Vec<Case>> {
    let docs = store
        .query(&Query::new(collections::CASES, "contactId", contact_id))
        .await?;
    Ok(docs
        .into_iter()
        .filter_map(case_from_doc)
        .filter(|c| statuses.is_empty() || statuses.contains(&c.record.status))
        .collect())
}

fn case_from_doc(doc: Document) -> Option<Case> {
    match serde_json::from_value::<CaseRecord>(doc.data) {
        Ok(record) => Some(Case { id: doc.id, record }),
        Err(e) => {
            warn!(case_id = %doc.id, error = %e, "skipping malformed case document");
            None
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Analysis                                                                  */
/* ------------------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisTradeline {
    pub creditor_name: String,
    pub account_number: String,
    pub account_type: String,
    pub balance: f64,
    pub payment_status: String,
    pub bureaus: Vec<Bureau>,
}

/// Cached per-run view of a parsed report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub contact_id: String,
    pub credit_report_id: Option<String>,
    pub report_source: String,
    pub scores: CreditScores,
    pub account_summary: AccountSummary,
    pub tradeline_count: usize,
    pub inquiry_count: usize,
    pub negative_item_count: usize,
    pub tradelines: Vec<AnalysisTradeline>,
    #[serde(default)]
    pub parse_warnings: Vec<String>,
    pub parsed_at: String,
}

/* ------------------------------------------------------------------------- */
/* Strategy plan                                                             */
/* ------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedBy {
    Ai,
    Fallback,
}

impl GeneratedBy {
    pub fn as_str(self) -> &'static str {
        match self {
            GeneratedBy::Ai => "ai",
            GeneratedBy::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseAssignment {
    pub dispute_id: String,
    /// 1 (hopeless) to 10 (certain removal).
    pub disputability_score: u8,
    pub assigned_round: u32,
    pub primary_strategy: String,
    #[serde(default)]
    pub secondary_strategy: Option<String>,
    pub legal_basis: Vec<String>,
    pub reasoning: String,
    /// 0.0 to 1.0.
    pub success_probability: f64,
    pub letter_tone: LetterTone,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundPlanEntry {
    pub round: u32,
    pub target_date: String,
    pub item_count: usize,
    pub focus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyPlan {
    pub contact_id: String,
    pub assignments: Vec<CaseAssignment>,
    pub overall_strategy: String,
    pub round_plan: Vec<RoundPlanEntry>,
    pub generated_by: GeneratedBy,
    pub projected_score_increase: f64,
    pub total_rounds: u32,
    pub created_at: String,
}

/* ------------------------------------------------------------------------- */
/* Letter                                                                    */
/* ------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterStatus {
    Draft,
    Sent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterRecord {
    pub dispute_id: String,
    pub contact_id: String,
    pub bureau: Bureau,
    pub tone: LetterTone,
    #[serde(default)]
    pub round: Option<u32>,
    pub subject: String,
    pub body: String,
    pub legal_citations: Vec<String>,
    pub status: LetterStatus,
    /// Model that produced the text.
    pub generated_by: String,
    pub created_at: String,
}

/* ------------------------------------------------------------------------- */
/* Subject profile                                                           */
/* ------------------------------------------------------------------------- */

/// Subject identity used in prompts. Missing fields stay empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectProfile {
    pub full_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl SubjectProfile {
    /// Reads a contact document. Accepts both a nested `address` object and
    /// flat address fields.
    pub fn from_contact(data: &Value) -> Self {
        let text = |v: Option<&Value>| {
            v.and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let addr = |key: &str, flat: &str| {
            let nested = text(data.get("address").and_then(|a| a.get(key)));
            if nested.is_empty() { text(data.get(flat)) } else { nested }
        };

        let first = text(data.get("firstName"));
        let last = text(data.get("lastName"));
        let full_name = match (first.is_empty(), last.is_empty()) {
            (false, false) => format!("{first} {last}"),
            (false, true) => first,
            (true, false) => last,
            (true, true) => text(data.get("name")),
        };

        Self {
            full_name,
            street: addr("street", "street"),
            city: addr("city", "city"),
            state: addr("state", "state"),
            zip: addr("zip", "zip"),
        }
    }

    pub async fn load<S: DocumentStore>(store: &S, contact_id: &str) -> EngineResult<Self> {
        Ok(store
            .get(collections::CONTACTS, contact_id)
            .await?
            .map(|doc| Self::from_contact(&doc.data))
            .unwrap_or_default())
    }
}
