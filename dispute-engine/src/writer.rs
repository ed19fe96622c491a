//! Duplicate suppression and case persistence.
//!
//! Existing case keys for the subject are loaded once per run, before any
//! insert. Each candidate is checked against that set only, so every
//! flagged item of one report gets its own case. Concurrent runs for the same subject are not serialized
//! here and may both insert the same account.

use std::collections::HashSet;

use credit_report::{Bureau, Category, ItemType, NegativeItem, Priority, ScoreImpact};
use dispute_store::DocumentStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    errors::EngineResult,
    records::{CaseRecord, CaseStatus, collections, load_cases, now_rfc3339},
};

/// Where the candidates came from.
#[derive(Debug, Clone, Copy)]
pub struct CaseMeta<'a> {
    pub report_id: Option<&'a str>,
    pub analysis_id: Option<&'a str>,
    /// `auto_scan` or `upload`.
    pub source: &'a str,
    /// Report source tag (`creditReports`, `enrollments-html`, ...).
    pub scan_source: &'a str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByType {
    pub collection: u32,
    pub late_payment: u32,
    pub charge_off: u32,
    pub inquiry: u32,
    pub public_record: u32,
    pub other: u32,
}

impl ByType {
    fn bump(&mut self, category: Category) {
        let slot = match category {
            Category::Collection => &mut self.collection,
            Category::LatePayment => &mut self.late_payment,
            Category::ChargeOff => &mut self.charge_off,
            Category::Inquiry => &mut self.inquiry,
            Category::PublicRecord => &mut self.public_record,
            Category::Other => &mut self.other,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByBureau {
    pub transunion: u32,
    pub experian: u32,
    pub equifax: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByPriority {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

/// Counts over the cases created by one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: u32,
    pub by_type: ByType,
    pub by_bureau: ByBureau,
    pub by_priority: ByPriority,
    pub total_score_impact: ScoreImpact,
}

impl RunSummary {
    fn count(&mut self, item: &NegativeItem) {
        self.total += 1;
        self.by_type.bump(item.category);
        match item.priority {
            Priority::High => self.by_priority.high += 1,
            Priority::Medium => self.by_priority.medium += 1,
            Priority::Low => self.by_priority.low += 1,
        }
        if item.bureaus.contains(&Bureau::TransUnion) {
            self.by_bureau.transunion += 1;
        }
        if item.bureaus.contains(&Bureau::Experian) {
            self.by_bureau.experian += 1;
        }
        if item.bureaus.contains(&Bureau::Equifax) {
            self.by_bureau.equifax += 1;
        }
        let total = &mut self.total_score_impact;
        total.min = total.min.saturating_add(item.estimated_score_impact.min);
        total.max = total.max.saturating_add(item.estimated_score_impact.max);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSummary {
    pub created_ids: Vec<String>,
    /// Candidates matching a case that already existed before this run.
    pub skipped_duplicates: usize,
    pub summary: RunSummary,
}

/// Identity of a case for duplicate suppression.
///
/// Real account numbers stand alone. Placeholders (`N/A`, fully masked or
/// empty) are qualified by item type so an inquiry never shadows a public
/// record.
pub fn dedupe_key(item_type: ItemType, account_number: &str) -> String {
    let acct = account_number.trim();
    let placeholder = acct.is_empty()
        || acct.eq_ignore_ascii_case("n/a")
        || acct.chars().all(|c| c == '*' || c == 'X' || c == 'x');
    if placeholder {
        let kind = match item_type {
            ItemType::Tradeline => "tradeline",
            ItemType::Inquiry => "inquiry",
            ItemType::PublicRecord => "publicRecord",
        };
        format!("{kind}:{acct}")
    } else {
        acct.to_string()
    }
}

/// Persists the non-duplicate candidates as `pending` cases and updates the
/// subject summary.
///
/// # Errors
/// A failed case insert aborts the run; cases written before it stay.
pub async fn write_cases<S: DocumentStore>(
    store: &S,
    contact_id: &str,
    items: &[NegativeItem],
    meta: CaseMeta<'_>,
) -> EngineResult<WriteSummary> {
    let existing: HashSet<String> = load_cases(store, contact_id, &[])
        .await?
        .iter()
        .map(|c| dedupe_key(c.record.item_type, &c.record.account_number))
        .collect();
    debug!(contact_id, existing = existing.len(), "existing case keys loaded");

    let mut out = WriteSummary::default();

    for item in items {
        let key = dedupe_key(item.item_type(), &item.account_number);
        if existing.contains(&key) {
            debug!(creditor = %item.creditor_name, account = %item.account_number, "skipping duplicate");
            out.skipped_duplicates += 1;
            continue;
        }

        let record = case_record(contact_id, item, meta);
        let id = store
            .insert(collections::CASES, serde_json::to_value(&record)?)
            .await?;
        out.summary.count(item);
        out.created_ids.push(id);
    }

    let now = now_rfc3339();
    let patch = json!({
        "disputes.lastScan": now,
        "disputes.itemCount": items.len(),
        "disputes.analysisId": meta.analysis_id,
        "creditReport.lastAnalyzed": now,
        "creditReport.negativeItems": items.len(),
        "updatedAt": now,
    });
    if let Err(e) = store.update(collections::CONTACTS, contact_id, patch).await {
        warn!(contact_id, error = %e, "subject summary update failed");
    }

    info!(
        contact_id,
        created = out.created_ids.len(),
        skipped = out.skipped_duplicates,
        impact_min = out.summary.total_score_impact.min,
        impact_max = out.summary.total_score_impact.max,
        "cases written"
    );
    Ok(out)
}

fn case_record(contact_id: &str, item: &NegativeItem, meta: CaseMeta<'_>) -> CaseRecord {
    let now = now_rfc3339();
    CaseRecord {
        contact_id: contact_id.to_string(),
        credit_report_id: meta.report_id.map(str::to_string),
        analysis_id: meta.analysis_id.map(str::to_string),
        creditor_name: item.creditor_name.clone(),
        account_number: item.account_number.clone(),
        account_type: item.account_type.clone(),
        balance: item.balance,
        payment_status: item.payment_status.clone(),
        negative_reason: item.negative_reason.clone(),
        category: item.category,
        item_type: item.item_type(),
        bureaus: item.bureaus.clone(),
        priority: item.priority,
        estimated_score_impact: item.estimated_score_impact,
        recommended_strategy: item.recommended_strategy.clone(),
        suggested_dispute_reason: item.suggested_dispute_reason.clone(),
        status: CaseStatus::Pending,
        stage: "identified".into(),
        dispute_round: None,
        strategy_plan_id: None,
        disputability_score: None,
        primary_strategy: None,
        secondary_strategy: None,
        legal_basis: Vec::new(),
        success_probability: None,
        letter_tone: None,
        special_instructions: None,
        created_at: now.clone(),
        updated_at: now,
        source: meta.source.to_string(),
        scan_source: meta.scan_source.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credit_report::{NegativeSubject, Tradeline};
    use dispute_store::InMemoryStore;
    use pretty_assertions::assert_eq;

    fn item(account: &str, category: Category, priority: Priority, bureaus: Vec<Bureau>) -> NegativeItem {
        NegativeItem {
            subject: NegativeSubject::Tradeline(Tradeline::default()),
            creditor_name: "CREDITOR".into(),
            account_number: account.into(),
            account_type: "Revolving".into(),
            balance: 100.0,
            payment_status: "Late".into(),
            bureaus,
            negative_reason: "Late Payment History".into(),
            category,
            priority,
            estimated_score_impact: ScoreImpact::new(15, 40),
            recommended_strategy: "s".into(),
            suggested_dispute_reason: "r".into(),
        }
    }

    const META: CaseMeta<'static> = CaseMeta {
        report_id: Some("r1"),
        analysis_id: Some("a1"),
        source: "auto_scan",
        scan_source: "creditReports",
    };

    #[tokio::test]
    async fn second_run_skips_everything_from_the_first() {
        let store = InMemoryStore::new();
        store.put("contacts", "c1", json!({ "firstName": "Jane" })).await;
        let items = vec![
            item("1111", Category::LatePayment, Priority::Medium, vec![Bureau::Experian]),
            item("2222", Category::Collection, Priority::High, Bureau::ALL.to_vec()),
        ];

        let first = write_cases(&store, "c1", &items, META).await.unwrap();
        assert_eq!(first.created_ids.len(), 2);
        assert_eq!(first.summary.by_bureau, ByBureau { transunion: 1, experian: 2, equifax: 1 });
        assert_eq!(first.summary.by_type.collection, 1);
        assert_eq!(first.summary.total_score_impact, ScoreImpact::new(30, 80));

        let second = write_cases(&store, "c1", &items, META).await.unwrap();
        assert!(second.created_ids.is_empty());
        assert_eq!(second.skipped_duplicates, 2);
        assert_eq!(store.all("disputes").await.len(), 2);

        let contact = store.get("contacts", "c1").await.unwrap().unwrap();
        assert_eq!(contact.field("disputes.itemCount"), Some(&json!(2)));
        assert_eq!(contact.str_field("disputes.analysisId"), Some("a1"));
    }

    #[tokio::test]
    async fn other_subjects_do_not_count_as_duplicates() {
        let store = InMemoryStore::new();
        let items = vec![item("1111", Category::Other, Priority::Medium, Bureau::ALL.to_vec())];
        write_cases(&store, "c1", &items, META).await.unwrap();
        let other = write_cases(&store, "c2", &items, META).await.unwrap();
        assert_eq!(other.created_ids.len(), 1);
    }

    #[tokio::test]
    async fn every_flagged_item_of_one_run_gets_a_case() {
        let store = InMemoryStore::new();
        let mut inquiry = item("N/A", Category::Inquiry, Priority::Low, Bureau::ALL.to_vec());
        inquiry.subject = NegativeSubject::Inquiry(Default::default());
        let mut record = item("N/A", Category::PublicRecord, Priority::High, Bureau::ALL.to_vec());
        record.subject = NegativeSubject::PublicRecord(Default::default());
        let items = vec![inquiry.clone(), inquiry.clone(), inquiry, record];

        let out = write_cases(&store, "c1", &items, META).await.unwrap();
        assert_eq!(out.created_ids.len(), 4);
        assert_eq!(out.skipped_duplicates, 0);
        assert_eq!(out.summary.by_type.inquiry, 3);
        assert_eq!(out.summary.by_type.public_record, 1);

        let again = write_cases(&store, "c1", &items, META).await.unwrap();
        assert!(again.created_ids.is_empty());
        assert_eq!(again.skipped_duplicates, 4);
    }

    #[tokio::test]
    async fn stored_case_has_pending_status_and_provenance() {
        let store = InMemoryStore::new();
        let items = vec![item("9999", Category::ChargeOff, Priority::High, vec![Bureau::Equifax])];
        let out = write_cases(&store, "c1", &items, META).await.unwrap();
        let doc = store.get("disputes", &out.created_ids[0]).await.unwrap().unwrap();
        assert_eq!(doc.str_field("status"), Some("pending"));
        assert_eq!(doc.str_field("stage"), Some("identified"));
        assert_eq!(doc.str_field("category"), Some("chargeOff"));
        assert_eq!(doc.str_field("scanSource"), Some("creditReports"));
        assert_eq!(doc.field("bureaus"), Some(&json!(["EQF"])));
        assert_eq!(doc.field("disputeRound"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn dedupe_keys() {
        assert_eq!(dedupe_key(ItemType::Tradeline, " 1234XXXX "), "1234XXXX");
        assert_eq!(dedupe_key(ItemType::Inquiry, "N/A"), "inquiry:N/A");
        assert_eq!(dedupe_key(ItemType::Tradeline, "****"), "tradeline:****");
    }
}
