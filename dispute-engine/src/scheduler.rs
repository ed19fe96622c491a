//! Round scheduling.
//!
//! Pending cases are ranked (priority, then `estimatedScoreImpact.max`
//! descending, then balance descending) and cut into consecutive rounds of
//! at most `max_per_round` cases. Round `n` is scheduled
//! `(n - 1) * spacing_days` after round 1.

use std::{cmp::Ordering, time::Instant};

use dispute_store::DocumentStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::{
    errors::{EngineError, EngineResult},
    records::{Case, CaseStatus, collections, load_cases, now_rfc3339},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundEntry {
    pub round: u32,
    pub item_count: usize,
    pub items: Vec<String>,
    pub dispute_ids: Vec<String>,
    pub scheduled: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundManifest {
    pub total_rounds: u32,
    pub total_items: usize,
    pub rounds: Vec<RoundEntry>,
}

/// Dispute order. Ties on all three keys keep their relative order.
pub fn compare_for_rounds(a: &Case, b: &Case) -> Ordering {
    let (a, b) = (&a.record, &b.record);
    a.priority
        .cmp(&b.priority)
        .then_with(|| b.estimated_score_impact.max.cmp(&a.estimated_score_impact.max))
        .then_with(|| b.balance.total_cmp(&a.balance))
}

pub fn sort_for_rounds(cases: &mut [Case]) {
    cases.sort_by(compare_for_rounds);
}

/// Consecutive groups of `max_per_round`; only the last may be shorter.
pub fn partition_into_rounds<T>(items: Vec<T>, max_per_round: usize) -> Vec<Vec<T>> {
    let size = max_per_round.max(1);
    let mut rounds = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        rounds.push(iter.by_ref().take(size).collect());
    }
    rounds
}

pub fn round_label(round: u32, spacing_days: u32) -> String {
    if round <= 1 {
        "Immediately".to_string()
    } else {
        format!("{} days after round 1", (round - 1) * spacing_days)
    }
}

/// Schedules every pending case of a subject and persists `disputeRound`.
pub async fn assign_rounds<S: DocumentStore>(
    store: &S,
    contact_id: &str,
    max_per_round: usize,
    spacing_days: u32,
) -> EngineResult<RoundManifest> {
    if max_per_round == 0 {
        return Err(EngineError::Validation("maxPerRound must be at least 1".into()));
    }
    let t0 = Instant::now();

    let mut cases = load_cases(store, contact_id, &[CaseStatus::Pending]).await?;
    sort_for_rounds(&mut cases);
    let total_items = cases.len();
    debug!(contact_id, pending = total_items, "rounds: cases ranked");

    let mut manifest = RoundManifest {
        total_items,
        ..RoundManifest::default()
    };

    for (idx, group) in partition_into_rounds(cases, max_per_round).into_iter().enumerate() {
        let round = idx as u32 + 1;
        let now = now_rfc3339();
        for case in &group {
            store
                .update(
                    collections::CASES,
                    &case.id,
                    json!({ "disputeRound": round, "updatedAt": now }),
                )
                .await?;
        }
        manifest.rounds.push(RoundEntry {
            round,
            item_count: group.len(),
            items: group.iter().map(Case::describe).collect(),
            dispute_ids: group.iter().map(|c| c.id.clone()).collect(),
            scheduled: round_label(round, spacing_days),
        });
    }
    manifest.total_rounds = manifest.rounds.len() as u32;

    info!(
        contact_id,
        rounds = manifest.total_rounds,
        items = total_items,
        latency_ms = t0.elapsed().as_millis() as u64,
        "rounds assigned"
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_sizes() {
        for (n, k) in [(0usize, 7usize), (1, 7), (7, 7), (8, 7), (15, 7), (10, 3)] {
            let rounds = partition_into_rounds((0..n).collect::<Vec<_>>(), k);
            assert_eq!(rounds.len(), n.div_ceil(k), "n={n} k={k}");
            if let Some((last, full)) = rounds.split_last() {
                assert!(full.iter().all(|r| r.len() == k));
                assert!(!last.is_empty() && last.len() <= k);
            }
        }
    }

    #[test]
    fn ranks_by_priority_then_impact_then_balance() {
        use crate::testutil::case;
        use credit_report::{Category, Priority};

        let mut small = case("small", Category::Collection, Priority::High, (50, 100));
        small.record.balance = 50.0;
        let mut big = case("big", Category::Collection, Priority::High, (50, 100));
        big.record.balance = 900.0;
        let mut cases = vec![
            case("low", Category::Inquiry, Priority::Low, (2, 5)),
            small,
            case("late", Category::LatePayment, Priority::High, (40, 100)),
            case("co", Category::ChargeOff, Priority::High, (60, 110)),
            case("mid", Category::Other, Priority::Medium, (20, 50)),
            big,
        ];
        sort_for_rounds(&mut cases);
        let order: Vec<&str> = cases.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["co", "big", "late", "small", "mid", "low"]);
    }

    #[test]
    fn labels() {
        assert_eq!(round_label(1, 30), "Immediately");
        assert_eq!(round_label(2, 30), "30 days after round 1");
        assert_eq!(round_label(4, 30), "90 days after round 1");
    }
}
