//! Strategy orchestration.
//!
//! The reasoning service proposes a plan for every pending case of a subject.
//! When the call fails or nothing usable comes back, the plan is built from
//! the static template catalog instead. Either way the plan is persisted,
//! mirrored onto each case, and summarized on the subject record.

pub mod parse;
pub mod prompt;
pub mod templates;

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    time::Instant,
};

use dispute_store::DocumentStore;
use reasoning_service::ReasoningService;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    config::EngineConfig,
    errors::EngineResult,
    records::{
        Case, CaseAssignment, CaseStatus, GeneratedBy, LetterTone, RoundPlanEntry, StrategyPlan,
        SubjectProfile, collections, load_cases, now_rfc3339,
    },
    scheduler::round_label,
    telemetry::prompt_dump::PromptDump,
};

use parse::{AiAssignment, AiStrategy, parse_strategy_response};
use prompt::{STRATEGY_SYSTEM_PROMPT, build_strategy_prompt};
use templates::{StrategyTemplate, template_for};

/// What a strategy run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOutcome {
    pub plan_id: Option<String>,
    pub fallback_used: bool,
    pub generated_by: GeneratedBy,
    pub case_count: usize,
    pub total_rounds: u32,
    pub projected_score_increase: f64,
    pub overall_strategy: String,
    pub round_plan: Vec<RoundPlanEntry>,
    pub assignments: Vec<CaseAssignment>,
}

fn template_assignment(case: &Case, template: &StrategyTemplate, round: u32) -> CaseAssignment {
    CaseAssignment {
        dispute_id: case.id.clone(),
        disputability_score: template.disputability,
        assigned_round: round,
        primary_strategy: template.primary.as_str().to_string(),
        secondary_strategy: Some(template.secondary.as_str().to_string()),
        legal_basis: template.legal_basis.iter().map(|b| b.key().to_string()).collect(),
        reasoning: template.rationale.to_string(),
        success_probability: template.success_rate,
        letter_tone: LetterTone::default_for(case.record.priority),
        special_instructions: None,
    }
}

/// Round by position in the loaded list: `index / max_per_round + 1`.
fn positional_round(index: usize, max_per_round: usize) -> u32 {
    (index / max_per_round.max(1)) as u32 + 1
}

/// Template-only plan, one assignment per case in list order.
pub fn fallback_plan(contact_id: &str, cases: &[Case], cfg: &EngineConfig) -> StrategyPlan {
    let assignments: Vec<CaseAssignment> = cases
        .iter()
        .enumerate()
        .map(|(i, case)| {
            let template = template_for(case.record.category);
            template_assignment(case, template, positional_round(i, cfg.max_per_round))
        })
        .collect();
    let round_plan = derive_round_plan(cases, &assignments, cfg.round_spacing_days);
    let total_rounds = round_plan.len() as u32;

    StrategyPlan {
        contact_id: contact_id.to_string(),
        overall_strategy: format!(
            "Template plan: {} items over {} round(s). Collections and public records are \
             challenged first, then charge-offs, late payments and inquiries, with rounds {} days apart.",
            cases.len(),
            total_rounds,
            cfg.round_spacing_days
        ),
        projected_score_increase: projected_increase(cases, &assignments),
        assignments,
        round_plan,
        generated_by: GeneratedBy::Fallback,
        total_rounds,
        created_at: now_rfc3339(),
    }
}

/// Merges model output with templates. Cases the model skipped, and fields
/// it left out, come from the template of the case's category.
fn merge_ai_plan(
    contact_id: &str,
    cases: &[Case],
    ai: AiStrategy,
    cfg: &EngineConfig,
) -> StrategyPlan {
    let mut by_id: HashMap<String, AiAssignment> = ai
        .assignments
        .into_iter()
        .map(|a| (a.dispute_id.clone(), a))
        .collect();

    let assignments: Vec<CaseAssignment> = cases
        .iter()
        .enumerate()
        .map(|(i, case)| {
            let template = template_for(case.record.category);
            let base = template_assignment(case, template, positional_round(i, cfg.max_per_round));
            match by_id.remove(&case.id) {
                Some(a) => overlay(base, a),
                None => {
                    debug!(case_id = %case.id, "no model assignment; using template");
                    base
                }
            }
        })
        .collect();

    let round_plan = if ai.round_plan.is_empty() {
        derive_round_plan(cases, &assignments, cfg.round_spacing_days)
    } else {
        ai.round_plan
    };
    let total_rounds = assignments
        .iter()
        .map(|a| a.assigned_round)
        .max()
        .unwrap_or(0);

    StrategyPlan {
        contact_id: contact_id.to_string(),
        overall_strategy: ai.overall_strategy.unwrap_or_else(|| {
            format!("{} items over {} round(s).", cases.len(), total_rounds)
        }),
        projected_score_increase: projected_increase(cases, &assignments),
        assignments,
        round_plan,
        generated_by: GeneratedBy::Ai,
        total_rounds,
        created_at: now_rfc3339(),
    }
}

fn overlay(base: CaseAssignment, a: AiAssignment) -> CaseAssignment {
    CaseAssignment {
        disputability_score: a.disputability_score.unwrap_or(base.disputability_score),
        assigned_round: a.assigned_round.unwrap_or(base.assigned_round),
        primary_strategy: a.primary_strategy.unwrap_or(base.primary_strategy),
        secondary_strategy: a.secondary_strategy.or(base.secondary_strategy),
        legal_basis: if a.legal_basis.is_empty() {
            base.legal_basis
        } else {
            a.legal_basis
        },
        reasoning: a.reasoning.unwrap_or(base.reasoning),
        success_probability: a.success_probability.unwrap_or(base.success_probability),
        letter_tone: a
            .letter_tone
            .as_deref()
            .and_then(LetterTone::parse)
            .unwrap_or(base.letter_tone),
        special_instructions: a.special_instructions,
        dispute_id: base.dispute_id,
    }
}

fn derive_round_plan(
    cases: &[Case],
    assignments: &[CaseAssignment],
    spacing_days: u32,
) -> Vec<RoundPlanEntry> {
    let category_of: HashMap<&str, &str> = cases
        .iter()
        .map(|c| (c.id.as_str(), c.record.category.as_str()))
        .collect();

    let mut rounds: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for a in assignments {
        let cat = category_of.get(a.dispute_id.as_str()).copied().unwrap_or("other");
        rounds.entry(a.assigned_round).or_default().push(cat);
    }

    rounds
        .into_iter()
        .map(|(round, cats)| {
            let mut focus: Vec<&str> = Vec::new();
            for c in &cats {
                if !focus.contains(c) {
                    focus.push(c);
                }
            }
            RoundPlanEntry {
                round,
                target_date: round_label(round, spacing_days),
                item_count: cats.len(),
                focus: focus.join(", "),
            }
        })
        .collect()
}

/// Sum over cases of impact midpoint times success probability, one decimal.
fn projected_increase(cases: &[Case], assignments: &[CaseAssignment]) -> f64 {
    let probability: HashMap<&str, f64> = assignments
        .iter()
        .map(|a| (a.dispute_id.as_str(), a.success_probability))
        .collect();
    let total: f64 = cases
        .iter()
        .map(|c| {
            let p = probability.get(c.id.as_str()).copied().unwrap_or(0.0);
            c.record.estimated_score_impact.midpoint() * p
        })
        .sum();
    (total * 10.0).round() / 10.0
}

/// Builds, persists and mirrors a strategy plan for every pending case.
pub async fn generate_strategy<S, R>(
    store: &S,
    reasoning: &R,
    cfg: &EngineConfig,
    dump: &PromptDump,
    contact_id: &str,
) -> EngineResult<StrategyOutcome>
where
    S: DocumentStore,
    R: ReasoningService,
{
    let t0 = Instant::now();
    let cases = load_cases(store, contact_id, &[CaseStatus::Pending]).await?;
    if cases.is_empty() {
        info!(contact_id, "strategy: no pending cases");
        return Ok(StrategyOutcome {
            plan_id: None,
            fallback_used: false,
            generated_by: GeneratedBy::Fallback,
            case_count: 0,
            total_rounds: 0,
            projected_score_increase: 0.0,
            overall_strategy: String::new(),
            round_plan: Vec::new(),
            assignments: Vec::new(),
        });
    }

    let profile = SubjectProfile::load(store, contact_id).await?;
    let user = build_strategy_prompt(&profile, &cases, cfg.max_per_round, cfg.round_spacing_days);
    dump.dump(contact_id, "strategy", 0, "prompt", &user).await;
    debug!(contact_id, cases = cases.len(), prompt_chars = user.len(), "strategy: prompt built");

    let t_call = Instant::now();
    let ai = match reasoning
        .complete(STRATEGY_SYSTEM_PROMPT, &user, cfg.strategy_opts)
        .await
    {
        Ok(text) => {
            dump.dump(contact_id, "strategy", 1, "response", &text).await;
            let known: HashSet<&str> = cases.iter().map(|c| c.id.as_str()).collect();
            parse_strategy_response(&text, &known)
        }
        Err(e) => {
            warn!(contact_id, error = %e, "strategy: reasoning call failed; using templates");
            None
        }
    };
    debug!(
        contact_id,
        latency_ms = t_call.elapsed().as_millis() as u64,
        parsed = ai.is_some(),
        "strategy: reasoning call finished"
    );

    let plan = match ai {
        Some(ai) => merge_ai_plan(contact_id, &cases, ai, cfg),
        None => fallback_plan(contact_id, &cases, cfg),
    };
    let fallback_used = plan.generated_by == GeneratedBy::Fallback;

    let plan_id = store
        .insert(collections::STRATEGIES, serde_json::to_value(&plan)?)
        .await?;

    let status_of: HashMap<&str, CaseStatus> =
        cases.iter().map(|c| (c.id.as_str(), c.record.status)).collect();
    for a in &plan.assignments {
        let mut patch = json!({
            "strategyPlanId": plan_id,
            "disputabilityScore": a.disputability_score,
            "disputeRound": a.assigned_round,
            "primaryStrategy": a.primary_strategy,
            "secondaryStrategy": a.secondary_strategy,
            "legalBasis": a.legal_basis,
            "successProbability": a.success_probability,
            "letterTone": a.letter_tone,
            "specialInstructions": a.special_instructions,
            "updatedAt": now_rfc3339(),
        });
        let advance = status_of
            .get(a.dispute_id.as_str())
            .is_some_and(|s| s.can_advance_to(CaseStatus::StrategyAssigned));
        if advance {
            patch["status"] = json!(CaseStatus::StrategyAssigned);
            patch["stage"] = json!("strategy_assigned");
        }
        store.update(collections::CASES, &a.dispute_id, patch).await?;
    }

    let now = now_rfc3339();
    let contact_patch = json!({
        "disputeStrategy.planId": plan_id,
        "disputeStrategy.projectedScoreIncrease": plan.projected_score_increase,
        "disputeStrategy.totalRounds": plan.total_rounds,
        "disputeStrategy.generatedBy": plan.generated_by,
        "disputeStrategy.lastGenerated": now,
        "updatedAt": now,
    });
    if let Err(e) = store.update(collections::CONTACTS, contact_id, contact_patch).await {
        warn!(contact_id, error = %e, "strategy: subject summary not updated");
    }

    info!(
        contact_id,
        plan_id = %plan_id,
        cases = cases.len(),
        rounds = plan.total_rounds,
        generated_by = plan.generated_by.as_str(),
        latency_ms = t0.elapsed().as_millis() as u64,
        "strategy generated"
    );

    Ok(StrategyOutcome {
        plan_id: Some(plan_id),
        fallback_used,
        generated_by: plan.generated_by,
        case_count: cases.len(),
        total_rounds: plan.total_rounds,
        projected_score_increase: plan.projected_score_increase,
        overall_strategy: plan.overall_strategy,
        round_plan: plan.round_plan,
        assignments: plan.assignments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::case;
    use credit_report::{Category, Priority};

    #[test]
    fn fallback_assigns_positional_rounds_and_template_fields() {
        let cfg = EngineConfig {
            max_per_round: 2,
            ..EngineConfig::default()
        };
        let cases = vec![
            case("a", Category::Collection, Priority::High, (50, 100)),
            case("b", Category::LatePayment, Priority::Medium, (20, 40)),
            case("c", Category::Inquiry, Priority::Low, (2, 6)),
        ];
        let plan = fallback_plan("c1", &cases, &cfg);

        let rounds: Vec<u32> = plan.assignments.iter().map(|a| a.assigned_round).collect();
        assert_eq!(rounds, vec![1, 1, 2]);
        assert_eq!(plan.total_rounds, 2);
        assert_eq!(plan.generated_by, GeneratedBy::Fallback);
        assert_eq!(plan.assignments[0].primary_strategy, "validation");
        assert_eq!(plan.assignments[0].letter_tone, LetterTone::Aggressive);
        assert_eq!(plan.assignments[1].letter_tone, LetterTone::Formal);
        assert_eq!(plan.round_plan[0].item_count, 2);
        assert_eq!(plan.round_plan[0].focus, "collection, latePayment");
        assert_eq!(plan.round_plan[1].target_date, "30 days after round 1");
        // 75*0.78 + 30*0.65 + 4*0.70
        assert_eq!(plan.projected_score_increase, 80.8);
    }

    #[test]
    fn model_fields_override_templates_per_case() {
        let cfg = EngineConfig::default();
        let cases = vec![
            case("a", Category::Collection, Priority::High, (50, 100)),
            case("b", Category::ChargeOff, Priority::High, (40, 80)),
        ];
        let ai = AiStrategy {
            overall_strategy: Some("Validate first".into()),
            assignments: vec![AiAssignment {
                dispute_id: "b".into(),
                assigned_round: Some(2),
                letter_tone: Some("consumer".into()),
                ..AiAssignment::default()
            }],
            round_plan: Vec::new(),
        };
        let plan = merge_ai_plan("c1", &cases, ai, &cfg);

        assert_eq!(plan.generated_by, GeneratedBy::Ai);
        assert_eq!(plan.overall_strategy, "Validate first");
        assert_eq!(plan.assignments[0].primary_strategy, "validation");
        assert_eq!(plan.assignments[1].assigned_round, 2);
        assert_eq!(plan.assignments[1].letter_tone, LetterTone::Consumer);
        assert_eq!(plan.assignments[1].primary_strategy, "factual");
        assert_eq!(plan.total_rounds, 2);
        assert_eq!(plan.round_plan.len(), 2);
    }
}
