//! Letter generation.
//!
//! One reasoning request per (case, bureau, tone). Requests run through a
//! bounded `buffered` stream so results come back in input order no matter
//! how many are in flight. A failed or too-short response drops that one
//! letter and the batch goes on.

use std::{collections::HashSet, time::Instant};

use credit_report::Bureau;
use dispute_store::DocumentStore;
use futures::{StreamExt, stream};
use reasoning_service::ReasoningService;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
    config::EngineConfig,
    errors::EngineResult,
    records::{
        Case, CaseStatus, LetterRecord, LetterStatus, LetterTone, SubjectProfile, collections,
        load_cases, now_rfc3339,
    },
    strategy::{
        parse::parse_letter_response,
        prompt::{LETTER_SYSTEM_PROMPT, build_letter_prompt},
    },
    telemetry::prompt_dump::PromptDump,
};

/// Which tones to draft for each case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneSelection {
    /// The tone on the case, or the priority default.
    #[default]
    Assigned,
    /// Formal, consumer and aggressive.
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LetterRequest {
    /// Only cases scheduled in this round.
    pub round: Option<u32>,
    pub tones: ToneSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedLetter {
    pub id: String,
    pub dispute_id: String,
    pub bureau: Bureau,
    pub tone: LetterTone,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterFailure {
    pub dispute_id: String,
    pub bureau: Bureau,
    pub tone: LetterTone,
    pub reason: String,
}

/// `letters.len() + failed.len() == expected`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterBatch {
    pub expected: usize,
    pub generated: usize,
    pub letters: Vec<GeneratedLetter>,
    pub failed: Vec<LetterFailure>,
}

struct Job<'a> {
    idx: usize,
    case: &'a Case,
    bureau: Bureau,
    tone: LetterTone,
}

fn tones_for(case: &Case, selection: ToneSelection) -> Vec<LetterTone> {
    match selection {
        ToneSelection::All => LetterTone::ALL.to_vec(),
        ToneSelection::Assigned => vec![
            case.record
                .letter_tone
                .unwrap_or_else(|| LetterTone::default_for(case.record.priority)),
        ],
    }
}

fn default_subject(case: &Case) -> String {
    format!(
        "Dispute of {} account {}",
        case.record.creditor_name, case.record.account_number
    )
}

/// Drafts and persists letters for the subject's open cases.
pub async fn generate_letters<S, R>(
    store: &S,
    reasoning: &R,
    cfg: &EngineConfig,
    dump: &PromptDump,
    contact_id: &str,
    req: LetterRequest,
) -> EngineResult<LetterBatch>
where
    S: DocumentStore,
    R: ReasoningService,
{
    let t0 = Instant::now();
    let cases: Vec<Case> = load_cases(
        store,
        contact_id,
        &[CaseStatus::Pending, CaseStatus::StrategyAssigned],
    )
    .await?
    .into_iter()
    .filter(|c| req.round.is_none() || c.record.dispute_round == req.round)
    .collect();

    let profile = SubjectProfile::load(store, contact_id).await?;

    let jobs: Vec<Job<'_>> = cases
        .iter()
        .flat_map(|case| {
            let tones = tones_for(case, req.tones);
            case.record.bureaus.iter().flat_map(move |&bureau| {
                tones.clone().into_iter().map(move |tone| (case, bureau, tone))
            })
        })
        .enumerate()
        .map(|(idx, (case, bureau, tone))| Job {
            idx,
            case,
            bureau,
            tone,
        })
        .collect();
    let expected = jobs.len();
    debug!(contact_id, cases = cases.len(), expected, round = ?req.round, "letters: jobs planned");

    let profile = &profile;
    let results: Vec<(Job<'_>, Result<(String, String), String>)> = stream::iter(jobs)
        .map(|job| async move {
            let outcome = draft(reasoning, cfg, dump, contact_id, profile, &job).await;
            (job, outcome)
        })
        .buffered(cfg.letter_concurrency.max(1))
        .collect()
        .await;

    let mut batch = LetterBatch {
        expected,
        ..LetterBatch::default()
    };
    let mut lettered: HashSet<&str> = HashSet::new();
    let generated_by = reasoning.model_name().to_string();

    for (job, outcome) in results {
        let (subject, body) = match outcome {
            Ok(text) => text,
            Err(reason) => {
                warn!(
                    contact_id,
                    case_id = %job.case.id,
                    bureau = %job.bureau,
                    tone = job.tone.as_str(),
                    reason = %reason,
                    "letter skipped"
                );
                batch.failed.push(LetterFailure {
                    dispute_id: job.case.id.clone(),
                    bureau: job.bureau,
                    tone: job.tone,
                    reason,
                });
                continue;
            }
        };

        let record = LetterRecord {
            dispute_id: job.case.id.clone(),
            contact_id: contact_id.to_string(),
            bureau: job.bureau,
            tone: job.tone,
            round: job.case.record.dispute_round,
            subject: subject.clone(),
            body,
            legal_citations: job.case.record.legal_basis.clone(),
            status: LetterStatus::Draft,
            generated_by: generated_by.clone(),
            created_at: now_rfc3339(),
        };
        let id = store
            .insert(collections::LETTERS, serde_json::to_value(&record)?)
            .await?;
        lettered.insert(job.case.id.as_str());
        batch.letters.push(GeneratedLetter {
            id,
            dispute_id: record.dispute_id,
            bureau: job.bureau,
            tone: job.tone,
            subject,
        });
    }
    batch.generated = batch.letters.len();

    for case in cases.iter().filter(|c| lettered.contains(c.id.as_str())) {
        if !case.record.status.can_advance_to(CaseStatus::LettersGenerated) {
            continue;
        }
        store
            .update(
                collections::CASES,
                &case.id,
                json!({
                    "status": CaseStatus::LettersGenerated,
                    "stage": "letters_generated",
                    "updatedAt": now_rfc3339(),
                }),
            )
            .await?;
    }

    info!(
        contact_id,
        expected,
        generated = batch.generated,
        failed = batch.failed.len(),
        latency_ms = t0.elapsed().as_millis() as u64,
        "letters generated"
    );
    Ok(batch)
}

/// One reasoning call. `Err` carries the reason the letter was dropped.
async fn draft<R: ReasoningService>(
    reasoning: &R,
    cfg: &EngineConfig,
    dump: &PromptDump,
    contact_id: &str,
    profile: &SubjectProfile,
    job: &Job<'_>,
) -> Result<(String, String), String> {
    let user = build_letter_prompt(profile, job.case, job.bureau, job.tone);
    let name = format!("{}_{}_{}", job.case.id, job.bureau, job.tone.as_str());
    dump.dump(contact_id, "letters", job.idx * 2, &name, &user).await;

    let t = Instant::now();
    let text = reasoning
        .complete(LETTER_SYSTEM_PROMPT, &user, cfg.letter_opts)
        .await
        .map_err(|e| format!("reasoning call failed: {e}"))?;
    dump.dump(contact_id, "letters", job.idx * 2 + 1, &name, &text).await;
    debug!(
        case_id = %job.case.id,
        bureau = %job.bureau,
        latency_ms = t.elapsed().as_millis() as u64,
        chars = text.len(),
        "letter response received"
    );

    let parsed = parse_letter_response(&text);
    let chars = parsed.body.chars().count();
    if chars < cfg.min_letter_chars {
        return Err(format!(
            "response too short ({chars} < {} chars)",
            cfg.min_letter_chars
        ));
    }
    let subject = parsed.subject.unwrap_or_else(|| default_subject(job.case));
    Ok((subject, parsed.body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use credit_report::{Category, Priority};

    #[test]
    fn assigned_tone_falls_back_to_priority_default() {
        let mut case = crate::testutil::case("d1", Category::Collection, Priority::High, (50, 100));
        assert_eq!(tones_for(&case, ToneSelection::Assigned), vec![LetterTone::Aggressive]);
        case.record.letter_tone = Some(LetterTone::Consumer);
        assert_eq!(tones_for(&case, ToneSelection::Assigned), vec![LetterTone::Consumer]);
        assert_eq!(tones_for(&case, ToneSelection::All).len(), 3);
    }
}
