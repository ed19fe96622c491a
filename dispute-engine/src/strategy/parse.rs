//! Lenient parsing of reasoning-service responses.
//!
//! Models wrap JSON in fences, prepend prose, and drift on field types. The
//! parsers here accept all of that and drop whatever cannot be used; callers
//! decide what to do with an empty result.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::records::RoundPlanEntry;

/// Strips a surrounding markdown code fence.
pub fn cleanup_json_like(s: &str) -> String {
    let mut t = s.trim().to_string();
    if t.starts_with("```") {
        t = t
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .to_string();
        if let Some(pos) = t.rfind("```") {
            t.truncate(pos);
        }
    }
    t.trim().to_string()
}

/// The span from the first `{` to the last `}`, if any.
pub fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

fn parse_object(text: &str) -> Option<Value> {
    let clean = cleanup_json_like(text);
    if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(&clean) {
        return Some(v);
    }
    let span = extract_json_object(&clean)?;
    match serde_json::from_str::<Value>(span) {
        Ok(v @ Value::Object(_)) => Some(v),
        _ => None,
    }
}

/// One assignment as the model returned it. Everything but the id is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiAssignment {
    pub dispute_id: String,
    pub disputability_score: Option<u8>,
    pub assigned_round: Option<u32>,
    pub primary_strategy: Option<String>,
    pub secondary_strategy: Option<String>,
    pub legal_basis: Vec<String>,
    pub reasoning: Option<String>,
    pub success_probability: Option<f64>,
    pub letter_tone: Option<String>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiStrategy {
    pub overall_strategy: Option<String>,
    pub assignments: Vec<AiAssignment>,
    pub round_plan: Vec<RoundPlanEntry>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawStrategy {
    overall_strategy: Option<Value>,
    assignments: Vec<Value>,
    round_plan: Vec<Value>,
}

/// Parses a strategy response and keeps only assignments whose id is in
/// `known_ids` (first occurrence wins). `None` when nothing usable is left.
pub fn parse_strategy_response(text: &str, known_ids: &HashSet<&str>) -> Option<AiStrategy> {
    let Some(obj) = parse_object(text) else {
        warn!(chars = text.len(), "strategy response has no JSON object");
        return None;
    };
    let raw: RawStrategy = match serde_json::from_value(obj) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "strategy response has an unexpected shape");
            return None;
        }
    };

    let mut seen = HashSet::new();
    let mut assignments = Vec::with_capacity(raw.assignments.len());
    for item in &raw.assignments {
        let Some(a) = assignment_from(item) else {
            continue;
        };
        if !known_ids.contains(a.dispute_id.as_str()) {
            debug!(dispute_id = %a.dispute_id, "ignoring assignment for unknown case");
            continue;
        }
        if seen.insert(a.dispute_id.clone()) {
            assignments.push(a);
        }
    }
    if assignments.is_empty() {
        warn!(returned = raw.assignments.len(), "strategy response has no usable assignments");
        return None;
    }

    Some(AiStrategy {
        overall_strategy: raw.overall_strategy.as_ref().and_then(text_of),
        assignments,
        round_plan: raw.round_plan.iter().filter_map(round_from).collect(),
    })
}

fn assignment_from(v: &Value) -> Option<AiAssignment> {
    let obj = v.as_object()?;
    let dispute_id = obj.get("disputeId").and_then(text_of)?;
    let get = |k: &str| obj.get(k);

    Some(AiAssignment {
        dispute_id,
        disputability_score: get("disputabilityScore")
            .and_then(number_of)
            .map(|n| n.round().clamp(1.0, 10.0) as u8),
        assigned_round: get("assignedRound")
            .and_then(number_of)
            .map(|n| n.round().max(1.0) as u32),
        primary_strategy: get("primaryStrategy").and_then(text_of),
        secondary_strategy: get("secondaryStrategy").and_then(text_of),
        legal_basis: match get("legalBasis") {
            Some(Value::Array(items)) => items.iter().filter_map(text_of).collect(),
            Some(v) => text_of(v)
                .map(|s| s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect())
                .unwrap_or_default(),
            None => Vec::new(),
        },
        reasoning: get("reasoning").and_then(text_of),
        success_probability: get("successProbability").and_then(number_of).map(probability),
        letter_tone: get("letterTone").and_then(text_of),
        special_instructions: get("specialInstructions").and_then(text_of),
    })
}

fn round_from(v: &Value) -> Option<RoundPlanEntry> {
    let obj = v.as_object()?;
    Some(RoundPlanEntry {
        round: obj.get("round").and_then(number_of)?.max(1.0) as u32,
        target_date: obj.get("targetDate").and_then(text_of).unwrap_or_default(),
        item_count: obj.get("itemCount").and_then(number_of).unwrap_or(0.0).max(0.0) as usize,
        focus: obj.get("focus").and_then(text_of).unwrap_or_default(),
    })
}

/// Accepts 0..1 or a percentage.
fn probability(n: f64) -> f64 {
    let p = if n > 1.0 { n / 100.0 } else { n };
    p.clamp(0.0, 1.0)
}

fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_of(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

/// Subject line and body of a drafted letter.
#[derive(Debug, Clone, PartialEq)]
pub struct LetterText {
    pub subject: Option<String>,
    pub body: String,
}

/// Reads a letter as `{subject, body}` JSON, then as text led by a
/// `Subject:` line, then as a bare body.
pub fn parse_letter_response(text: &str) -> LetterText {
    if let Some(obj) = parse_object(text) {
        if let Some(body) = obj.get("body").and_then(text_of) {
            return LetterText {
                subject: obj.get("subject").and_then(text_of),
                body,
            };
        }
    }

    let trimmed = text.trim();
    let mut lines = trimmed.lines();
    if let Some(first) = lines.next() {
        let head = first.trim();
        let tagged = head.get(..8).is_some_and(|p| p.eq_ignore_ascii_case("subject:"));
        if tagged {
            let subject = head[8..].trim().to_string();
            let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
            return LetterText {
                subject: Some(subject).filter(|s| !s.is_empty()),
                body,
            };
        }
    }

    LetterText {
        subject: None,
        body: trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids<'a>(list: &[&'a str]) -> HashSet<&'a str> {
        list.iter().copied().collect()
    }

    #[test]
    fn fenced_json_with_prose_around() {
        let text = "Here is the plan:\n```json\n{\"overallStrategy\":\"Collections first\",\
            \"assignments\":[{\"disputeId\":\"d1\",\"disputabilityScore\":\"9\",\"assignedRound\":1,\
            \"primaryStrategy\":\"validation\",\"legalBasis\":\"FDCPA_809, FCRA_611\",\
            \"successProbability\":80,\"letterTone\":\"aggressive\"}],\
            \"roundPlan\":[{\"round\":1,\"targetDate\":\"now\",\"itemCount\":1,\"focus\":\"collections\"}]}\n```";
        let s = parse_strategy_response(text, &ids(&["d1"])).unwrap();
        assert_eq!(s.overall_strategy.as_deref(), Some("Collections first"));
        let a = &s.assignments[0];
        assert_eq!(a.disputability_score, Some(9));
        assert_eq!(a.legal_basis, vec!["FDCPA_809", "FCRA_611"]);
        assert_eq!(a.success_probability, Some(0.8));
        assert_eq!(s.round_plan.len(), 1);
    }

    #[test]
    fn unknown_and_repeated_ids_are_dropped() {
        let text = r#"{"assignments":[
            {"disputeId":"ghost","assignedRound":1},
            {"disputeId":"d2","assignedRound":2},
            {"disputeId":"d2","assignedRound":5},
            {"assignedRound":1}
        ]}"#;
        let s = parse_strategy_response(text, &ids(&["d1", "d2"])).unwrap();
        assert_eq!(s.assignments.len(), 1);
        assert_eq!(s.assignments[0].assigned_round, Some(2));
    }

    #[test]
    fn nothing_usable_is_none() {
        assert!(parse_strategy_response("I cannot help with that.", &ids(&["d1"])).is_none());
        assert!(parse_strategy_response(r#"{"assignments":[]}"#, &ids(&["d1"])).is_none());
        assert!(parse_strategy_response(r#"{"assignments":"none"}"#, &ids(&["d1"])).is_none());
    }

    #[test]
    fn letter_json_subject_line_and_bare_text() {
        let j = parse_letter_response("```json\n{\"subject\":\"Dispute\",\"body\":\"Dear Sir\"}\n```");
        assert_eq!(j.subject.as_deref(), Some("Dispute"));
        assert_eq!(j.body, "Dear Sir");

        let s = parse_letter_response("SUBJECT: Account dispute\n\nTo whom it may concern,\nfix it.");
        assert_eq!(s.subject.as_deref(), Some("Account dispute"));
        assert_eq!(s.body, "To whom it may concern,\nfix it.");

        let b = parse_letter_response("  To whom it may concern  ");
        assert_eq!(b.subject, None);
        assert_eq!(b.body, "To whom it may concern");
    }
}
