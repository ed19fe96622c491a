//! Prompt builders for strategy planning and letter drafting.
//!
//! Keep prompts compact; the response shape is spelled out as JSON so the
//! parser can stay strict about field names.

use credit_report::Bureau;
use serde_json::json;

use crate::{
    records::{Case, LetterTone, SubjectProfile},
    strategy::templates::{StrategyTag, citation_for},
};

pub const STRATEGY_SYSTEM_PROMPT: &str = "\
You are an experienced credit dispute strategist working under the Fair Credit Reporting Act \
and the Fair Debt Collection Practices Act.
Policy:
- Validate collection accounts first; request debt validation before disputing accuracy.
- Never schedule more than 5-7 items in one round.
- Space rounds about 30 days apart so each bureau investigation can finish.
- Prioritize high-balance collections and charge-offs.
Answer with a single JSON object and nothing else.";

pub const LETTER_SYSTEM_PROMPT: &str = "\
You draft credit dispute letters addressed to a consumer reporting agency.
Write in first person as the consumer. Be specific about the disputed account, cite the \
statutes given, and request investigation and correction or deletion within 30 days.
Do not invent account details that are not provided.
Answer with JSON: {\"subject\": \"...\", \"body\": \"...\"}.";

/// User prompt for the strategy call.
pub fn build_strategy_prompt(
    profile: &SubjectProfile,
    cases: &[Case],
    max_per_round: usize,
    spacing_days: u32,
) -> String {
    let items: Vec<_> = cases
        .iter()
        .map(|c| {
            let r = &c.record;
            json!({
                "disputeId": c.id,
                "creditor": r.creditor_name,
                "account": r.account_number,
                "category": r.category,
                "balance": r.balance,
                "paymentStatus": r.payment_status,
                "bureaus": r.bureaus,
                "priority": r.priority,
                "estimatedScoreImpact": r.estimated_score_impact,
                "reason": r.negative_reason,
            })
        })
        .collect();
    let tags: Vec<&str> = [
        StrategyTag::Validation,
        StrategyTag::Verification,
        StrategyTag::Goodwill,
        StrategyTag::Factual,
        StrategyTag::Procedural,
        StrategyTag::EOscar,
    ]
    .iter()
    .map(|t| t.as_str())
    .collect();

    let mut s = String::new();
    s.push_str("# Consumer\n");
    s.push_str(&format!("Name: {}\n", or_unknown(&profile.full_name)));
    s.push_str(&format!("Open disputable items: {}\n", cases.len()));
    s.push_str("\n# Items\n```json\n");
    s.push_str(&serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".into()));
    s.push_str("\n```\n");
    s.push_str("\n# Constraints\n");
    s.push_str(&format!("- At most {max_per_round} items per round.\n"));
    s.push_str(&format!("- Rounds are {spacing_days} days apart.\n"));
    s.push_str(&format!("- strategy tags: {}\n", tags.join(", ")));
    s.push_str("- legal basis keys: FCRA_611, FCRA_609, FCRA_623, FCRA_605, FCRA_604, FDCPA_809\n");
    s.push_str("- letterTone: formal | consumer | aggressive\n");
    s.push_str(
        "\n# Response shape\n\
{\n  \"overallStrategy\": \"...\",\n  \"assignments\": [{\n    \"disputeId\": \"...\",\n    \
\"disputabilityScore\": 1-10,\n    \"assignedRound\": 1,\n    \"primaryStrategy\": \"validation\",\n    \
\"secondaryStrategy\": \"factual\",\n    \"legalBasis\": [\"FCRA_611\"],\n    \"reasoning\": \"...\",\n    \
\"successProbability\": 0.0-1.0,\n    \"letterTone\": \"formal\",\n    \"specialInstructions\": \"...\"\n  }],\n  \
\"roundPlan\": [{ \"round\": 1, \"targetDate\": \"...\", \"itemCount\": 1, \"focus\": \"...\" }]\n}\n",
    );
    s
}

/// User prompt for one (case, bureau, tone) letter.
pub fn build_letter_prompt(
    profile: &SubjectProfile,
    case: &Case,
    bureau: Bureau,
    tone: LetterTone,
) -> String {
    let r = &case.record;
    let address = bureau.mailing_address();

    let mut s = String::new();
    s.push_str("# From\n");
    s.push_str(&format!("{}\n", or_unknown(&profile.full_name)));
    if !profile.street.is_empty() {
        s.push_str(&format!(
            "{}\n{}, {} {}\n",
            profile.street, profile.city, profile.state, profile.zip
        ));
    }
    s.push_str("\n# To\n");
    s.push_str(&format!("{address}\n"));
    s.push_str("\n# Disputed account\n");
    s.push_str(&format!("Creditor: {}\n", r.creditor_name));
    s.push_str(&format!("Account number: {}\n", r.account_number));
    s.push_str(&format!("Account type: {}\n", r.account_type));
    s.push_str(&format!("Balance reported: ${:.2}\n", r.balance));
    if !r.payment_status.is_empty() {
        s.push_str(&format!("Payment status: {}\n", r.payment_status));
    }
    s.push_str(&format!("Issue: {}\n", r.negative_reason));
    s.push_str(&format!("Dispute reason: {}\n", r.suggested_dispute_reason));
    if let Some(strategy) = &r.primary_strategy {
        let title = StrategyTag::parse(strategy).map_or(strategy.as_str(), |t| t.title());
        s.push_str(&format!("Strategy: {title}\n"));
    }
    if let Some(extra) = r.special_instructions.as_deref().filter(|x| !x.is_empty()) {
        s.push_str(&format!("Special instructions: {extra}\n"));
    }
    if !r.legal_basis.is_empty() {
        s.push_str("\n# Legal basis\n");
        for key in &r.legal_basis {
            s.push_str(&format!("- {}\n", citation_for(key)));
        }
    }
    s.push_str(&format!("\n# Tone\n{}\n", tone_guidance(tone)));
    s
}

fn tone_guidance(tone: LetterTone) -> &'static str {
    match tone {
        LetterTone::Formal => "Formal and precise. Reference the statutes by section.",
        LetterTone::Consumer => "Plain, personal language from an ordinary consumer.",
        LetterTone::Aggressive => {
            "Firm and demanding. State that unverifiable information must be deleted and that \
             further action will follow non-compliance."
        }
    }
}

fn or_unknown(s: &str) -> &str {
    if s.is_empty() { "Consumer" } else { s }
}
