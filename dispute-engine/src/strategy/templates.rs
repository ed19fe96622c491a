//! Static strategy catalog and legal-basis citations.
//!
//! The catalog is immutable. Which tag is recommended for a category is
//! computed by [`recommend`] and returned as a value.

use credit_report::Category;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyTag {
    Validation,
    Verification,
    Goodwill,
    Factual,
    Procedural,
    EOscar,
}

impl StrategyTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyTag::Validation => "validation",
            StrategyTag::Verification => "verification",
            StrategyTag::Goodwill => "goodwill",
            StrategyTag::Factual => "factual",
            StrategyTag::Procedural => "procedural",
            StrategyTag::EOscar => "e_oscar",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            StrategyTag::Validation => "Debt Validation",
            StrategyTag::Verification => "Account Verification",
            StrategyTag::Goodwill => "Goodwill Letter",
            StrategyTag::Factual => "Factual Dispute",
            StrategyTag::Procedural => "Procedural Violation",
            StrategyTag::EOscar => "E-Oscar Challenge",
        }
    }

    /// Historical success rate, percent.
    pub fn base_success_rate(self) -> u8 {
        match self {
            StrategyTag::Validation => 78,
            StrategyTag::Verification => 65,
            StrategyTag::Goodwill => 45,
            StrategyTag::Factual => 82,
            StrategyTag::Procedural => 70,
            StrategyTag::EOscar => 58,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let norm: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match norm.as_str() {
            "validation" | "debtvalidation" => Some(StrategyTag::Validation),
            "verification" | "accountverification" => Some(StrategyTag::Verification),
            "goodwill" | "goodwillletter" => Some(StrategyTag::Goodwill),
            "factual" | "factualdispute" => Some(StrategyTag::Factual),
            "procedural" | "proceduralviolation" => Some(StrategyTag::Procedural),
            "eoscar" | "eoscarchallenge" => Some(StrategyTag::EOscar),
            _ => None,
        }
    }
}

/// Statute a dispute can cite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegalBasis {
    #[serde(rename = "FCRA_611")]
    Fcra611,
    #[serde(rename = "FCRA_609")]
    Fcra609,
    #[serde(rename = "FCRA_623")]
    Fcra623,
    #[serde(rename = "FCRA_605")]
    Fcra605,
    #[serde(rename = "FCRA_604")]
    Fcra604,
    #[serde(rename = "FDCPA_809")]
    Fdcpa809,
}

impl LegalBasis {
    pub const ALL: [LegalBasis; 6] = [
        LegalBasis::Fcra611,
        LegalBasis::Fcra609,
        LegalBasis::Fcra623,
        LegalBasis::Fcra605,
        LegalBasis::Fcra604,
        LegalBasis::Fdcpa809,
    ];

    pub fn key(self) -> &'static str {
        match self {
            LegalBasis::Fcra611 => "FCRA_611",
            LegalBasis::Fcra609 => "FCRA_609",
            LegalBasis::Fcra623 => "FCRA_623",
            LegalBasis::Fcra605 => "FCRA_605",
            LegalBasis::Fcra604 => "FCRA_604",
            LegalBasis::Fdcpa809 => "FDCPA_809",
        }
    }

    pub fn citation(self) -> &'static str {
        match self {
            LegalBasis::Fcra611 => "FCRA Section 611, 15 U.S.C. § 1681i (procedure in case of disputed accuracy)",
            LegalBasis::Fcra609 => "FCRA Section 609, 15 U.S.C. § 1681g (disclosures to consumers)",
            LegalBasis::Fcra623 => "FCRA Section 623, 15 U.S.C. § 1681s-2 (responsibilities of furnishers)",
            LegalBasis::Fcra605 => "FCRA Section 605, 15 U.S.C. § 1681c (obsolete information)",
            LegalBasis::Fcra604 => "FCRA Section 604, 15 U.S.C. § 1681b (permissible purposes)",
            LegalBasis::Fdcpa809 => "FDCPA Section 809, 15 U.S.C. § 1692g (validation of debts)",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let k = key.trim().to_ascii_uppercase().replace([' ', '-', '§'], "_");
        Self::ALL.into_iter().find(|b| b.key() == k)
    }
}

/// Citation text for a key, or the key itself when it is not in the catalog.
pub fn citation_for(key: &str) -> String {
    LegalBasis::from_key(key)
        .map(|b| b.citation().to_string())
        .unwrap_or_else(|| key.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyTemplate {
    pub category: Category,
    pub primary: StrategyTag,
    pub secondary: StrategyTag,
    pub tertiary: StrategyTag,
    pub legal_basis: &'static [LegalBasis],
    /// 1 to 10.
    pub disputability: u8,
    /// 0.0 to 1.0.
    pub success_rate: f64,
    /// Lower goes earlier.
    pub round_priority: u8,
    pub rationale: &'static str,
}

static CATALOG: [StrategyTemplate; 6] = [
    StrategyTemplate {
        category: Category::Collection,
        primary: StrategyTag::Validation,
        secondary: StrategyTag::Factual,
        tertiary: StrategyTag::Procedural,
        legal_basis: &[LegalBasis::Fdcpa809, LegalBasis::Fcra611, LegalBasis::Fcra609],
        disputability: 8,
        success_rate: 0.78,
        round_priority: 1,
        rationale: "Collectors frequently cannot produce the original agreement or chain of ownership.",
    },
    StrategyTemplate {
        category: Category::ChargeOff,
        primary: StrategyTag::Factual,
        secondary: StrategyTag::Validation,
        tertiary: StrategyTag::Procedural,
        legal_basis: &[LegalBasis::Fcra611, LegalBasis::Fcra623, LegalBasis::Fcra609],
        disputability: 7,
        success_rate: 0.72,
        round_priority: 1,
        rationale: "Charge-off balances and dates are often misreported after the account is sold.",
    },
    StrategyTemplate {
        category: Category::LatePayment,
        primary: StrategyTag::Verification,
        secondary: StrategyTag::Goodwill,
        tertiary: StrategyTag::Factual,
        legal_basis: &[LegalBasis::Fcra611, LegalBasis::Fcra623],
        disputability: 6,
        success_rate: 0.65,
        round_priority: 2,
        rationale: "Furnishers must verify each reported delinquency date against payment records.",
    },
    StrategyTemplate {
        category: Category::Other,
        primary: StrategyTag::Verification,
        secondary: StrategyTag::Procedural,
        tertiary: StrategyTag::Factual,
        legal_basis: &[LegalBasis::Fcra611, LegalBasis::Fcra609],
        disputability: 5,
        success_rate: 0.60,
        round_priority: 2,
        rationale: "A derogatory status without supporting documentation cannot be verified.",
    },
    StrategyTemplate {
        category: Category::Inquiry,
        primary: StrategyTag::Procedural,
        secondary: StrategyTag::Factual,
        tertiary: StrategyTag::EOscar,
        legal_basis: &[LegalBasis::Fcra604, LegalBasis::Fcra611],
        disputability: 7,
        success_rate: 0.70,
        round_priority: 3,
        rationale: "Hard inquiries require a permissible purpose the creditor must document.",
    },
    StrategyTemplate {
        category: Category::PublicRecord,
        primary: StrategyTag::Procedural,
        secondary: StrategyTag::Factual,
        tertiary: StrategyTag::EOscar,
        legal_basis: &[LegalBasis::Fcra611, LegalBasis::Fcra605, LegalBasis::Fcra609],
        disputability: 6,
        success_rate: 0.58,
        round_priority: 1,
        rationale: "Bureaus rarely verify public records with the court directly.",
    },
];

pub fn catalog() -> &'static [StrategyTemplate] {
    &CATALOG
}

pub fn template_for(category: Category) -> &'static StrategyTemplate {
    CATALOG
        .iter()
        .find(|t| t.category == category)
        .unwrap_or(&CATALOG[3])
}

/// A template together with the tag recommended for a given case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recommendation {
    pub template: &'static StrategyTemplate,
    pub recommended: StrategyTag,
}

/// Picks the template tag with the best historical success rate, preferring
/// earlier tags on ties.
pub fn recommend(category: Category) -> Recommendation {
    let template = template_for(category);
    let recommended = [template.secondary, template.tertiary]
        .into_iter()
        .fold(template.primary, |best, t| {
            if t.base_success_rate() > best.base_success_rate() {
                t
            } else {
                best
            }
        });
    Recommendation {
        template,
        recommended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_template() {
        for c in [
            Category::Collection,
            Category::ChargeOff,
            Category::LatePayment,
            Category::Other,
            Category::Inquiry,
            Category::PublicRecord,
        ] {
            let t = template_for(c);
            assert_eq!(t.category, c);
            assert!((1..=10).contains(&t.disputability));
            assert!(!t.legal_basis.is_empty());
        }
    }

    #[test]
    fn recommendation_does_not_touch_the_catalog() {
        let before = catalog().to_vec();
        let r = recommend(Category::Collection);
        assert_eq!(r.recommended, StrategyTag::Factual);
        assert_eq!(r.template.primary, StrategyTag::Validation);
        assert_eq!(catalog(), before.as_slice());
    }

    #[test]
    fn highest_success_rate_wins() {
        assert_eq!(recommend(Category::Inquiry).recommended, StrategyTag::Factual);
        assert_eq!(recommend(Category::Other).recommended, StrategyTag::Factual);
    }

    #[test]
    fn legal_keys_resolve() {
        assert_eq!(LegalBasis::from_key("fcra 611"), Some(LegalBasis::Fcra611));
        assert_eq!(LegalBasis::from_key("FDCPA_809"), Some(LegalBasis::Fdcpa809));
        assert!(citation_for("FCRA_623").contains("1681s-2"));
        assert_eq!(citation_for("STATE_LAW"), "STATE_LAW");
    }
}
