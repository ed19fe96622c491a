//! Case fixtures shared by unit tests.

use credit_report::{Bureau, Category, ItemType, Priority, ScoreImpact};

use crate::records::{Case, CaseRecord, CaseStatus};

pub fn case(id: &str, category: Category, priority: Priority, impact: (u32, u32)) -> Case {
    Case {
        id: id.to_string(),
        record: CaseRecord {
            contact_id: "c1".into(),
            credit_report_id: None,
            analysis_id: None,
            creditor_name: format!("CREDITOR {id}"),
            account_number: format!("****{id}"),
            account_type: "Revolving".into(),
            balance: 100.0,
            payment_status: String::new(),
            negative_reason: "reason".into(),
            category,
            item_type: ItemType::Tradeline,
            bureaus: vec![Bureau::TransUnion],
            priority,
            estimated_score_impact: ScoreImpact::new(impact.0, impact.1),
            recommended_strategy: String::new(),
            suggested_dispute_reason: String::new(),
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
            created_at: String::new(),
            updated_at: String::new(),
            source: "creditReports".into(),
            scan_source: "report".into(),
        },
    }
}
