//! Structured (JSON) report path.

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    bureau::Bureau,
    model::{
        CreditScores, Inquiry, LatePayments, MASKED_ACCOUNT, NormalizedReport, PublicRecord,
        Tradeline, UNKNOWN,
    },
    normalize::{
        bureaus::extract_bureaus,
        fields::{self, Accessor, as_number},
    },
};

/// Builds a report from a structured payload.
///
/// Malformed nested structures (an array field holding a string, a list
/// entry that is not an object) are skipped and described in `warnings`.
pub fn parse_json_report(root: &Value, warnings: &mut Vec<String>) -> NormalizedReport {
    let mut report = NormalizedReport::default();

    let Some(obj) = root.as_object() else {
        warnings.push(format!("report root is {}, expected an object", kind_of(root)));
        return report;
    };

    report.scores = extract_scores(obj);

    for (idx, item) in items(obj, &fields::TRADELINE_ARRAYS, warnings).iter().enumerate() {
        match item.as_object() {
            Some(t) => report.push_tradeline(tradeline_from(t, item)),
            None => warnings.push(format!("tradelines[{idx}] is {}, skipped", kind_of(item))),
        }
    }

    for (idx, item) in items(obj, &fields::INQUIRY_ARRAYS, warnings).iter().enumerate() {
        match item.as_object() {
            Some(i) => report.inquiries.push(inquiry_from(i, item)),
            None => warnings.push(format!("inquiries[{idx}] is {}, skipped", kind_of(item))),
        }
    }

    for (idx, item) in items(obj, &fields::PUBLIC_RECORD_ARRAYS, warnings)
        .iter()
        .enumerate()
    {
        match item.as_object() {
            Some(r) => report.public_records.push(public_record_from(r, item)),
            None => warnings.push(format!("publicRecords[{idx}] is {}, skipped", kind_of(item))),
        }
    }

    debug!(
        tradelines = report.tradelines.len(),
        inquiries = report.inquiries.len(),
        public_records = report.public_records.len(),
        "json report parsed"
    );
    report
}

/// Resolves the first non-empty source array for a collection.
fn items<'a>(
    obj: &'a Map<String, Value>,
    accessor: &Accessor,
    warnings: &mut Vec<String>,
) -> &'a [Value] {
    match accessor.value(obj) {
        Some(Value::Array(a)) => a.as_slice(),
        Some(other) => {
            warnings.push(format!(
                "{} is {}, expected an array",
                accessor.field,
                kind_of(other)
            ));
            &[]
        }
        None => &[],
    }
}

/* ------------------------------------------------------------------------- */
/* Scores                                                                    */
/* ------------------------------------------------------------------------- */

const SCORE_NAMES: [(Bureau, [&str; 2], [&str; 2]); 3] = [
    (Bureau::TransUnion, ["transunion", "tu"], ["transunionScore", "tuScore"]),
    (Bureau::Experian, ["experian", "exp"], ["experianScore", "expScore"]),
    (Bureau::Equifax, ["equifax", "eqf"], ["equifaxScore", "eqfScore"]),
];

/// Score cascade, later conventions override earlier ones only when they
/// actually yield a value:
/// 1. `bureaus.<name>.score`
/// 2. `scores.<name>`
/// 3. `<name>Score` on the root
/// 4. `vantageScore`, applied to all three only while the TransUnion score
///    is still zero.
pub fn extract_scores(obj: &Map<String, Value>) -> CreditScores {
    let mut scores = CreditScores::default();

    for (bureau, names, direct) in SCORE_NAMES {
        let nested = obj.get("bureaus").and_then(Value::as_object).and_then(|b| {
            names
                .iter()
                .filter_map(|n| b.get(*n))
                .filter_map(|entry| entry.get("score"))
                .find_map(score_of)
        });
        let flat = obj
            .get("scores")
            .and_then(Value::as_object)
            .and_then(|s| names.iter().filter_map(|n| s.get(*n)).find_map(score_of));
        let root = direct.iter().filter_map(|k| obj.get(*k)).find_map(score_of);

        if let Some(score) = root.or(flat).or(nested) {
            scores.set(bureau, score);
        }
    }

    if scores.transunion == 0 {
        if let Some(vantage) = obj.get("vantageScore").and_then(score_of) {
            for b in Bureau::ALL {
                scores.set(b, vantage);
            }
        }
    }

    scores
}

fn score_of(v: &Value) -> Option<u32> {
    as_number(v)
        .filter(|n| *n > 0.0 && *n < 10_000.0)
        .map(|n| n.round() as u32)
}

/* ------------------------------------------------------------------------- */
/* Items                                                                     */
/* ------------------------------------------------------------------------- */

fn tradeline_from(t: &Map<String, Value>, raw: &Value) -> Tradeline {
    Tradeline {
        creditor_name: fields::CREDITOR_NAME.text(t).unwrap_or_else(|| UNKNOWN.into()),
        account_number: fields::ACCOUNT_NUMBER
            .text(t)
            .unwrap_or_else(|| MASKED_ACCOUNT.into()),
        account_type: fields::ACCOUNT_TYPE.text(t).unwrap_or_else(|| UNKNOWN.into()),
        account_status: fields::ACCOUNT_STATUS.text(t).unwrap_or_else(|| UNKNOWN.into()),
        payment_status: fields::PAYMENT_STATUS.text(t).unwrap_or_else(|| UNKNOWN.into()),
        balance: fields::BALANCE.number(t).unwrap_or(0.0),
        credit_limit: fields::CREDIT_LIMIT.number(t).unwrap_or(0.0),
        date_opened: fields::DATE_OPENED.text(t),
        date_reported: fields::DATE_REPORTED.text(t),
        last_payment_date: fields::LAST_PAYMENT_DATE.text(t),
        months_reviewed: fields::MONTHS_REVIEWED.count(t).unwrap_or(0),
        late_payments: LatePayments {
            days30: fields::LATE_30.count(t).unwrap_or(0),
            days60: fields::LATE_60.count(t).unwrap_or(0),
            days90: fields::LATE_90.count(t).unwrap_or(0),
        },
        bureaus: extract_bureaus(t),
        raw: raw.clone(),
    }
}

fn inquiry_from(i: &Map<String, Value>, raw: &Value) -> Inquiry {
    Inquiry {
        creditor_name: fields::INQUIRY_CREDITOR.text(i).unwrap_or_else(|| UNKNOWN.into()),
        inquiry_date: fields::INQUIRY_DATE.text(i),
        inquiry_type: fields::INQUIRY_TYPE.text(i).unwrap_or_else(|| "Hard".into()),
        bureaus: extract_bureaus(i),
        raw: raw.clone(),
    }
}

fn public_record_from(r: &Map<String, Value>, raw: &Value) -> PublicRecord {
    PublicRecord {
        record_type: fields::RECORD_TYPE.text(r).unwrap_or_else(|| UNKNOWN.into()),
        court: fields::RECORD_COURT.text(r),
        filed_date: fields::RECORD_FILED.text(r),
        status: fields::RECORD_STATUS.text(r).unwrap_or_else(|| UNKNOWN.into()),
        bureaus: extract_bureaus(r),
        raw: raw.clone(),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(v: Value) -> (NormalizedReport, Vec<String>) {
        let mut w = Vec::new();
        let r = parse_json_report(&v, &mut w);
        (r, w)
    }

    #[test]
    fn score_layers_override_only_when_non_empty() {
        let (r, _) = parse(json!({
            "bureaus": { "transunion": { "score": 610 }, "exp": { "score": 620 } },
            "scores": { "tu": 0, "experian": 640 },
            "equifaxScore": "655"
        }));
        assert_eq!(
            r.scores,
            CreditScores {
                transunion: 610,
                experian: 640,
                equifax: 655
            }
        );
    }

    #[test]
    fn vantage_fallback_only_when_transunion_missing() {
        let (r, _) = parse(json!({ "experianScore": 700, "vantageScore": 650 }));
        assert_eq!(r.scores.transunion, 650);
        assert_eq!(r.scores.experian, 650);

        let (r, _) = parse(json!({ "tuScore": 600, "vantageScore": 650 }));
        assert_eq!(r.scores.transunion, 600);
        assert_eq!(r.scores.equifax, 0);
    }

    #[test]
    fn tradelines_from_alternate_arrays_and_keys() {
        let (r, w) = parse(json!({
            "accounts": [{
                "subscriberName": "MIDLAND FUNDING",
                "acctNumber": "****1234",
                "type": "Collection",
                "status": "Open",
                "currentBalance": "$500.00",
                "payStatus": "Collection",
                "times30DaysLate": 2,
                "reportingBureaus": { "experian": true }
            }]
        }));
        assert!(w.is_empty());
        let t = &r.tradelines[0];
        assert_eq!(t.creditor_name, "MIDLAND FUNDING");
        assert_eq!(t.account_number, "****1234");
        assert_eq!(t.balance, 500.0);
        assert_eq!(t.late_payments.days30, 2);
        assert_eq!(t.bureaus, vec![Bureau::Experian]);
        assert_eq!(r.account_summary.total_accounts, 1);
        assert_eq!(r.account_summary.collection_accounts, 1);
    }

    #[test]
    fn missing_fields_default() {
        let (r, _) = parse(json!({ "tradelines": [{}], "inquiries": [{}], "publicRecords": [{}] }));
        let t = &r.tradelines[0];
        assert_eq!(t.creditor_name, "Unknown");
        assert_eq!(t.account_number, "****");
        assert_eq!(t.bureaus, Bureau::ALL.to_vec());
        assert_eq!(r.inquiries[0].inquiry_type, "Hard");
        assert_eq!(r.public_records[0].record_type, "Unknown");
        assert_eq!(r.public_records[0].court, None);
    }

    #[test]
    fn malformed_structures_become_warnings() {
        let (r, w) = parse(json!({
            "tradelines": [42, { "name": "OK BANK" }],
            "inquiries": "none"
        }));
        assert_eq!(r.tradelines.len(), 1);
        assert_eq!(w.len(), 2);
        assert!(w[0].contains("tradelines[0]"));
        assert!(w[1].contains("inquiries"));
    }

    #[test]
    fn non_object_root_is_empty_report() {
        let (r, w) = parse(json!([1, 2, 3]));
        assert_eq!(r, NormalizedReport::default());
        assert_eq!(w.len(), 1);
    }
}
