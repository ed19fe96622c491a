//! Bureau signals on loosely-typed report items.

use serde_json::{Map, Value};

use crate::{
    bureau::{Bureau, normalize_bureau_list},
    normalize::fields::is_present,
};

const FLAG_KEYS: [(Bureau, [&str; 3]); 3] = [
    (Bureau::TransUnion, ["transunion", "tu", "TU"]),
    (Bureau::Experian, ["experian", "exp", "EXP"]),
    (Bureau::Equifax, ["equifax", "eqf", "EQF"]),
];

/// Collects every bureau an item claims to be reported by.
///
/// Signals, in order:
/// 1. truthy per-bureau fields (`transunion`, `tu`, `TU`, ...);
/// 2. a `bureaus` array of codes or names (unrecognized entries dropped),
///    or a `bureaus` object keyed by bureau name;
/// 3. a `reportingBureaus` object with truthy `transunion` / `experian` /
///    `equifax` flags.
///
/// Deduplicated in first-seen order; no signal at all yields all three.
pub fn extract_bureaus(item: &Map<String, Value>) -> Vec<Bureau> {
    let mut found = Vec::new();

    for (bureau, keys) in FLAG_KEYS {
        if keys.iter().any(|k| item.get(*k).is_some_and(is_present)) {
            found.push(bureau);
        }
    }

    match item.get("bureaus") {
        Some(Value::Array(list)) => {
            found.extend(list.iter().filter_map(Value::as_str).filter_map(Bureau::from_alias));
        }
        Some(Value::Object(flags)) => found.extend(flagged(flags)),
        _ => {}
    }

    if let Some(Value::Object(flags)) = item.get("reportingBureaus") {
        found.extend(flagged(flags));
    }

    normalize_bureau_list(found)
}

fn flagged(flags: &Map<String, Value>) -> impl Iterator<Item = Bureau> + '_ {
    flags
        .iter()
        .filter(|(_, v)| is_present(v))
        .filter_map(|(k, _)| Bureau::from_alias(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bureaus(v: Value) -> Vec<Bureau> {
        extract_bureaus(v.as_object().unwrap())
    }

    #[test]
    fn no_signal_means_all_three() {
        assert_eq!(bureaus(json!({ "name": "X" })), Bureau::ALL.to_vec());
    }

    #[test]
    fn flags_array_and_reporting_object_merge() {
        let got = bureaus(json!({
            "experian": { "balance": 10 },
            "bureaus": ["TransUnion", "Innovis", "EXP"],
            "reportingBureaus": { "equifax": true, "transunion": false }
        }));
        assert_eq!(got, vec![Bureau::Experian, Bureau::TransUnion, Bureau::Equifax]);
    }

    #[test]
    fn false_flags_are_ignored() {
        let got = bureaus(json!({ "tu": false, "EQF": true }));
        assert_eq!(got, vec![Bureau::Equifax]);
    }
}
