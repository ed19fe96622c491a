//! Ordered key lists per canonical field.
//!
//! Upstream report producers disagree on field names. Each canonical field
//! declares its candidate keys once, in priority order; the first key whose
//! value is non-empty wins and later keys are never consulted.
//!
//! "Non-empty" follows the loose truthiness of the source data: `null`,
//! `false`, `0`, and blank strings are empty.

use serde_json::{Map, Value};

/// A canonical field and its candidate source keys, highest priority first.
#[derive(Debug, Clone, Copy)]
pub struct Accessor {
    pub field: &'static str,
    pub keys: &'static [&'static str],
}

impl Accessor {
    /// First non-empty value under any of the keys.
    pub fn value<'a>(&self, obj: &'a Map<String, Value>) -> Option<&'a Value> {
        self.keys
            .iter()
            .filter_map(|k| obj.get(*k))
            .find(|v| is_present(v))
    }

    /// First non-empty value rendered as a trimmed string.
    pub fn text(&self, obj: &Map<String, Value>) -> Option<String> {
        self.keys
            .iter()
            .filter_map(|k| obj.get(*k))
            .find_map(as_text)
    }

    /// First key whose value parses to a non-zero number.
    pub fn number(&self, obj: &Map<String, Value>) -> Option<f64> {
        self.keys
            .iter()
            .filter_map(|k| obj.get(*k))
            .find_map(as_number)
            .filter(|n| *n != 0.0)
    }

    /// Like [`Accessor::number`], truncated to a non-negative count.
    pub fn count(&self, obj: &Map<String, Value>) -> Option<u32> {
        self.number(obj)
            .filter(|n| *n > 0.0)
            .map(|n| n.min(u32::MAX as f64) as u32)
    }
}

/* ------------------------------------------------------------------------- */
/* Tradeline fields                                                          */
/* ------------------------------------------------------------------------- */

pub const CREDITOR_NAME: Accessor = Accessor {
    field: "creditorName",
    keys: &["creditorName", "accountName", "companyName", "subscriberName", "name"],
};
pub const ACCOUNT_NUMBER: Accessor = Accessor {
    field: "accountNumber",
    keys: &["accountNumber", "accountNum", "acctNumber"],
};
pub const ACCOUNT_TYPE: Accessor = Accessor {
    field: "accountType",
    keys: &["accountType", "type", "accountTypeDescription"],
};
pub const ACCOUNT_STATUS: Accessor = Accessor {
    field: "accountStatus",
    keys: &["accountStatus", "status", "accountCondition"],
};
pub const BALANCE: Accessor = Accessor {
    field: "balance",
    keys: &["balance", "currentBalance", "balanceAmount"],
};
pub const CREDIT_LIMIT: Accessor = Accessor {
    field: "creditLimit",
    keys: &["creditLimit", "highCredit"],
};
pub const PAYMENT_STATUS: Accessor = Accessor {
    field: "paymentStatus",
    keys: &["paymentStatus", "payStatus", "conditionCode", "accountRating"],
};
pub const DATE_OPENED: Accessor = Accessor {
    field: "dateOpened",
    keys: &["dateOpened", "openDate", "accountOpenedDate"],
};
pub const DATE_REPORTED: Accessor = Accessor {
    field: "dateReported",
    keys: &["dateReported", "reportedDate"],
};
pub const LAST_PAYMENT_DATE: Accessor = Accessor {
    field: "lastPaymentDate",
    keys: &["lastPaymentDate", "lastPayment"],
};
pub const MONTHS_REVIEWED: Accessor = Accessor {
    field: "monthsReviewed",
    keys: &["monthsReviewed", "termsMonths"],
};
pub const LATE_30: Accessor = Accessor {
    field: "late30",
    keys: &["late30", "times30DaysLate"],
};
pub const LATE_60: Accessor = Accessor {
    field: "late60",
    keys: &["late60", "times60DaysLate"],
};
pub const LATE_90: Accessor = Accessor {
    field: "late90",
    keys: &["late90", "times90DaysLate"],
};

/* ------------------------------------------------------------------------- */
/* Inquiry and public-record fields                                          */
/* ------------------------------------------------------------------------- */

pub const INQUIRY_CREDITOR: Accessor = Accessor {
    field: "creditorName",
    keys: &["creditorName", "companyName", "subscriberName"],
};
pub const INQUIRY_DATE: Accessor = Accessor {
    field: "inquiryDate",
    keys: &["inquiryDate", "date", "dateOfInquiry"],
};
pub const INQUIRY_TYPE: Accessor = Accessor {
    field: "inquiryType",
    keys: &["inquiryType", "type"],
};

pub const RECORD_TYPE: Accessor = Accessor {
    field: "type",
    keys: &["type", "publicRecordType"],
};
pub const RECORD_COURT: Accessor = Accessor {
    field: "court",
    keys: &["court", "courtName"],
};
pub const RECORD_FILED: Accessor = Accessor {
    field: "filedDate",
    keys: &["filedDate", "dateReported"],
};
pub const RECORD_STATUS: Accessor = Accessor {
    field: "status",
    keys: &["status"],
};

/* ------------------------------------------------------------------------- */
/* Collection arrays                                                         */
/* ------------------------------------------------------------------------- */

pub const TRADELINE_ARRAYS: Accessor = Accessor {
    field: "tradelines",
    keys: &["tradelines", "accounts", "tradelineAccounts", "creditAccounts", "tradeLines"],
};
pub const INQUIRY_ARRAYS: Accessor = Accessor {
    field: "inquiries",
    keys: &["inquiries", "creditInquiries", "hardInquiries"],
};
pub const PUBLIC_RECORD_ARRAYS: Accessor = Accessor {
    field: "publicRecords",
    keys: &["publicRecords", "publicRecord"],
};

/* ------------------------------------------------------------------------- */
/* Value helpers                                                             */
/* ------------------------------------------------------------------------- */

/// Loose truthiness used by the accessors.
pub fn is_present(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

/// Strings as-is (trimmed), numbers in their JSON rendering.
pub fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers, or strings holding a currency amount (`"$1,250.00"`).
pub fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Parses a currency-formatted amount, ignoring `$`, `,` and spaces.
///
/// Parsing stops at the first character that cannot belong to a number, so
/// `"500 USD"` is `500.0`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn first_non_empty_key_wins() {
        let o = obj(json!({
            "creditorName": "",
            "accountName": "ACME BANK",
            "name": "should not win"
        }));
        assert_eq!(CREDITOR_NAME.text(&o).as_deref(), Some("ACME BANK"));
    }

    #[test]
    fn later_key_never_overrides_earlier_one() {
        let o = obj(json!({ "accountStatus": "Open", "status": "Collection" }));
        assert_eq!(ACCOUNT_STATUS.text(&o).as_deref(), Some("Open"));
    }

    #[test]
    fn zero_and_null_fall_through() {
        let o = obj(json!({ "balance": 0, "currentBalance": null, "balanceAmount": "$1,250.50" }));
        assert_eq!(BALANCE.number(&o), Some(1250.5));
        let none = obj(json!({ "balance": 0 }));
        assert_eq!(BALANCE.number(&none), None);
    }

    #[test]
    fn numeric_account_numbers_render_as_text() {
        let o = obj(json!({ "acctNumber": 12345678 }));
        assert_eq!(ACCOUNT_NUMBER.text(&o).as_deref(), Some("12345678"));
    }

    #[test]
    fn counts_from_alternate_keys() {
        let o = obj(json!({ "times30DaysLate": "4", "late60": 2 }));
        assert_eq!(LATE_30.count(&o), Some(4));
        assert_eq!(LATE_60.count(&o), Some(2));
        assert_eq!(LATE_90.count(&o), None);
    }

    #[test]
    fn amount_parsing() {
        assert_eq!(parse_amount("$500"), Some(500.0));
        assert_eq!(parse_amount(" 1,200.75 "), Some(1200.75));
        assert_eq!(parse_amount("500 USD"), Some(500.0));
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn empty_arrays_do_not_shadow_later_sources() {
        let o = obj(json!({ "tradelines": [], "accounts": [{ "name": "X" }] }));
        let arr = TRADELINE_ARRAYS.value(&o).and_then(Value::as_array).unwrap();
        assert_eq!(arr.len(), 1);
    }
}
