//! The three national credit bureaus and their dispute mailing addresses.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bureau {
    #[serde(rename = "TU", alias = "TUC")]
    TransUnion,
    #[serde(rename = "EXP")]
    Experian,
    #[serde(rename = "EQF")]
    Equifax,
}

/// Postal address a dispute letter is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailingAddress {
    pub name: &'static str,
    pub street: &'static str,
    pub city: &'static str,
    pub state: &'static str,
    pub zip: &'static str,
}

impl fmt::Display for MailingAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}, {} {}",
            self.name, self.street, self.city, self.state, self.zip
        )
    }
}

impl Bureau {
    /// Report order used whenever a source gives no bureau signal.
    pub const ALL: [Bureau; 3] = [Bureau::TransUnion, Bureau::Experian, Bureau::Equifax];

    pub fn code(self) -> &'static str {
        match self {
            Bureau::TransUnion => "TU",
            Bureau::Experian => "EXP",
            Bureau::Equifax => "EQF",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Bureau::TransUnion => "TransUnion",
            Bureau::Experian => "Experian",
            Bureau::Equifax => "Equifax",
        }
    }

    pub fn mailing_address(self) -> MailingAddress {
        match self {
            Bureau::TransUnion => MailingAddress {
                name: "TransUnion",
                street: "P.O. Box 2000",
                city: "Chester",
                state: "PA",
                zip: "19016",
            },
            Bureau::Experian => MailingAddress {
                name: "Experian",
                street: "P.O. Box 4500",
                city: "Allen",
                state: "TX",
                zip: "75013",
            },
            Bureau::Equifax => MailingAddress {
                name: "Equifax",
                street: "P.O. Box 740256",
                city: "Atlanta",
                state: "GA",
                zip: "30374",
            },
        }
    }

    /// Maps a code, alias or display name to a bureau (case-insensitive).
    ///
    /// Accepts `TU`/`TUC`/`TransUnion`, `EXP`/`Experian`, `EQF`/`Equifax`,
    /// and any longer text containing `trans`, `exp` or `equi`.
    pub fn from_alias(raw: &str) -> Option<Bureau> {
        let s = raw.trim().to_ascii_lowercase();
        match s.as_str() {
            "" => None,
            "tu" | "tuc" => Some(Bureau::TransUnion),
            "eqf" => Some(Bureau::Equifax),
            _ if s.contains("trans") => Some(Bureau::TransUnion),
            _ if s.contains("exp") => Some(Bureau::Experian),
            _ if s.contains("equi") => Some(Bureau::Equifax),
            _ => None,
        }
    }
}

impl fmt::Display for Bureau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Deduplicates while keeping first-seen order; empty input means all three.
pub fn normalize_bureau_list(found: impl IntoIterator<Item = Bureau>) -> Vec<Bureau> {
    let mut out = Vec::with_capacity(3);
    for b in found {
        if !out.contains(&b) {
            out.push(b);
        }
    }
    if out.is_empty() {
        out.extend(Bureau::ALL);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_case_insensitively() {
        assert_eq!(Bureau::from_alias("TUC"), Some(Bureau::TransUnion));
        assert_eq!(Bureau::from_alias("transunion"), Some(Bureau::TransUnion));
        assert_eq!(Bureau::from_alias(" Experian "), Some(Bureau::Experian));
        assert_eq!(Bureau::from_alias("EQF"), Some(Bureau::Equifax));
        assert_eq!(Bureau::from_alias("Equifax Inc"), Some(Bureau::Equifax));
        assert_eq!(Bureau::from_alias("Innovis"), None);
        assert_eq!(Bureau::from_alias(""), None);
    }

    #[test]
    fn bureau_list_dedups_and_defaults() {
        assert_eq!(normalize_bureau_list([]), Bureau::ALL.to_vec());
        assert_eq!(
            normalize_bureau_list([Bureau::Equifax, Bureau::TransUnion, Bureau::Equifax]),
            vec![Bureau::Equifax, Bureau::TransUnion]
        );
    }

    #[test]
    fn serializes_as_short_codes() {
        let json = serde_json::to_string(&Bureau::ALL).unwrap();
        assert_eq!(json, r#"["TU","EXP","EQF"]"#);
        let back: Bureau = serde_json::from_str(r#""TUC""#).unwrap();
        assert_eq!(back, Bureau::TransUnion);
    }
}
