//! Markup report path.
//!
//! With the `dom` feature the document is parsed into a DOM and items are
//! selected by class/attribute heuristics. Without it (or when a caller
//! asks for it explicitly) a regex block extractor works on the raw markup.
//! Both paths recover scores from the tag-stripped document text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::{
    bureau::{Bureau, normalize_bureau_list},
    model::{MASKED_ACCOUNT, NormalizedReport, Tradeline, UNKNOWN},
    normalize::{fields::parse_amount, text::extract_text_scores},
};

/// Table row labels, in lookup order per canonical field.
const ACCOUNT_NUMBER_LABELS: [&str; 2] = ["Account #", "Account Number"];
const ACCOUNT_TYPE_LABEL: &str = "Account Type";
const ACCOUNT_STATUS_LABEL: &str = "Account Status";
const BALANCE_LABEL: &str = "Balance";
const PAYMENT_STATUS_LABEL: &str = "Payment Status";
const DATE_OPENED_LABEL: &str = "Date Opened";

/// Parses markup with the best available extractor.
pub fn parse_html_report(html: &str) -> NormalizedReport {
    #[cfg(feature = "dom")]
    {
        dom::parse(html)
    }
    #[cfg(not(feature = "dom"))]
    {
        parse_html_with_regex(html)
    }
}

/* ------------------------------------------------------------------------- */
/* DOM path                                                                  */
/* ------------------------------------------------------------------------- */

#[cfg(feature = "dom")]
mod dom {
    use std::collections::HashSet;

    use scraper::{ElementRef, Html, Selector};

    use super::*;
    use crate::model::Inquiry;

    fn selector(css: &str) -> Selector {
        Selector::parse(css).expect("static selector")
    }

    static TRADELINES: LazyLock<Selector> =
        LazyLock::new(|| selector(".tradeline, .account, .trade-line, [data-account]"));
    static CREDITOR: LazyLock<Selector> =
        LazyLock::new(|| selector("h3, .creditor-name, .account-name"));
    static ROWS: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
    static CELLS: LazyLock<Selector> = LazyLock::new(|| selector("td, th"));
    static BUREAUS: LazyLock<Selector> = LazyLock::new(|| selector(".bureau, [data-bureau]"));
    static INQUIRIES: LazyLock<Selector> =
        LazyLock::new(|| selector(".inquiry, .credit-inquiry, [data-creditor]"));
    static INQ_CREDITOR: LazyLock<Selector> = LazyLock::new(|| selector(".creditor"));
    static INQ_DATE: LazyLock<Selector> = LazyLock::new(|| selector(".date"));
    static INQ_TYPE: LazyLock<Selector> = LazyLock::new(|| selector(".type"));

    pub(super) fn parse(html: &str) -> NormalizedReport {
        let doc = Html::parse_document(html);
        let page_text = doc.root_element().text().collect::<Vec<_>>().join(" ");

        let mut report = NormalizedReport {
            scores: extract_text_scores(&page_text),
            ..NormalizedReport::default()
        };

        for el in outermost(doc.select(&TRADELINES)) {
            report.push_tradeline(tradeline_from(el));
        }

        for el in outermost(doc.select(&INQUIRIES)) {
            report.inquiries.push(Inquiry {
                creditor_name: first_text(el, &INQ_CREDITOR)
                    .or_else(|| attr(el, "data-creditor"))
                    .unwrap_or_else(|| UNKNOWN.into()),
                inquiry_date: first_text(el, &INQ_DATE),
                inquiry_type: first_text(el, &INQ_TYPE).unwrap_or_else(|| "Hard".into()),
                bureaus: bureaus_in(el),
                ..Inquiry::default()
            });
        }

        debug!(
            tradelines = report.tradelines.len(),
            inquiries = report.inquiries.len(),
            "html report parsed (dom)"
        );
        report
    }

    fn tradeline_from(el: ElementRef<'_>) -> Tradeline {
        let account_number = ACCOUNT_NUMBER_LABELS
            .iter()
            .find_map(|label| table_value(el, label));

        Tradeline {
            creditor_name: first_text(el, &CREDITOR)
                .or_else(|| attr(el, "data-account"))
                .unwrap_or_else(|| UNKNOWN.into()),
            account_number: account_number.unwrap_or_else(|| MASKED_ACCOUNT.into()),
            account_type: table_value(el, ACCOUNT_TYPE_LABEL).unwrap_or_else(|| UNKNOWN.into()),
            account_status: table_value(el, ACCOUNT_STATUS_LABEL)
                .unwrap_or_else(|| UNKNOWN.into()),
            payment_status: table_value(el, PAYMENT_STATUS_LABEL)
                .unwrap_or_else(|| UNKNOWN.into()),
            balance: table_value(el, BALANCE_LABEL)
                .and_then(|b| parse_amount(&b))
                .unwrap_or(0.0),
            date_opened: table_value(el, DATE_OPENED_LABEL),
            bureaus: bureaus_in(el),
            ..Tradeline::default()
        }
    }

    /// Drops matches nested inside another match so a `[data-account]`
    /// child of a `.tradeline` is not counted twice.
    fn outermost<'a>(matches: impl Iterator<Item = ElementRef<'a>>) -> Vec<ElementRef<'a>> {
        let all: Vec<ElementRef<'a>> = matches.collect();
        let ids: HashSet<_> = all.iter().map(|e| e.id()).collect();
        all.into_iter()
            .filter(|e| !e.ancestors().any(|a| ids.contains(&a.id())))
            .collect()
    }

    /// Value cell of the first table row whose cells mention `label`.
    fn table_value(el: ElementRef<'_>, label: &str) -> Option<String> {
        el.select(&ROWS).find_map(|row| {
            let cells: Vec<ElementRef<'_>> = row.select(&CELLS).collect();
            if cells.iter().any(|c| text_of(*c).contains(label)) {
                cells.last().map(|c| text_of(*c)).filter(|v| !v.is_empty())
            } else {
                None
            }
        })
    }

    fn bureaus_in(el: ElementRef<'_>) -> Vec<Bureau> {
        normalize_bureau_list(el.select(&BUREAUS).filter_map(|b| {
            attr(b, "data-bureau")
                .or_else(|| Some(text_of(b)))
                .and_then(|code| Bureau::from_alias(&code))
        }))
    }

    fn first_text(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
        el.select(sel).next().map(text_of).filter(|t| !t.is_empty())
    }

    fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
        el.value()
            .attr(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn text_of(el: ElementRef<'_>) -> String {
        el.text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/* ------------------------------------------------------------------------- */
/* Regex path                                                                */
/* ------------------------------------------------------------------------- */

static TRADELINE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div[^>]*class=["'][^"']*tradeline[^"']*["'][^>]*>([\s\S]*?)</div>"#)
        .expect("tradeline block pattern")
});
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h3[^>]*>(.*?)</h3>").expect("heading pattern"));
static BUREAU_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)data-bureau=["']([^"']+)["']"#).expect("bureau pattern"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern"));

/// Regex block extractor over raw markup.
///
/// Only `div` blocks whose class mentions `tradeline` are recognized, and a
/// block ends at the first closing `</div>`.
pub fn parse_html_with_regex(html: &str) -> NormalizedReport {
    let mut report = NormalizedReport {
        scores: extract_text_scores(&strip_tags(html)),
        ..NormalizedReport::default()
    };

    for cap in TRADELINE_BLOCK.captures_iter(html) {
        let block = cap.get(1).map_or("", |m| m.as_str());

        let creditor_name = HEADING
            .captures(block)
            .and_then(|c| c.get(1))
            .map(|m| strip_tags(m.as_str()))
            .filter(|s| !s.is_empty());
        let account_number = ACCOUNT_NUMBER_LABELS
            .iter()
            .find_map(|label| label_value(block, label));

        report.push_tradeline(Tradeline {
            creditor_name: creditor_name.unwrap_or_else(|| UNKNOWN.into()),
            account_number: account_number.unwrap_or_else(|| MASKED_ACCOUNT.into()),
            account_type: label_value(block, ACCOUNT_TYPE_LABEL).unwrap_or_else(|| UNKNOWN.into()),
            account_status: label_value(block, ACCOUNT_STATUS_LABEL)
                .unwrap_or_else(|| UNKNOWN.into()),
            payment_status: label_value(block, PAYMENT_STATUS_LABEL)
                .unwrap_or_else(|| UNKNOWN.into()),
            balance: label_value(block, BALANCE_LABEL)
                .and_then(|b| parse_amount(&b))
                .unwrap_or(0.0),
            date_opened: label_value(block, DATE_OPENED_LABEL),
            bureaus: normalize_bureau_list(
                BUREAU_ATTR
                    .captures_iter(block)
                    .filter_map(|c| c.get(1))
                    .filter_map(|m| Bureau::from_alias(m.as_str())),
            ),
            ..Tradeline::default()
        });
    }

    debug!(tradelines = report.tradelines.len(), "html report parsed (regex)");
    report
}

/// `<td>Label</td><td>value</td>` lookup inside one block.
fn label_value(block: &str, label: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r"(?i){}[^<]*</t[dh]>\s*<t[dh][^>]*>([^<]+)",
        regex::escape(label)
    ))
    .ok()?;
    re.captures(block)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|v| !v.is_empty())
}

/// Tag-stripped, entity-decoded text with collapsed whitespace.
pub fn strip_tags(html: &str) -> String {
    let text = TAG.replace_all(html, " ");
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
<html><body>
  <div class="scores">TransUnion: 601 Experian: 612 Equifax: 623</div>
  <div class="tradeline">
    <h3>MIDLAND FUNDING</h3>
    <table>
      <tr><td>Account #</td><td>****1234</td></tr>
      <tr><td>Account Type</td><td>Collection</td></tr>
      <tr><td>Account Status</td><td>Open</td></tr>
      <tr><td>Balance</td><td>$1,200.00</td></tr>
      <tr><td>Payment Status</td><td>Collection</td></tr>
      <tr><td>Date Opened</td><td>2021-02-01</td></tr>
    </table>
    <span data-bureau="TUC"></span><span data-bureau="EQF"></span>
  </div>
  <div class="tradeline">
    <h3>AT&amp;T MOBILITY</h3>
    <table><tr><td>Account Number</td><td>5555XXXX</td></tr></table>
  </div>
</body></html>"#;

    fn check(report: &NormalizedReport) {
        assert_eq!(report.scores.transunion, 601);
        assert_eq!(report.scores.equifax, 623);
        assert_eq!(report.tradelines.len(), 2);

        let t = &report.tradelines[0];
        assert_eq!(t.creditor_name, "MIDLAND FUNDING");
        assert_eq!(t.account_number, "****1234");
        assert_eq!(t.account_type, "Collection");
        assert_eq!(t.balance, 1200.0);
        assert_eq!(t.date_opened.as_deref(), Some("2021-02-01"));
        assert_eq!(t.bureaus, vec![Bureau::TransUnion, Bureau::Equifax]);

        let second = &report.tradelines[1];
        assert_eq!(second.creditor_name, "AT&T MOBILITY");
        assert_eq!(second.account_number, "5555XXXX");
        assert_eq!(second.bureaus, Bureau::ALL.to_vec());
        assert_eq!(report.account_summary.collection_accounts, 1);
    }

    #[test]
    fn regex_path_extracts_blocks() {
        check(&parse_html_with_regex(DOC));
    }

    #[cfg(feature = "dom")]
    #[test]
    fn dom_path_extracts_blocks_and_inquiries() {
        let with_inquiries = DOC.replace(
            "</body>",
            r#"<div class="inquiry"><span class="creditor">CAR LOANS INC</span>
               <span class="date">2024-05-01</span></div></body>"#,
        );
        let report = parse_html_report(&with_inquiries);
        check(&report);
        assert_eq!(report.inquiries.len(), 1);
        assert_eq!(report.inquiries[0].creditor_name, "CAR LOANS INC");
        assert_eq!(report.inquiries[0].inquiry_type, "Hard");
    }

    #[test]
    fn markup_without_items_is_empty() {
        let r = parse_html_report("<div><p>no report here</p></div>");
        assert!(r.tradelines.is_empty());
        assert_eq!(r.account_summary.total_accounts, 0);
    }

    #[test]
    fn strip_tags_decodes_entities() {
        assert_eq!(strip_tags("<b>A&amp;B</b>\n <i>C</i>"), "A&B C");
    }
}
