//! Report source resolution.
//!
//! Upstream data entry is inconsistent about which timestamp a record
//! carries, so the resolver walks an ordered list of queries and takes the
//! first one that returns anything:
//!
//! 1. `creditReports` by `contactId`, newest `createdAt` first
//! 2. `enrollments` by `contactId`, newest `createdAt` first
//! 3. `enrollments` by `contactId`, newest `enrolledAt` first
//! 4. `enrollments` by `contactId`, unordered

use std::fmt;

use credit_report::RawPayload;
use dispute_store::{Document, DocumentStore, Query};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{errors::EngineResult, records::collections};

/// Which kind of source a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportSource {
    #[serde(rename = "creditReports")]
    CreditReports,
    #[serde(rename = "enrollments-html")]
    EnrollmentHtml,
    #[serde(rename = "enrollments-json")]
    EnrollmentJson,
    #[serde(rename = "upload")]
    Upload,
}

impl ReportSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportSource::CreditReports => "creditReports",
            ReportSource::EnrollmentHtml => "enrollments-html",
            ReportSource::EnrollmentJson => "enrollments-json",
            ReportSource::Upload => "upload",
        }
    }
}

impl fmt::Display for ReportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The query that produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverBranch {
    PrimaryByCreatedAt,
    EnrollmentByCreatedAt,
    EnrollmentByEnrolledAt,
    EnrollmentUnordered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReport {
    pub report_id: String,
    pub payload: RawPayload,
    pub source: ReportSource,
    pub branch: ResolverBranch,
}

/// Finds the most recent usable report for a subject, or `None`.
pub async fn resolve_report<S: DocumentStore>(
    store: &S,
    contact_id: &str,
) -> EngineResult<Option<ResolvedReport>> {
    let primary = Query::new(collections::CREDIT_REPORTS, "contactId", contact_id)
        .order_by_desc("createdAt")
        .limit(1);
    if let Some(doc) = store.query(&primary).await?.into_iter().next() {
        match doc.data.get("reportData").filter(|v| !v.is_null()) {
            Some(data) => {
                debug!(contact_id, report_id = %doc.id, "report found in creditReports");
                return Ok(Some(ResolvedReport {
                    payload: RawPayload::from(data.clone()),
                    report_id: doc.id,
                    source: ReportSource::CreditReports,
                    branch: ResolverBranch::PrimaryByCreatedAt,
                }));
            }
            None => debug!(contact_id, report_id = %doc.id, "creditReports record has no reportData"),
        }
    }

    let base = Query::new(collections::ENROLLMENTS, "contactId", contact_id);
    let attempts = [
        (
            ResolverBranch::EnrollmentByCreatedAt,
            base.clone().order_by_desc("createdAt").limit(1),
        ),
        (
            ResolverBranch::EnrollmentByEnrolledAt,
            base.clone().order_by_desc("enrolledAt").limit(1),
        ),
        (ResolverBranch::EnrollmentUnordered, base.limit(1)),
    ];

    for (branch, query) in attempts {
        let Some(doc) = store.query(&query).await?.into_iter().next() else {
            debug!(contact_id, ?branch, "enrollment query empty");
            continue;
        };
        return Ok(enrollment_payload(doc, branch));
    }

    Ok(None)
}

/// Picks `reportHtml` over `reportJson`. A `reportJson` string that does not
/// parse leaves the record unusable.
fn enrollment_payload(doc: Document, branch: ResolverBranch) -> Option<ResolvedReport> {
    let html = doc
        .data
        .get("reportHtml")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty());
    if let Some(html) = html {
        return Some(ResolvedReport {
            payload: RawPayload::Text(html.to_string()),
            report_id: doc.id,
            source: ReportSource::EnrollmentHtml,
            branch,
        });
    }

    let parsed = match doc.data.get("reportJson") {
        Some(Value::String(s)) if !s.trim().is_empty() => match serde_json::from_str::<Value>(s) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(report_id = %doc.id, error = %e, "enrollment reportJson does not parse");
                None
            }
        },
        Some(v @ Value::Object(_)) => Some(v.clone()),
        _ => None,
    }?;

    Some(ResolvedReport {
        payload: RawPayload::Structured(parsed),
        report_id: doc.id,
        source: ReportSource::EnrollmentJson,
        branch,
    })
}
