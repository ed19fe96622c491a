//! Pipeline façade.
//!
//! Every operation returns a [`PipelineResponse`]; nothing here returns
//! `Err`. Expected conditions (no report, unreadable payload) and hard
//! failures (a store write that failed) both become `success: false` with a
//! message, logged at `warn` and `error` respectively.
//!
//! `populate_from_report` runs:
//! 1. `step1`: resolve the newest usable report
//! 2. `step2`: normalize it
//! 3. `step3`: classify negative items
//! 4. `step4`: persist the analysis record
//! 5. `step5`: write cases with duplicate suppression

use std::{sync::Arc, time::Instant};

use chrono::{NaiveDate, Utc};
use credit_report::{
    CreditScores, FormatHint, NormalizedReport, RawPayload, TextExtractor, classify_at, normalize,
};
use dispute_store::{BlobStore, DocumentStore, blob_path_from_url};
use reasoning_service::ReasoningService;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::{
    config::EngineConfig,
    errors::{EngineError, EngineResult},
    letters::{self, LetterBatch, LetterRequest},
    records::{AnalysisRecord, AnalysisTradeline, collections, now_rfc3339},
    resolver::{ReportSource, resolve_report},
    scheduler::{self, RoundManifest},
    strategy::{self, StrategyOutcome},
    telemetry::prompt_dump::PromptDump,
    writer::{CaseMeta, RunSummary, write_cases},
};

pub const NO_REPORT: &str = "No credit report found";
pub const UNKNOWN_FORMAT: &str = "Unknown report format";

/// Result envelope shared by all entry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse<T> {
    pub success: bool,
    pub contact_id: String,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl<T> PipelineResponse<T> {
    pub fn ok(contact_id: &str, data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            contact_id: contact_id.to_string(),
            data: Some(data),
            error: None,
            message: message.into(),
        }
    }

    pub fn fail(contact_id: &str, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            contact_id: contact_id.to_string(),
            data: None,
            message: error.clone(),
            error: Some(error),
        }
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulateReport {
    pub report_id: Option<String>,
    pub report_source: ReportSource,
    pub analysis_id: String,
    pub dispute_count: usize,
    pub dispute_ids: Vec<String>,
    pub summary: RunSummary,
    pub credit_scores: CreditScores,
    pub skipped_duplicates: usize,
    pub total_scanned: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Where a payload came from, for provenance fields.
struct Origin<'a> {
    report_id: Option<&'a str>,
    source: ReportSource,
    /// `auto_scan` or `upload`.
    trigger: &'a str,
}

/// Entry points of the dispute pipeline, generic over the store and the
/// reasoning backend.
pub struct DisputeEngine<S, R> {
    store: S,
    reasoning: R,
    cfg: EngineConfig,
    dump: PromptDump,
    extractor: Option<Arc<dyn TextExtractor>>,
    as_of: Option<NaiveDate>,
}

impl<S, R> DisputeEngine<S, R>
where
    S: DocumentStore,
    R: ReasoningService,
{
    pub fn new(store: S, reasoning: R, cfg: EngineConfig) -> Self {
        let dump = PromptDump::new(cfg.prompt_dump_dir.clone());
        Self {
            store,
            reasoning,
            cfg,
            dump,
            extractor: None,
            as_of: None,
        }
    }

    /// PDF and image input is read through this extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Fixes "today" for the inquiry look-back window.
    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn reasoning(&self) -> &R {
        &self.reasoning
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Ingests the subject's newest stored report and creates cases.
    pub async fn populate_from_report(&self, contact_id: &str) -> PipelineResponse<PopulateReport> {
        let t0 = Instant::now();
        debug!(contact_id, "step1: resolve report");
        let resolved = match resolve_report(&self.store, contact_id).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                warn!(contact_id, "step1: no usable report");
                return PipelineResponse::fail(contact_id, NO_REPORT);
            }
            Err(e) => return hard_failure(contact_id, "resolve report", e),
        };
        debug!(
            contact_id,
            report_id = %resolved.report_id,
            source = %resolved.source,
            branch = ?resolved.branch,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "step1: report resolved"
        );

        if let RawPayload::Structured(v) = &resolved.payload {
            if !matches!(v, Value::Object(_) | Value::Array(_)) {
                warn!(contact_id, report_id = %resolved.report_id, "step1: report payload is not a document");
                return PipelineResponse::fail(contact_id, UNKNOWN_FORMAT);
            }
        }

        let origin = Origin {
            report_id: Some(&resolved.report_id),
            source: resolved.source,
            trigger: "auto_scan",
        };
        self.ingest(contact_id, &resolved.payload, FormatHint::Auto, origin, t0)
            .await
    }

    /// Ingests an uploaded file. With `FormatHint::Auto` the hint comes from
    /// the file extension.
    pub async fn populate_from_upload<B: BlobStore>(
        &self,
        blobs: &B,
        contact_id: &str,
        file_url: &str,
        hint: FormatHint,
    ) -> PipelineResponse<PopulateReport> {
        let t0 = Instant::now();
        let path = blob_path_from_url(file_url);
        debug!(contact_id, path = %path, "step1: download upload");
        let bytes = match blobs.download(&path).await {
            Ok(b) => b,
            Err(e) => {
                warn!(contact_id, path = %path, error = %e, "step1: upload not readable");
                return PipelineResponse::fail(contact_id, e.to_string());
            }
        };
        let hint = match hint {
            FormatHint::Auto => FormatHint::from_file_name(&path),
            h => h,
        };
        debug!(contact_id, bytes = bytes.len(), ?hint, "step1: upload downloaded");

        let origin = Origin {
            report_id: None,
            source: ReportSource::Upload,
            trigger: "upload",
        };
        self.ingest(contact_id, &RawPayload::Binary(bytes), hint, origin, t0)
            .await
    }

    async fn ingest(
        &self,
        contact_id: &str,
        payload: &RawPayload,
        hint: FormatHint,
        origin: Origin<'_>,
        t0: Instant,
    ) -> PipelineResponse<PopulateReport> {
        debug!(contact_id, "step2: normalize");
        let outcome = match normalize(payload, hint, self.extractor.as_deref()) {
            Ok(o) => o,
            Err(e) => {
                warn!(contact_id, error = %e, "step2: payload rejected");
                return PipelineResponse::fail(contact_id, format!("{UNKNOWN_FORMAT}: {e}"));
            }
        };
        let (report, warnings) = outcome.into_parts();
        debug!(
            contact_id,
            tradelines = report.tradelines.len(),
            inquiries = report.inquiries.len(),
            public_records = report.public_records.len(),
            warnings = warnings.len(),
            "step2: normalized"
        );

        debug!(contact_id, "step3: classify");
        let today = self.as_of.unwrap_or_else(|| Utc::now().date_naive());
        let items = classify_at(&report, today);
        debug!(contact_id, negative_items = items.len(), "step3: classified");

        debug!(contact_id, "step4: persist analysis");
        let analysis = analysis_record(contact_id, &origin, &report, items.len(), &warnings);
        let analysis_id = match self.insert_analysis(&analysis).await {
            Ok(id) => id,
            Err(e) => return hard_failure(contact_id, "persist analysis", e),
        };

        debug!(contact_id, "step5: write cases");
        let meta = CaseMeta {
            report_id: origin.report_id,
            analysis_id: Some(&analysis_id),
            source: origin.trigger,
            scan_source: origin.source.as_str(),
        };
        let written = match write_cases(&self.store, contact_id, &items, meta).await {
            Ok(w) => w,
            Err(e) => return hard_failure(contact_id, "write cases", e),
        };

        let created = written.created_ids.len();
        let message = format!(
            "Created {created} new disputes from {} negative items ({} duplicates skipped)",
            items.len(),
            written.skipped_duplicates
        );
        info!(
            contact_id,
            source = %origin.source,
            created,
            skipped = written.skipped_duplicates,
            scanned = items.len(),
            latency_ms = t0.elapsed().as_millis() as u64,
            "dispute population finished"
        );

        PipelineResponse::ok(
            contact_id,
            PopulateReport {
                report_id: origin.report_id.map(str::to_string),
                report_source: origin.source,
                analysis_id,
                dispute_count: created,
                dispute_ids: written.created_ids,
                summary: written.summary,
                credit_scores: report.scores,
                skipped_duplicates: written.skipped_duplicates,
                total_scanned: items.len(),
                warnings,
            },
            message,
        )
    }

    async fn insert_analysis(&self, analysis: &AnalysisRecord) -> EngineResult<String> {
        let body = serde_json::to_value(analysis)?;
        Ok(self.store.insert(collections::ANALYSES, body).await?)
    }

    /// Schedules pending cases into rounds.
    pub async fn assign_rounds(&self, contact_id: &str) -> PipelineResponse<RoundManifest> {
        match scheduler::assign_rounds(
            &self.store,
            contact_id,
            self.cfg.max_per_round,
            self.cfg.round_spacing_days,
        )
        .await
        {
            Ok(m) => {
                let message = format!(
                    "Scheduled {} disputes into {} rounds",
                    m.total_items, m.total_rounds
                );
                PipelineResponse::ok(contact_id, m, message)
            }
            Err(e) => hard_failure(contact_id, "assign rounds", e),
        }
    }

    /// Plans every pending case, through the reasoning service when it
    /// answers usefully and from templates otherwise.
    pub async fn generate_strategy(&self, contact_id: &str) -> PipelineResponse<StrategyOutcome> {
        match strategy::generate_strategy(&self.store, &self.reasoning, &self.cfg, &self.dump, contact_id)
            .await
        {
            Ok(o) => {
                let message = if o.case_count == 0 {
                    "No pending disputes to plan".to_string()
                } else if o.fallback_used {
                    format!(
                        "Strategy for {} disputes built from templates (reasoning service unavailable)",
                        o.case_count
                    )
                } else {
                    format!("AI strategy generated for {} disputes", o.case_count)
                };
                PipelineResponse::ok(contact_id, o, message)
            }
            Err(e) => hard_failure(contact_id, "generate strategy", e),
        }
    }

    /// Drafts letters. Callers compare `generated` with `expected`.
    pub async fn generate_letters(
        &self,
        contact_id: &str,
        req: LetterRequest,
    ) -> PipelineResponse<LetterBatch> {
        match letters::generate_letters(&self.store, &self.reasoning, &self.cfg, &self.dump, contact_id, req)
            .await
        {
            Ok(b) => {
                let message = format!("Generated {} of {} letters", b.generated, b.expected);
                PipelineResponse::ok(contact_id, b, message)
            }
            Err(e) => hard_failure(contact_id, "generate letters", e),
        }
    }
}

fn hard_failure<T>(contact_id: &str, stage: &str, e: EngineError) -> PipelineResponse<T> {
    error!(contact_id, stage, error = %e, "pipeline stage failed");
    PipelineResponse::fail(contact_id, e.to_string())
}

fn analysis_record(
    contact_id: &str,
    origin: &Origin<'_>,
    report: &NormalizedReport,
    negative_items: usize,
    warnings: &[String],
) -> AnalysisRecord {
    AnalysisRecord {
        contact_id: contact_id.to_string(),
        credit_report_id: origin.report_id.map(str::to_string),
        report_source: origin.source.as_str().to_string(),
        scores: report.scores,
        account_summary: report.account_summary,
        tradeline_count: report.tradelines.len(),
        inquiry_count: report.inquiries.len(),
        negative_item_count: negative_items,
        tradelines: report
            .tradelines
            .iter()
            .map(|t| AnalysisTradeline {
                creditor_name: t.creditor_name.clone(),
                account_number: t.account_number.clone(),
                account_type: t.account_type.clone(),
                balance: t.balance,
                payment_status: t.payment_status.clone(),
                bureaus: t.bureaus.clone(),
            })
            .collect(),
        parse_warnings: warnings.to_vec(),
        parsed_at: now_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_flattens_payload() {
        #[derive(Serialize)]
        struct Count {
            count: u32,
        }
        let ok = serde_json::to_value(PipelineResponse::ok("c1", Count { count: 2 }, "done")).unwrap();
        assert_eq!(
            ok,
            json!({ "success": true, "contactId": "c1", "count": 2, "message": "done" })
        );

        let fail = serde_json::to_value(PipelineResponse::<Count>::fail("c1", NO_REPORT)).unwrap();
        assert_eq!(
            fail,
            json!({
                "success": false,
                "contactId": "c1",
                "error": "No credit report found",
                "message": "No credit report found"
            })
        );
    }
}
