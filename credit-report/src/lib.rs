//! Credit-report model, normalizer and negative-item classifier.
//!
//! ```text
//! RawPayload ──detect──▶ json | html | text ──▶ NormalizedReport ──classify──▶ Vec<NegativeItem>
//! ```
//!
//! Everything here is synchronous and free of I/O; persistence and the
//! reasoning service live in the engine crate.

pub mod bureau;
pub mod classify;
pub mod detect;
pub mod errors;
pub mod model;
pub mod normalize;

pub use bureau::{Bureau, MailingAddress};
pub use classify::{
    Category, ItemType, NegativeItem, NegativeSubject, Priority, ScoreImpact, classify,
    classify_at,
};
pub use detect::{DetectedFormat, FormatHint, RawPayload, detect_format};
pub use errors::{NormalizeError, NormalizeResult};
pub use model::{
    AccountSummary, CreditScores, Inquiry, LatePayments, NormalizedReport, PublicRecord,
    Tradeline,
};
pub use normalize::{ParseOutcome, TextExtractor, normalize};
