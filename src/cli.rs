use std::{path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand};
use credit_report::FormatHint;
use dispute_engine::{LetterRequest, ToneSelection};

/// Local trigger for the dispute pipeline. Every command prints its result
/// envelope as JSON on stdout.
#[derive(Debug, Parser)]
#[command(name = "dispute-backend", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON document store root
    #[arg(long, global = true, env = "DISPUTE_DATA_DIR", default_value = "dispute_data/store")]
    pub data_dir: PathBuf,

    /// Uploaded files root
    #[arg(long, global = true, env = "DISPUTE_BLOB_DIR", default_value = "dispute_data/blobs")]
    pub blob_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Ingest the newest stored report and create cases.
    Populate { contact: String },
    /// Ingest an uploaded report file.
    Upload {
        contact: String,
        file_url: String,
        /// auto, json, html, pdf, image or text
        #[arg(long, default_value = "auto", value_parser = FormatHint::from_str)]
        format: FormatHint,
    },
    /// Schedule pending cases into rounds.
    Rounds { contact: String },
    /// Plan a strategy for pending cases.
    Strategy { contact: String },
    /// Draft letters for open cases.
    Letters(LettersArgs),
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct LettersArgs {
    pub contact: String,
    /// Only cases scheduled in this round
    #[arg(long)]
    pub round: Option<u32>,
    /// Draft formal, consumer and aggressive versions
    #[arg(long)]
    pub all_tones: bool,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Populate { .. } => "populate",
            Command::Upload { .. } => "upload",
            Command::Rounds { .. } => "rounds",
            Command::Strategy { .. } => "strategy",
            Command::Letters(_) => "letters",
        }
    }

    pub fn contact(&self) -> &str {
        match self {
            Command::Populate { contact }
            | Command::Upload { contact, .. }
            | Command::Rounds { contact }
            | Command::Strategy { contact }
            | Command::Letters(LettersArgs { contact, .. }) => contact,
        }
    }
}

impl LettersArgs {
    pub fn request(&self) -> LetterRequest {
        LetterRequest {
            round: self.round,
            tones: if self.all_tones {
                ToneSelection::All
            } else {
                ToneSelection::Assigned
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_parses_format_hint() {
        let cli = Cli::try_parse_from([
            "dispute-backend",
            "upload",
            "C1",
            "uploads/C1/report.pdf",
            "--format",
            "PDF",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Command::Upload {
                contact: "C1".into(),
                file_url: "uploads/C1/report.pdf".into(),
                format: FormatHint::Pdf,
            }
        );
        assert_eq!(cli.command.contact(), "C1");
    }

    #[test]
    fn upload_format_defaults_to_auto() {
        let cli = Cli::try_parse_from(["dispute-backend", "upload", "C1", "r.json"]).unwrap();
        assert!(matches!(cli.command, Command::Upload { format: FormatHint::Auto, .. }));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let parsed = Cli::try_parse_from(["dispute-backend", "upload", "C1", "r", "--format", "xml"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn letters_flags_build_request() {
        let cli = Cli::try_parse_from(["dispute-backend", "letters", "C1", "--round", "2", "--all-tones"])
            .unwrap();
        let Command::Letters(args) = &cli.command else {
            panic!("expected letters, got {:?}", cli.command);
        };
        let req = args.request();
        assert_eq!(req.round, Some(2));
        assert_eq!(req.tones, ToneSelection::All);

        let cli = Cli::try_parse_from(["dispute-backend", "letters", "C1"]).unwrap();
        let Command::Letters(args) = &cli.command else {
            panic!("expected letters");
        };
        assert_eq!(args.request(), LetterRequest::default());
    }

    #[test]
    fn contact_is_required() {
        assert!(Cli::try_parse_from(["dispute-backend", "rounds"]).is_err());
    }
}
