//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use casefetch_core::{DEFAULT_MAX_RETRIES, DEFAULT_PAGE_SIZE};

/// Batch download court case law from the CourtListener REST API.
///
/// Casefetch searches case law by keyword, then downloads each matching
/// case's metadata JSON, sub-opinions, and opinion PDF into one directory.
#[derive(Parser, Debug)]
#[command(name = "casefetch")]
#[command(author, version, about)]
pub struct Args {
    /// Search phrases, one query per argument
    #[arg(required = true, value_name = "PHRASE")]
    pub queries: Vec<String>,

    /// Jurisdiction slugs to filter by server-side (repeatable)
    #[arg(short = 'j', long = "jurisdiction", value_name = "SLUG")]
    pub jurisdictions: Vec<String>,

    /// Only cases filed on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub filed_after: Option<String>,

    /// Only cases filed on or before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub filed_before: Option<String>,

    /// Output directory for case artifacts
    #[arg(short, long, default_value = "cases")]
    pub output: PathBuf,

    /// Also fetch RECAP docket PDFs for cases with a docket id
    #[arg(long)]
    pub recap: bool,

    /// Results requested per search page (1-100)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub page_size: u32,

    /// Maximum attempts per request for transient failures (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_retries: u32,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
