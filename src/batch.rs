//! Top-level run loop: queries through search, cases through download.
//!
//! The orchestrator processes one query at a time and one case at a time,
//! collecting a [`QueryReport`] per query and the final metrics snapshot into
//! a [`RunSummary`]. Per-case failures stay inside their [`DownloadOutcome`];
//! a search that dies mid-pagination is recorded on its report and ends that
//! query only, never the run.

use std::path::Path;

use tracing::{error, info, instrument};

use crate::api::{ApiClient, MetricsSnapshot};
use crate::download::{DownloadOutcome, Downloader};
use crate::recap::RecapFetcher;
use crate::search::{SearchQuery, Searcher};

/// Results of one query: how many cases matched and what happened to each.
#[derive(Debug)]
pub struct QueryReport {
    /// The search phrase.
    pub phrase: String,
    /// Number of cases the search yielded.
    pub cases_found: usize,
    /// One outcome per case, in result order.
    pub outcomes: Vec<DownloadOutcome>,
    /// Set when pagination failed before the result set was exhausted.
    pub search_error: Option<String>,
}

impl QueryReport {
    fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            cases_found: 0,
            outcomes: Vec::new(),
            search_error: None,
        }
    }

    /// Number of cases whose metadata record could not be saved.
    #[must_use]
    pub fn cases_failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }
}

/// Aggregate results of a whole run.
#[derive(Debug)]
pub struct RunSummary {
    /// One report per query, in input order.
    pub reports: Vec<QueryReport>,
    /// API accounting across every request the run made.
    pub metrics: MetricsSnapshot,
}

impl RunSummary {
    /// Total cases found across all queries.
    #[must_use]
    pub fn cases_found(&self) -> usize {
        self.reports.iter().map(|r| r.cases_found).sum()
    }

    /// Total cases whose metadata record could not be saved.
    #[must_use]
    pub fn cases_failed(&self) -> usize {
        self.reports.iter().map(QueryReport::cases_failed).sum()
    }
}

/// Fans a list of queries through search and per-case downloads.
#[derive(Debug)]
pub struct Orchestrator {
    client: ApiClient,
    searcher: Searcher,
    downloader: Downloader,
    recap: Option<RecapFetcher>,
}

impl Orchestrator {
    /// Creates an orchestrator around a shared client.
    ///
    /// `page_size` is the search page size; `fetch_recap` enables docket PDF
    /// retrieval for cases that carry a docket id.
    #[must_use]
    pub fn new(client: ApiClient, page_size: u32, fetch_recap: bool) -> Self {
        let searcher = Searcher::with_page_size(client.clone(), page_size);
        let downloader = Downloader::new(client.clone());
        let recap = fetch_recap.then(|| RecapFetcher::new(client.clone()));
        Self {
            client,
            searcher,
            downloader,
            recap,
        }
    }

    /// Runs every query to completion, downloading each matched case.
    #[instrument(skip(self, queries), fields(queries = queries.len(), output_dir = %output_dir.display()))]
    pub async fn run(&self, queries: &[SearchQuery], output_dir: &Path) -> RunSummary {
        let mut reports = Vec::with_capacity(queries.len());

        for query in queries {
            info!(
                phrase = %query.phrase(),
                jurisdictions = ?query.jurisdictions(),
                "searching cases"
            );
            reports.push(self.run_query(query, output_dir).await);
        }

        RunSummary {
            reports,
            metrics: self.client.metrics().snapshot(),
        }
    }

    async fn run_query(&self, query: &SearchQuery, output_dir: &Path) -> QueryReport {
        let mut report = QueryReport::new(query.phrase());
        let mut results = self.searcher.search(query);

        loop {
            match results.next().await {
                Ok(Some(case)) => {
                    report.cases_found += 1;
                    let mut outcome = self.downloader.download(&case, output_dir).await;

                    // Docket PDFs enrich the saved case record, so a case whose
                    // metadata fetch failed is not worth a RECAP round-trip.
                    if let (Some(recap), Some(docket_id)) = (&self.recap, case.docket_id) {
                        if outcome.succeeded() {
                            outcome.docket_pdf = recap.fetch_docket(docket_id, output_dir).await;
                        }
                    }

                    report.outcomes.push(outcome);
                }
                Ok(None) => break,
                Err(err) => {
                    error!(phrase = %query.phrase(), error = %err, "search failed");
                    report.search_error = Some(err.to_string());
                    break;
                }
            }
        }

        info!(
            phrase = %query.phrase(),
            cases = report.cases_found,
            failed = report.cases_failed(),
            "query complete"
        );
        report
    }
}
