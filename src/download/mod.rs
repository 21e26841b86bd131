//! Per-case artifact downloads.
//!
//! Given a [`CaseResult`], the [`Downloader`] fetches and persists the full
//! metadata JSON, any sub-opinion JSON records, and the opinion PDF. Each step
//! is independently fallible and independently recorded on the returned
//! [`DownloadOutcome`]; only a metadata failure ends the case early, since the
//! other artifacts enrich that record. Existing files are overwritten, and
//! filesystem errors land in the outcome rather than aborting the batch.

mod outcome;

pub use outcome::{ArtifactOutcome, DownloadOutcome};

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, ApiError};
use crate::search::CaseResult;

/// Fetches and persists the artifacts of individual cases.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: ApiClient,
}

impl Downloader {
    /// Creates a downloader sharing the given client.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Downloads all artifacts for one case into `output_dir`.
    ///
    /// Writes `<case_id>.json`, `<case_id>_sub_<n>.json` per sub-opinion, and
    /// `<case_id>.pdf` when the case carries an opinion PDF URL. Never returns
    /// an error: every failure is recorded on the outcome.
    #[instrument(skip(self, case), fields(case_id = %case.id))]
    pub async fn download(&self, case: &CaseResult, output_dir: &Path) -> DownloadOutcome {
        let mut outcome = DownloadOutcome::new(&case.id);
        info!(name = %case.name, "downloading case");

        let metadata_path = output_dir.join(format!("{}.json", case.id));
        match self.fetch_json_artifact(&case.metadata_url, &metadata_path).await {
            Ok(()) => outcome.metadata = ArtifactOutcome::Saved(metadata_path),
            Err(error) => {
                warn!(error = %error, "case metadata fetch failed");
                outcome.metadata = ArtifactOutcome::Failed(error.to_string());
                // without the case record there is nothing to enrich
                return outcome;
            }
        }

        for (index, sub_url) in case.sub_opinions.iter().enumerate() {
            let n = index + 1;
            let sub_path = output_dir.join(format!("{}_sub_{n}.json", case.id));
            let artifact = match self.fetch_json_artifact(sub_url, &sub_path).await {
                Ok(()) => ArtifactOutcome::Saved(sub_path),
                Err(error) => {
                    warn!(sub_opinion = n, error = %error, "sub-opinion fetch failed");
                    ArtifactOutcome::Failed(error.to_string())
                }
            };
            outcome.sub_opinions.push(artifact);
        }

        outcome.opinion_pdf = match &case.opinion_pdf_url {
            None => {
                debug!("case has no opinion PDF");
                ArtifactOutcome::Absent
            }
            Some(url) => {
                let pdf_path = output_dir.join(format!("{}.pdf", case.id));
                match self.client.download_file(url, &pdf_path).await {
                    Ok(bytes) => {
                        debug!(bytes, path = %pdf_path.display(), "opinion PDF saved");
                        ArtifactOutcome::Saved(pdf_path)
                    }
                    Err(error) => {
                        warn!(error = %error, "opinion PDF fetch failed");
                        ArtifactOutcome::Failed(error.to_string())
                    }
                }
            }
        };

        outcome
    }

    /// Fetches a JSON record and writes it pretty-printed to `dest`.
    ///
    /// Parsing before writing keeps garbage responses out of the output
    /// directory; the stable key order makes repeat runs byte-identical.
    async fn fetch_json_artifact(&self, url: &str, dest: &Path) -> Result<(), ApiError> {
        let response = self.client.get(url, &[]).await?;
        let record: serde_json::Value = response.json()?;
        let pretty = serde_json::to_vec_pretty(&record).map_err(|e| ApiError::json(url, e))?;
        tokio::fs::write(dest, pretty)
            .await
            .map_err(|e| ApiError::io(dest, e))
    }
}
