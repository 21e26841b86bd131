//! RECAP docket PDF retrieval.
//!
//! RECAP coverage is crowd-sourced and incomplete: a docket with no archived
//! document is an expected outcome, reported as [`ArtifactOutcome::Absent`]
//! rather than a failure. The fetcher lists the docket's entries, follows the
//! first RECAP document reference, and downloads its PDF when one is on file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, ApiError};
use crate::download::ArtifactOutcome;

/// One page of a docket's entry list.
#[derive(Debug, Deserialize)]
struct DocketEntriesPage {
    #[serde(default)]
    results: Vec<DocketEntry>,
}

/// A docket entry; most carry no RECAP document reference.
#[derive(Debug, Deserialize)]
struct DocketEntry {
    recap_document: Option<u64>,
}

/// A RECAP document record. `download_url` is null while no PDF is on file.
#[derive(Debug, Deserialize)]
struct RecapDocument {
    download_url: Option<String>,
}

/// Retrieves archived docket PDFs from the RECAP endpoints.
#[derive(Debug, Clone)]
pub struct RecapFetcher {
    client: ApiClient,
}

impl RecapFetcher {
    /// Creates a fetcher sharing the given client.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetches the docket's RECAP PDF into `output_dir/docket_<id>.pdf`.
    ///
    /// Returns `Saved` with the written path, `Absent` when the archive holds
    /// no document for this docket, or `Failed` on fetch/write errors. Never
    /// returns an error: like the case downloader, failures are recorded, not
    /// raised.
    #[instrument(skip(self))]
    pub async fn fetch_docket(&self, docket_id: u64, output_dir: &Path) -> ArtifactOutcome {
        match self.try_fetch(docket_id, output_dir).await {
            Ok(Some(path)) => {
                info!(docket_id, path = %path.display(), "docket PDF saved");
                ArtifactOutcome::Saved(path)
            }
            Ok(None) => {
                debug!(docket_id, "no RECAP document available");
                ArtifactOutcome::Absent
            }
            Err(error) => {
                warn!(docket_id, error = %error, "docket PDF fetch failed");
                ArtifactOutcome::Failed(error.to_string())
            }
        }
    }

    /// `Ok(None)` means the archive has nothing for this docket.
    async fn try_fetch(
        &self,
        docket_id: u64,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>, ApiError> {
        let entries_path = format!("/dockets/{docket_id}/entries/");
        let response = self.client.get(&entries_path, &[]).await?;
        let page: DocketEntriesPage = response.json()?;

        let Some(document_id) = page.results.iter().find_map(|e| e.recap_document) else {
            return Ok(None);
        };

        let document_path = format!("/recap-documents/{document_id}/");
        let response = self.client.get(&document_path, &[]).await?;
        let document: RecapDocument = response.json()?;

        let Some(pdf_url) = document.download_url.filter(|url| !url.is_empty()) else {
            // referenced but never uploaded
            return Ok(None);
        };

        let dest = output_dir.join(format!("docket_{docket_id}.pdf"));
        self.client.download_file(&pdf_url, &dest).await?;
        Ok(Some(dest))
    }
}
