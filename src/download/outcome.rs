//! Per-case download results.

use std::path::{Path, PathBuf};

/// Result of fetching and persisting one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// The artifact was written to the given path.
    Saved(PathBuf),
    /// The source has no such artifact; expected for many cases, not an error.
    Absent,
    /// Fetching or writing the artifact failed.
    Failed(String),
}

impl ArtifactOutcome {
    /// Returns true when the artifact was written.
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    /// Returns the saved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Saved(path) => Some(path),
            _ => None,
        }
    }

    /// Returns the failure reason, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Record of which artifacts were written for one case, and why the rest
/// were not. One outcome per case per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// The case identifier the artifacts belong to.
    pub case_id: String,
    /// Full case metadata JSON (`<case_id>.json`). Fatal to the case when
    /// failed; the remaining artifacts are enrichments of this record.
    pub metadata: ArtifactOutcome,
    /// Sub-opinion JSON artifacts, in reference order.
    pub sub_opinions: Vec<ArtifactOutcome>,
    /// Opinion PDF (`<case_id>.pdf`), absent for cases without one.
    pub opinion_pdf: ArtifactOutcome,
    /// RECAP docket PDF, absent unless RECAP fetching ran and found one.
    pub docket_pdf: ArtifactOutcome,
}

impl DownloadOutcome {
    /// Creates an outcome with nothing attempted yet.
    #[must_use]
    pub fn new(case_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            metadata: ArtifactOutcome::Absent,
            sub_opinions: Vec::new(),
            opinion_pdf: ArtifactOutcome::Absent,
            docket_pdf: ArtifactOutcome::Absent,
        }
    }

    /// Whether the case record itself was saved.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.metadata.is_saved()
    }

    /// Number of artifacts written for this case.
    #[must_use]
    pub fn saved_count(&self) -> usize {
        let subs = self.sub_opinions.iter().filter(|a| a.is_saved()).count();
        [&self.metadata, &self.opinion_pdf, &self.docket_pdf]
            .into_iter()
            .filter(|a| a.is_saved())
            .count()
            + subs
    }

    /// Number of artifacts that failed for this case.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        let subs = self
            .sub_opinions
            .iter()
            .filter(|a| a.failure().is_some())
            .count();
        [&self.metadata, &self.opinion_pdf, &self.docket_pdf]
            .into_iter()
            .filter(|a| a.failure().is_some())
            .count()
            + subs
    }
}
