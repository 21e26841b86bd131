//! Keyword search against the opinion search endpoint.
//!
//! [`Searcher`] turns a [`SearchQuery`] into a finite sequence of
//! [`CaseResult`]s, following the server's pagination cursor until it reports
//! no further pages or returns an empty page. Entries missing required fields
//! are logged as data-quality warnings and skipped; an empty result set is a
//! normal outcome.

use std::collections::VecDeque;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};

/// Search endpoint path.
const SEARCH_PATH: &str = "/search/";

/// Default number of results requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// An immutable search request: phrase plus optional server-side filters.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    phrase: String,
    jurisdictions: Vec<String>,
    filed_after: Option<String>,
    filed_before: Option<String>,
}

impl SearchQuery {
    /// Creates a query for the given keyword/phrase.
    #[must_use]
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            jurisdictions: Vec::new(),
            filed_after: None,
            filed_before: None,
        }
    }

    /// Restricts results to the given jurisdiction slugs (filtered server-side).
    #[must_use]
    pub fn with_jurisdictions<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.jurisdictions = slugs.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts results to cases filed within the given `YYYY-MM-DD` bounds.
    #[must_use]
    pub fn with_filed_range(mut self, after: Option<String>, before: Option<String>) -> Self {
        self.filed_after = after;
        self.filed_before = before;
        self
    }

    /// Returns the search phrase.
    #[must_use]
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Returns the jurisdiction slugs, empty when unfiltered.
    #[must_use]
    pub fn jurisdictions(&self) -> &[String] {
        &self.jurisdictions
    }
}

/// One case from the search results, with everything the downloader needs.
///
/// Produced by [`Searcher`]; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    /// Case identifier (first available of `id`, `cluster_id`, `docket_id`).
    pub id: String,
    /// Case name.
    pub name: String,
    /// Court slug, when reported.
    pub court: Option<String>,
    /// Filing date, when reported.
    pub date_filed: Option<String>,
    /// URL of the full case metadata record.
    pub metadata_url: String,
    /// URL of the opinion PDF; many cases have none.
    pub opinion_pdf_url: Option<String>,
    /// Docket identifier for RECAP lookups, when reported.
    pub docket_id: Option<u64>,
    /// Fetch URLs of attached sub-opinions (dissents, concurrences).
    pub sub_opinions: Vec<String>,
}

// ==================== Search API Response Types ====================

/// One page of the search response.
#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<SearchEntry>,
    next: Option<String>,
}

/// A raw search result entry. Fields are permissive; which of the identifier
/// and URL variants is populated differs per record type.
#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: Option<u64>,
    cluster_id: Option<u64>,
    docket_id: Option<u64>,
    name: Option<String>,
    #[serde(rename = "caseName")]
    case_name: Option<String>,
    court: Option<String>,
    #[serde(alias = "dateFiled")]
    date_filed: Option<String>,
    url: Option<String>,
    resource_uri: Option<String>,
    absolute_url: Option<String>,
    download_url: Option<String>,
    #[serde(default)]
    sub_opinions: Vec<String>,
}

impl SearchEntry {
    /// Validates the entry and maps it to a [`CaseResult`].
    ///
    /// Returns the rejection reason for malformed entries so the caller can
    /// log a data-quality warning and move on.
    fn into_case(self) -> Result<CaseResult, &'static str> {
        let metadata_url = self.metadata_url().ok_or("no usable metadata URL")?;
        let id = self
            .id
            .or(self.cluster_id)
            .or(self.docket_id)
            .ok_or("missing identifier")?
            .to_string();
        let name = self
            .name
            .or(self.case_name)
            .filter(|name| !name.is_empty())
            .ok_or("missing case name")?;

        Ok(CaseResult {
            id,
            name,
            court: self.court,
            date_filed: self.date_filed,
            metadata_url,
            opinion_pdf_url: self.download_url.filter(|url| !url.is_empty()),
            docket_id: self.docket_id,
            sub_opinions: self.sub_opinions,
        })
    }

    /// Metadata URL fallback chain: `url`, `resource_uri`, `/clusters/<id>/`
    /// from a cluster id, then an API-shaped `absolute_url`.
    fn metadata_url(&self) -> Option<String> {
        if let Some(url) = &self.url {
            return Some(url.clone());
        }
        if let Some(uri) = &self.resource_uri {
            return Some(uri.clone());
        }
        if let Some(cluster_id) = self.cluster_id {
            return Some(format!("/clusters/{cluster_id}/"));
        }
        match &self.absolute_url {
            Some(abs) if abs.starts_with("/api/rest/") || abs.starts_with("http") => {
                Some(abs.clone())
            }
            _ => None,
        }
    }
}

// ==================== Searcher ====================

/// Executes paginated keyword searches.
#[derive(Debug, Clone)]
pub struct Searcher {
    client: ApiClient,
    page_size: u32,
}

impl Searcher {
    /// Creates a searcher with the default page size.
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self::with_page_size(client, DEFAULT_PAGE_SIZE)
    }

    /// Creates a searcher requesting `page_size` results per page.
    #[must_use]
    pub fn with_page_size(client: ApiClient, page_size: u32) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
        }
    }

    /// Starts a search, returning the result sequence.
    ///
    /// The sequence is finite and not restartable: pages are fetched lazily as
    /// results are consumed, and a consumed sequence stays empty.
    #[must_use]
    pub fn search(&self, query: &SearchQuery) -> SearchResults<'_> {
        SearchResults {
            client: &self.client,
            first_page: Some(self.first_page_params(query)),
            buffered: VecDeque::new(),
            next_url: None,
            done: false,
        }
    }

    fn first_page_params(&self, query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.phrase.clone()),
            // opinions only
            ("type", "o".to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if !query.jurisdictions.is_empty() {
            params.push(("court", query.jurisdictions.join(",")));
        }
        if let Some(after) = &query.filed_after {
            params.push(("filed_after", after.clone()));
        }
        if let Some(before) = &query.filed_before {
            params.push(("filed_before", before.clone()));
        }
        params
    }
}

/// Lazy sequence of [`CaseResult`]s backed by paginated API calls.
#[derive(Debug)]
pub struct SearchResults<'a> {
    client: &'a ApiClient,
    /// Query parameters for the initial request; taken on the first fetch.
    first_page: Option<Vec<(&'static str, String)>>,
    buffered: VecDeque<CaseResult>,
    next_url: Option<String>,
    done: bool,
}

impl SearchResults<'_> {
    /// Returns the next case, fetching further pages as needed.
    ///
    /// `Ok(None)` marks the end of the result set.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when a page fetch fails after retries or the page
    /// body is not valid JSON.
    pub async fn next(&mut self) -> Result<Option<CaseResult>, ApiError> {
        loop {
            if let Some(case) = self.buffered.pop_front() {
                return Ok(Some(case));
            }
            if self.done {
                return Ok(None);
            }
            self.fetch_next_page().await?;
        }
    }

    /// Drains the remaining results into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first [`ApiError`] encountered while paging.
    pub async fn collect_all(mut self) -> Result<Vec<CaseResult>, ApiError> {
        let mut cases = Vec::new();
        while let Some(case) = self.next().await? {
            cases.push(case);
        }
        Ok(cases)
    }

    async fn fetch_next_page(&mut self) -> Result<(), ApiError> {
        let response = if let Some(params) = self.first_page.take() {
            self.client.get(SEARCH_PATH, &params).await?
        } else if let Some(next) = self.next_url.take() {
            self.client.get(&next, &[]).await?
        } else {
            self.done = true;
            return Ok(());
        };

        let page: SearchPage = response.json()?;

        // An empty page ends the sequence even if a cursor is present
        if page.results.is_empty() {
            debug!("empty search page, ending pagination");
            self.done = true;
            return Ok(());
        }

        let page_len = page.results.len();
        for entry in page.results {
            match entry.into_case() {
                Ok(case) => self.buffered.push_back(case),
                Err(reason) => warn!(reason, "skipping malformed search result entry"),
            }
        }
        debug!(
            entries = page_len,
            mapped = self.buffered.len(),
            has_next = page.next.is_some(),
            "search page mapped"
        );

        self.next_url = page.next;
        if self.next_url.is_none() {
            self.done = true;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::RetryPolicy;
    use crate::config::Config;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_searcher(server: &MockServer) -> Searcher {
        let config = Config::new(server.uri(), "test-token");
        Searcher::new(ApiClient::new(&config, RetryPolicy::with_max_attempts(1)))
    }

    fn entry(id: u64, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "url": format!("/clusters/{id}/"),
            "court": "colo",
            "date_filed": "2024-01-15"
        })
    }

    // ==================== Entry Mapping Tests ====================

    #[test]
    fn test_entry_maps_all_fields() {
        let entry: SearchEntry = serde_json::from_value(json!({
            "id": 7,
            "name": "Smith v. Jones",
            "court": "colo",
            "date_filed": "2023-06-01",
            "url": "/clusters/7/",
            "download_url": "https://example.com/7.pdf",
            "docket_id": 70,
            "sub_opinions": ["/opinions/8/", "/opinions/9/"]
        }))
        .unwrap();

        let case = entry.into_case().unwrap();
        assert_eq!(case.id, "7");
        assert_eq!(case.name, "Smith v. Jones");
        assert_eq!(case.metadata_url, "/clusters/7/");
        assert_eq!(case.opinion_pdf_url.as_deref(), Some("https://example.com/7.pdf"));
        assert_eq!(case.docket_id, Some(70));
        assert_eq!(case.sub_opinions.len(), 2);
    }

    #[test]
    fn test_entry_identifier_falls_back_to_cluster_then_docket() {
        let entry: SearchEntry = serde_json::from_value(json!({
            "cluster_id": 42, "docket_id": 3, "name": "Cluster Case"
        }))
        .unwrap();
        assert_eq!(entry.into_case().unwrap().id, "42");

        let entry: SearchEntry = serde_json::from_value(json!({
            "docket_id": 3, "name": "Docket Case", "url": "/dockets/3/"
        }))
        .unwrap();
        assert_eq!(entry.into_case().unwrap().id, "3");
    }

    #[test]
    fn test_entry_name_falls_back_to_case_name() {
        let entry: SearchEntry = serde_json::from_value(json!({
            "id": 2, "caseName": "Bar Case", "url": "/clusters/2/"
        }))
        .unwrap();
        assert_eq!(entry.into_case().unwrap().name, "Bar Case");
    }

    #[test]
    fn test_entry_metadata_url_chain() {
        // resource_uri wins when url is absent
        let entry: SearchEntry = serde_json::from_value(json!({
            "id": 1, "name": "A", "resource_uri": "/clusters/1/"
        }))
        .unwrap();
        assert_eq!(entry.into_case().unwrap().metadata_url, "/clusters/1/");

        // cluster_id beats absolute_url
        let entry: SearchEntry = serde_json::from_value(json!({
            "cluster_id": 3, "name": "B", "absolute_url": "/opinion/3/foo"
        }))
        .unwrap();
        assert_eq!(entry.into_case().unwrap().metadata_url, "/clusters/3/");

        // API-shaped absolute_url is accepted as last resort
        let entry: SearchEntry = serde_json::from_value(json!({
            "id": 4, "name": "C", "absolute_url": "/api/rest/v4/opinions/4/"
        }))
        .unwrap();
        assert_eq!(entry.into_case().unwrap().metadata_url, "/api/rest/v4/opinions/4/");
    }

    #[test]
    fn test_entry_missing_identifier_is_rejected() {
        let entry: SearchEntry = serde_json::from_value(json!({
            "name": "No Id Case", "url": "/clusters/x/"
        }))
        .unwrap();
        assert_eq!(entry.into_case().unwrap_err(), "missing identifier");
    }

    #[test]
    fn test_entry_missing_name_is_rejected() {
        let entry: SearchEntry = serde_json::from_value(json!({
            "id": 5, "url": "/clusters/5/"
        }))
        .unwrap();
        assert_eq!(entry.into_case().unwrap_err(), "missing case name");
    }

    #[test]
    fn test_entry_non_api_absolute_url_is_rejected() {
        let entry: SearchEntry = serde_json::from_value(json!({
            "id": 5, "name": "E", "absolute_url": "/opinion/5"
        }))
        .unwrap();
        assert_eq!(entry.into_case().unwrap_err(), "no usable metadata URL");
    }

    // ==================== Pagination Tests (wiremock) ====================

    #[tokio::test]
    async fn test_search_empty_result_set_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": [], "next": null})),
            )
            .mount(&server)
            .await;

        let searcher = test_searcher(&server);
        let query = SearchQuery::new("no hits");
        let cases = searcher.search(&query).collect_all().await.unwrap();
        assert!(cases.is_empty());
    }

    #[tokio::test]
    async fn test_search_two_pages_yields_union_in_page_order() {
        let server = MockServer::start().await;

        let page1_entries: Vec<_> = (1..=20).map(|i| entry(i, &format!("Case {i}"))).collect();
        let page2_entries: Vec<_> = (21..=25).map(|i| entry(i, &format!("Case {i}"))).collect();

        Mock::given(method("GET"))
            .and(path("/search/"))
            .and(query_param("q", "civil rights"))
            .and(query_param("court", "colo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": page1_entries,
                "next": format!("{}/search/?cursor=abc", server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search/"))
            .and(query_param("cursor", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": page2_entries,
                "next": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let searcher = test_searcher(&server);
        let query = SearchQuery::new("civil rights").with_jurisdictions(["colo"]);
        let cases = searcher.search(&query).collect_all().await.unwrap();

        assert_eq!(cases.len(), 25);
        assert_eq!(cases[0].id, "1");
        assert_eq!(cases[19].id, "20");
        assert_eq!(cases[24].id, "25");
    }

    #[tokio::test]
    async fn test_search_follows_relative_next_url() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/"))
            .and(query_param("q", "kw"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [entry(1, "First")],
                "next": "/search/?cursor=p2"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/search/"))
            .and(query_param("cursor", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [entry(2, "Second")],
                "next": null
            })))
            .mount(&server)
            .await;

        let searcher = test_searcher(&server);
        let cases = searcher
            .search(&SearchQuery::new("kw"))
            .collect_all()
            .await
            .unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[1].name, "Second");
    }

    #[tokio::test]
    async fn test_search_skips_malformed_entries() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"name": "No Identifier", "url": "/clusters/x/"},
                    entry(2, "Valid Case"),
                    {"id": 3, "url": "/clusters/3/"}
                ],
                "next": null
            })))
            .mount(&server)
            .await;

        let searcher = test_searcher(&server);
        let cases = searcher
            .search(&SearchQuery::new("kw"))
            .collect_all()
            .await
            .unwrap();

        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "Valid Case");
    }

    #[tokio::test]
    async fn test_search_sends_filters_and_page_size() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/"))
            .and(query_param("type", "o"))
            .and(query_param("page_size", "50"))
            .and(query_param("court", "colo,circtdco"))
            .and(query_param("filed_after", "2023-01-01"))
            .and(query_param("filed_before", "2023-12-31"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": [], "next": null})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = Config::new(server.uri(), "test-token");
        let searcher =
            Searcher::with_page_size(ApiClient::new(&config, RetryPolicy::with_max_attempts(1)), 50);
        let query = SearchQuery::new("kw")
            .with_jurisdictions(["colo", "circtdco"])
            .with_filed_range(Some("2023-01-01".to_string()), Some("2023-12-31".to_string()));

        let cases = searcher.search(&query).collect_all().await.unwrap();
        assert!(cases.is_empty());
    }

    #[tokio::test]
    async fn test_search_empty_page_with_cursor_still_ends() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [],
                "next": "/search/?cursor=never"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let searcher = test_searcher(&server);
        let cases = searcher
            .search(&SearchQuery::new("kw"))
            .collect_all()
            .await
            .unwrap();
        assert!(cases.is_empty());
    }
}
