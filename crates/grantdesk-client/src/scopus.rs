//! Scopus client for importing an author's publications.
//!
//! Uses the Elsevier Scopus Search API:
//! <https://dev.elsevier.com/documentation/ScopusSearchAPI.wadl>

use std::time::Duration;

use grantdesk_core::{AppError, HttpConfig, PublicationFetcher, PublicationSource, RemotePublication};
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::time::sleep;

use crate::retry::send_with_retry;

const DEFAULT_BASE_URL: &str = "https://api.elsevier.com/";

/// Envelope of a Scopus Search response.
#[derive(Deserialize, Debug)]
struct ScopusResponse {
    #[serde(rename = "search-results")]
    search_results: SearchResults,
}

#[derive(Deserialize, Debug)]
struct SearchResults {
    /// Scopus sends counts as strings.
    #[serde(rename = "opensearch:totalResults", default)]
    total_results: Option<String>,
    #[serde(default)]
    entry: Vec<ScopusEntry>,
}

/// One search result.
///
/// An empty result set is returned as a single entry that only carries an
/// `error` field, so every field is optional.
#[derive(Deserialize, Debug, Clone)]
pub struct ScopusEntry {
    #[serde(rename = "dc:identifier")]
    pub identifier: Option<String>,
    #[serde(rename = "dc:title")]
    pub title: Option<String>,
    #[serde(rename = "dc:creator")]
    pub creator: Option<String>,
    #[serde(rename = "prism:publicationName")]
    pub publication_name: Option<String>,
    #[serde(rename = "prism:coverDate")]
    pub cover_date: Option<String>,
    #[serde(rename = "prism:doi")]
    pub doi: Option<String>,
    #[serde(rename = "citedby-count")]
    pub cited_by_count: Option<String>,
    #[serde(default)]
    pub link: Vec<ScopusLink>,
    pub error: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScopusLink {
    #[serde(rename = "@ref")]
    pub rel: String,
    #[serde(rename = "@href")]
    pub href: String,
}

/// HTTP client for the Scopus Search API.
///
/// The API key is sent in the `X-ELS-APIKey` header.
///
/// # Examples
///
/// ```no_run
/// use grantdesk_client::ScopusClient;
/// use grantdesk_core::PublicationFetcher;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ScopusClient::new("your-api-key")?;
/// let publications = client.fetch_by_author("57190000000").await?;
/// println!("Found {} publications", publications.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ScopusClient {
    client: Client,
    base_url: Url,
    api_key: String,
    http_config: HttpConfig,
}

impl ScopusClient {
    /// Results per page. 25 is the maximum for the STANDARD view.
    const PAGE_SIZE: usize = 25;

    /// The API refuses `start` beyond 5000.
    const MAX_RESULTS: usize = 5000;

    /// Delay between pages.
    const PAGE_DELAY: Duration = Duration::from_millis(200);

    pub fn new(api_key: &str) -> Result<Self, AppError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Points the client at another host, e.g. an institutional proxy.
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::ConfigError("Scopus API key is empty".to_string()));
        }
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::ConfigError(format!("invalid Scopus URL '{}': {}", base_url, e)))?;

        let http_config = HttpConfig::default();
        let client = Client::builder()
            .user_agent(concat!("GrantDesk/", env!("CARGO_PKG_VERSION")))
            .timeout(http_config.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.trim().to_string(),
            http_config,
        })
    }

    fn search_url(&self, author_id: &str, start: usize) -> Result<Url, AppError> {
        let mut url = self
            .base_url
            .join("content/search/scopus")
            .map_err(|e| AppError::Generic(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("query", &format!("AU-ID({})", author_id))
            .append_pair("start", &start.to_string())
            .append_pair("count", &Self::PAGE_SIZE.to_string())
            .append_pair("sort", "-coverDate");
        Ok(url)
    }

    async fn fetch_page(&self, author_id: &str, start: usize) -> Result<SearchResults, AppError> {
        let url = self.search_url(author_id, start)?;
        let resp = send_with_retry(
            || {
                self.client
                    .get(url.clone())
                    .header("X-ELS-APIKey", &self.api_key)
                    .header(reqwest::header::ACCEPT, "application/json")
            },
            &self.http_config,
            "scopus",
        )
        .await?;

        let body: ScopusResponse = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(format!("invalid Scopus response: {}", e)))?;
        Ok(body.search_results)
    }

    /// Converts a search entry into a [`RemotePublication`].
    ///
    /// Returns `None` for placeholder entries without an identifier.
    pub fn into_remote(entry: ScopusEntry) -> Option<RemotePublication> {
        let identifier = entry.identifier?;
        let external_id = identifier
            .strip_prefix("SCOPUS_ID:")
            .unwrap_or(&identifier)
            .to_string();
        if external_id.is_empty() {
            return None;
        }

        let pub_year = entry
            .cover_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse::<i32>().ok());
        let url = entry
            .link
            .iter()
            .find(|l| l.rel == "scopus")
            .map(|l| l.href.clone());

        Some(RemotePublication {
            external_id,
            title: entry.title.unwrap_or_default(),
            authors: entry.creator.unwrap_or_default(),
            venue: entry.publication_name.filter(|v| !v.is_empty()),
            pub_year,
            doi: entry.doi.filter(|d| !d.is_empty()),
            url,
            citation_count: entry
                .cited_by_count
                .as_deref()
                .and_then(|c| c.parse().ok())
                .unwrap_or(0),
        })
    }
}

impl PublicationFetcher for ScopusClient {
    fn source(&self) -> PublicationSource {
        PublicationSource::Scopus
    }

    async fn fetch_by_author(&self, author_id: &str) -> Result<Vec<RemotePublication>, AppError> {
        let mut publications = Vec::new();
        let mut start = 0;

        loop {
            let page = self.fetch_page(author_id, start).await?;
            let total = page
                .total_results
                .as_deref()
                .and_then(|t| t.parse::<usize>().ok())
                .unwrap_or(0);
            let page_len = page.entry.len();

            publications.extend(page.entry.into_iter().filter_map(Self::into_remote));

            start += page_len;
            if page_len == 0 || start >= total || start >= Self::MAX_RESULTS {
                break;
            }
            sleep(Self::PAGE_DELAY).await;
        }

        tracing::debug!(author_id, count = publications.len(), "Fetched Scopus publications");
        Ok(publications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_deserialization() {
        let json = r#"{
            "search-results": {
                "opensearch:totalResults": "2",
                "opensearch:startIndex": "0",
                "entry": [
                    {
                        "dc:identifier": "SCOPUS_ID:85012345678",
                        "dc:title": "Sparse models for grant allocation",
                        "dc:creator": "Rossi M.",
                        "prism:publicationName": "Research Policy",
                        "prism:coverDate": "2024-03-01",
                        "prism:doi": "10.1016/j.respol.2024.01.001",
                        "citedby-count": "7",
                        "link": [
                            {"@ref": "self", "@href": "https://api.elsevier.com/content/abstract/scopus_id/85012345678"},
                            {"@ref": "scopus", "@href": "https://www.scopus.com/inward/record.uri?eid=2-s2.0-85012345678"}
                        ]
                    },
                    {
                        "dc:identifier": "SCOPUS_ID:85000000001",
                        "dc:title": "Untitled note"
                    }
                ]
            }
        }"#;

        let response: ScopusResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.search_results.total_results.as_deref(), Some("2"));
        assert_eq!(response.search_results.entry.len(), 2);

        let first = ScopusClient::into_remote(response.search_results.entry[0].clone()).unwrap();
        assert_eq!(first.external_id, "85012345678");
        assert_eq!(first.pub_year, Some(2024));
        assert_eq!(first.citation_count, 7);
        assert_eq!(first.venue.as_deref(), Some("Research Policy"));
        assert!(first.url.unwrap().contains("scopus.com"));

        let second = ScopusClient::into_remote(response.search_results.entry[1].clone()).unwrap();
        assert_eq!(second.citation_count, 0);
        assert_eq!(second.pub_year, None);
    }

    #[test]
    fn test_empty_result_set_yields_nothing() {
        let json = r#"{
            "search-results": {
                "opensearch:totalResults": "0",
                "entry": [{"@_fa": "true", "error": "Result set was empty"}]
            }
        }"#;

        let response: ScopusResponse = serde_json::from_str(json).unwrap();
        let publications: Vec<_> = response
            .search_results
            .entry
            .into_iter()
            .filter_map(ScopusClient::into_remote)
            .collect();
        assert!(publications.is_empty());
    }

    #[test]
    fn test_search_url() {
        let client = ScopusClient::new("key").unwrap();
        let url = client.search_url("57190000000", 25).unwrap();
        assert_eq!(url.path(), "/content/search/scopus");
        let query = url.query().unwrap();
        assert!(query.contains("query=AU-ID%2857190000000%29"));
        assert!(query.contains("start=25"));
        assert!(query.contains("count=25"));
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        assert!(matches!(
            ScopusClient::new("  "),
            Err(AppError::ConfigError(_))
        ));
    }
}
