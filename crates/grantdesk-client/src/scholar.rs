//! Google Scholar client.
//!
//! Google Scholar has no public API; author profiles are read through
//! SerpApi's `google_scholar_author` engine:
//! <https://serpapi.com/google-scholar-author-api>

use std::time::Duration;

use grantdesk_core::{AppError, HttpConfig, PublicationFetcher, PublicationSource, RemotePublication};
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::time::sleep;

use crate::retry::send_with_retry;

const DEFAULT_BASE_URL: &str = "https://serpapi.com/";

#[derive(Deserialize, Debug)]
struct AuthorResponse {
    #[serde(default)]
    articles: Vec<ScholarArticle>,
    /// SerpApi reports failures in the body with HTTP 200.
    error: Option<String>,
    serpapi_pagination: Option<Pagination>,
}

#[derive(Deserialize, Debug)]
struct Pagination {
    next: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScholarArticle {
    pub title: Option<String>,
    pub link: Option<String>,
    pub citation_id: Option<String>,
    pub authors: Option<String>,
    pub publication: Option<String>,
    pub cited_by: Option<CitedBy>,
    /// A string in practice, sometimes empty.
    pub year: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CitedBy {
    pub value: Option<i32>,
}

/// HTTP client for Google Scholar author profiles via SerpApi.
#[derive(Clone)]
pub struct ScholarClient {
    client: Client,
    base_url: Url,
    api_key: String,
    http_config: HttpConfig,
}

impl ScholarClient {
    /// Articles per page. 100 is the engine maximum.
    const PAGE_SIZE: usize = 100;

    /// Profiles larger than this are truncated.
    const MAX_ARTICLES: usize = 2000;

    const PAGE_DELAY: Duration = Duration::from_millis(500);

    pub fn new(api_key: &str) -> Result<Self, AppError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::ConfigError("SerpApi key is empty".to_string()));
        }
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::ConfigError(format!("invalid SerpApi URL '{}': {}", base_url, e)))?;

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

    fn author_url(&self, author_id: &str, start: usize) -> Result<Url, AppError> {
        let mut url = self
            .base_url
            .join("search.json")
            .map_err(|e| AppError::Generic(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("engine", "google_scholar_author")
            .append_pair("author_id", author_id)
            .append_pair("start", &start.to_string())
            .append_pair("num", &Self::PAGE_SIZE.to_string())
            .append_pair("sort", "pubdate")
            .append_pair("api_key", &self.api_key);
        Ok(url)
    }

    async fn fetch_page(&self, author_id: &str, start: usize) -> Result<AuthorResponse, AppError> {
        let url = self.author_url(author_id, start)?;
        let resp = send_with_retry(|| self.client.get(url.clone()), &self.http_config, "serpapi").await?;

        let body: AuthorResponse = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(format!("invalid SerpApi response: {}", e)))?;

        match &body.error {
            // An author without articles is not an error.
            Some(message) if message.contains("hasn't returned any results") => Ok(AuthorResponse {
                articles: Vec::new(),
                error: None,
                serpapi_pagination: None,
            }),
            Some(message) => Err(AppError::ClientError(format!("SerpApi: {}", message))),
            None => Ok(body),
        }
    }

    /// Converts a profile article into a [`RemotePublication`].
    ///
    /// Articles without a `citation_id` cannot be matched across imports and
    /// are skipped.
    pub fn into_remote(article: ScholarArticle) -> Option<RemotePublication> {
        let external_id = article.citation_id.filter(|id| !id.is_empty())?;
        Some(RemotePublication {
            external_id,
            title: article.title.unwrap_or_default(),
            authors: article.authors.unwrap_or_default(),
            venue: article.publication.filter(|v| !v.is_empty()),
            pub_year: article.year.as_deref().and_then(|y| y.trim().parse().ok()),
            doi: None,
            url: article.link,
            citation_count: article.cited_by.and_then(|c| c.value).unwrap_or(0),
        })
    }
}

impl PublicationFetcher for ScholarClient {
    fn source(&self) -> PublicationSource {
        PublicationSource::Scholar
    }

    async fn fetch_by_author(&self, author_id: &str) -> Result<Vec<RemotePublication>, AppError> {
        let mut publications = Vec::new();
        let mut start = 0;

        loop {
            let page = self.fetch_page(author_id, start).await?;
            let page_len = page.articles.len();
            let has_next = page
                .serpapi_pagination
                .as_ref()
                .is_some_and(|p| p.next.is_some());

            publications.extend(page.articles.into_iter().filter_map(Self::into_remote));

            start += page_len;
            if page_len < Self::PAGE_SIZE || !has_next || start >= Self::MAX_ARTICLES {
                break;
            }
            sleep(Self::PAGE_DELAY).await;
        }

        tracing::debug!(author_id, count = publications.len(), "Fetched Scholar publications");
        Ok(publications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_response_deserialization() {
        let json = r#"{
            "search_metadata": {"status": "Success"},
            "author": {"name": "Maria Rossi"},
            "articles": [
                {
                    "title": "Deep learning for peer review",
                    "link": "https://scholar.google.com/citations?view_op=view_citation&citation_for_view=abcDEF:u5HHmVD_uO8C",
                    "citation_id": "abcDEF:u5HHmVD_uO8C",
                    "authors": "M Rossi, L Bianchi",
                    "publication": "Scientometrics 120 (2), 2021",
                    "cited_by": {"value": 42, "link": "https://scholar.google.com/..."},
                    "year": "2021"
                },
                {
                    "title": "Working paper",
                    "citation_id": "abcDEF:zzz",
                    "authors": "M Rossi",
                    "publication": "",
                    "cited_by": {"value": null},
                    "year": ""
                },
                {
                    "title": "Merged duplicate without id"
                }
            ],
            "serpapi_pagination": {"next": "https://serpapi.com/search.json?start=100"}
        }"#;

        let response: AuthorResponse = serde_json::from_str(json).unwrap();
        assert!(response.error.is_none());
        assert_eq!(response.articles.len(), 3);

        let publications: Vec<_> = response
            .articles
            .into_iter()
            .filter_map(ScholarClient::into_remote)
            .collect();
        assert_eq!(publications.len(), 2);

        assert_eq!(publications[0].external_id, "abcDEF:u5HHmVD_uO8C");
        assert_eq!(publications[0].citation_count, 42);
        assert_eq!(publications[0].pub_year, Some(2021));

        assert_eq!(publications[1].venue, None);
        assert_eq!(publications[1].pub_year, None);
        assert_eq!(publications[1].citation_count, 0);
    }

    #[test]
    fn test_error_body_deserialization() {
        let json = r#"{"error": "Invalid API key. Your API key should be here: https://serpapi.com/manage-api-key"}"#;
        let response: AuthorResponse = serde_json::from_str(json).unwrap();
        assert!(response.articles.is_empty());
        assert!(response.error.unwrap().starts_with("Invalid API key"));
    }

    #[test]
    fn test_author_url() {
        let client = ScholarClient::new("secret").unwrap();
        let url = client.author_url("abcDEF", 100).unwrap();
        assert_eq!(url.path(), "/search.json");
        let query = url.query().unwrap();
        assert!(query.contains("engine=google_scholar_author"));
        assert!(query.contains("author_id=abcDEF"));
        assert!(query.contains("start=100"));
        assert!(query.contains("api_key=secret"));
    }
}
