//! Fetcher factory and enum dispatch.
//!
//! [`PublicationFetcher`] returns `impl Future` (RPITIT) and is not object
//! safe, so runtime selection goes through [`PublicationFetcherEnum`].

use grantdesk_core::{AppError, PublicationFetcher, PublicationSource, RemotePublication};

use crate::scholar::ScholarClient;
use crate::scopus::ScopusClient;

/// Unified fetcher over the supported sources.
#[derive(Clone)]
pub enum PublicationFetcherEnum {
    Scopus(ScopusClient),
    Scholar(ScholarClient),
}

impl PublicationFetcher for PublicationFetcherEnum {
    fn source(&self) -> PublicationSource {
        match self {
            Self::Scopus(c) => c.source(),
            Self::Scholar(c) => c.source(),
        }
    }

    async fn fetch_by_author(&self, author_id: &str) -> Result<Vec<RemotePublication>, AppError> {
        match self {
            Self::Scopus(c) => c.fetch_by_author(author_id).await,
            Self::Scholar(c) => c.fetch_by_author(author_id).await,
        }
    }
}

/// Builds fetchers from the configured API keys.
#[derive(Debug, Clone, Default)]
pub struct FetcherFactory {
    scopus_api_key: Option<String>,
    scholar_api_key: Option<String>,
}

impl FetcherFactory {
    pub fn new(scopus_api_key: Option<String>, scholar_api_key: Option<String>) -> Self {
        let keep = |key: Option<String>| key.filter(|k| !k.trim().is_empty());
        Self {
            scopus_api_key: keep(scopus_api_key),
            scholar_api_key: keep(scholar_api_key),
        }
    }

    /// Whether a key is configured for `source`.
    pub fn is_configured(&self, source: PublicationSource) -> bool {
        match source {
            PublicationSource::Scopus => self.scopus_api_key.is_some(),
            PublicationSource::Scholar => self.scholar_api_key.is_some(),
            PublicationSource::Manual => false,
        }
    }

    pub fn for_source(&self, source: PublicationSource) -> Result<PublicationFetcherEnum, AppError> {
        match source {
            PublicationSource::Scopus => {
                let key = self.scopus_api_key.as_deref().ok_or_else(|| {
                    AppError::ConfigError("SCOPUS_API_KEY is not set".to_string())
                })?;
                Ok(PublicationFetcherEnum::Scopus(ScopusClient::new(key)?))
            }
            PublicationSource::Scholar => {
                let key = self.scholar_api_key.as_deref().ok_or_else(|| {
                    AppError::ConfigError("SCHOLAR_API_KEY is not set".to_string())
                })?;
                Ok(PublicationFetcherEnum::Scholar(ScholarClient::new(key)?))
            }
            PublicationSource::Manual => Err(AppError::Validation(
                "manual publications cannot be imported".to_string(),
            )),
        }
    }
}
