use std::time::Duration;

use sqlx::MySqlPool;

use grantdesk_client::FetcherFactory;
use grantdesk_core::{ImportConfig, LibreOfficeConverter, SummaryService};
use grantdesk_db::{
    AnnouncementRepository, FundRepository, PublicationRepository, RequestRepository,
    SessionRepository, UserRepository, YearRepository,
};

use crate::config::ServerConfig;

/// Shared application state for all handlers.
///
/// Every field is cheap to clone: repositories share the pool internally.
#[derive(Clone)]
pub struct AppState {
    pub pool: MySqlPool,
    pub users: UserRepository,
    pub sessions: SessionRepository,
    pub years: YearRepository,
    pub funds: FundRepository,
    pub requests: RequestRepository,
    pub announcements: AnnouncementRepository,
    pub publications: PublicationRepository,

    /// Builds Scopus / Scholar clients from the configured keys.
    pub fetchers: FetcherFactory,
    pub import_config: ImportConfig,

    /// `None` when no summary template is configured.
    pub summary_service: Option<SummaryService<LibreOfficeConverter>>,

    pub session_ttl: chrono::Duration,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(pool: MySqlPool, config: &ServerConfig) -> Self {
        let summary_service = config.summary_template.as_ref().map(|template| {
            let converter = LibreOfficeConverter::new(
                config.soffice_bin.clone(),
                Duration::from_secs(config.summary_timeout_secs),
            );
            SummaryService::new(template.clone(), converter)
        });

        Self {
            users: UserRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool.clone()),
            years: YearRepository::new(pool.clone()),
            funds: FundRepository::new(pool.clone()),
            requests: RequestRepository::new(pool.clone()),
            announcements: AnnouncementRepository::new(pool.clone()),
            publications: PublicationRepository::new(pool.clone()),
            pool,
            fetchers: FetcherFactory::new(
                config.scopus_api_key.clone(),
                config.scholar_api_key.clone(),
            ),
            import_config: ImportConfig::default(),
            summary_service,
            session_ttl: chrono::Duration::hours(config.session_ttl_hours.max(1)),
            cookie_secure: config.cookie_secure,
        }
    }
}
