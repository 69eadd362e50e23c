use clap::Parser;
use std::path::PathBuf;

/// Server configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug, Clone)]
#[command(name = "grantdesk-server")]
#[command(author, version, about = "REST API and web portal for GrantDesk")]
pub struct ServerConfig {
    /// MySQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Server port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Allowed CORS origins, comma separated, or "*"
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Requests per second per client IP (0 disables rate limiting)
    #[arg(long, env = "RATE_LIMIT_RPS", default_value = "10")]
    pub rate_limit_rps: u32,

    /// Burst size for the rate limiter
    #[arg(long, env = "RATE_LIMIT_BURST", default_value = "30")]
    pub rate_limit_burst: u32,

    /// Session lifetime in hours
    #[arg(long, env = "SESSION_TTL_HOURS", default_value = "12")]
    pub session_ttl_hours: i64,

    /// Mark the session cookie `Secure` (enable behind HTTPS)
    #[arg(long, env = "COOKIE_SECURE")]
    pub cookie_secure: bool,

    /// Elsevier API key for Scopus imports
    #[arg(long, env = "SCOPUS_API_KEY")]
    pub scopus_api_key: Option<String>,

    /// SerpApi key for Google Scholar imports
    #[arg(long, env = "SCHOLAR_API_KEY")]
    pub scholar_api_key: Option<String>,

    /// DOCX template used for publication summaries
    #[arg(long, env = "SUMMARY_TEMPLATE")]
    pub summary_template: Option<PathBuf>,

    /// LibreOffice binary used for PDF conversion
    #[arg(long, env = "SOFFICE_BIN", default_value = "soffice")]
    pub soffice_bin: String,

    /// Timeout for one PDF conversion, in seconds
    #[arg(long, env = "SUMMARY_TIMEOUT_SECS", default_value = "60")]
    pub summary_timeout_secs: u64,

    /// Apply schema migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS")]
    pub run_migrations: bool,
}
