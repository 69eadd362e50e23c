use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use grantdesk_core::{PublicationSource, Role};

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "grantdesk")]
#[command(author, version, about = "Operator tools for the GrantDesk fund portal")]
#[command(after_help = "Examples:
  grantdesk migrate
  grantdesk create-user --email admin@uni.edu --name \"Research Office\" --role superadmin
  grantdesk import --all --source scopus
  grantdesk summary --user m.rossi@uni.edu --year 2025 --output rossi-2025.pdf
  grantdesk stats --year 2026")]
pub struct Config {
    /// MySQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Elsevier API key for Scopus imports
    #[arg(long, env = "SCOPUS_API_KEY")]
    pub scopus_api_key: Option<String>,

    /// SerpApi key for Google Scholar imports
    #[arg(long, env = "SCHOLAR_API_KEY")]
    pub scholar_api_key: Option<String>,

    /// Custom path to grantdesk.toml
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create or upgrade the database schema
    Migrate,

    /// Create an account
    #[command(after_help = "The password is read from GRANTDESK_PASSWORD when --password is omitted.")]
    CreateUser {
        #[arg(long)]
        email: String,
        /// Full name
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value = "teacher")]
        role: RoleArg,
        /// Department name; created when missing
        #[arg(long)]
        department: Option<String>,
        #[arg(long, env = "GRANTDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Import publications from Scopus or Google Scholar
    #[command(after_help = "Examples:
  grantdesk import --user m.rossi@uni.edu
  grantdesk import --all --source scholar")]
    Import {
        #[command(flatten)]
        target: ImportTargetArgs,
        #[arg(short, long, value_enum, default_value = "scopus")]
        source: SourceArg,
    },

    /// Render a publication summary PDF
    Summary {
        /// Email of the user
        #[arg(long)]
        user: String,
        /// Publication year
        #[arg(long)]
        year: i32,
        /// Output PDF file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Show request and publication statistics
    Stats {
        /// Budget year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },
}

/// Either one user or everyone with an author id.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ImportTargetArgs {
    /// Email of the user to import
    #[arg(long)]
    pub user: Option<String>,
    /// Import every active user with an author id for the source
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SourceArg {
    Scopus,
    Scholar,
}

impl From<SourceArg> for PublicationSource {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Scopus => PublicationSource::Scopus,
            SourceArg::Scholar => PublicationSource::Scholar,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Teacher,
    Staff,
    DeptHead,
    Admin,
    Superadmin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Teacher => Role::Teacher,
            RoleArg::Staff => Role::Staff,
            RoleArg::DeptHead => Role::DeptHead,
            RoleArg::Admin => Role::Admin,
            RoleArg::Superadmin => Role::SuperAdmin,
        }
    }
}
