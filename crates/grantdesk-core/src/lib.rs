//! GrantDesk Core - Domain types, business rules and services.
//!
//! This crate provides the core functionality for GrantDesk, including:
//!
//! - **Domain models**: [`User`], [`BudgetYear`], [`FundRequest`], [`Publication`], etc.
//! - **Business rules**: fund aggregation and allocation checks ([`funds`]),
//!   the request state machine ([`workflow`]), import delta detection ([`delta`])
//! - **Services**: [`ImportService`] for publication imports, [`SummaryService`]
//!   for PDF summaries
//! - **Traits**: [`PublicationFetcher`], [`PublicationStore`], [`DocumentConverter`]
//!   for dependency injection
//! - **Progress reporting**: [`ImportReporter`] trait for decoupled logging
//!
//! # Architecture
//!
//! Frontends (REST server, CLI) own I/O; this crate only sees it through
//! traits:
//!
//! - [`PublicationFetcher`] - Scopus / Google Scholar clients (`grantdesk-client`)
//! - [`PublicationStore`] - MySQL repository (`grantdesk-db`)
//! - [`DocumentConverter`] - headless LibreOffice ([`LibreOfficeConverter`])
//!
//! # Example
//!
//! ```ignore
//! use grantdesk_core::{ImportService, TracingReporter};
//!
//! let service = ImportService::new(publication_repo, scopus_client);
//! let stats = service
//!     .import_for_user_with_progress(user.id, "57190000000", &TracingReporter)
//!     .await?;
//! ```

pub mod auth;
pub mod config;
pub mod convert;
pub mod dashboard;
pub mod delta;
pub mod docx;
pub mod error;
pub mod funds;
pub mod import;
pub mod models;
pub mod progress;
pub mod summary;
pub mod traits;
pub mod workflow;

// Configuration
pub use config::{
    DbConfig, FileConfig, HttpConfig, ImportConfig, SummaryConfig, default_config_path,
    load_file_config,
};

// Error handling
pub use error::AppError;

// Domain models
pub use models::{
    Announcement, AnnouncementKind, AnnouncementStatus, BudgetLine, BudgetScope, BudgetYear,
    Department, FundCategory, FundRequest, FundRequestDraft, FundSubcategory, ImportRun,
    NewAnnouncement, NewBudgetLine, NewBudgetYear, NewFundCategory, NewFundRequest,
    NewFundSubcategory, NewImportRun, NewPublication, NewReview, NewUser, Publication,
    PublicationSource, RecordStatus, RemotePublication, RequestStatus, Review, ReviewDecision,
    ReviewStage, Role, SubcategoryUsage, User, UserUpdate,
};

// Business rules
pub use dashboard::{DashboardRow, RequestSummary, summarize_requests};
pub use delta::{
    BatchImportSummary, ImportDecision, ImportOutcome, ImportStats, UserImportResult,
    needs_update,
};
pub use funds::{
    FundCategoryView, FundLevelView, FundSubcategoryView, build_fund_tree, check_allocation,
    filter_for_role, find_subcategory,
};
pub use workflow::{Actor, RequestAction, authorize, next_status};

// Progress reporting
pub use progress::{ImportEvent, ImportReporter, SilentReporter, TracingReporter};

// Traits for dependency injection
pub use traits::{DocumentConverter, PublicationFetcher, PublicationStore};

// Services
pub use convert::LibreOfficeConverter;
pub use docx::patch_docx;
pub use import::{ImportService, ImportTarget};
pub use summary::{SummaryRequest, SummaryService};
