//! GrantDesk Client - HTTP clients for bibliographic APIs
//!
//! This crate provides the publication sources used by imports:
//!
//! - [`scopus`] - Elsevier Scopus Search API
//! - [`scholar`] - Google Scholar author profiles through SerpApi
//!
//! # Overview
//!
//! Both clients implement [`grantdesk_core::PublicationFetcher`]. The
//! [`FetcherFactory`] picks one at runtime from a [`PublicationSource`]
//! and the configured API keys.
//!
//! [`PublicationSource`]: grantdesk_core::PublicationSource

mod retry;

pub mod fetcher;
pub mod scholar;
pub mod scopus;

pub use fetcher::{FetcherFactory, PublicationFetcherEnum};
pub use scholar::ScholarClient;
pub use scopus::ScopusClient;
