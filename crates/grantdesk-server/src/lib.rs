//! GrantDesk Server - REST API and pages for the GrantDesk fund portal
//!
//! This crate serves two surfaces over the same state:
//!
//! - **REST API** under `/api/v1`: years, funds, fund requests and their
//!   review, announcements, publications and dashboards
//! - **Pages**: login form, role dashboards and the administration pages,
//!   rendered with askama templates
//!
//! Both authenticate with the same session cookie.
//!
//! # API Documentation
//!
//! When running the server, interactive API documentation is available
//! at `/swagger-ui`.

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod pages;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use router::create_router;
pub use state::AppState;
