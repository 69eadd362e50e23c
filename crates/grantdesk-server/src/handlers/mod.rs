//! HTTP request handlers for API endpoints.

pub mod announcements;
pub mod auth;
pub mod dashboard;
pub mod funds;
pub mod health;
pub mod publications;
pub mod requests;
pub mod users;
pub mod years;
