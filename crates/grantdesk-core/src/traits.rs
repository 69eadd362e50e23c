//! Trait definitions for external dependencies.
//!
//! Services in this crate are generic over these traits so they can be
//! driven by the MySQL repositories and HTTP clients in production and by
//! in-memory mocks in tests.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use crate::{AppError, NewImportRun, NewPublication, PublicationSource, RemotePublication};

/// Remote bibliographic source that lists an author's publications.
pub trait PublicationFetcher: Send + Sync + Clone {
    /// Which source this fetcher reads from.
    fn source(&self) -> PublicationSource;

    /// Fetches every publication attributed to `author_id` on the source.
    ///
    /// Implementations follow pagination until the source is exhausted.
    fn fetch_by_author(
        &self,
        author_id: &str,
    ) -> impl Future<Output = Result<Vec<RemotePublication>, AppError>> + Send;
}

/// Persistence for imported publications.
pub trait PublicationStore: Send + Sync + Clone {
    /// Content hashes of a user's publications from one source, keyed by
    /// external id.
    fn get_hashes(
        &self,
        user_id: i64,
        source: PublicationSource,
    ) -> impl Future<Output = Result<HashMap<String, String>, AppError>> + Send;

    /// Inserts or updates a publication on `(user_id, source, external_id)`.
    fn upsert(
        &self,
        publication: &NewPublication,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Records the outcome of one import.
    fn record_import_run(
        &self,
        run: &NewImportRun,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;
}

/// Converts office documents to PDF.
pub trait DocumentConverter: Send + Sync + Clone {
    /// Converts `docx_path` and writes the PDF into `out_dir`.
    ///
    /// Returns the path of the produced PDF.
    fn convert_to_pdf(
        &self,
        docx_path: &Path,
        out_dir: &Path,
    ) -> impl Future<Output = Result<PathBuf, AppError>> + Send;
}
