//! Mock implementations of the core traits.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use grantdesk_core::traits::{DocumentConverter, PublicationFetcher, PublicationStore};
use grantdesk_core::{AppError, NewImportRun, NewPublication, PublicationSource, RemotePublication};

// =============================================================================
// MockFetcher
// =============================================================================

/// Fetcher returning a fixed list per author id.
#[derive(Clone)]
pub struct MockFetcher {
    source: PublicationSource,
    by_author: Arc<Mutex<HashMap<String, Vec<RemotePublication>>>>,
    failing_authors: Arc<Mutex<Vec<String>>>,
    pub calls: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new(source: PublicationSource) -> Self {
        Self {
            source,
            by_author: Arc::new(Mutex::new(HashMap::new())),
            failing_authors: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_author(self, author_id: &str, publications: Vec<RemotePublication>) -> Self {
        self.set_author(author_id, publications);
        self
    }

    pub fn set_author(&self, author_id: &str, publications: Vec<RemotePublication>) {
        self.by_author
            .lock()
            .unwrap()
            .insert(author_id.to_string(), publications);
    }

    pub fn failing_for(self, author_id: &str) -> Self {
        self.failing_authors
            .lock()
            .unwrap()
            .push(author_id.to_string());
        self
    }
}

impl PublicationFetcher for MockFetcher {
    fn source(&self) -> PublicationSource {
        self.source
    }

    async fn fetch_by_author(&self, author_id: &str) -> Result<Vec<RemotePublication>, AppError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self
            .failing_authors
            .lock()
            .unwrap()
            .iter()
            .any(|a| a == author_id)
        {
            return Err(AppError::NetworkError("connection reset".to_string()));
        }
        Ok(self
            .by_author
            .lock()
            .unwrap()
            .get(author_id)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn remote(external_id: &str, title: &str, citations: i32) -> RemotePublication {
    RemotePublication {
        external_id: external_id.to_string(),
        title: title.to_string(),
        authors: "Hopper, G.".to_string(),
        venue: Some("Proceedings of Testing".to_string()),
        pub_year: Some(2026),
        doi: None,
        url: None,
        citation_count: citations,
    }
}

// =============================================================================
// MockPublicationStore
// =============================================================================

type PublicationKey = (i64, PublicationSource, String);

/// In-memory store keyed like the `publications` unique index.
#[derive(Clone, Default)]
pub struct MockPublicationStore {
    pub publications: Arc<Mutex<HashMap<PublicationKey, NewPublication>>>,
    pub runs: Arc<Mutex<Vec<NewImportRun>>>,
    pub upserts: Arc<AtomicUsize>,
    failing_external_ids: Arc<Mutex<Vec<String>>>,
}

impl MockPublicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_upsert_for(self, external_id: &str) -> Self {
        self.failing_external_ids
            .lock()
            .unwrap()
            .push(external_id.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.publications.lock().unwrap().len()
    }

    pub fn get(&self, user_id: i64, source: PublicationSource, external_id: &str) -> Option<NewPublication> {
        self.publications
            .lock()
            .unwrap()
            .get(&(user_id, source, external_id.to_string()))
            .cloned()
    }
}

impl PublicationStore for MockPublicationStore {
    async fn get_hashes(
        &self,
        user_id: i64,
        source: PublicationSource,
    ) -> Result<HashMap<String, String>, AppError> {
        Ok(self
            .publications
            .lock()
            .unwrap()
            .iter()
            .filter(|((uid, src, _), _)| *uid == user_id && *src == source)
            .map(|((_, _, ext), p)| (ext.clone(), p.content_hash.clone()))
            .collect())
    }

    async fn upsert(&self, publication: &NewPublication) -> Result<(), AppError> {
        if self
            .failing_external_ids
            .lock()
            .unwrap()
            .contains(&publication.external_id)
        {
            return Err(AppError::Generic("disk full".to_string()));
        }
        self.upserts.fetch_add(1, Ordering::Relaxed);
        self.publications.lock().unwrap().insert(
            (
                publication.user_id,
                publication.source,
                publication.external_id.clone(),
            ),
            publication.clone(),
        );
        Ok(())
    }

    async fn record_import_run(&self, run: &NewImportRun) -> Result<i64, AppError> {
        let mut runs = self.runs.lock().unwrap();
        runs.push(run.clone());
        Ok(runs.len() as i64)
    }
}

// =============================================================================
// MockConverter
// =============================================================================

/// Converter that "renders" the DOCX by copying it to `<stem>.pdf`.
#[derive(Clone, Default)]
pub struct MockConverter {
    pub last_input: Arc<Mutex<Option<Vec<u8>>>>,
    fail: bool,
}

impl MockConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl DocumentConverter for MockConverter {
    async fn convert_to_pdf(&self, docx_path: &Path, out_dir: &Path) -> Result<PathBuf, AppError> {
        if self.fail {
            return Err(AppError::ConversionFailed("soffice exited with 1".to_string()));
        }
        let bytes = tokio::fs::read(docx_path).await?;
        *self.last_input.lock().unwrap() = Some(bytes);

        let stem = docx_path.file_stem().unwrap_or_default();
        let pdf = out_dir.join(stem).with_extension("pdf");
        tokio::fs::write(&pdf, b"%PDF-1.7 mock").await?;
        Ok(pdf)
    }
}
