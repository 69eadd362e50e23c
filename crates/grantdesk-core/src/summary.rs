//! Publication summary documents.
//!
//! [`SummaryService`] fills the DOCX template with a user's publications for
//! one year and converts the result to PDF.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::docx::patch_docx;
use crate::error::AppError;
use crate::models::{Publication, User};
use crate::traits::DocumentConverter;

/// Who and what a summary is about.
#[derive(Debug, Clone, Copy)]
pub struct SummaryRequest<'a> {
    pub user: &'a User,
    pub department: Option<&'a str>,
    pub year: i32,
    pub publications: &'a [Publication],
}

/// Builds the template fields for a summary.
pub fn build_fields(request: &SummaryRequest<'_>, now: DateTime<Utc>) -> HashMap<String, String> {
    let total_citations: i64 = request
        .publications
        .iter()
        .map(|p| i64::from(p.citation_count))
        .sum();

    let publications = if request.publications.is_empty() {
        "No publications recorded for this year.".to_string()
    } else {
        request
            .publications
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}. {}", i + 1, format_publication(p)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    HashMap::from([
        ("full_name".to_string(), request.user.full_name.clone()),
        (
            "department".to_string(),
            request.department.unwrap_or("-").to_string(),
        ),
        ("year".to_string(), request.year.to_string()),
        (
            "publication_count".to_string(),
            request.publications.len().to_string(),
        ),
        ("publications".to_string(), publications),
        ("total_citations".to_string(), total_citations.to_string()),
        (
            "generated_at".to_string(),
            now.format("%Y-%m-%d %H:%M UTC").to_string(),
        ),
    ])
}

/// One reference line: `Authors (Year). Title. Venue. DOI. Cited by N.`
pub fn format_publication(p: &Publication) -> String {
    let mut line = p.authors.trim().to_string();
    if let Some(year) = p.pub_year {
        line.push_str(&format!(" ({})", year));
    }
    line.push_str(&format!(". {}.", p.title.trim().trim_end_matches('.')));
    if let Some(venue) = p.venue.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        line.push_str(&format!(" {}.", venue));
    }
    if let Some(doi) = p.doi.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!(" doi:{}.", doi));
    }
    line.push_str(&format!(" Cited by {}.", p.citation_count));
    line
}

/// Generates PDF summaries from a DOCX template.
#[derive(Clone)]
pub struct SummaryService<C: DocumentConverter> {
    template_path: PathBuf,
    converter: C,
}

impl<C: DocumentConverter> SummaryService<C> {
    pub fn new(template_path: impl Into<PathBuf>, converter: C) -> Self {
        Self {
            template_path: template_path.into(),
            converter,
        }
    }

    /// Renders the summary and returns the PDF bytes.
    ///
    /// The template is read on every call so it can be replaced without a
    /// restart. Intermediate files live in a temporary directory removed on
    /// return.
    pub async fn generate(&self, request: &SummaryRequest<'_>) -> Result<Vec<u8>, AppError> {
        let template = tokio::fs::read(&self.template_path).await.map_err(|e| {
            AppError::ConfigError(format!(
                "cannot read summary template '{}': {}",
                self.template_path.display(),
                e
            ))
        })?;

        let fields = build_fields(request, Utc::now());
        let docx = patch_docx(&template, &fields)?;

        let workdir = tempfile::tempdir()?;
        let docx_path = workdir
            .path()
            .join(format!("summary-{}-{}.docx", request.user.id, request.year));
        tokio::fs::write(&docx_path, &docx).await?;

        let pdf_path = self
            .converter
            .convert_to_pdf(&docx_path, workdir.path())
            .await?;
        let pdf = tokio::fs::read(&pdf_path).await?;

        tracing::info!(
            user_id = request.user.id,
            year = request.year,
            publications = request.publications.len(),
            bytes = pdf.len(),
            "Generated publication summary"
        );

        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PublicationSource, Role};
    use chrono::TimeZone;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            email: "ada@uni.edu".into(),
            password_hash: String::new(),
            full_name: "Ada Lovelace".into(),
            role: Role::Teacher,
            department_id: Some(1),
            scopus_author_id: None,
            scholar_author_id: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn publication(title: &str, citations: i32) -> Publication {
        let now = Utc::now();
        Publication {
            id: 1,
            user_id: 7,
            title: title.into(),
            authors: "Lovelace, A.; Babbage, C.".into(),
            venue: Some("Journal of Engines".into()),
            pub_year: Some(2026),
            doi: Some("10.1000/xyz".into()),
            url: None,
            citation_count: citations,
            source: PublicationSource::Scopus,
            external_id: "85000000001".into(),
            content_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_format_publication() {
        let line = format_publication(&publication("Notes on the engine.", 12));
        assert_eq!(
            line,
            "Lovelace, A.; Babbage, C. (2026). Notes on the engine. Journal of Engines. doi:10.1000/xyz. Cited by 12."
        );
    }

    #[test]
    fn test_format_publication_minimal() {
        let mut p = publication("Untitled", 0);
        p.pub_year = None;
        p.venue = None;
        p.doi = None;
        assert_eq!(
            format_publication(&p),
            "Lovelace, A.; Babbage, C.. Untitled. Cited by 0."
        );
    }

    #[test]
    fn test_build_fields() {
        let user = user();
        let pubs = vec![publication("First", 3), publication("Second", 4)];
        let request = SummaryRequest {
            user: &user,
            department: Some("Physics"),
            year: 2026,
            publications: &pubs,
        };
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let fields = build_fields(&request, now);

        assert_eq!(fields["full_name"], "Ada Lovelace");
        assert_eq!(fields["department"], "Physics");
        assert_eq!(fields["year"], "2026");
        assert_eq!(fields["publication_count"], "2");
        assert_eq!(fields["total_citations"], "7");
        assert_eq!(fields["generated_at"], "2026-10-18 09:30 UTC");
        assert!(fields["publications"].starts_with("1. "));
        assert!(fields["publications"].contains("\n2. "));
    }

    #[test]
    fn test_build_fields_without_publications() {
        let user = user();
        let request = SummaryRequest {
            user: &user,
            department: None,
            year: 2025,
            publications: &[],
        };
        let fields = build_fields(&request, Utc::now());
        assert_eq!(fields["publication_count"], "0");
        assert_eq!(fields["total_citations"], "0");
        assert_eq!(fields["department"], "-");
    }
}
