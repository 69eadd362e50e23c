//! Integration tests for SummaryService.

use std::io::{Cursor, Read, Write};

use chrono::Utc;
use grantdesk_core::{
    AppError, Publication, PublicationSource, Role, SummaryRequest, SummaryService, User,
};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::integration::common::MockConverter;

const DOCUMENT: &str = "<w:document><w:body><w:p><w:r><w:t>{{full_name}}</w:t></w:r></w:p>\
<w:p><w:r><w:t>{{department}} / {{year}}</w:t></w:r></w:p>\
<w:p><w:r><w:t>{{publication_</w:t></w:r><w:r><w:t>count}} papers, {{total_citations}} citations</w:t></w:r></w:p>\
<w:p><w:r><w:t>{{publications}}</w:t></w:r></w:p></w:body></w:document>";

fn write_template(dir: &std::path::Path) -> std::path::PathBuf {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("[Content_Types].xml", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"<Types/>").unwrap();
    writer
        .start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(DOCUMENT.as_bytes()).unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let path = dir.join("summary.docx");
    std::fs::write(&path, bytes).unwrap();
    path
}

fn document_xml(docx: &[u8]) -> String {
    let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut entry = archive.by_name("word/document.xml").unwrap();
    let mut xml = String::new();
    entry.read_to_string(&mut xml).unwrap();
    xml
}

fn user() -> User {
    let now = Utc::now();
    User {
        id: 11,
        email: "grace@uni.edu".into(),
        password_hash: String::new(),
        full_name: "Grace Hopper".into(),
        role: Role::Teacher,
        department_id: Some(2),
        scopus_author_id: Some("57190000001".into()),
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
        user_id: 11,
        title: title.into(),
        authors: "Hopper, G.".into(),
        venue: None,
        pub_year: Some(2026),
        doi: None,
        url: None,
        citation_count: citations,
        source: PublicationSource::Scopus,
        external_id: title.into(),
        content_hash: String::new(),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_generate_fills_template_and_returns_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(dir.path());
    let converter = MockConverter::new();
    let service = SummaryService::new(&template, converter.clone());

    let user = user();
    let pubs = vec![publication("COBOL & you", 5), publication("Bugs", 7)];
    let request = SummaryRequest {
        user: &user,
        department: Some("Computer Science"),
        year: 2026,
        publications: &pubs,
    };

    let pdf = service.generate(&request).await.unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    let docx = converter.last_input.lock().unwrap().clone().unwrap();
    let xml = document_xml(&docx);
    assert!(xml.contains("Grace Hopper"));
    assert!(xml.contains("Computer Science / 2026"));
    assert!(xml.contains("2 papers, 12 citations"));
    assert!(xml.contains("COBOL &amp; you"));
    assert!(xml.contains("<w:br/>"));
    assert!(!xml.contains("{{"));
}

#[tokio::test]
async fn test_generate_with_no_publications() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(dir.path());
    let converter = MockConverter::new();
    let service = SummaryService::new(&template, converter.clone());

    let user = user();
    let request = SummaryRequest {
        user: &user,
        department: None,
        year: 2025,
        publications: &[],
    };

    let pdf = service.generate(&request).await.unwrap();
    assert!(!pdf.is_empty());

    let docx = converter.last_input.lock().unwrap().clone().unwrap();
    assert!(document_xml(&docx).contains("0 papers, 0 citations"));
}

#[tokio::test]
async fn test_missing_template_is_config_error() {
    let service = SummaryService::new("/nonexistent/summary.docx", MockConverter::new());
    let user = user();
    let request = SummaryRequest {
        user: &user,
        department: None,
        year: 2026,
        publications: &[],
    };

    let err = service.generate(&request).await.unwrap_err();
    assert!(matches!(err, AppError::ConfigError(_)));
}

#[tokio::test]
async fn test_converter_failure_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(dir.path());
    let service = SummaryService::new(&template, MockConverter::failing());
    let user = user();
    let request = SummaryRequest {
        user: &user,
        department: None,
        year: 2026,
        publications: &[],
    };

    let err = service.generate(&request).await.unwrap_err();
    assert!(matches!(err, AppError::ConversionFailed(_)));
}
