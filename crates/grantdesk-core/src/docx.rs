//! DOCX template filling.
//!
//! A DOCX file is a zip archive; the visible text lives in
//! `word/document.xml` plus one XML part per header and footer. Fields are
//! written as `{{key}}` in the template. Word frequently splits such a field
//! over several runs (`{{full_</w:t></w:r><w:r><w:t>name}}`), so markup
//! between the braces is ignored when reading the key and dropped when the
//! field is replaced.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::AppError;

/// Longest key accepted between the braces, in bytes of text.
const MAX_KEY_LEN: usize = 64;

const DOCUMENT_PART: &str = "word/document.xml";

/// Replaces `{{key}}` fields in a DOCX template.
///
/// Unknown keys are left as they are. Entries other than the document,
/// header and footer parts are copied without recompression.
pub fn patch_docx(template: &[u8], fields: &HashMap<String, String>) -> Result<Vec<u8>, AppError> {
    let mut archive = ZipArchive::new(Cursor::new(template)).map_err(zip_error)?;
    if archive.by_name(DOCUMENT_PART).is_err() {
        return Err(AppError::DocumentError(format!(
            "template has no {}",
            DOCUMENT_PART
        )));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(template.len())));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(zip_error)?;
        let name = entry.name().to_string();

        if is_text_part(&name) {
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            let patched = replace_placeholders(&xml, fields);

            writer.start_file(name, options).map_err(zip_error)?;
            writer.write_all(patched.as_bytes())?;
        } else {
            writer.raw_copy_file(entry).map_err(zip_error)?;
        }
    }

    let cursor = writer.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}

fn is_text_part(name: &str) -> bool {
    name == DOCUMENT_PART
        || ((name.starts_with("word/header") || name.starts_with("word/footer"))
            && name.ends_with(".xml"))
}

fn zip_error(e: zip::result::ZipError) -> AppError {
    AppError::DocumentError(e.to_string())
}

/// Replaces every `{{key}}` in `xml` whose key is present in `fields`.
pub fn replace_placeholders(xml: &str, fields: &HashMap<String, String>) -> String {
    let bytes = xml.as_bytes();
    let mut out = String::with_capacity(xml.len());
    let mut copied = 0;
    let mut in_tag = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' => in_tag = true,
            b'>' => in_tag = false,
            b'{' if !in_tag => {
                if let Some((key, end)) = parse_placeholder(bytes, i) {
                    if let Some(value) = fields.get(&key) {
                        out.push_str(&xml[copied..i]);
                        out.push_str(&render_value(value));
                        copied = end;
                        i = end;
                        continue;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    out.push_str(&xml[copied..]);
    out
}

/// Parses a field starting at the `{` at `start`.
///
/// Returns the trimmed key and the byte offset just past the closing `}}`.
fn parse_placeholder(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    enum State {
        SecondOpen,
        Key,
        SecondClose,
    }

    let mut state = State::SecondOpen;
    let mut key = Vec::new();
    let mut in_tag = false;

    for (i, &b) in bytes.iter().enumerate().skip(start + 1) {
        if in_tag {
            if b == b'>' {
                in_tag = false;
            }
            continue;
        }
        if b == b'<' {
            in_tag = true;
            continue;
        }

        match state {
            State::SecondOpen if b == b'{' => state = State::Key,
            State::SecondOpen => return None,
            State::Key if b == b'}' => state = State::SecondClose,
            State::Key if b == b'{' => return None,
            State::Key => {
                key.push(b);
                if key.len() > MAX_KEY_LEN {
                    return None;
                }
            }
            State::SecondClose if b == b'}' => {
                let key = String::from_utf8(key).ok()?;
                return Some((key.trim().to_string(), i + 1));
            }
            State::SecondClose => return None,
        }
    }

    None
}

/// Escapes a value for a `w:t` element; newlines become line breaks.
fn render_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (n, line) in value.split('\n').enumerate() {
        if n > 0 {
            out.push_str("</w:t><w:br/><w:t xml:space=\"preserve\">");
        }
        for c in line.trim_end_matches('\r').chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&apos;"),
                c => out.push(c),
            }
        }
    }
    out
}
