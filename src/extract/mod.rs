// Format-specific text extraction
// Turns a source file into an ordered sequence of raw text units, one per
// logical page/section, dispatched on the file extension.


use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};

use crate::{RagError, Result};

/// A raw unit of extracted text, before splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUnit {
    pub text: String,
    /// 1-indexed page number for paginated formats
    pub page: Option<u32>,
    pub source: PathBuf,
}

/// Extract raw text units from a file, dispatching on its extension.
///
/// Plain text, CSV, log, and Markdown files produce a single unit. PDFs
/// produce one unit per non-blank page. DOCX files produce a single unit
/// with paragraphs joined by newlines; an unreadable DOCX body degrades to
/// an empty unit rather than failing the call.
#[inline]
pub fn extract(path: &Path) -> Result<Vec<RawUnit>> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    debug!("Extracting {} as '{}'", path.display(), extension);

    match extension.as_str() {
        "txt" | "csv" | "log" | "md" => extract_whole_file(path),
        "pdf" => extract_pdf(path),
        "docx" | "doc" => extract_docx(path),
        _ => Err(RagError::UnsupportedFormat(format!(
            "{} ('{}')",
            path.display(),
            extension
        ))),
    }
}

fn extract_whole_file(path: &Path) -> Result<Vec<RawUnit>> {
    let text = fs::read_to_string(path).map_err(|e| {
        RagError::Extraction(format!("Failed to read {}: {}", path.display(), e))
    })?;

    Ok(vec![RawUnit {
        text,
        page: None,
        source: path.to_path_buf(),
    }])
}

/// One unit per non-blank page, tagged with the 1-indexed page number.
fn extract_pdf(path: &Path) -> Result<Vec<RawUnit>> {
    let document = lopdf::Document::load(path).map_err(|e| {
        RagError::Extraction(format!("Failed to open PDF {}: {}", path.display(), e))
    })?;

    let mut units = Vec::new();
    for page_number in document.get_pages().keys() {
        let text = document.extract_text(&[*page_number]).map_err(|e| {
            RagError::Extraction(format!(
                "Failed to extract page {} of {}: {}",
                page_number,
                path.display(),
                e
            ))
        })?;

        if text.trim().is_empty() {
            continue;
        }

        units.push(RawUnit {
            text,
            page: Some(*page_number),
            source: path.to_path_buf(),
        });
    }

    debug!(
        "Extracted {} non-blank pages from {}",
        units.len(),
        path.display()
    );
    Ok(units)
}

/// All paragraphs joined by newlines, as a single unit. A DOCX whose body
/// cannot be parsed degrades to one empty unit instead of failing the call.
fn extract_docx(path: &Path) -> Result<Vec<RawUnit>> {
    let file = fs::File::open(path).map_err(|e| {
        RagError::Extraction(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let text = match read_docx_body(file) {
        Ok(text) => text,
        Err(e) => {
            warn!("Could not parse DOCX body of {}: {}", path.display(), e);
            String::new()
        }
    };

    Ok(vec![RawUnit {
        text,
        page: None,
        source: path.to_path_buf(),
    }])
}

/// Pull paragraph text out of word/document.xml inside the DOCX archive.
fn read_docx_body(file: fs::File) -> anyhow::Result<String> {
    let mut archive = zip::ZipArchive::new(file)?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Text(t) if in_text_run => current.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n"))
}
