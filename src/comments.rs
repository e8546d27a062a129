use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "csv"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentBank {
    items: Vec<String>,
}

impl CommentBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<String>) -> Self {
        let mut bank = Self::new();
        bank.merge(items);
        bank
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    pub fn contains(&self, text: &str) -> bool {
        self.items.iter().any(|item| item == text)
    }

    pub fn add(&mut self, text: &str) -> Result<(), AppError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AppError::EmptyComment);
        }
        if self.contains(trimmed) {
            return Err(AppError::DuplicateComment);
        }
        self.items.push(trimmed.to_string());
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<String> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn merge<I, S>(&mut self, incoming: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen: HashSet<String> = self.items.iter().cloned().collect();
        let before = self.items.len();
        for text in incoming {
            let trimmed = text.as_ref().trim();
            if trimmed.is_empty() || seen.contains(trimmed) {
                continue;
            }
            seen.insert(trimmed.to_string());
            self.items.push(trimmed.to_string());
        }
        self.items.len() - before
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Pdf,
    PlainText,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.eq_ignore_ascii_case("application/pdf") {
            MediaKind::Pdf
        } else {
            MediaKind::PlainText
        }
    }

    pub fn detect(path: &Path, payload: &[u8]) -> Result<Self, AppError> {
        match extension_of(path).as_deref() {
            Some("pdf") => Ok(MediaKind::Pdf),
            Some("txt") | Some("csv") => Ok(MediaKind::PlainText),
            Some(_) => Err(AppError::UnsupportedFile(path.to_path_buf())),
            None => Ok(Self::from_mime(tree_magic_mini::from_u8(payload))),
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_accepted_path(path: &Path) -> bool {
    match extension_of(path) {
        Some(ext) => ACCEPTED_EXTENSIONS.contains(&ext.as_str()),
        None => true,
    }
}

pub fn ingest_file(path: &Path) -> Result<Vec<String>, AppError> {
    if !is_accepted_path(path) {
        return Err(AppError::UnsupportedFile(path.to_path_buf()));
    }
    let payload = std::fs::read(path).map_err(|source| AppError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let kind = MediaKind::detect(path, &payload)?;
    log::debug!(
        "ingest: {} ({} bytes, {:?})",
        path.display(),
        payload.len(),
        kind
    );
    ingest(&payload, kind)
}

pub fn ingest(payload: &[u8], kind: MediaKind) -> Result<Vec<String>, AppError> {
    let text = match kind {
        MediaKind::Pdf => extract_pdf_text(payload)?,
        MediaKind::PlainText => decode_text(payload),
    };
    Ok(split_comments(&text))
}

pub fn split_comments(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|ch: char| ch == '\n' || ch == ',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .filter(|piece| seen.insert(*piece))
        .map(str::to_string)
        .collect()
}

fn decode_text(payload: &[u8]) -> String {
    let payload = payload.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(payload);
    String::from_utf8_lossy(payload).into_owned()
}

// One run per Tj/TJ; runs joined by a space, pages by a newline.
pub fn extract_pdf_text(payload: &[u8]) -> Result<String, AppError> {
    let document =
        Document::load_mem(payload).map_err(|err| AppError::Extraction(err.to_string()))?;
    let mut pages = Vec::new();
    for (page_number, page_id) in document.get_pages() {
        let runs = page_runs(&document, page_id)
            .map_err(|err| AppError::Extraction(format!("page {page_number}: {err}")))?;
        pages.push(runs.join(" "));
    }
    Ok(pages.join("\n"))
}

fn page_runs(document: &Document, page_id: ObjectId) -> lopdf::Result<Vec<String>> {
    let encodings: BTreeMap<Vec<u8>, &str> = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(name, font)| (name, font.get_font_encoding()))
        .collect();
    let content = Content::decode(&document.get_page_content(page_id)?)?;

    let mut runs = Vec::new();
    let mut encoding = None;
    for operation in &content.operations {
        match operation.operator.as_str() {
            "Tf" => {
                encoding = operation
                    .operands
                    .first()
                    .and_then(|name| name.as_name().ok())
                    .and_then(|name| encodings.get(name).copied());
            }
            "Tj" | "TJ" | "'" | "\"" => {
                let mut run = String::new();
                for operand in &operation.operands {
                    collect_strings(&mut run, encoding, operand);
                }
                let run = run.trim();
                if !run.is_empty() {
                    runs.push(run.to_string());
                }
            }
            _ => {}
        }
    }
    Ok(runs)
}

fn collect_strings(run: &mut String, encoding: Option<&str>, operand: &Object) {
    match operand {
        Object::String(bytes, _) => run.push_str(&Document::decode_text(encoding, bytes)),
        Object::Array(items) => {
            for item in items {
                match item {
                    // wide negative kerning inside TJ stands in for a word gap
                    Object::Integer(gap) if *gap < -100 => run.push(' '),
                    Object::Real(gap) if *gap < -100.0 => run.push(' '),
                    _ => collect_strings(run, encoding, item),
                }
            }
        }
        _ => {}
    }
}
