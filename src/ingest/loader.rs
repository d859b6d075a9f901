use std::any::Any;
use std::fs;
use std::panic;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::errors::AppError;
use crate::models::Document;

/// File types the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" | "md" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }
}

/// Reads every supported file under `data_dir`, recursively and in path
/// order. A missing directory is created and yields no documents. Files
/// that fail to read are logged and skipped, as are files with no text.
pub fn load_documents(data_dir: &Path) -> Result<Vec<Document>, AppError> {
    if !data_dir.exists() {
        fs::create_dir_all(data_dir).map_err(|e| unreadable(data_dir, e))?;
        warn!(
            "Created missing directory {}. Place the syllabus PDFs there.",
            data_dir.display()
        );
        return Ok(Vec::new());
    }

    info!("Scanning directory {}", data_dir.display());
    let mut files = Vec::new();
    collect_files(data_dir, &mut files)?;
    files.sort();

    let mut documents = Vec::new();
    for path in files {
        let Some(kind) = DocumentKind::from_path(&path) else {
            continue;
        };
        match read_text(&path, kind) {
            Ok(text) if text.trim().is_empty() => {
                debug!("Skipping {}: no extractable text", path.display());
            }
            Ok(text) => {
                info!("Read {}", path.display());
                documents.push(Document {
                    content: text,
                    source: path.display().to_string(),
                });
            }
            Err(e) => error!("{e}"),
        }
    }
    Ok(documents)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), AppError> {
    for entry in fs::read_dir(dir).map_err(|e| unreadable(dir, e))? {
        let path = entry.map_err(|e| unreadable(dir, e))?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn read_text(path: &Path, kind: DocumentKind) -> Result<String, AppError> {
    match kind {
        DocumentKind::Pdf => extract_pdf_text(path),
        DocumentKind::PlainText => fs::read_to_string(path).map_err(|e| unreadable(path, e)),
    }
}

/// pdf-extract panics on some fonts and encodings instead of returning an
/// error, so a panic is treated like any other unreadable file.
fn extract_pdf_text(path: &Path) -> Result<String, AppError> {
    match panic::catch_unwind(|| pdf_extract::extract_text(path)) {
        Ok(result) => result.map_err(|e| unreadable(path, e)),
        Err(payload) => Err(unreadable(path, panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("PDF parser panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("PDF parser panicked: {msg}")
    } else {
        "PDF parser panicked".to_string()
    }
}

fn unreadable(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::DocumentUnreadable {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
