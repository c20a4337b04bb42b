//! services/api/src/adapters/extraction.rs
//!
//! This module contains the adapter that decodes uploaded files.
//! It implements the `TextExtractionService` port from the `core` crate.

use async_trait::async_trait;
use base64::Engine;
use calamine::{open_workbook_auto_from_rs, Reader};
use flashcard_core::domain::{FileData, UploadedFile};
use flashcard_core::error::ExtractionError;
use flashcard_core::ports::TextExtractionService;
use std::io::Cursor;

const PLAIN_TEXT: &str = "text/plain";

/// How a file is decoded, decided from its mime type and extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Image,
    Pdf,
    Spreadsheet,
    Media,
    Text,
}

fn classify(file: &UploadedFile) -> FileKind {
    if file.mime_type.starts_with("image/") {
        return FileKind::Image;
    }
    if file.mime_type.starts_with("audio/") || file.mime_type.starts_with("video/") {
        return FileKind::Media;
    }
    match file.extension().as_deref() {
        Some("pdf") => FileKind::Pdf,
        Some("xlsx") | Some("xls") | Some("ods") => FileKind::Spreadsheet,
        _ => FileKind::Text,
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextExtractionService` for images, PDFs,
/// spreadsheets and plain text.
#[derive(Clone, Default)]
pub struct FileExtractor;

impl FileExtractor {
    pub fn new() -> Self {
        Self
    }

    fn pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractionError::Unreadable(format!("PDF: {}", e)))
    }

    /// Every sheet in workbook order, rows as tab-separated lines.
    fn spreadsheet_text(bytes: Vec<u8>) -> Result<String, ExtractionError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| ExtractionError::Unreadable(format!("spreadsheet: {}", e)))?;
        let mut text = String::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ExtractionError::Unreadable(format!("sheet '{}': {}", name, e)))?;
            for row in range.rows() {
                let cells: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
                text.push_str(&cells.join("\t"));
                text.push('\n');
            }
        }
        Ok(text)
    }
}

//=========================================================================================
// `TextExtractionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextExtractionService for FileExtractor {
    async fn extract(&self, file: &UploadedFile) -> Result<FileData, ExtractionError> {
        if file.bytes.is_empty() {
            return Err(ExtractionError::Empty);
        }

        match classify(file) {
            FileKind::Image => Ok(FileData {
                content: base64::engine::general_purpose::STANDARD.encode(&file.bytes),
                mime_type: file.mime_type.clone(),
            }),
            FileKind::Media => Err(ExtractionError::Unsupported(file.mime_type.clone())),
            FileKind::Pdf => {
                let bytes = file.bytes.clone();
                // PDF parsing is CPU bound; keep it off the async workers.
                let content = tokio::task::spawn_blocking(move || Self::pdf_text(&bytes))
                    .await
                    .map_err(|e| ExtractionError::Unreadable(format!("PDF worker failed: {}", e)))??;
                Ok(FileData {
                    content,
                    mime_type: PLAIN_TEXT.to_string(),
                })
            }
            FileKind::Spreadsheet => {
                let bytes = file.bytes.clone();
                let content = tokio::task::spawn_blocking(move || Self::spreadsheet_text(bytes))
                    .await
                    .map_err(|e| ExtractionError::Unreadable(format!("spreadsheet worker failed: {}", e)))??;
                Ok(FileData {
                    content,
                    mime_type: PLAIN_TEXT.to_string(),
                })
            }
            FileKind::Text => {
                let content = String::from_utf8(file.bytes.clone())
                    .map_err(|e| ExtractionError::Unreadable(format!("not valid UTF-8 text: {}", e)))?;
                Ok(FileData {
                    content,
                    mime_type: PLAIN_TEXT.to_string(),
                })
            }
        }
    }
}
