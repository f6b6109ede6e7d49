//! Document Text Extractor: turns an uploaded file into either plain text or an
//! inline binary payload the extraction service can read directly.
//!
//! PDF parsing and DOCX unpacking are CPU-bound and run inside `spawn_blocking`.
//! OCR is delegated to an `OcrEngine` so tests never need a tesseract binary.

pub mod docx;
pub mod ocr;
pub mod pdf;

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::documents::ocr::{sanitize_ocr_text, OcrEngine};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";

const IMAGE_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/webp",
    "image/gif",
    "image/bmp",
    "image/tiff",
];

/// ExtractionFailure: the file could not be turned into usable content.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Could not read {kind} file: {reason}")]
    Corrupt { kind: DocumentKind, reason: String },

    #[error("No readable text found in {0} file")]
    Empty(DocumentKind),

    #[error("OCR failed: {0}")]
    Ocr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Word,
    LegacyWord,
    PlainText,
    Image,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Word => "DOCX",
            DocumentKind::LegacyWord => "DOC",
            DocumentKind::PlainText => "text",
            DocumentKind::Image => "image",
        };
        f.write_str(label)
    }
}

impl DocumentKind {
    /// Classifies a file by its declared media type, falling back to the file
    /// extension when the browser sent a generic type.
    pub fn detect(mime_type: &str, file_name: &str) -> Option<Self> {
        let mime = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            MIME_PDF => return Some(DocumentKind::Pdf),
            MIME_DOCX => return Some(DocumentKind::Word),
            MIME_DOC => return Some(DocumentKind::LegacyWord),
            MIME_TEXT => return Some(DocumentKind::PlainText),
            m if IMAGE_MIME_TYPES.contains(&m) => return Some(DocumentKind::Image),
            "" | "application/octet-stream" => {}
            _ => return None,
        }

        let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Word),
            "doc" => Some(DocumentKind::LegacyWord),
            "txt" => Some(DocumentKind::PlainText),
            "png" | "jpg" | "jpeg" | "webp" | "gif" | "bmp" | "tif" | "tiff" => {
                Some(DocumentKind::Image)
            }
            _ => None,
        }
    }

    /// Canonical media type sent upstream for this kind.
    pub fn canonical_mime(&self, declared: &str) -> String {
        match self {
            DocumentKind::Pdf => MIME_PDF.to_string(),
            DocumentKind::Word => MIME_DOCX.to_string(),
            DocumentKind::LegacyWord => MIME_DOC.to_string(),
            DocumentKind::PlainText => MIME_TEXT.to_string(),
            DocumentKind::Image => {
                let declared = declared.trim().to_ascii_lowercase();
                if declared.starts_with("image/") {
                    declared
                } else {
                    "image/png".to_string()
                }
            }
        }
    }
}

/// A file as received from the browser.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// What the session view exposes about an uploaded file.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileSummary {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::detect(&self.mime_type, &self.file_name)
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.bytes.len(),
        }
    }
}

/// Extracted content, ready for a generation request.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    Text(String),
    Inline { mime_type: String, data: Bytes },
}

/// How PDFs are handed to the extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfStrategy {
    /// Forward the PDF bytes untouched; the service reads the document itself.
    Inline,
    /// Extract text locally; fall back to inline when the PDF has no text layer.
    PreferText,
}

pub struct DocumentExtractor {
    ocr: Arc<dyn OcrEngine>,
}

impl DocumentExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    /// Produces non-empty content for `file`, or a `DocumentError`. Never returns
    /// an empty success.
    pub async fn extract(
        &self,
        file: &UploadedFile,
        pdf_strategy: PdfStrategy,
    ) -> Result<DocumentContent, DocumentError> {
        let kind = file
            .kind()
            .ok_or_else(|| DocumentError::Unsupported(file.mime_type.clone()))?;

        if file.bytes.is_empty() {
            return Err(DocumentError::Empty(kind));
        }

        debug!(
            "Extracting {} document '{}' ({} bytes)",
            kind,
            file.file_name,
            file.bytes.len()
        );

        match kind {
            DocumentKind::Pdf => {
                if !pdf::looks_like_pdf(&file.bytes) {
                    return Err(DocumentError::Corrupt {
                        kind,
                        reason: "missing %PDF header".to_string(),
                    });
                }
                match pdf_strategy {
                    PdfStrategy::Inline => Ok(DocumentContent::Inline {
                        mime_type: MIME_PDF.to_string(),
                        data: file.bytes.clone(),
                    }),
                    PdfStrategy::PreferText => match pdf::extract_pdf_text(file.bytes.clone()).await {
                        Ok(text) => Ok(DocumentContent::Text(text)),
                        Err(DocumentError::Empty(_)) => {
                            debug!("PDF has no text layer, forwarding inline");
                            Ok(DocumentContent::Inline {
                                mime_type: MIME_PDF.to_string(),
                                data: file.bytes.clone(),
                            })
                        }
                        Err(e) => Err(e),
                    },
                }
            }
            DocumentKind::Word | DocumentKind::LegacyWord => {
                let bytes = file.bytes.clone();
                let text = tokio::task::spawn_blocking(move || docx::extract_docx_text(&bytes, kind))
                    .await
                    .map_err(|e| DocumentError::Corrupt {
                        kind,
                        reason: e.to_string(),
                    })??;
                non_empty(text, kind)
            }
            DocumentKind::PlainText => {
                let bytes = file
                    .bytes
                    .strip_prefix(b"\xEF\xBB\xBF")
                    .unwrap_or(&file.bytes[..]);
                let text = std::str::from_utf8(bytes).map_err(|e| DocumentError::Corrupt {
                    kind,
                    reason: format!("not valid UTF-8: {e}"),
                })?;
                non_empty(text.to_string(), kind)
            }
            DocumentKind::Image => {
                let raw = self.ocr.recognize(&file.bytes).await?;
                non_empty(sanitize_ocr_text(&raw), kind)
            }
        }
    }
}

fn non_empty(text: String, kind: DocumentKind) -> Result<DocumentContent, DocumentError> {
    if text.trim().is_empty() {
        Err(DocumentError::Empty(kind))
    } else {
        Ok(DocumentContent::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::ocr::testing::FixedOcr;

    fn extractor(ocr_text: &str) -> DocumentExtractor {
        DocumentExtractor::new(Arc::new(FixedOcr::new(ocr_text)))
    }

    #[test]
    fn test_detect_by_mime_type() {
        assert_eq!(DocumentKind::detect("application/pdf", "x"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::detect(MIME_DOCX, "x"), Some(DocumentKind::Word));
        assert_eq!(DocumentKind::detect("text/plain; charset=utf-8", "x"), Some(DocumentKind::PlainText));
        assert_eq!(DocumentKind::detect("image/jpeg", "x"), Some(DocumentKind::Image));
    }

    #[test]
    fn test_detect_falls_back_to_extension_for_octet_stream() {
        assert_eq!(
            DocumentKind::detect("application/octet-stream", "resume.DOCX"),
            Some(DocumentKind::Word)
        );
        assert_eq!(DocumentKind::detect("", "scan.jpeg"), Some(DocumentKind::Image));
    }

    #[test]
    fn test_detect_rejects_unknown_types() {
        assert_eq!(DocumentKind::detect("application/zip", "resume.pdf"), None);
        assert_eq!(DocumentKind::detect("application/octet-stream", "resume.exe"), None);
    }

    #[tokio::test]
    async fn test_plain_text_is_read_verbatim() {
        let file = UploadedFile::new("r.txt", MIME_TEXT, Bytes::from_static(b"Jane Doe\nRN, BLS"));
        let content = extractor("").extract(&file, PdfStrategy::Inline).await.unwrap();
        assert_eq!(content, DocumentContent::Text("Jane Doe\nRN, BLS".to_string()));
    }

    #[tokio::test]
    async fn test_plain_text_strips_bom() {
        let file = UploadedFile::new("r.txt", MIME_TEXT, Bytes::from_static(b"\xEF\xBB\xBFhello"));
        let content = extractor("").extract(&file, PdfStrategy::Inline).await.unwrap();
        assert_eq!(content, DocumentContent::Text("hello".to_string()));
    }

    #[tokio::test]
    async fn test_whitespace_only_text_is_an_extraction_failure() {
        let file = UploadedFile::new("r.txt", MIME_TEXT, Bytes::from_static(b"  \n\t "));
        let err = extractor("").extract(&file, PdfStrategy::Inline).await.unwrap_err();
        assert!(matches!(err, DocumentError::Empty(DocumentKind::PlainText)));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_an_extraction_failure() {
        let file = UploadedFile::new("r.txt", MIME_TEXT, Bytes::from_static(&[0xff, 0xfe, 0x41]));
        let err = extractor("").extract(&file, PdfStrategy::Inline).await.unwrap_err();
        assert!(matches!(err, DocumentError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_empty_file_is_an_extraction_failure() {
        let file = UploadedFile::new("r.pdf", MIME_PDF, Bytes::new());
        let err = extractor("").extract(&file, PdfStrategy::Inline).await.unwrap_err();
        assert!(matches!(err, DocumentError::Empty(DocumentKind::Pdf)));
    }

    #[tokio::test]
    async fn test_pdf_is_forwarded_inline_unmodified() {
        let bytes = Bytes::from_static(b"%PDF-1.4 fake body");
        let file = UploadedFile::new("r.pdf", MIME_PDF, bytes.clone());
        let content = extractor("").extract(&file, PdfStrategy::Inline).await.unwrap();
        assert_eq!(
            content,
            DocumentContent::Inline {
                mime_type: MIME_PDF.to_string(),
                data: bytes
            }
        );
    }

    #[tokio::test]
    async fn test_pdf_without_header_is_corrupt() {
        let file = UploadedFile::new("r.pdf", MIME_PDF, Bytes::from_static(b"not a pdf"));
        let err = extractor("").extract(&file, PdfStrategy::Inline).await.unwrap_err();
        assert!(matches!(err, DocumentError::Corrupt { kind: DocumentKind::Pdf, .. }));
    }

    #[tokio::test]
    async fn test_image_goes_through_ocr_and_is_sanitized() {
        let file = UploadedFile::new("c.png", "image/png", Bytes::from_static(b"\x89PNG"));
        let content = extractor("  BLS   Provider\n\n Card ✓ 2024 ")
            .extract(&file, PdfStrategy::Inline)
            .await
            .unwrap();
        assert_eq!(content, DocumentContent::Text("BLS Provider Card 2024".to_string()));
    }

    #[tokio::test]
    async fn test_image_with_no_recognized_text_fails() {
        let file = UploadedFile::new("c.png", "image/png", Bytes::from_static(b"\x89PNG"));
        let err = extractor(" \n ").extract(&file, PdfStrategy::Inline).await.unwrap_err();
        assert!(matches!(err, DocumentError::Empty(DocumentKind::Image)));
    }

    #[tokio::test]
    async fn test_docx_text_is_extracted() {
        let bytes = docx::testing::docx_with_paragraphs(&["Jane Doe", "Registered Nurse"]);
        let file = UploadedFile::new("r.docx", MIME_DOCX, Bytes::from(bytes));
        let content = extractor("").extract(&file, PdfStrategy::Inline).await.unwrap();
        assert_eq!(content, DocumentContent::Text("Jane Doe\nRegistered Nurse".to_string()));
    }
}
