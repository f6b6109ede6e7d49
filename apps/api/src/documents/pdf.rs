use bytes::Bytes;

use crate::documents::{DocumentError, DocumentKind};

const PDF_MAGIC: &[u8] = b"%PDF-";
/// pdf-extract separates pages with form feeds.
const PAGE_BREAK: char = '\u{c}';

/// Cheap header check before handing bytes to the parser or the service.
/// Some generators emit a few junk bytes before the header, so look a little way in.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(1024)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

/// Extracts text page by page and joins the pages with newlines.
/// pdf-extract can panic on malformed input; `spawn_blocking` turns that into a `JoinError`.
pub async fn extract_pdf_text(bytes: Bytes) -> Result<String, DocumentError> {
    let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| corrupt(format!("parser aborted: {e}")))?
        .map_err(|e| corrupt(e.to_string()))?;

    let text = join_pages(&raw);
    if text.is_empty() {
        return Err(DocumentError::Empty(DocumentKind::Pdf));
    }
    Ok(text)
}

fn join_pages(raw: &str) -> String {
    raw.split(PAGE_BREAK)
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn corrupt(reason: String) -> DocumentError {
    DocumentError::Corrupt {
        kind: DocumentKind::Pdf,
        reason,
    }
}
