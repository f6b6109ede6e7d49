use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::documents::{DocumentError, DocumentKind};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const DOCUMENT_PART: &str = "word/document.xml";

/// Pulls the text runs out of a Word document, discarding all formatting.
///
/// Paragraphs end with a newline, `<w:tab/>` becomes a tab and `<w:br/>` a
/// newline. Legacy binary `.doc` files are not OOXML containers and are
/// rejected; a `.doc` that is really a renamed `.docx` is read normally.
pub fn extract_docx_text(bytes: &[u8], kind: DocumentKind) -> Result<String, DocumentError> {
    if !bytes.starts_with(ZIP_MAGIC) {
        return Err(match kind {
            DocumentKind::LegacyWord => DocumentError::Unsupported(
                "legacy binary .doc files are not supported; please save as .docx or PDF".to_string(),
            ),
            _ => corrupt(kind, "not a zip container".to_string()),
        });
    }

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| corrupt(kind, e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| corrupt(kind, format!("{DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| corrupt(kind, e.to_string()))?;

    collect_text_runs(&xml).map_err(|e| corrupt(kind, e.to_string()))
}

fn collect_text_runs(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n"))
}

fn corrupt(kind: DocumentKind, reason: String) -> DocumentError {
    DocumentError::Corrupt { kind, reason }
}
