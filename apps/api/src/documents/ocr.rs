use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::documents::DocumentError;

/// OCR engine seam. The service only needs "image bytes in, text out".
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, DocumentError>;
}

/// Runs the tesseract CLI, piping the image through stdin and reading text from stdout.
pub struct TesseractOcr {
    binary: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, DocumentError> {
        debug!("Running OCR on {} byte image", image.len());

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DocumentError::Ocr(format!("failed to start {}: {e}", self.binary)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| DocumentError::Ocr("stdin not captured".to_string()))?;
        let input = image.to_vec();
        // Feed stdin concurrently so a large stdout can't deadlock the pipe.
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| DocumentError::Ocr(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| DocumentError::Ocr(e.to_string()))?;

        writer
            .await
            .map_err(|e| DocumentError::Ocr(e.to_string()))?
            .map_err(|e| DocumentError::Ocr(format!("failed to write image: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocumentError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Drops non-ASCII characters, collapses whitespace runs to single spaces and trims.
pub fn sanitize_ocr_text(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
