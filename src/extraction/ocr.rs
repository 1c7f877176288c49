//! OCR collaborator and the `tesseract` CLI implementation.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::error::OcrError;
use crate::constants::{OCR_PAGE_SEG_MODE, OCR_TIMEOUT_SECS};

#[async_trait]
/// Turns one slide image into text. Fallible and possibly slow.
pub trait OcrEngine: Send + Sync {
    /// Recognizes text in an encoded image (PNG, JPEG, ...).
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Shells out to `tesseract <image> stdout --psm 6`.
///
/// The image is written to a temporary file that is removed when the call returns,
/// whether recognition succeeded, failed or timed out.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    program: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(OCR_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns `true` if the binary can be spawned at all.
    pub async fn is_available(&self) -> bool {
        run_tool(&self.program, vec!["--version".into()], self.timeout)
            .await
            .is_ok()
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let file = tempfile::Builder::new()
            .prefix("pitchrank-ocr-")
            .suffix(".png")
            .tempfile()?;
        tokio::fs::write(file.path(), image).await?;

        let args = vec![
            file.path().as_os_str().to_owned(),
            "stdout".into(),
            "--psm".into(),
            OCR_PAGE_SEG_MODE.into(),
        ];
        let stdout = run_tool(&self.program, args, self.timeout).await?;

        let text = String::from_utf8_lossy(&stdout).trim().to_string();
        debug!(chars = text.len(), "tesseract finished");
        Ok(text)
    }
}

/// Runs an external tool to completion and returns its stdout.
///
/// The child is killed if the timeout elapses (`kill_on_drop`).
pub(super) async fn run_tool(
    program: &str,
    args: Vec<OsString>,
    timeout: Duration,
) -> Result<Vec<u8>, OcrError> {
    let mut cmd = Command::new(program);
    cmd.args(&args)
        .kill_on_drop(true)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let child = cmd.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => OcrError::Unavailable {
            tool: program.to_string(),
            reason: e.to_string(),
        },
        _ => OcrError::Io(e),
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(res) => res?,
        Err(_) => {
            return Err(OcrError::Timeout {
                tool: program.to_string(),
                elapsed: timeout,
            });
        }
    };

    if !output.status.success() {
        return Err(OcrError::ToolFailed {
            tool: program.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}
