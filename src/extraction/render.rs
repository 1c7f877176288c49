//! Slide rasterizer collaborator and the `pdftoppm` implementation.

use std::time::Duration;

use async_trait::async_trait;

use super::error::OcrError;
use super::ocr::run_tool;
use crate::constants::{OCR_TIMEOUT_SECS, RASTERIZE_DPI};

#[async_trait]
/// Renders one PDF page to an image for OCR.
pub trait SlideRasterizer: Send + Sync {
    /// `page` is one-based. Returns PNG bytes.
    async fn render_pdf_page(&self, pdf: &[u8], page: u32) -> Result<Vec<u8>, OcrError>;
}

/// Poppler's `pdftoppm`, run inside a scoped temporary directory.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: String,
    dpi: u32,
    timeout: Duration,
}

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self {
            program: "pdftoppm".to_string(),
            dpi: RASTERIZE_DPI,
            timeout: Duration::from_secs(OCR_TIMEOUT_SECS),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlideRasterizer for PdftoppmRasterizer {
    async fn render_pdf_page(&self, pdf: &[u8], page: u32) -> Result<Vec<u8>, OcrError> {
        // Dropping the directory removes the input copy and the rendered page.
        let dir = tempfile::Builder::new()
            .prefix("pitchrank-render-")
            .tempdir()?;
        let input = dir.path().join("input.pdf");
        let output_stem = dir.path().join("page");
        tokio::fs::write(&input, pdf).await?;

        let page_arg = page.to_string();
        let args = vec![
            "-f".into(),
            page_arg.clone().into(),
            "-l".into(),
            page_arg.into(),
            "-r".into(),
            self.dpi.to_string().into(),
            "-png".into(),
            "-singlefile".into(),
            input.into_os_string(),
            output_stem.as_os_str().to_owned(),
        ];
        run_tool(&self.program, args, self.timeout).await?;

        match tokio::fs::read(output_stem.with_extension("png")).await {
            Ok(png) if !png.is_empty() => Ok(png),
            Ok(_) => Err(OcrError::NoOutput {
                tool: self.program.clone(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::NoOutput {
                tool: self.program.clone(),
            }),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_rasterizer_is_unavailable() {
        let rasterizer = PdftoppmRasterizer::new().with_program("pitchrank-no-such-rasterizer");

        let err = rasterizer
            .render_pdf_page(b"%PDF-1.4", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::Unavailable { .. }));
    }

    /// Writes an executable `pdftoppm` stand-in that records its input path, then runs `body`.
    #[cfg(unix)]
    fn stub_rasterizer(dir: &std::path::Path, body: &str) -> (String, std::path::PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let record = dir.join("input-path");
        let script = dir.join("pdftoppm-stub");
        let source = format!("#!/bin/sh\necho \"$9\" > '{}'\n{}\n", record.display(), body);
        std::fs::write(&script, source).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        (script.display().to_string(), record)
    }

    #[cfg(unix)]
    fn recorded_render_dir(record: &std::path::Path) -> std::path::PathBuf {
        let input = std::path::PathBuf::from(std::fs::read_to_string(record).unwrap().trim());
        let dir = input.parent().unwrap().to_path_buf();
        let name = dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("pitchrank-render-"), "unexpected dir {name}");
        dir
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_render_dir_removed_after_success() {
        let tmp = tempfile::tempdir().unwrap();
        let (program, record) = stub_rasterizer(tmp.path(), "printf 'PNGDATA' > \"${10}.png\"");
        let rasterizer = PdftoppmRasterizer::new().with_program(program);

        let png = rasterizer.render_pdf_page(b"%PDF-1.4", 2).await.unwrap();

        assert_eq!(png, b"PNGDATA");
        assert!(!recorded_render_dir(&record).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_render_dir_removed_after_tool_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let (program, record) = stub_rasterizer(tmp.path(), "echo 'bad xref' >&2\nexit 3");
        let rasterizer = PdftoppmRasterizer::new().with_program(program);

        let err = rasterizer.render_pdf_page(b"%PDF-1.4", 1).await.unwrap_err();

        assert!(matches!(err, OcrError::ToolFailed { ref stderr, .. } if stderr == "bad xref"));
        assert!(!recorded_render_dir(&record).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_render_dir_removed_after_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        let (program, record) = stub_rasterizer(tmp.path(), "sleep 5");
        let rasterizer = PdftoppmRasterizer::new()
            .with_program(program)
            .with_timeout(Duration::from_secs(1));

        let err = rasterizer.render_pdf_page(b"%PDF-1.4", 1).await.unwrap_err();

        assert!(matches!(err, OcrError::Timeout { .. }));
        assert!(!recorded_render_dir(&record).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_output_is_no_output() {
        let tmp = tempfile::tempdir().unwrap();
        let (program, record) = stub_rasterizer(tmp.path(), "exit 0");
        let rasterizer = PdftoppmRasterizer::new().with_program(program);

        let err = rasterizer.render_pdf_page(b"%PDF-1.4", 1).await.unwrap_err();

        assert!(matches!(err, OcrError::NoOutput { .. }));
        assert!(!recorded_render_dir(&record).exists());
    }
}
