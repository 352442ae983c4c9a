//! Page rendering and OCR collaborators.
//!
//! The extractor needs two things it cannot do itself for image-only PDF
//! pages: turn a page into an image ([`PageRenderer`]) and turn that image
//! into text ([`OcrEngine`]). Both are blocking calls. The default
//! implementations shell out to poppler's `pdftoppm` and to `tesseract`.
//!
//! Rendered images live in a per-call temporary directory which is removed
//! before the call returns.

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::OcrConfig;

/// Renders a single PDF page to PNG bytes.
pub trait PageRenderer: Send + Sync {
    /// `page_number` is 1-based.
    fn render_page(&self, pdf: &Path, page_number: u32) -> Result<Vec<u8>>;
}

/// Recognizes text in an image. Best effort: no accuracy guarantee.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String>;
}

/// Renderer backed by `pdftoppm` (poppler-utils).
pub struct PdftoppmRenderer {
    program: String,
    dpi: u32,
}

impl PdftoppmRenderer {
    pub fn new(program: impl Into<String>, dpi: u32) -> Self {
        Self {
            program: program.into(),
            dpi,
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.pdftoppm.clone(), config.dpi)
    }

    /// `pdftoppm -v` prints to stderr and may exit non-zero; spawning is
    /// enough to know the binary is there.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program).arg("-v").output().is_ok()
    }
}

impl PageRenderer for PdftoppmRenderer {
    fn render_page(&self, pdf: &Path, page_number: u32) -> Result<Vec<u8>> {
        let scratch = ScratchDir::new("render")?;
        let prefix = scratch.path().join("page");
        let page = page_number.to_string();

        let output = Command::new(&self.program)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(&page)
            .arg("-l")
            .arg(&page)
            .arg(pdf)
            .arg(&prefix)
            .output()
            .with_context(|| format!("failed to spawn {}", self.program))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        // pdftoppm zero-pads the page suffix depending on the page count,
        // so pick up whatever single PNG it produced.
        let image = std::fs::read_dir(scratch.path())?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| p.extension().is_some_and(|ext| ext == "png"))
            .ok_or_else(|| anyhow!("{} produced no image", self.program))?;

        Ok(std::fs::read(image)?)
    }
}

/// OCR engine backed by the `tesseract` CLI.
pub struct TesseractOcr {
    program: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(program: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.tesseract.clone(), config.language.clone())
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &[u8]) -> Result<String> {
        let scratch = ScratchDir::new("ocr")?;
        let input = scratch.path().join("input.png");
        std::fs::write(&input, image)?;

        let output = Command::new(&self.program)
            .arg(&input)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .with_context(|| format!("failed to spawn {}", self.program))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// OCR engine used when `[ocr] enabled = false`. Every call fails, so
/// image-only pages contribute nothing and a warning is logged.
pub struct DisabledOcr;

impl OcrEngine for DisabledOcr {
    fn recognize(&self, _image: &[u8]) -> Result<String> {
        bail!("OCR is disabled")
    }
}

/// Renderer used together with [`DisabledOcr`]; skips the render step.
pub struct DisabledRenderer;

impl PageRenderer for DisabledRenderer {
    fn render_page(&self, _pdf: &Path, page_number: u32) -> Result<Vec<u8>> {
        bail!("page rendering is disabled (page {})", page_number)
    }
}

/// Temporary directory removed on drop.
struct ScratchDir(PathBuf);

impl ScratchDir {
    fn new(label: &str) -> Result<Self> {
        let dir = std::env::temp_dir().join(format!(
            "lexcorpus-{}-{}",
            label,
            uuid::Uuid::new_v4()
        ));
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(Self(dir))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_ocr_always_fails() {
        assert!(DisabledOcr.recognize(b"png").is_err());
        assert!(DisabledRenderer
            .render_page(Path::new("x.pdf"), 1)
            .is_err());
    }

    #[test]
    fn missing_binaries_are_reported_unavailable() {
        let renderer = PdftoppmRenderer::new("lexcorpus-no-such-pdftoppm", 150);
        assert!(!renderer.is_available());
        let ocr = TesseractOcr::new("lexcorpus-no-such-tesseract", "eng");
        assert!(!ocr.is_available());
    }

    #[test]
    fn missing_tesseract_is_an_error_not_a_panic() {
        let ocr = TesseractOcr::new("lexcorpus-no-such-tesseract", "eng");
        let err = ocr.recognize(b"not really a png").unwrap_err();
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[test]
    fn scratch_dir_removed_on_drop() {
        let path = {
            let dir = ScratchDir::new("test").unwrap();
            assert!(dir.path().exists());
            dir.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
