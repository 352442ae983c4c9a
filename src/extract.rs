//! Text extraction for PDF and plain-text files, with OCR fallback.
//!
//! [`Extractor::extract`] is infallible by contract: any failure is logged
//! and the file contributes an empty string, so one corrupt document never
//! stops a run.
//!
//! PDFs are processed page by page. A page whose native text layer is
//! empty or whitespace-only is rendered and sent through the OCR engine
//! once; the OCR output replaces the native text for that page.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, warn};

use crate::config::OcrConfig;
use crate::error::{ExtractError, IngestError};
use crate::models::{ExtractionMethod, PageContent, SourceFile, SourceKind};
use crate::ocr::{
    DisabledOcr, DisabledRenderer, OcrEngine, PageRenderer, PdftoppmRenderer, TesseractOcr,
};

/// Source of the native (machine-readable) text of each PDF page.
pub trait TextLayer: Send + Sync {
    /// One entry per page, in document order.
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, ExtractError>;
}

/// Text layer read with `pdf-extract`.
pub struct PdfExtractTextLayer;

impl TextLayer for PdfExtractTextLayer {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, ExtractError> {
        // pdf-extract panics on some malformed documents.
        match catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf)
        })) {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
            Err(_) => Err(ExtractError::Pdf("parser panicked".to_string())),
        }
    }
}

/// Per-file text extractor.
pub struct Extractor {
    text_layer: Box<dyn TextLayer>,
    renderer: Box<dyn PageRenderer>,
    ocr: Box<dyn OcrEngine>,
}

impl Extractor {
    pub fn new(
        text_layer: Box<dyn TextLayer>,
        renderer: Box<dyn PageRenderer>,
        ocr: Box<dyn OcrEngine>,
    ) -> Self {
        Self {
            text_layer,
            renderer,
            ocr,
        }
    }

    /// Build the default extractor: pdf-extract for the text layer,
    /// pdftoppm + tesseract for OCR (or no OCR when disabled).
    pub fn from_config(config: &OcrConfig) -> Self {
        if config.enabled {
            Self::new(
                Box::new(PdfExtractTextLayer),
                Box::new(PdftoppmRenderer::from_config(config)),
                Box::new(TesseractOcr::from_config(config)),
            )
        } else {
            Self::new(
                Box::new(PdfExtractTextLayer),
                Box::new(DisabledRenderer),
                Box::new(DisabledOcr),
            )
        }
    }

    /// Extract the text of one file. Never fails: errors are logged and
    /// yield an empty string.
    pub fn extract(&self, file: &SourceFile) -> String {
        self.extract_report(file).text
    }

    /// Like [`extract`](Self::extract) but also reports how many PDF pages
    /// went through OCR.
    pub fn extract_report(&self, file: &SourceFile) -> FileText {
        let result = match file.kind {
            SourceKind::Text => read_text(&file.path).map(|text| FileText {
                text,
                ocr_pages: 0,
            }),
            SourceKind::Pdf => self.extract_pages(file).map(|pages| {
                let ocr_pages = pages
                    .iter()
                    .filter(|p| p.method == ExtractionMethod::Ocr)
                    .count();
                FileText {
                    text: join_pages(&pages),
                    ocr_pages,
                }
            }),
        };

        match result {
            Ok(file_text) => file_text,
            Err(source) => {
                let err = IngestError::Extraction {
                    path: file.path.clone(),
                    source,
                };
                warn!("{}", err);
                FileText::default()
            }
        }
    }

    /// Extract every page of a PDF, escalating whitespace-only pages to OCR.
    ///
    /// Fails only when the document itself cannot be read or parsed; a page
    /// whose render or OCR step fails is logged and kept as empty text.
    pub fn extract_pages(&self, file: &SourceFile) -> Result<Vec<PageContent>, ExtractError> {
        let path = file.path.as_path();
        debug!("extracting PDF {}", path.display());
        let bytes = std::fs::read(path)?;
        let native = self.text_layer.page_texts(&bytes)?;

        let mut pages = Vec::with_capacity(native.len());
        for (i, text) in native.into_iter().enumerate() {
            let page_number = i as u32 + 1;
            if !text.trim().is_empty() {
                pages.push(PageContent {
                    source: file.clone(),
                    page_number,
                    text,
                    method: ExtractionMethod::Native,
                });
                continue;
            }

            debug!(
                "page {} of {} has no text layer, running OCR",
                page_number,
                path.display()
            );
            let text = match self.ocr_page(path, page_number) {
                Ok(text) => text,
                Err(e) => {
                    warn!("{}: {}", path.display(), e);
                    String::new()
                }
            };
            pages.push(PageContent {
                source: file.clone(),
                page_number,
                text,
                method: ExtractionMethod::Ocr,
            });
        }

        Ok(pages)
    }

    fn ocr_page(&self, path: &Path, page: u32) -> Result<String, ExtractError> {
        let image = self
            .renderer
            .render_page(path, page)
            .map_err(|e| ExtractError::Render {
                page,
                reason: format!("{:#}", e),
            })?;
        self.ocr.recognize(&image).map_err(|e| ExtractError::Ocr {
            page,
            reason: format!("{:#}", e),
        })
    }
}

/// Text of one file plus OCR bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileText {
    pub text: String,
    pub ocr_pages: usize,
}

/// Join page texts with newlines, in page order.
pub fn join_pages(pages: &[PageContent]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8(bytes)?)
}
