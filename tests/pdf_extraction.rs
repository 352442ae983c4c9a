//! Real `pdf-extract` text layer against PDFs assembled with lopdf.

use std::path::Path;
use std::sync::{Arc, Mutex};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;

use lexcorpus::extract::{Extractor, PdfExtractTextLayer};
use lexcorpus::models::{ExtractionMethod, SourceFile};
use lexcorpus::ocr::{OcrEngine, PageRenderer};

/// Build a PDF with one page per entry; `None` pages have an empty content stream.
fn build_pdf(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let operations = match page {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
            None => vec![],
        };
        let content = Content { operations };
        let content_id =
            doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Renders page N as the bytes of "N".
struct PageNumberRenderer;

impl PageRenderer for PageNumberRenderer {
    fn render_page(&self, _pdf: &Path, page_number: u32) -> anyhow::Result<Vec<u8>> {
        Ok(page_number.to_string().into_bytes())
    }
}

/// Records which page images it was asked to read.
#[derive(Clone, Default)]
struct RecordingOcr(Arc<Mutex<Vec<String>>>);

impl OcrEngine for RecordingOcr {
    fn recognize(&self, image: &[u8]) -> anyhow::Result<String> {
        let page = String::from_utf8_lossy(image).into_owned();
        self.0.lock().unwrap().push(page.clone());
        Ok(format!("ocr of page {}", page))
    }
}

fn extractor(ocr: RecordingOcr) -> Extractor {
    Extractor::new(
        Box::new(PdfExtractTextLayer),
        Box::new(PageNumberRenderer),
        Box::new(ocr),
    )
}

fn write_pdf(dir: &TempDir, name: &str, pages: &[Option<&str>]) -> SourceFile {
    let path = dir.path().join(name);
    std::fs::write(&path, build_pdf(pages)).unwrap();
    SourceFile::classify(path).unwrap()
}

#[test]
fn blank_page_goes_through_ocr_once() {
    let dir = TempDir::new().unwrap();
    let file = write_pdf(&dir, "agreement.pdf", &[Some("Native clause"), None]);
    let ocr = RecordingOcr::default();
    let ex = extractor(ocr.clone());

    let pages = ex.extract_pages(&file).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].method, ExtractionMethod::Native);
    assert_eq!(pages[0].text.trim(), "Native clause");
    assert_eq!(pages[1].method, ExtractionMethod::Ocr);
    assert_eq!(pages[1].page_number, 2);
    assert_eq!(*ocr.0.lock().unwrap(), vec!["2".to_string()]);

    let report = extractor(RecordingOcr::default()).extract_report(&file);
    assert!(
        report.text.ends_with("Native clause\nocr of page 2"),
        "text: {:?}",
        report.text
    );
    assert_eq!(report.ocr_pages, 1);
}

#[test]
fn text_pdf_needs_no_ocr() {
    let dir = TempDir::new().unwrap();
    let file = write_pdf(&dir, "brief.pdf", &[Some("First page"), Some("Second page")]);
    let ocr = RecordingOcr::default();

    let text = extractor(ocr.clone()).extract(&file);
    assert!(text.contains("First page"), "text: {:?}", text);
    assert!(text.contains("Second page"), "text: {:?}", text);
    assert!(ocr.0.lock().unwrap().is_empty());
}
