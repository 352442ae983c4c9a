use anyhow::Result;

use crate::config::Config;
use crate::ocr::{PdftoppmRenderer, TesseractOcr};

/// One row of `lexcorpus doctor` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: &'static str,
    pub status: String,
    pub healthy: bool,
}

pub fn checks(config: &Config) -> Vec<Check> {
    let mut out = Vec::new();

    let ocr_check = |name: &'static str, program: &str, available: bool| {
        if !config.ocr.enabled {
            Check {
                name,
                status: "DISABLED".to_string(),
                healthy: true,
            }
        } else if available {
            Check {
                name,
                status: format!("OK ({})", program),
                healthy: true,
            }
        } else {
            Check {
                name,
                status: format!("MISSING ({} not found)", program),
                healthy: false,
            }
        }
    };

    let renderer = PdftoppmRenderer::from_config(&config.ocr);
    out.push(ocr_check(
        "pdftoppm",
        &config.ocr.pdftoppm,
        config.ocr.enabled && renderer.is_available(),
    ));
    let tesseract = TesseractOcr::from_config(&config.ocr);
    out.push(ocr_check(
        "tesseract",
        &config.ocr.tesseract,
        config.ocr.enabled && tesseract.is_available(),
    ));

    let embedding = &config.embedding;
    out.push(if embedding.is_enabled() {
        Check {
            name: "embedding",
            status: format!(
                "{} ({})",
                embedding.provider,
                embedding.model.as_deref().unwrap_or("default model")
            ),
            healthy: true,
        }
    } else {
        Check {
            name: "embedding",
            status: "DISABLED (builds will fail)".to_string(),
            healthy: false,
        }
    });

    out.push(Check {
        name: "store",
        status: config.store.root.display().to_string(),
        healthy: true,
    });

    out
}

pub fn run_doctor(config: &Config) -> Result<()> {
    println!("{:<12} {:<40} HEALTHY", "CHECK", "STATUS");
    for check in checks(config) {
        println!("{:<12} {:<40} {}", check.name, check.status, check.healthy);
    }
    Ok(())
}
