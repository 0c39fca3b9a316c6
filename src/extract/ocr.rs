//! OCR tier: rasterize, clean up and hand each page to Tesseract

use crate::extract::pdfium::{load_document, pdfium};
use crate::extract::{ExtractError, OcrTier};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Blur strength matching a 5x5 Gaussian kernel
const BLUR_SIGMA: f32 = 1.1;

/// Tesseract-backed OCR over pdfium-rendered pages
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    library_dir: Option<String>,
    tesseract: PathBuf,
    dpi: u32,
    language: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(
        library_dir: Option<String>,
        tesseract: PathBuf,
        dpi: u32,
        language: String,
        timeout: Duration,
    ) -> Self {
        Self {
            library_dir,
            tesseract,
            dpi,
            language,
            timeout,
        }
    }

    fn ocr_page(
        &self,
        page: &PdfPage<'_>,
        config: &PdfRenderConfig,
    ) -> Result<String, ExtractError> {
        let bitmap = page
            .render_with_config(config)
            .map_err(|e| ExtractError::Ocr(format!("render failed: {:?}", e)))?;
        let prepared = preprocess(&bitmap.as_image());

        // Deleted when `file` drops, whatever happens below
        let file = tempfile::Builder::new()
            .prefix("policy-harvester-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ExtractError::Ocr(format!("temp file: {}", e)))?;
        prepared
            .save_with_format(file.path(), ImageFormat::Png)
            .map_err(|e| ExtractError::Ocr(format!("writing page image: {}", e)))?;

        run_tesseract(&self.tesseract, file.path(), &self.language, self.timeout)
    }
}

impl OcrTier for TesseractOcr {
    fn pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        let pdfium = pdfium(self.library_dir.as_deref())?;
        let document = load_document(pdfium, bytes)?;
        let config = PdfRenderConfig::new().scale_page_by_factor(self.dpi as f32 / 72.0);

        let mut texts = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            match self.ocr_page(&page, &config) {
                Ok(text) => texts.push(text),
                Err(e) => {
                    warn!("OCR failed on page {}: {}", index + 1, e);
                    texts.push(String::new());
                }
            }
        }
        Ok(texts)
    }
}

/// Grayscale, blur and binarize a rendered page
pub(crate) fn preprocess(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let mut blurred = image::imageops::blur(&gray, BLUR_SIGMA);
    let threshold = otsu_threshold(&blurred);
    for pixel in blurred.pixels_mut() {
        *pixel = if pixel.0[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        };
    }
    blurred
}

/// Otsu's method: the level that maximizes between-class variance
pub(crate) fn otsu_threshold(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }
    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0f64;
    let mut best_threshold = 0u8;
    let mut best_variance = 0f64;

    for (level, &count) in histogram.iter().enumerate() {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }

        background_sum += level as f64 * count as f64;
        let background_mean = background_sum / background_weight as f64;
        let foreground_mean = (weighted_total - background_sum) / foreground_weight as f64;
        let variance = background_weight as f64
            * foreground_weight as f64
            * (background_mean - foreground_mean).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_threshold = level as u8;
        }
    }

    best_threshold
}

/// Runs `tesseract <image> stdout -l <language>` and returns its output
///
/// The process is killed once `timeout` elapses. Stdout is drained on a
/// separate thread so a chatty page cannot fill the pipe and stall.
fn run_tesseract(
    tesseract: &Path,
    image: &Path,
    language: &str,
    timeout: Duration,
) -> Result<String, ExtractError> {
    let mut child = Command::new(tesseract)
        .arg(image)
        .arg("stdout")
        .arg("-l")
        .arg(language)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ExtractError::Ocr(format!("failed to start tesseract: {}", e)))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| ExtractError::Ocr("tesseract stdout unavailable".to_string()))?;
    let reader = std::thread::spawn(move || {
        let mut buffer = Vec::new();
        stdout.read_to_end(&mut buffer).map(|_| buffer)
    });

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if start.elapsed() > timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExtractError::Ocr(format!(
                    "tesseract timed out after {}s",
                    timeout.as_secs()
                )));
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(25)),
            Err(e) => return Err(ExtractError::Ocr(format!("waiting on tesseract: {}", e))),
        }
    };

    if !status.success() {
        return Err(ExtractError::Ocr(format!("tesseract exited with {}", status)));
    }

    let output = reader
        .join()
        .map_err(|_| ExtractError::Ocr("tesseract reader thread panicked".to_string()))?
        .map_err(|e| ExtractError::Ocr(format!("reading tesseract output: {}", e)))?;

    debug!("tesseract produced {} bytes", output.len());
    Ok(String::from_utf8_lossy(&output).trim().to_string())
}
