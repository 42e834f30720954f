// THEORY:
// The preprocessor turns whatever the scanner produced into a single-channel
// image that the mark classifier can threshold. Its shape is fixed:
//
//     grayscale -> optional denoise -> optional contrast fix -> optional binarize
//
// Only which optional stages run, and with which parameters, is configurable.
// Clean flatbed scans need little help; phone photos of crumpled forms need all
// of it. The configuration travels with the form template.

use crate::core_modules::pixel::Pixel;
use crate::core_modules::threshold;
use crate::error::{OmrError, OmrResult};
use image::{DynamicImage, GrayImage, ImageReader, Luma};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for the preprocessing stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Odd Gaussian kernel size for noise smoothing. `None` or `1` disables it.
    pub blur_kernel: Option<u32>,
    /// Histogram equalization to stretch contrast over the whole page.
    pub equalize: bool,
    /// Adaptive binarization of the whole page into pure ink and paper.
    pub binarize: bool,
    /// Window size used when `binarize` is set.
    pub binarize_block_size: u32,
    /// How much darker than its neighbourhood a pixel must be to become ink.
    pub binarize_offset: i32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            blur_kernel: Some(3),
            equalize: true,
            binarize: false,
            binarize_block_size: 11,
            binarize_offset: 2,
        }
    }
}

impl PreprocessConfig {
    /// Grayscale conversion only.
    pub fn grayscale_only() -> Self {
        Self {
            blur_kernel: None,
            equalize: false,
            binarize: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(kernel) = self.blur_kernel {
            if kernel == 0 || kernel % 2 == 0 {
                return Err(format!("blur kernel must be an odd integer >= 1, got {kernel}"));
            }
        }
        if self.binarize && (self.binarize_block_size < 3 || self.binarize_block_size % 2 == 0) {
            return Err(format!(
                "binarize block size must be an odd integer >= 3, got {}",
                self.binarize_block_size
            ));
        }
        Ok(())
    }
}

/// Decodes an image file. This is the only fatal failure of a form.
pub fn load_image(path: &Path) -> OmrResult<DynamicImage> {
    let load_error = |reason: String| OmrError::ImageLoad {
        path: path.display().to_string(),
        reason,
    };
    ImageReader::open(path)
        .map_err(|e| load_error(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| load_error(e.to_string()))?
        .decode()
        .map_err(|e| load_error(e.to_string()))
}

/// Runs the preprocessing stages in their fixed order.
pub fn preprocess(image: &DynamicImage, config: &PreprocessConfig) -> GrayImage {
    let mut gray = grayscale(image);

    if let Some(kernel) = config.blur_kernel.filter(|k| *k > 1) {
        gray = threshold::gaussian_smooth(&gray, kernel);
        tracing::trace!(kernel, "applied noise smoothing");
    }

    if config.equalize {
        gray = equalize(&gray);
    }

    if config.binarize {
        gray = threshold::adaptive_threshold(&gray, config.binarize_block_size, config.binarize_offset);
        tracing::trace!(block = config.binarize_block_size, "binarized page");
    }

    gray
}

/// Rec. 601 grayscale conversion.
pub fn grayscale(image: &DynamicImage) -> GrayImage {
    let rgba = image.to_rgba8();
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        Luma([Pixel::from(rgba.get_pixel(x, y)).luminance()])
    })
}

/// Histogram equalization. A single-valued image has no contrast to stretch and is returned as is.
fn equalize(gray: &GrayImage) -> GrayImage {
    let mut levels = gray.pixels().map(|p| p.0[0]);
    let Some(first) = levels.next() else {
        return gray.clone();
    };
    if levels.all(|level| level == first) {
        return gray.clone();
    }
    imageproc::contrast::equalize_histogram(gray)
}
