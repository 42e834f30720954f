// THEORY:
// The `mark_classifier` decides whether one bubble has been filled in. It sees
// only the pixels of that bubble's region and has no memory between calls, so
// any number of regions can be classified concurrently.
//
// Algorithm:
// 1.  **Local Binarization**: The region is lightly smoothed, then every pixel is
//     compared with its Gaussian neighbourhood mean. Pixels clearly darker than
//     their surroundings, or dark in absolute terms, are ink.
// 2.  **Fill Ratio**: `confidence` is the fraction of the region that is ink.
// 3.  **Shape Coherence**: `shape_coverage` is the share of the ink that belongs to
//     the single largest connected patch. A pen stroke or filled circle is one
//     patch; scan noise is many.
// 4.  **Decision**: A mark needs enough ink by ratio, enough ink by count (scaled
//     to the region's area unless a fixed count is configured), and either a coherent shape or a very high fill. The "shape OR high fill" clause
//     trades a few false positives for tolerance of messy, broken-up fills.
//
// Known false positive: a dark smudge or scanner shadow covering a whole region
// passes all three checks. It is reported as marked.

use crate::core_modules::ink_blob::ink_blob;
use crate::core_modules::threshold;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// The minimum number of ink pixels a marked region must contain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum DarkPixelFloor {
    /// `pixels` ink pixels for every `per_area` pixels of region, rounded up.
    Scaled { pixels: u64, per_area: u64 },
    /// A fraction of the region's area.
    AreaFraction(f64),
    /// A fixed pixel count, tied to the scan resolution the template was tuned for.
    /// Regions smaller than the count can never be marked.
    Absolute(u64),
}

impl Default for DarkPixelFloor {
    /// 80 ink pixels per 30x30 bubble, the size the restaurant menu's bubbles
    /// take on a 1000 pixel wide scan.
    fn default() -> Self {
        DarkPixelFloor::Scaled {
            pixels: 80,
            per_area: 900,
        }
    }
}

impl DarkPixelFloor {
    pub fn pixels_for(&self, total_pixels: u64) -> u64 {
        match *self {
            DarkPixelFloor::Scaled { pixels, per_area } => (pixels * total_pixels).div_ceil(per_area.max(1)),
            DarkPixelFloor::AreaFraction(fraction) => (fraction * total_pixels as f64).ceil() as u64,
            DarkPixelFloor::Absolute(pixels) => pixels,
        }
    }
}

/// Tunables of the mark decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Odd smoothing kernel applied to the region before binarization. `None` skips it.
    pub region_blur_kernel: Option<u32>,
    /// Odd window size of the local mean.
    pub block_size: u32,
    /// How much darker than its neighbourhood mean a pixel must be to count as ink.
    pub offset: i32,
    /// Grey level at or below which a pixel is ink regardless of its neighbourhood.
    pub absolute_ink_level: u8,
    pub min_dark_ratio: f64,
    pub min_dark_pixels: DarkPixelFloor,
    pub shape_coverage_floor: f64,
    pub high_confidence_bypass: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            region_blur_kernel: Some(3),
            block_size: 11,
            offset: 2,
            absolute_ink_level: 96,
            min_dark_ratio: 0.35,
            min_dark_pixels: DarkPixelFloor::default(),
            shape_coverage_floor: 0.2,
            high_confidence_bypass: 0.5,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(kernel) = self.region_blur_kernel {
            if kernel == 0 || kernel % 2 == 0 {
                return Err(format!("region blur kernel must be an odd integer >= 1, got {kernel}"));
            }
        }
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(format!("block size must be an odd integer >= 3, got {}", self.block_size));
        }
        let ratios = [
            ("min_dark_ratio", self.min_dark_ratio),
            ("shape_coverage_floor", self.shape_coverage_floor),
            ("high_confidence_bypass", self.high_confidence_bypass),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must lie in [0, 1], got {value}"));
            }
        }
        match self.min_dark_pixels {
            DarkPixelFloor::Scaled { pixels, per_area } if per_area == 0 || pixels > per_area => {
                return Err(format!(
                    "scaled dark pixel floor needs per_area > 0 and pixels <= per_area, got {pixels} per {per_area}"
                ));
            }
            DarkPixelFloor::AreaFraction(fraction) if !(0.0..=1.0).contains(&fraction) => {
                return Err(format!("dark pixel area fraction must lie in [0, 1], got {fraction}"));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Which clauses of the decision rule held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationChecks {
    #[serde(rename = "darkRatioCheck")]
    pub dark_ratio: bool,
    #[serde(rename = "darkPixelsCheck")]
    pub dark_pixels: bool,
    #[serde(rename = "contourCoverageCheck")]
    pub shape_coverage: bool,
}

/// The verdict for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkDecision {
    pub is_marked: bool,
    pub confidence: f64,
    pub dark_pixels: u64,
    pub white_pixels: u64,
    pub total_pixels: u64,
    pub shape_coverage: f64,
    /// The dark pixel floor as it applied to this region.
    pub required_dark_pixels: u64,
    pub checks: ValidationChecks,
}

/// Classifies one cropped region.
pub fn classify(region: &GrayImage, config: &ClassifierConfig) -> MarkDecision {
    let total_pixels = region.width() as u64 * region.height() as u64;

    // --- 1. Local Binarization ---
    let smoothed = threshold::gaussian_smooth(region, config.region_blur_kernel.unwrap_or(1));
    let mask = threshold::ink_mask(&smoothed, config.block_size, config.offset, config.absolute_ink_level);
    let dark_pixels = mask.pixels().filter(|p| p.0[0] != 0).count() as u64;
    let white_pixels = total_pixels - dark_pixels;

    // --- 2. Fill Ratio ---
    let confidence = if total_pixels > 0 {
        dark_pixels as f64 / total_pixels as f64
    } else {
        0.0
    };

    // --- 3. Shape Coherence ---
    let shape_coverage = if dark_pixels > 0 {
        ink_blob::largest_blob_area(&mask) as f64 / dark_pixels as f64
    } else {
        0.0
    };

    // --- 4. Decision ---
    let required_dark_pixels = config.min_dark_pixels.pixels_for(total_pixels);
    let checks = ValidationChecks {
        dark_ratio: confidence >= config.min_dark_ratio,
        dark_pixels: dark_pixels >= required_dark_pixels,
        shape_coverage: dark_pixels > 0
            && (shape_coverage > config.shape_coverage_floor || confidence > config.high_confidence_bypass),
    };
    let is_marked = dark_pixels > 0 && checks.dark_ratio && checks.dark_pixels && checks.shape_coverage;

    MarkDecision {
        is_marked,
        confidence,
        dark_pixels,
        white_pixels,
        total_pixels,
        shape_coverage,
        required_dark_pixels,
        checks,
    }
}
