// THEORY:
// Scans are rarely lit evenly: one corner of the page is grey, another is
// washed out. A single global cut between "ink" and "paper" fails on such
// scans, so ink is found relative to its neighbourhood instead. Each pixel is
// compared with the Gaussian-weighted mean of the square window around it and
// counts as ink when it is darker than that mean by at least a fixed offset.
//
// The Gaussian kernels follow the conventions of common imaging libraries:
// fixed binomial tables for sizes up to 7, and `sigma = 0.3 * ((k - 1) / 2 - 1) + 0.8`
// above that. Borders replicate the edge pixel. Means are rounded to whole grey
// levels before the comparison, which keeps results identical to those tools.

use image::{GrayImage, Luma};

/// Grey level written for ink in a binarized image.
pub const INK: u8 = 0;
/// Grey level written for paper in a binarized image.
pub const PAPER: u8 = 255;

/// Builds a normalized 1D Gaussian kernel of odd length `size`.
pub fn gaussian_kernel(size: u32) -> Vec<f64> {
    match size {
        0 | 1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
        _ => {
            let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
            let center = (size / 2) as f64;
            let raw: Vec<f64> = (0..size)
                .map(|i| {
                    let d = i as f64 - center;
                    (-(d * d) / (2.0 * sigma * sigma)).exp()
                })
                .collect();
            let total: f64 = raw.iter().sum();
            raw.into_iter().map(|w| w / total).collect()
        }
    }
}

/// Separable Gaussian smoothing with a `size`x`size` window. Sizes of 0 or 1 copy the image.
pub fn gaussian_smooth(image: &GrayImage, size: u32) -> GrayImage {
    if size <= 1 {
        return image.clone();
    }
    let (width, height) = image.dimensions();
    let smoothed = smooth_f64(image, &gaussian_kernel(size));
    GrayImage::from_fn(width, height, |x, y| {
        let value = smoothed[(y * width + x) as usize];
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Adaptive Gaussian threshold: `PAPER` where `pixel - localMean > -offset`, `INK` elsewhere.
pub fn adaptive_threshold(image: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let means = gaussian_smooth(image, block_size);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = image.get_pixel(x, y).0[0] as i32;
        let mean = means.get_pixel(x, y).0[0] as i32;
        if value - mean > -offset { Luma([PAPER]) } else { Luma([INK]) }
    })
}

/// Marks ink pixels with 255 and paper with 0.
///
/// A pixel is ink when the adaptive threshold says so, or when it is at or
/// below `absolute_ink_level`. The second rule catches uniformly dark areas,
/// such as the inside of a solidly filled bubble, that a purely local
/// comparison sees as flat background.
pub fn ink_mask(image: &GrayImage, block_size: u32, offset: i32, absolute_ink_level: u8) -> GrayImage {
    let means = gaussian_smooth(image, block_size);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = image.get_pixel(x, y).0[0];
        let mean = means.get_pixel(x, y).0[0];
        // Complement of `adaptive_threshold`'s paper test.
        let locally_dark = value as i32 - mean as i32 <= -offset;
        if locally_dark || value <= absolute_ink_level {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

fn smooth_f64(image: &GrayImage, kernel: &[f64]) -> Vec<f64> {
    let (width, height) = image.dimensions();
    let (w, h) = (width as i64, height as i64);
    let radius = (kernel.len() / 2) as i64;

    // --- 1. Horizontal Pass ---
    let mut horizontal = vec![0.0f64; (width * height) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, weight) in kernel.iter().enumerate() {
                // Replicate border: out-of-range taps reuse the edge pixel.
                let sx = (x + i as i64 - radius).clamp(0, w - 1);
                acc += weight * image.get_pixel(sx as u32, y as u32).0[0] as f64;
            }
            horizontal[(y * w + x) as usize] = acc;
        }
    }

    // --- 2. Vertical Pass ---
    // Runs on unrounded values so the two passes equal one 2D convolution.
    let mut out = vec![0.0f64; (width * height) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (i, weight) in kernel.iter().enumerate() {
                let sy = (y + i as i64 - radius).clamp(0, h - 1);
                acc += weight * horizontal[(sy * w + x) as usize];
            }
            out[(y * w + x) as usize] = acc;
        }
    }
    out
}
