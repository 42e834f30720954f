// THEORY:
// The `region` module bridges the paper form and the pixel grid. Given a bubble
// from the template and the real size of the scan, it produces the pixel
// rectangle to analyze.
//
// Key architectural principles:
// 1.  **Always In Bounds**: A resolved region is clamped so it lies entirely inside
//     the image. Oversized boxes shrink to fit; misplaced boxes slide back onto the
//     page.
// 2.  **Drop, Don't Fail**: A box that collapses to zero width or height (a tiny
//     scan, a rounding artifact) is dropped. The caller skips it and keeps going.
// 3.  **Pure**: Resolution depends only on the bubble and the image size.

use crate::core_modules::form_layout::{BoxPosition, MarkSpec};
use image::{GrayImage, imageops};
use serde::Serialize;

/// A pixel rectangle guaranteed to lie inside the image it was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ResolvedRegion {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Copies the region's pixels out of `image`, or `None` if it does not fit.
    pub fn crop(&self, image: &GrayImage) -> Option<GrayImage> {
        let (image_width, image_height) = image.dimensions();
        let fits = self.x as u64 + self.width as u64 <= image_width as u64
            && self.y as u64 + self.height as u64 <= image_height as u64;
        if !fits || self.width == 0 || self.height == 0 {
            return None;
        }
        Some(imageops::crop_imm(image, self.x, self.y, self.width, self.height).to_image())
    }
}

/// Resolves a bubble to pixels, or `None` when it has no area at this image size.
pub fn resolve(spec: &MarkSpec, image_width: u32, image_height: u32) -> Option<ResolvedRegion> {
    let image_w = image_width as i64;
    let image_h = image_height as i64;

    let (x, y, width, height) = match spec.position {
        BoxPosition::Relative { x, y, width, height } => (
            scale(x, image_width),
            scale(y, image_height),
            scale(width, image_width),
            scale(height, image_height),
        ),
        BoxPosition::Absolute { x, y, width, height } => (x, y, width, height),
    };

    let width = width.min(image_w);
    let height = height.min(image_h);
    if width <= 0 || height <= 0 {
        return None;
    }

    let x = x.clamp(0, image_w - width);
    let y = y.clamp(0, image_h - height);

    Some(ResolvedRegion {
        x: x as u32,
        y: y as u32,
        width: width as u32,
        height: height as u32,
    })
}

fn scale(fraction: f64, extent: u32) -> i64 {
    let value = (fraction * extent as f64).round();
    if value.is_finite() { value as i64 } else { 0 }
}
