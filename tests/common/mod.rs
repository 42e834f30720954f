#![allow(dead_code)]

use image::{Rgb, RgbImage};
use mark_sense::FormTemplate;
use mark_sense::core_modules::form_layout::MarkKind;
use mark_sense::core_modules::region::resolve;
use std::path::{Path, PathBuf};

pub const PAPER: Rgb<u8> = Rgb([248, 248, 246]);
pub const INK: Rgb<u8> = Rgb([12, 14, 40]);

/// A blank scan of the given size.
pub fn blank_page(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, PAPER)
}

/// Fills the bubble of `item`/`kind` with ink, overshooting its region by `margin` pixels.
pub fn fill_bubble(page: &mut RgbImage, template: &FormTemplate, item: &str, kind: MarkKind, margin: u32) {
    let spec = template
        .marks
        .iter()
        .find(|spec| spec.item == item && spec.kind == kind)
        .expect("bubble exists in template");
    let region = resolve(spec, page.width(), page.height()).expect("bubble resolves");
    let x0 = region.x.saturating_sub(margin);
    let y0 = region.y.saturating_sub(margin);
    let x1 = (region.x + region.width + margin).min(page.width());
    let y1 = (region.y + region.height + margin).min(page.height());
    for y in y0..y1 {
        for x in x0..x1 {
            page.put_pixel(x, y, INK);
        }
    }
}

pub fn save_page(dir: &Path, name: &str, page: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    page.save(&path).expect("fixture is written");
    path
}
