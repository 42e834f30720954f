// Debug overlay: the scanned form with every analyzed region outlined,
// green when marked and red when not. Handy when tuning a template's geometry.

pub mod annotate {
    use crate::core_modules::report::MarkResult;
    use crate::error::{OmrError, OmrResult};
    use image::{DynamicImage, ImageEncoder, Rgb, RgbImage};
    use imageproc::drawing::draw_hollow_rect_mut;
    use imageproc::rect::Rect;
    use std::path::Path;

    const MARKED: Rgb<u8> = Rgb([0, 200, 0]);
    const UNMARKED: Rgb<u8> = Rgb([220, 0, 0]);
    const BORDER: u32 = 2;

    pub fn render(image: &DynamicImage, marks: &[MarkResult]) -> RgbImage {
        let mut canvas = image.to_rgb8();
        for mark in marks {
            let colour = if mark.is_marked { MARKED } else { UNMARKED };
            let region = mark.region;
            for inset in 0..BORDER {
                let width = region.width.saturating_sub(2 * inset);
                let height = region.height.saturating_sub(2 * inset);
                if width == 0 || height == 0 {
                    break;
                }
                let rect = Rect::at((region.x + inset) as i32, (region.y + inset) as i32).of_size(width, height);
                draw_hollow_rect_mut(&mut canvas, rect, colour);
            }
        }
        canvas
    }

    pub fn save(path: &Path, image: &DynamicImage, marks: &[MarkResult]) -> OmrResult<()> {
        let output_error = |reason: String| OmrError::Output {
            path: path.display().to_string(),
            reason,
        };
        let canvas = render(image, marks);
        let output = std::fs::File::create(path).map_err(|e| output_error(e.to_string()))?;
        let encoder = image::codecs::png::PngEncoder::new(output);
        encoder
            .write_image(
                canvas.as_raw(),
                canvas.width(),
                canvas.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| output_error(e.to_string()))
    }
}
