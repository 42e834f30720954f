// THEORY:
// The `Pixel` module is the smallest unit of the engine: a single RGBA sample and
// the one heuristic the mark reader needs from it, its brightness. Ink on paper
// is recognized by being darker than the paper around it, so everything
// downstream works on a single luminance channel.
//
// Brightness uses the ITU-R BT.601 weights in 14-bit fixed point, rounded the
// same way common imaging libraries round, so a grayscale scan produced here
// matches one produced by those tools bit for bit. Alpha is ignored; scanners do
// not produce transparency.

use image::Rgba;

pub type Channel = u8;
pub type Luminance = u8;

const LUMA_SHIFT: u32 = 14;
const LUMA_RED: u32 = 4899;
const LUMA_GREEN: u32 = 9617;
const LUMA_BLUE: u32 = 1868;
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

/// A "dumb" data container representing a single RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
    pub alpha: Channel,
}

impl Pixel {
    pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
        Pixel { red, green, blue, alpha }
    }

    /// Rec. 601 luma in 0..=255.
    pub fn luminance(&self) -> Luminance {
        let weighted = self.red as u32 * LUMA_RED
            + self.green as u32 * LUMA_GREEN
            + self.blue as u32 * LUMA_BLUE
            + LUMA_ROUND;
        (weighted >> LUMA_SHIFT) as Luminance
    }
}

impl From<&Rgba<u8>> for Pixel {
    fn from(rgba: &Rgba<u8>) -> Self {
        let [red, green, blue, alpha] = rgba.0;
        Pixel::new(red, green, blue, alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes_map_to_extremes() {
        assert_eq!(Pixel::new(0, 0, 0, 255).luminance(), 0);
        assert_eq!(Pixel::new(255, 255, 255, 255).luminance(), 255);
    }

    #[test]
    fn gray_stays_gray() {
        for v in [1u8, 17, 128, 200, 254] {
            assert_eq!(Pixel::new(v, v, v, 255).luminance(), v);
        }
    }

    #[test]
    fn green_dominates_blue() {
        let green = Pixel::new(0, 255, 0, 255).luminance();
        let blue = Pixel::new(0, 0, 255, 255).luminance();
        assert_eq!(green, 150);
        assert_eq!(blue, 29);
    }

    #[test]
    fn alpha_is_ignored() {
        let opaque = Pixel::from(&Rgba([90, 40, 200, 255]));
        let clear = Pixel::from(&Rgba([90, 40, 200, 0]));
        assert_eq!(opaque.luminance(), clear.luminance());
    }
}
