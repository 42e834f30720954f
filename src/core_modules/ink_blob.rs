// THEORY:
// The `ink_blob` module is the shape check of the mark reader. A filled bubble
// is one coherent patch of ink. Scanner noise, paper texture and shadows are
// many small specks. Both can darken the same fraction of a region, so the
// dark-pixel ratio alone cannot tell them apart; the size of the largest
// connected patch can.
//
// Algorithm:
// 1.  **Seeding**: Scan the ink mask row by row. Every ink pixel not yet
//     claimed by a blob seeds a new one.
// 2.  **Region Growing**: From the seed, grow outwards through the 8 surrounding
//     pixels while they are ink. A `visited` grid makes sure every pixel joins
//     at most one blob.
// 3.  **Measurement**: Once a blob stops growing, only its area is kept. The
//     classifier compares areas, nothing else.
// 4.  **Stateless Utility**: Like the rest of the classifier, this is a pure
//     function of one mask.

pub mod ink_blob {
    use image::GrayImage;

    const NEIGHBOURS: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    /// Areas of every connected patch of non-zero pixels in `mask`, in scan
    /// order of each patch's first pixel.
    pub fn blob_areas(mask: &GrayImage) -> Vec<usize> {
        let (width, height) = mask.dimensions();
        let mut visited = vec![false; width as usize * height as usize];
        let mut areas = Vec::new();

        // --- 1. Seeding ---
        for y in 0..height {
            for x in 0..width {
                let index = (y * width + x) as usize;
                if visited[index] || mask.get_pixel(x, y).0[0] == 0 {
                    continue;
                }
                areas.push(grow_blob(mask, (x, y), &mut visited));
            }
        }

        areas
    }

    /// Area of the biggest blob, 0 for an empty mask.
    pub fn largest_blob_area(mask: &GrayImage) -> usize {
        blob_areas(mask).into_iter().max().unwrap_or(0)
    }

    /// Flood-fills from `seed` and returns the number of pixels claimed.
    fn grow_blob(mask: &GrayImage, seed: (u32, u32), visited: &mut [bool]) -> usize {
        let (width, height) = mask.dimensions();
        let mut queue = vec![seed];
        visited[(seed.1 * width + seed.0) as usize] = true;
        let mut area = 0usize;

        // --- 2. Region Growing ---
        while let Some((x, y)) = queue.pop() {
            area += 1;

            for (dx, dy) in NEIGHBOURS {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                // Edge of the region; there is nothing beyond it.
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                let index = (ny * width + nx) as usize;
                if !visited[index] && mask.get_pixel(nx, ny).0[0] != 0 {
                    visited[index] = true;
                    queue.push((nx, ny));
                }
            }
        }

        // --- 3. Measurement ---
        area
    }
}
