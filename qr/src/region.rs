//! Stage C: connected-component labelling via bounded iterative flood fill
//! (Section 4.C). Pixels already thresholded to `{BLACK = 0, WHITE = 1}` are
//! relabelled in place with a dense region id (`>= 2`); once relabelled, a
//! pixel is never read back as a threshold polarity (Section 3 invariant).

use crate::config::Config;
use crate::util::tracing_wrappers::*;

pub const BLACK: u8 = 0;
pub const WHITE: u8 = 1;
pub const FIRST_REGION_ID: u16 = 2;

#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub seed_x: i32,
    pub seed_y: i32,
    pub area: usize,
    pub black: bool,
    pub capstone_index: Option<usize>,
}

/// A row-span flood-fill work item: fill `[left, right]` on row `y`, having
/// arrived from the row `dy` pixels above/below.
#[derive(Debug, Clone, Copy)]
struct Span {
    y: i32,
    left: i32,
    right: i32,
}

pub struct RegionLabeller {
    pub regions: Vec<Region>,
    capacity: usize,
    scratch: Vec<Span>,
    scratch_capacity: usize,
}

impl RegionLabeller {
    pub fn new(config: &Config, h: usize) -> Self {
        // Section 4.C / Section 9: "sized from the image height: enough records
        // for a ring rotated ~45deg at 1/3 image height".
        let scratch_capacity = (h / 3).max(8) * 4 + 32;
        RegionLabeller {
            regions: Vec::with_capacity(config.region_capacity as usize),
            capacity: config.region_capacity as usize,
            scratch: Vec::with_capacity(scratch_capacity),
            scratch_capacity,
        }
    }

    /// Labels every remaining BLACK/WHITE pixel in `frame` with a region id,
    /// in raster order (Section 4.C). Returns once every pixel is either a
    /// polarity sentinel (for abandoned/overflowed regions) or a region id.
    pub fn run(&mut self, frame: &mut [u8], w: usize, h: usize) {
        self.regions.clear();
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let idx = (y as usize) * w + (x as usize);
                let v = frame[idx];
                if v != BLACK && v != WHITE {
                    continue;
                }
                self.label_region(frame, w, h, x, y, v == BLACK);
            }
        }
    }

    fn label_region(&mut self, frame: &mut [u8], w: usize, h: usize, seed_x: i32, seed_y: i32, black: bool) {
        if self.regions.len() >= self.capacity {
            debug!(seed_x, seed_y, "region table full, pixel marked black");
            frame[seed_y as usize * w + seed_x as usize] = BLACK;
            return;
        }
        let id = (self.regions.len() as u16 + FIRST_REGION_ID) as u8;
        let polarity = if black { BLACK } else { WHITE };

        self.scratch.clear();
        self.scratch.push(Span { y: seed_y, left: seed_x, right: seed_x });
        let mut area = 0usize;
        let mut overflowed = false;
        let mut filled_pixels: Vec<(i32, i32, i32)> = Vec::new(); // (y, left, right)

        while let Some(span) = self.scratch.pop() {
            if frame_row(frame, w, span.y)[span.left as usize] != polarity {
                // Already filled by an earlier, overlapping span push.
                continue;
            }
            let row = frame_row_mut(frame, w, span.y);
            // Expand the span left/right while pixels still match `polarity`.
            let mut left = span.left;
            while left > 0 && row[(left - 1) as usize] == polarity {
                left -= 1;
            }
            let mut right = span.right;
            while (right as usize) + 1 < w && row[(right + 1) as usize] == polarity {
                right += 1;
            }
            for x in left..=right {
                row[x as usize] = id;
            }
            area += (right - left + 1) as usize;
            filled_pixels.push((span.y, left, right));

            for &dy in &[-1i32, 1] {
                let ny = span.y + dy;
                if ny < 0 || ny >= h as i32 {
                    continue;
                }
                let nrow = frame_row(frame, w, ny);
                let mut x = left;
                while x <= right {
                    if nrow[x as usize] == polarity {
                        let start = x;
                        while x <= right && x < w as i32 && nrow[x as usize] == polarity {
                            x += 1;
                        }
                        if self.scratch.len() >= self.scratch_capacity {
                            overflowed = true;
                        } else {
                            self.scratch.push(Span { y: ny, left: start, right: x - 1 });
                        }
                    } else {
                        x += 1;
                    }
                }
            }
        }

        if overflowed {
            debug!(seed_x, seed_y, area, "flood fill scratch overflow, region abandoned");
            for (y, left, right) in filled_pixels {
                let row = frame_row_mut(frame, w, y);
                for x in left..=right {
                    row[x as usize] = BLACK;
                }
            }
            return;
        }

        self.regions.push(Region { seed_x, seed_y, area, black, capstone_index: None });
        trace!(id, area, black, "region labelled");
    }
}

/// Resolves a labelled pixel's polarity: `BLACK`/`WHITE` sentinels resolve
/// directly, any other value is looked up in `regions` (Section 3 invariant).
pub fn is_black(label: u8, regions: &[Region]) -> bool {
    match label {
        BLACK => true,
        WHITE => false,
        id => regions[(id - FIRST_REGION_ID as u8) as usize].black,
    }
}

fn frame_row(frame: &[u8], w: usize, y: i32) -> &[u8] {
    &frame[(y as usize) * w..(y as usize) * w + w]
}

fn frame_row_mut(frame: &mut [u8], w: usize, y: i32) -> &mut [u8] {
    &mut frame[(y as usize) * w..(y as usize) * w + w]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> (Vec<u8>, usize, usize) {
        let h = rows.len();
        let w = rows[0].len();
        let mut frame = vec![0u8; w * h];
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                frame[y * w + x] = if c == '#' { BLACK } else { WHITE };
            }
        }
        (frame, w, h)
    }

    #[test]
    fn single_black_square_is_one_region() {
        let (mut frame, w, h) = grid(&["....", ".##.", ".##.", "...."]);
        let mut labeller = RegionLabeller::new(&Config::default(), h);
        labeller.run(&mut frame, w, h);
        // One BLACK region (area 4) and one WHITE region (the surrounding
        // ring, 4-connected).
        assert_eq!(labeller.regions.len(), 2);
        let black_region = labeller.regions.iter().find(|r| r.black).unwrap();
        assert_eq!(black_region.area, 4);
    }

    #[test]
    fn disjoint_black_regions_are_distinct() {
        let (mut frame, w, h) = grid(&["#...#", ".....", "#...#"]);
        let mut labeller = RegionLabeller::new(&Config::default(), h);
        labeller.run(&mut frame, w, h);
        let black_regions = labeller.regions.iter().filter(|r| r.black).count();
        assert_eq!(black_regions, 4);
    }

    #[test]
    fn every_pixel_ends_up_black_white_or_a_region_id() {
        let (mut frame, w, h) = grid(&["#.#.#", ".###.", "#.#.#", ".....", "#####"]);
        let mut labeller = RegionLabeller::new(&Config::default(), h);
        labeller.run(&mut frame, w, h);
        let max_id = (labeller.regions.len() as u16 + FIRST_REGION_ID - 1) as u8;
        for &v in &frame {
            assert!(v == BLACK || v == WHITE || (FIRST_REGION_ID as u8..=max_id).contains(&v));
        }
    }
}
