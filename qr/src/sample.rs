//! Stage F: cell sampling (Section 4.F). Projects each of the `grid_size x
//! grid_size` cell centres through the grid's homography and reads the
//! underlying pixel's polarity off the labelled frame.

use crate::data::Code;
use crate::geometry::Point;
use crate::grid::Grid;
use crate::region::{is_black, Region};
use crate::util::tracing_wrappers::*;

/// Samples `grid` against the labelled `frame`, producing a [`Code`]. Cells
/// that project outside the image are treated as white (Section 4.F: "a cell
/// that samples off the edge of the image counts as a light module").
pub fn sample(frame: &[u8], w: usize, h: usize, regions: &[Region], grid: &Grid) -> Code {
    let size = grid.grid_size;
    let corners = [
        grid.homography.map_cell(0, 0),
        grid.homography.map_cell(size - 1, 0),
        grid.homography.map_cell(size - 1, size - 1),
        grid.homography.map_cell(0, size - 1),
    ];
    let mut code = Code::new(corners, size);

    let mut black_count = 0usize;
    for v in 0..size {
        for u in 0..size {
            let Point { x, y } = grid.homography.map_cell(u, v);
            let black = if x < 0 || y < 0 || (x as usize) >= w || (y as usize) >= h {
                false
            } else {
                is_black(frame[y as usize * w + x as usize], regions)
            };
            if black {
                black_count += 1;
            }
            code.set_cell(u, v, black);
        }
    }
    trace!(size, black_count, "grid sampled");
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Perspective;

    fn identity_grid(size: usize) -> Grid {
        Grid {
            cap_indices: [0, 0, 0],
            align_point: None,
            tpep: [Point::new(0, 0); 3],
            grid_size: size,
            homography: Perspective { c: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0] },
        }
    }

    #[test]
    fn samples_checkerboard_correctly() {
        let w = 10;
        let h = 10;
        let mut frame = vec![1u8; w * h]; // all WHITE
        for y in 0..h {
            for x in 0..w {
                if (x + y) % 2 == 0 {
                    frame[y * w + x] = 0; // BLACK
                }
            }
        }
        let regions: Vec<Region> = Vec::new();
        let grid = identity_grid(8);
        let code = sample(&frame, w, h, &regions, &grid);
        for v in 0..8 {
            for u in 0..8 {
                let expected = (u + v) % 2 == 0;
                assert_eq!(code.get_cell(u, v), expected, "cell ({u},{v})");
            }
        }
    }

    #[test]
    fn out_of_bounds_cells_sample_as_white() {
        let w = 4;
        let h = 4;
        let frame = vec![0u8; w * h]; // all BLACK
        let regions: Vec<Region> = Vec::new();
        let mut grid = identity_grid(8);
        grid.homography = Perspective { c: [1.0, 0.0, -2.0, 0.0, 1.0, -2.0, 0.0, 0.0] };
        let code = sample(&frame, w, h, &regions, &grid);
        assert!(!code.get_cell(0, 0));
    }
}
