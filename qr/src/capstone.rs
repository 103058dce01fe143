//! Stage D: finder-pattern (capstone) identification (Section 4.D). Scans
//! rows of the already-labelled frame for the 1:1:3:1:1 dark:light:dark:
//! light:dark run signature, then validates and measures each candidate as a
//! ring-around-a-square.

use crate::config::Config;
use crate::geometry::Point;
use crate::region::{is_black, Region, BLACK, FIRST_REGION_ID, WHITE};
use crate::util::tracing_wrappers::*;

#[derive(Debug, Clone)]
pub struct Capstone {
    /// Clockwise from the corner nearest the image origin (Section 4.D.5).
    pub corners: [Point; 4],
    pub centre: Point,
    pub ring_region: usize,
    pub stone_region: usize,
    pub homography: crate::geometry::Perspective,
    pub grid_index: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Run {
    start: i32,
    end: i32,
    label: u8,
}

impl Run {
    fn width(&self) -> i32 {
        self.end - self.start + 1
    }
}

fn pixel_label(frame: &[u8], w: usize, x: i32, y: i32) -> u8 {
    frame[y as usize * w + x as usize]
}

fn region_index(label: u8) -> Option<usize> {
    if label == BLACK || label == WHITE {
        None
    } else {
        Some((label - FIRST_REGION_ID as u8) as usize)
    }
}

fn row_runs(frame: &[u8], w: usize, y: i32, regions: &[Region]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut x = 0i32;
    while (x as usize) < w {
        let label = pixel_label(frame, w, x, y);
        let black = is_black(label, regions);
        let start = x;
        while (x as usize) < w && is_black(pixel_label(frame, w, x, y), regions) == black {
            x += 1;
        }
        runs.push(Run { start, end: x - 1, label });
    }
    runs
}

/// Checks five consecutive run widths against the 1:1:3:1:1 ratio within
/// `tolerance` (Section 4.D: "within +/-40%").
fn matches_capstone_ratio(widths: [i32; 5], tolerance: f64) -> bool {
    let sum: i32 = widths.iter().sum();
    if sum <= 0 {
        return false;
    }
    let unit = sum as f64 / 7.0;
    let expected = [1.0, 1.0, 3.0, 1.0, 1.0];
    for i in 0..5 {
        let want = expected[i] * unit;
        let got = widths[i] as f64;
        if (got - want).abs() > want * tolerance {
            return false;
        }
    }
    true
}

/// Scans `frame` for capstones, returning them in scan order (top-to-bottom,
/// left-to-right), matching Section 5's "Ordering" guarantee.
pub fn find_capstones(frame: &[u8], w: usize, h: usize, regions: &[Region], config: &Config) -> Vec<Capstone> {
    let mut out = Vec::new();
    let mut claimed_stones = std::collections::HashSet::new();

    for y in 0..h as i32 {
        let runs = row_runs(frame, w, y, regions);
        for window in runs.windows(5) {
            let widths = [
                window[0].width(),
                window[1].width(),
                window[2].width(),
                window[3].width(),
                window[4].width(),
            ];
            // dark, light, dark, light, dark
            let polarities_ok = is_black(window[0].label, regions)
                && !is_black(window[1].label, regions)
                && is_black(window[2].label, regions)
                && !is_black(window[3].label, regions)
                && is_black(window[4].label, regions);
            if !polarities_ok || !matches_capstone_ratio(widths, config.capstone_run_tolerance) {
                continue;
            }
            let Some(stone_idx) = region_index(window[2].label) else { continue };
            let Some(ring_idx_left) = region_index(window[0].label) else { continue };
            let Some(ring_idx_right) = region_index(window[4].label) else { continue };
            if ring_idx_left != ring_idx_right {
                debug!(y, "capstone candidate rejected: ring halves belong to different regions");
                continue;
            }
            if claimed_stones.contains(&stone_idx) {
                continue;
            }

            let cx = (window[2].start + window[2].end) / 2;
            let cy = y;
            let Some(capstone) = validate_and_measure(frame, w, h, regions, stone_idx, ring_idx_left, cx, cy, config)
            else {
                continue;
            };
            claimed_stones.insert(stone_idx);
            debug!(cx, cy, "capstone accepted");
            out.push(capstone);
            if out.len() >= crate::config::MAX_CAPSTONES {
                return out;
            }
        }
    }
    out
}

/// Runs the vertical probe, area-ratio check, and corner-finding for a
/// horizontally-matched candidate (Section 4.D steps 2-6).
fn validate_and_measure(
    frame: &[u8],
    w: usize,
    h: usize,
    regions: &[Region],
    stone_idx: usize,
    ring_idx: usize,
    cx: i32,
    cy: i32,
    config: &Config,
) -> Option<Capstone> {
    // Vertical probe: re-run the same run-ratio test along the column
    // through the candidate centre (Section 4.D.2).
    let col_runs = column_runs(frame, w, h, cx, regions);
    let vertical_ok = col_runs.windows(5).any(|window| {
        let widths = [
            window[0].width(),
            window[1].width(),
            window[2].width(),
            window[3].width(),
            window[4].width(),
        ];
        let polarities_ok = is_black(window[0].label, regions)
            && !is_black(window[1].label, regions)
            && is_black(window[2].label, regions)
            && !is_black(window[3].label, regions)
            && is_black(window[4].label, regions);
        polarities_ok
            && matches_capstone_ratio(widths, config.capstone_run_tolerance)
            && region_index(window[2].label) == Some(stone_idx)
    });
    if !vertical_ok {
        debug!(cx, cy, "capstone candidate rejected: vertical probe failed");
        return None;
    }

    let stone = &regions[stone_idx];
    let ring = &regions[ring_idx];
    let (lo, hi) = config.ring_area_ratio;
    if ring.area < stone.area || (ring.area as f64) < stone.area as f64 * lo || (ring.area as f64) > stone.area as f64 * hi {
        debug!(stone_area = stone.area, ring_area = ring.area, "capstone candidate rejected: area ratio out of range");
        return None;
    }

    let centre = Point::new(cx, cy);
    let corners = find_ring_corners(frame, w, h, ring_idx, centre, regions)?;
    if are_colinear(&corners) {
        debug!("capstone candidate rejected: degenerate (colinear) corners");
        return None;
    }
    let homography = crate::geometry::Perspective::from_capstone_corners(corners)?;

    Some(Capstone {
        corners,
        centre,
        ring_region: ring_idx,
        stone_region: stone_idx,
        homography,
        grid_index: None,
    })
}

fn column_runs(frame: &[u8], w: usize, h: usize, x: i32, regions: &[Region]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut y = 0i32;
    while (y as usize) < h {
        let label = pixel_label(frame, w, x, y);
        let black = is_black(label, regions);
        let start = y;
        while (y as usize) < h && is_black(pixel_label(frame, w, x, y), regions) == black {
            y += 1;
        }
        runs.push(Run { start, end: y - 1, label });
    }
    runs
}

/// Finds the four ring-region pixels maximising signed distance from the
/// centre along each of the four diagonal directions (Section 4.D.4),
/// returned in clockwise order starting from the corner nearest the image
/// origin (Section 4.D.5): top-left, top-right, bottom-right, bottom-left.
fn find_ring_corners(frame: &[u8], w: usize, h: usize, ring_idx: usize, centre: Point, regions: &[Region]) -> Option<[Point; 4]> {
    let target_label = (ring_idx + FIRST_REGION_ID as usize) as u8;
    let directions = [(-1i32, -1i32), (1, -1), (1, 1), (-1, 1)];
    let mut best = [None; 4];
    let mut best_score = [i64::MIN; 4];

    for y in 0..h as i32 {
        for x in 0..w as i32 {
            if pixel_label(frame, w, x, y) != target_label {
                continue;
            }
            let dx = (x - centre.x) as i64;
            let dy = (y - centre.y) as i64;
            for (i, &(ux, uy)) in directions.iter().enumerate() {
                let score = dx * ux as i64 + dy * uy as i64;
                if score > best_score[i] {
                    best_score[i] = score;
                    best[i] = Some(Point::new(x, y));
                }
            }
        }
    }
    let _ = regions;
    Some([best[0]?, best[1]?, best[2]?, best[3]?])
}

fn are_colinear(corners: &[Point; 4]) -> bool {
    let a = corners[0];
    for pair in [(1, 2), (1, 3), (2, 3)] {
        let cross = a.cross(corners[pair.0], corners[pair.1]);
        if cross != 0 {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_1_1_3_1_1_matches_within_tolerance() {
        assert!(matches_capstone_ratio([3, 3, 9, 3, 3], 0.4));
        assert!(matches_capstone_ratio([3, 4, 10, 3, 2], 0.4));
        assert!(!matches_capstone_ratio([1, 1, 1, 1, 1], 0.4));
    }

    #[test]
    fn colinear_points_are_detected() {
        let pts = [Point::new(0, 0), Point::new(1, 1), Point::new(2, 2), Point::new(3, 3)];
        assert!(are_colinear(&pts));
        let pts2 = [Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)];
        assert!(!are_colinear(&pts2));
    }
}
