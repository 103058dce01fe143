//! Stage E: grid assembly (Section 4.E). Groups capstone triplets into
//! top-left/top-right/bottom-left roles, estimates the symbol's grid size
//! from the timing pattern, locates the alignment pattern for large
//! versions, and fits the final perspective map.

use crate::capstone::Capstone;
use crate::geometry::{Perspective, Point};
use crate::region::Region;
use crate::tables;
use crate::util::tracing_wrappers::*;

#[derive(Debug, Clone)]
pub struct Grid {
    pub cap_indices: [usize; 3],
    pub align_point: Option<Point>,
    pub tpep: [Point; 3],
    pub grid_size: usize,
    pub homography: Perspective,
}

/// Builds every grid that can be assembled from `capstones`, in
/// capstone-triplet acceptance order (Section 5 "Ordering").
pub fn assemble_grids(frame: &[u8], w: usize, h: usize, capstones: &[Capstone], regions: &[Region]) -> Vec<Grid> {
    let mut grids = Vec::new();
    let n = capstones.len();
    for i in 0..n {
        if capstones[i].grid_index.is_some() {
            continue;
        }
        for j in (i + 1)..n {
            if capstones[j].grid_index.is_some() {
                continue;
            }
            for k in (j + 1)..n {
                if capstones[k].grid_index.is_some() {
                    continue;
                }
                if let Some(grid) = try_build_grid(frame, w, h, capstones, [i, j, k], regions) {
                    debug!(i, j, k, size = grid.grid_size, "grid accepted");
                    grids.push(grid);
                    if grids.len() >= crate::config::MAX_GRIDS {
                        return grids;
                    }
                }
            }
        }
    }
    grids
}

fn try_build_grid(frame: &[u8], w: usize, h: usize, capstones: &[Capstone], idx: [usize; 3], regions: &[Region]) -> Option<Grid> {
    let pts = [capstones[idx[0]].centre, capstones[idx[1]].centre, capstones[idx[2]].centre];

    // Section 4.E.1: TL is whichever capstone's opposite angle is closest to
    // 90 degrees.
    let angle_cos = |a: Point, b: Point, c: Point| -> f64 {
        let abx = (b.x - a.x) as f64;
        let aby = (b.y - a.y) as f64;
        let acx = (c.x - a.x) as f64;
        let acy = (c.y - a.y) as f64;
        let dot = abx * acx + aby * acy;
        let mag = ((abx * abx + aby * aby) * (acx * acx + acy * acy)).sqrt();
        if mag < 1e-9 { 1.0 } else { (dot / mag).clamp(-1.0, 1.0) }
    };
    let cos0 = angle_cos(pts[0], pts[1], pts[2]).abs();
    let cos1 = angle_cos(pts[1], pts[0], pts[2]).abs();
    let cos2 = angle_cos(pts[2], pts[0], pts[1]).abs();
    let tl_local = if cos0 <= cos1 && cos0 <= cos2 {
        0
    } else if cos1 <= cos2 {
        1
    } else {
        2
    };
    let others: Vec<usize> = (0..3).filter(|&x| x != tl_local).collect();
    let tl = pts[tl_local];
    let a = pts[others[0]];
    let b = pts[others[1]];

    // Section 4.E.2: TR/BL distinguished by handedness.
    let cross = tl.cross(a, b);
    if cross == 0 {
        debug!("grid rejected: capstone centres are colinear");
        return None;
    }
    let (tr, bl, tr_local, bl_local) =
        if cross > 0 { (a, b, others[0], others[1]) } else { (b, a, others[1], others[0]) };

    let cap_tl = &capstones[idx[tl_local]];
    let cap_tr = &capstones[idx[tr_local]];
    let cap_bl = &capstones[idx[bl_local]];

    // Section 4.E.3: timing-pattern walk to recover grid_size.
    let tp_tr_end = walk_timing_pattern(frame, w, h, tl, tr, regions);
    let tp_bl_end = walk_timing_pattern(frame, w, h, tl, bl, regions);
    let modules_tr = estimate_modules(tl, tr, tp_tr_end.1);
    let modules_bl = estimate_modules(tl, bl, tp_bl_end.1);
    let size_estimate = (modules_tr + modules_bl) / 2.0 + 7.0;
    let grid_size = snap_to_valid_size(size_estimate)?;
    let version = tables::version_for_grid_size(grid_size)?;

    let mut align_point = None;
    if version > 6 {
        let predicted = predict_alignment_point(cap_tl, cap_tr, cap_bl, grid_size);
        align_point = search_alignment_pattern(frame, w, h, predicted, regions);
    }

    let correspondences = build_correspondences(cap_tl, cap_tr, cap_bl, grid_size, align_point);
    let homography = Perspective::fit_overdetermined(&correspondences)?;

    Some(Grid {
        cap_indices: idx,
        align_point,
        tpep: [tp_tr_end.0, tp_bl_end.0, Point::new(0, 0)],
        grid_size,
        homography,
    })
}

fn snap_to_valid_size(estimate: f64) -> Option<usize> {
    let rounded = estimate.round() as i64;
    let mut best: Option<(usize, i64)> = None;
    for version in 1u8..=40 {
        let size = tables::grid_size_for_version(version) as i64;
        let diff = (size - rounded).abs();
        if best.map(|(_, d)| diff < d).unwrap_or(true) {
            best = Some((size as usize, diff));
        }
    }
    let (size, diff) = best?;
    // Reject if the closest valid size is implausibly far from the estimate.
    if diff > 8 { None } else { Some(size) }
}

fn estimate_modules(from: Point, to: Point, _walked_to: Point) -> f64 {
    (from.distance2(to) as f64).sqrt()
}

/// Counts black/white transitions walking from just outside `from` toward
/// `to`, approximating the timing-pattern module count (Section 4.E.3).
/// Returns the last sampled point and the number of transitions observed.
fn walk_timing_pattern(frame: &[u8], w: usize, h: usize, from: Point, to: Point, regions: &[Region]) -> (Point, usize) {
    let dx = (to.x - from.x) as f64;
    let dy = (to.y - from.y) as f64;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1.0 {
        return (from, 0);
    }
    let steps = len.round() as usize;
    let mut transitions = 0usize;
    let mut last_black: Option<bool> = None;
    let mut last_point = from;
    for s in 0..=steps {
        let t = s as f64 / steps as f64;
        let x = (from.x as f64 + dx * t).round() as i32;
        let y = (from.y as f64 + dy * t).round() as i32;
        if x < 0 || y < 0 || x as usize >= w || y as usize >= h {
            continue;
        }
        last_point = Point::new(x, y);
        let label = frame[y as usize * w + x as usize];
        let black = crate::region::is_black(label, regions);
        if let Some(prev) = last_black {
            if prev != black {
                transitions += 1;
            }
        }
        last_black = Some(black);
    }
    (last_point, transitions)
}

fn predict_alignment_point(tl: &Capstone, tr: &Capstone, bl: &Capstone, grid_size: usize) -> Point {
    // c . (grid_size - 7, grid_size - 7), approximated via the affine frame
    // spanned by the three capstone centres (Section 4.E.3).
    let u = (grid_size - 7) as f64 / (grid_size as f64);
    let v = u;
    let ex = tl.centre.x as f64 + u * (tr.centre.x - tl.centre.x) as f64 + v * (bl.centre.x - tl.centre.x) as f64;
    let ey = tl.centre.y as f64 + u * (tr.centre.y - tl.centre.y) as f64 + v * (bl.centre.y - tl.centre.y) as f64;
    Point::new(ex.round() as i32, ey.round() as i32)
}

/// Searches a small window around `predicted` for a 1:1:1:1:1 ring-in-dot
/// signature (Section 4.E.3). Returns the refined centre, if found.
fn search_alignment_pattern(frame: &[u8], w: usize, h: usize, predicted: Point, regions: &[Region]) -> Option<Point> {
    let radius = 6i32;
    let mut best: Option<(Point, i64)> = None;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let x = predicted.x + dx;
            let y = predicted.y + dy;
            if x < 2 || y < 2 || (x as usize) >= w - 2 || (y as usize) >= h - 2 {
                continue;
            }
            if is_alignment_centre(frame, w, x, y, regions) {
                let dist = (dx * dx + dy * dy) as i64;
                if best.map(|(_, d)| dist < d).unwrap_or(true) {
                    best = Some((Point::new(x, y), dist));
                }
            }
        }
    }
    best.map(|(p, _)| p)
}

fn is_alignment_centre(frame: &[u8], w: usize, x: i32, y: i32, regions: &[Region]) -> bool {
    let at = |dx: i32, dy: i32| -> bool {
        let px = x + dx;
        let py = y + dy;
        let label = frame[py as usize * w + px as usize];
        crate::region::is_black(label, regions)
    };
    // 5x1 horizontal probe through the candidate centre: dark,light,dark,light,dark.
    at(0, 0) && !at(-1, 0) && at(-2, 0) && !at(1, 0) && at(2, 0)
}

fn build_correspondences(
    tl: &Capstone,
    tr: &Capstone,
    bl: &Capstone,
    grid_size: usize,
    align_point: Option<Point>,
) -> Vec<((f64, f64), (f64, f64))> {
    let size = grid_size as f64;
    let mut out = Vec::with_capacity(13);
    let quad = |corners: &[Point; 4], ou: f64, ov: f64| -> [((f64, f64), (f64, f64)); 4] {
        let uv = [(0.0, 0.0), (7.0, 0.0), (7.0, 7.0), (0.0, 7.0)];
        std::array::from_fn(|i| ((uv[i].0 + ou, uv[i].1 + ov), (corners[i].x as f64, corners[i].y as f64)))
    };
    out.extend(quad(&tl.corners, 0.0, 0.0));
    out.extend(quad(&tr.corners, size - 7.0, 0.0));
    out.extend(quad(&bl.corners, 0.0, size - 7.0));
    if let Some(p) = align_point {
        out.push(((size - 7.0, size - 7.0), (p.x as f64, p.y as f64)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_to_valid_size_rounds_to_nearest_version() {
        assert_eq!(snap_to_valid_size(21.3), Some(21));
        assert_eq!(snap_to_valid_size(45.0), Some(45));
        assert_eq!(snap_to_valid_size(1000.0), None);
    }
}
