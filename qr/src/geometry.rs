//! Integer image-plane geometry and the 8-parameter projective map used by
//! every capstone and grid. Kept free of a linear-algebra dependency, solving
//! the small dense systems here by hand instead of pulling one in.

use crate::util::tracing_wrappers::*;

/// An integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    pub fn cross(self, a: Point, b: Point) -> i64 {
        let ax = (a.x - self.x) as i64;
        let ay = (a.y - self.y) as i64;
        let bx = (b.x - self.x) as i64;
        let by = (b.y - self.y) as i64;
        ax * by - ay * bx
    }

    pub fn distance2(self, other: Point) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }
}

/// The 8-parameter projective map
/// `(u, v) -> (x, y) = ((c0 u + c1 v + c2) / (c6 u + c7 v + 1), (c3 u + c4 v + c5) / (c6 u + c7 v + 1))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perspective {
    pub c: [f64; 8],
}

impl Perspective {
    /// Maps a `(u, v)` grid coordinate to image-plane `(x, y)`.
    pub fn map(&self, u: f64, v: f64) -> (f64, f64) {
        let c = &self.c;
        let den = c[6] * u + c[7] * v + 1.0;
        ((c[0] * u + c[1] * v + c[2]) / den, (c[3] * u + c[4] * v + c[5]) / den)
    }

    /// Maps a cell index `(u, v)` to its rounded centre pixel, per section 4.F.
    pub fn map_cell(&self, u: usize, v: usize) -> Point {
        let (x, y) = self.map(u as f64 + 0.5, v as f64 + 0.5);
        Point::new(x.round() as i32, y.round() as i32)
    }

    /// Fits the homography mapping `(0,0), (7,0), (7,7), (0,7)` to the four
    /// capstone corners (section 4.D.6), via the closed-form 4-point projective
    /// solve (equivalent to the Gauss-Jordan elimination of section 9, specialised
    /// to an exactly-determined 8x8 system).
    pub fn from_capstone_corners(corners: [Point; 4]) -> Option<Perspective> {
        let src = [
            (0.0, 0.0),
            (7.0, 0.0),
            (7.0, 7.0),
            (0.0, 7.0),
        ];
        let dst = corners.map(|p| (p.x as f64, p.y as f64));
        fit_projective(&src, &dst)
    }

    /// Refits the homography from an arbitrary set of `(u, v) -> (x, y)`
    /// correspondences (TL/TR/BL capstone corners plus, if present, the
    /// alignment point), via Gauss-Jordan elimination on the normal
    /// equations (section 4.E.4, section 9 "Homography solve").
    pub fn fit_overdetermined(points: &[((f64, f64), (f64, f64))]) -> Option<Perspective> {
        if points.len() < 4 {
            return None;
        }
        // Build the 8x8 normal-equations system A^T A c = A^T b from the
        // linearised projective equations:
        //   x = c0 u + c1 v + c2 - c6 u x - c7 v x
        //   y = c3 u + c4 v + c5 - c6 u y - c7 v y
        let mut ata = [[0.0f64; 8]; 8];
        let mut atb = [0.0f64; 8];
        for &((u, v), (x, y)) in points {
            let rows = [
                ([u, v, 1.0, 0.0, 0.0, 0.0, -u * x, -v * x], x),
                ([0.0, 0.0, 0.0, u, v, 1.0, -u * y, -v * y], y),
            ];
            for (row, rhs) in rows {
                for i in 0..8 {
                    atb[i] += row[i] * rhs;
                    for j in 0..8 {
                        ata[i][j] += row[i] * row[j];
                    }
                }
            }
        }
        let c = gauss_jordan_solve(ata, atb)?;
        Some(Perspective { c })
    }
}

/// Exact 4-point projective fit, used for capstone homographies where the
/// correspondence set is always exactly 4 points.
fn fit_projective(src: &[(f64, f64); 4], dst: &[(f64, f64); 4]) -> Option<Perspective> {
    let points: Vec<_> = src.iter().zip(dst.iter()).map(|(&s, &d)| (s, d)).collect();
    Perspective::fit_overdetermined(&points)
}

/// Solves `a x = b` for an 8x8 system via Gauss-Jordan elimination with
/// partial pivoting. Returns `None` if `a` is (numerically) singular.
fn gauss_jordan_solve(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> Option<[f64; 8]> {
    const N: usize = 8;
    for col in 0..N {
        let mut pivot_row = col;
        let mut pivot_val = a[col][col].abs();
        for row in (col + 1)..N {
            let v = a[row][col].abs();
            if v > pivot_val {
                pivot_val = v;
                pivot_row = row;
            }
        }
        if pivot_val < 1e-12 {
            debug!(column = col, "singular homography normal matrix");
            return None;
        }
        if pivot_row != col {
            a.swap(col, pivot_row);
            b.swap(col, pivot_row);
        }
        let pivot = a[col][col];
        for j in 0..N {
            a[col][j] /= pivot;
        }
        b[col] /= pivot;
        for row in 0..N {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..N {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }
    Some(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_like_square_maps_corners() {
        let corners = [
            Point::new(10, 10),
            Point::new(80, 10),
            Point::new(80, 80),
            Point::new(10, 80),
        ];
        let persp = Perspective::from_capstone_corners(corners).unwrap();
        let (x0, y0) = persp.map(0.0, 0.0);
        assert!((x0 - 10.0).abs() < 1e-6);
        assert!((y0 - 10.0).abs() < 1e-6);
        let (x1, y1) = persp.map(7.0, 7.0);
        assert!((x1 - 80.0).abs() < 1e-6);
        assert!((y1 - 80.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_points_are_rejected() {
        let corners = [
            Point::new(0, 0),
            Point::new(1, 1),
            Point::new(2, 2),
            Point::new(3, 3),
        ];
        assert!(Perspective::from_capstone_corners(corners).is_none());
    }

    #[test]
    fn cross_product_sign_indicates_handedness() {
        let origin = Point::new(0, 0);
        let a = Point::new(1, 0);
        let b = Point::new(0, 1);
        assert!(origin.cross(a, b) > 0);
        assert!(origin.cross(b, a) < 0);
    }
}
