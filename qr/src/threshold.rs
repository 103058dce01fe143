//! Stage B: row-wise adaptive binarisation (Section 4.B). Rewrites an H x W
//! grayscale buffer in place into `{BLACK = 0, WHITE = 1}`.

use crate::config::Config;
use crate::util::tracing_wrappers::*;

/// Thresholds `frame` (row-major, `w * h` bytes) in place using a moving
/// average over roughly `w * config.threshold_window_fraction` pixels,
/// walked in serpentine order so the running average carries between rows
/// and smooths illumination gradients (Section 4.B).
pub fn threshold(frame: &mut [u8], w: usize, h: usize, config: &Config) {
    if w == 0 || h == 0 {
        return;
    }
    let window = ((w as f64 * config.threshold_window_fraction).round() as usize).max(2);
    let bias = config.threshold_bias_percent;

    // Running average seeded from the image's own mean brightness so the
    // very first row isn't biased toward pure black or white.
    let mut avg = frame[..w].iter().map(|&p| p as f64).sum::<f64>() / w as f64;

    for row in 0..h {
        let left_to_right = row % 2 == 0;
        let row_start = row * w;
        let indices: Box<dyn Iterator<Item = usize>> = if left_to_right {
            Box::new(0..w)
        } else {
            Box::new((0..w).rev())
        };
        for x in indices {
            let idx = row_start + x;
            let value = frame[idx] as f64;
            avg += (value - avg) / window as f64;
            frame[idx] = if value < avg * (1.0 - bias) { 0 } else { 1 };
        }
    }
    trace!(w, h, window, "threshold pass complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_bright_row_is_all_white() {
        let mut frame = vec![230u8; 10 * 4];
        threshold(&mut frame, 10, 4, &Config::default());
        assert!(frame.iter().all(|&p| p == 1));
    }

    #[test]
    fn a_dark_dip_is_detected_as_black() {
        let mut frame = vec![230u8; 20];
        frame[10] = 20;
        threshold(&mut frame, 20, 1, &Config::default());
        assert_eq!(frame[10], 0);
        assert_eq!(frame[0], 1);
    }
}
