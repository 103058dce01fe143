//! Tunable constants used across the pipeline, grouped so they can be
//! overridden by a caller instead of being scattered through the stages as
//! inline literals. The defaults reproduce the empirical values this design
//! was distilled from; see the Open Questions discussion for why they are
//! tunable rather than contractual.

/// Maximum number of region-table entries; must fit the `u8` pixel-label
/// representation (`region_capacity + 2 <= 256`).
pub const MAX_REGION_CAPACITY: u16 = 254;

/// Maximum number of capstones tracked per frame.
pub const MAX_CAPSTONES: usize = 32;

/// Maximum number of grids (symbols) tracked per frame.
pub const MAX_GRIDS: usize = 8;

/// Maximum symbol side length, in cells (version 40).
pub const MAX_GRID_SIZE: usize = 177;

/// `ceil(MAX_GRID_SIZE^2 / 8)`.
pub const MAX_BITMAP_BYTES: usize = (MAX_GRID_SIZE * MAX_GRID_SIZE).div_ceil(8);

/// QR-40-L byte-mode capacity.
pub const MAX_PAYLOAD_BYTES: usize = 8896;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Upper bound on the number of distinct regions tracked per frame.
    /// Validated against [`MAX_REGION_CAPACITY`] in [`Config::validate`].
    pub region_capacity: u16,
    /// Fraction of the image width used as the adaptive-threshold moving
    /// window (section 4.B: "running average of the last ~W/8 pixels").
    pub threshold_window_fraction: f64,
    /// A pixel is BLACK when it is at least this fraction below the running
    /// average (section 4.B: "5% below").
    pub threshold_bias_percent: f64,
    /// Tolerance band for the 1:1:3:1:1 capstone run-ratio test, expressed as
    /// a fraction of the expected run width (section 4.D: "+/-40%").
    pub capstone_run_tolerance: f64,
    /// Minimum and maximum ring-area / stone-area ratio accepted for a
    /// capstone (section 4.D: "between 1.5x and 4x").
    pub ring_area_ratio: (f64, f64),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            region_capacity: MAX_REGION_CAPACITY,
            threshold_window_fraction: 0.125,
            threshold_bias_percent: 0.05,
            capstone_run_tolerance: 0.40,
            ring_area_ratio: (1.5, 4.0),
        }
    }
}

impl Config {
    /// Checks the invariants the pipeline relies on; called from
    /// `Context::with_config`.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.region_capacity == 0 || self.region_capacity > MAX_REGION_CAPACITY {
            return Err("region_capacity must be in 1..=254 for a u8-backed label buffer");
        }
        if !(0.0..1.0).contains(&self.threshold_window_fraction) {
            return Err("threshold_window_fraction must be in [0, 1)");
        }
        if !(0.0..1.0).contains(&self.threshold_bias_percent) {
            return Err("threshold_bias_percent must be in [0, 1)");
        }
        Ok(())
    }
}
