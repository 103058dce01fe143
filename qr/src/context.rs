//! Stage A (frame ownership) and the public pipeline driver (Section 4.A,
//! Section 4.J). [`Context`] owns every buffer the pipeline needs so a
//! caller can process a video stream without reallocating per frame.

use crate::bitstream;
use crate::capstone::{self, Capstone};
use crate::config::Config;
use crate::data::{Code, Data};
use crate::error::{DecodeError, Error};
use crate::grid::{self, Grid};
use crate::region::RegionLabeller;
use crate::sample;
use crate::threshold;
use crate::util::tracing_wrappers::*;

/// Owns the luminance frame buffer and every intermediate table the
/// recognition pipeline builds, so repeated calls across a video stream
/// reuse allocations instead of starting fresh (Section 4.A).
pub struct Context {
    config: Config,
    width: usize,
    height: usize,
    frame: Vec<u8>,
    labeller: Option<RegionLabeller>,
    capstones: Vec<Capstone>,
    grids: Vec<Grid>,
}

impl Context {
    /// Creates an empty context with default tunables. Call [`Context::resize`]
    /// before the first [`Context::begin`].
    pub fn new() -> Self {
        Context::with_config(Config::default())
    }

    /// Creates an empty context with caller-supplied tunables (Section 4.L).
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`Config::validate`].
    pub fn with_config(config: Config) -> Self {
        config.validate().expect("invalid Config");
        Context { config, width: 0, height: 0, frame: Vec::new(), labeller: None, capstones: Vec::new(), grids: Vec::new() }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reallocates the frame buffer for a `w x h` image. All-or-nothing: on
    /// allocation failure, the context is left at its previous dimensions
    /// (Section 4.A: "resize never leaves the context half-updated").
    pub fn resize(&mut self, w: usize, h: usize) -> Result<(), Error> {
        if w == 0 || h == 0 {
            return Err(Error::InvalidDimensions(w, h));
        }
        let needed = w.checked_mul(h).ok_or(Error::InvalidDimensions(w, h))?;
        let mut new_frame = Vec::new();
        new_frame.try_reserve_exact(needed).map_err(|e| Error::Alloc(w, h, e))?;
        new_frame.resize(needed, 0);

        self.frame = new_frame;
        self.width = w;
        self.height = h;
        self.labeller = Some(RegionLabeller::new(&self.config, h));
        self.capstones.clear();
        self.grids.clear();
        debug!(w, h, "context resized");
        Ok(())
    }

    /// Hands out the writable luminance buffer for the caller to fill with
    /// the next frame's grayscale pixels (Section 4.A).
    pub fn begin(&mut self) -> &mut [u8] {
        self.capstones.clear();
        self.grids.clear();
        &mut self.frame
    }

    /// Runs the full pipeline (threshold -> region labelling -> capstone
    /// detection -> grid assembly) over the buffer filled since [`Context::begin`]
    /// (Section 4.A-4.E).
    pub fn end(&mut self) {
        let (w, h) = (self.width, self.height);
        threshold::threshold(&mut self.frame, w, h, &self.config);

        let labeller = self.labeller.get_or_insert_with(|| RegionLabeller::new(&self.config, h));
        labeller.run(&mut self.frame, w, h);

        self.capstones = capstone::find_capstones(&self.frame, w, h, &labeller.regions, &self.config);
        self.grids = grid::assemble_grids(&self.frame, w, h, &self.capstones, &labeller.regions);
        for (i, grid) in self.grids.iter().enumerate() {
            for &idx in &grid.cap_indices {
                self.capstones[idx].grid_index = Some(i);
            }
        }
        debug!(capstones = self.capstones.len(), grids = self.grids.len(), "pipeline pass complete");
    }

    /// Number of grids (candidate symbols) found by the most recent [`Context::end`].
    pub fn count(&self) -> usize {
        self.grids.len()
    }

    /// Samples grid `index` into a [`Code`] (Section 4.F).
    pub fn extract(&self, index: usize) -> Result<Code, Error> {
        let grid = self.grids.get(index).ok_or(Error::GridIndexOutOfBounds(index, self.grids.len()))?;
        let labeller = self.labeller.as_ref().expect("extract called before a successful end()");
        Ok(sample::sample(&self.frame, self.width, self.height, &labeller.regions, grid))
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

/// Decodes a sampled [`Code`] into its [`Data`] payload (Section 4.G-4.I).
/// Pure: touches no `Context` state, so callers may decode off-thread.
pub fn decode(code: &Code) -> Result<Data, DecodeError> {
    bitstream::decode(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_then_begin_end_on_blank_frame_finds_nothing() {
        let mut ctx = Context::new();
        ctx.resize(64, 64).unwrap();
        let buf = ctx.begin();
        buf.fill(255);
        ctx.end();
        assert_eq!(ctx.count(), 0);
    }

    #[test]
    fn extract_out_of_bounds_is_an_error() {
        let mut ctx = Context::new();
        ctx.resize(32, 32).unwrap();
        ctx.begin().fill(255);
        ctx.end();
        assert!(matches!(ctx.extract(0), Err(Error::GridIndexOutOfBounds(0, 0))));
    }

    #[test]
    fn resize_rejects_zero_dimensions() {
        let mut ctx = Context::new();
        assert!(matches!(ctx.resize(0, 10), Err(Error::InvalidDimensions(0, 10))));
    }
}
