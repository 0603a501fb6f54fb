use crate::error::Error;

/// How the sweep walks its frequency ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepStyle {
    /// The step width is added to the current frequency at each step.
    Linear = 0,
    /// Steps are taken in a pseudorandom order across the ranges.
    Random = 1,
}

/// Configuration for a receive sweep, passed to
/// [`Device::start_rx_sweep`][crate::Device::start_rx_sweep].
///
/// A sweep continually retunes the receiver across the configured ranges,
/// delivering `bytes_per_step` bytes of samples at each tuning before moving
/// on. It is a tool for spectrum sensing, not active demodulation.
#[derive(Clone, Debug)]
pub struct SweepParams {
    /// Frequency ranges to sweep over, as `(start, stop)` pairs in MHz.
    /// Between 1 and 32 ranges, each with `start < stop`.
    pub freq_mhz: Vec<(u16, u16)>,
    /// Number of sample bytes to capture per tuning step, 1 to 262144.
    pub bytes_per_step: u32,
    /// Width of each tuning step in Hz, 1 to 20,000,000. The sample rate is
    /// a good value in general.
    pub step_width_hz: u32,
    /// Frequency offset added to each tuned frequency, in Hz. Must be below
    /// the step width.
    pub offset_hz: u32,
    /// Walk order across the ranges.
    pub style: SweepStyle,
}

const MAX_RANGES: usize = 32;
const MAX_BYTES_PER_STEP: u32 = 262_144;
const MAX_STEP_WIDTH_HZ: u32 = 20_000_000;

impl SweepParams {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.freq_mhz.is_empty() || self.freq_mhz.len() > MAX_RANGES {
            return Err(Error::InvalidParameter(
                "sweep needs between 1 and 32 frequency ranges",
            ));
        }
        if self.bytes_per_step == 0 || self.bytes_per_step > MAX_BYTES_PER_STEP {
            return Err(Error::InvalidParameter(
                "bytes per step must be between 1 and 262144",
            ));
        }
        if self.step_width_hz == 0 || self.step_width_hz > MAX_STEP_WIDTH_HZ {
            return Err(Error::InvalidParameter(
                "step width must be between 1 Hz and 20 MHz",
            ));
        }
        if self.offset_hz >= self.step_width_hz {
            return Err(Error::InvalidParameter(
                "offset must be below the step width",
            ));
        }
        for (lo, hi) in self.freq_mhz.iter().copied() {
            if lo >= hi {
                return Err(Error::InvalidParameter(
                    "each frequency range must have start < stop",
                ));
            }
        }
        Ok(())
    }

    // The native layout: start/stop pairs, flattened.
    pub(crate) fn flattened(&self) -> Vec<u16> {
        let mut list = Vec::with_capacity(self.freq_mhz.len() * 2);
        for (lo, hi) in self.freq_mhz.iter().copied() {
            list.push(lo);
            list.push(hi);
        }
        list
    }
}
