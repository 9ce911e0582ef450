// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Clock calibration data types

use crate::err::{Error, Result};

/// Exact rational value (numerator / denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ratio {
    pub numerator: u64,
    pub denominator: u64,
}

impl Ratio {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self { numerator, denominator }
    }
}

/// Known-good bus frequency, in Hz, as numerator / denominator
///
/// Thirds are common (e.g. 200000000 / 3 for a 66.67 MHz bus), which is
/// why candidates are not plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrequencyCandidate {
    pub numerator: u64,
    pub denominator: u64,
}

impl FrequencyCandidate {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self { numerator, denominator }
    }

    /// Whole-Hz candidate
    pub const fn hz(hz: u64) -> Self {
        Self::new(hz, 1)
    }

    /// Both terms non-zero
    pub const fn is_valid(&self) -> bool {
        self.numerator != 0 && self.denominator != 0
    }

    /// Decode the flat `[num0, den0, num1, den1, ...]` list platform
    /// firmware publishes into `table`
    ///
    /// # Returns
    ///
    /// The filled prefix of `table`
    pub fn parse_pairs<'t>(
        cells: &[u32],
        table: &'t mut [FrequencyCandidate],
    ) -> Result<&'t [FrequencyCandidate]> {
        if cells.len() % 2 != 0 {
            return Err(Error::OddCandidateList { len: cells.len() });
        }

        let count = cells.len() / 2;
        if count > table.len() {
            return Err(Error::CandidateOverflow { capacity: table.len() });
        }

        for (slot, pair) in table.iter_mut().zip(cells.chunks_exact(2)) {
            *slot = FrequencyCandidate::new(u64::from(pair[0]), u64::from(pair[1]));
        }

        Ok(&table[..count])
    }
}

/// Outcome of a calibration: bus frequency plus PLL multiplier
///
/// The denominator and multiplier are never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalibrationResult {
    bus_freq_numerator: u64,
    bus_freq_denominator: u64,
    pll_multiplier_half_steps: u32,
}

impl CalibrationResult {
    /// Build a result, rejecting a zero denominator or multiplier
    pub fn new(
        bus_freq_numerator: u64,
        bus_freq_denominator: u64,
        pll_multiplier_half_steps: u32,
    ) -> Result<Self> {
        if bus_freq_denominator == 0 || pll_multiplier_half_steps == 0 {
            return Err(Error::InvalidResult);
        }
        Ok(Self {
            bus_freq_numerator,
            bus_freq_denominator,
            pll_multiplier_half_steps,
        })
    }

    pub fn bus_freq_numerator(&self) -> u64 {
        self.bus_freq_numerator
    }

    pub fn bus_freq_denominator(&self) -> u64 {
        self.bus_freq_denominator
    }

    /// Bus frequency in Hz as an exact ratio
    pub fn bus_freq(&self) -> Ratio {
        Ratio::new(self.bus_freq_numerator, self.bus_freq_denominator)
    }

    /// CPU-to-bus multiplier in units of 1/2
    pub fn pll_multiplier_half_steps(&self) -> u32 {
        self.pll_multiplier_half_steps
    }
}
