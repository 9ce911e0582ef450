// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Derived Clock Rates
//!
//! Everything the timekeeping code needs follows from the bus frequency and
//! the PLL multiplier. Ratios stay exact; the Hz values truncate.

use super::types::{CalibrationResult, Ratio};

/// PLL multipliers are counted in halves
const PLL_STEPS_PER_MULTIPLE: u64 = 2;

/// The decrementer runs at one fourth of the bus clock
pub const BUS_TO_DECREMENTER: Ratio = Ratio::new(1, 4);

/// Clock rates computed from a calibration result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivedRates {
    pub bus_clock_hz: u64,
    pub cpu_clock_hz: u64,
    pub decrementer_clock_hz: u64,
    /// CPU clock over bus clock
    pub bus_to_cpu_ratio: Ratio,
    /// Decrementer clock over bus clock
    pub bus_to_decrementer_ratio: Ratio,
}

/// Compute the clock rates for `result`
pub fn derive_rates(result: &CalibrationResult) -> DerivedRates {
    let num = result.bus_freq_numerator();
    let den = result.bus_freq_denominator();
    let pll = u64::from(result.pll_multiplier_half_steps());

    let bus_clock_hz = num / den;

    let cpu_wide = u128::from(num) * u128::from(pll)
        / (u128::from(den) * u128::from(PLL_STEPS_PER_MULTIPLE));
    let cpu_clock_hz = u64::try_from(cpu_wide).unwrap_or(u64::MAX);

    DerivedRates {
        bus_clock_hz,
        cpu_clock_hz,
        decrementer_clock_hz: bus_clock_hz * BUS_TO_DECREMENTER.numerator
            / BUS_TO_DECREMENTER.denominator,
        bus_to_cpu_ratio: Ratio::new(pll, PLL_STEPS_PER_MULTIPLE),
        bus_to_decrementer_ratio: BUS_TO_DECREMENTER,
    }
}

/// Clock frequency record handed to the timebase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockFrequencyInfo {
    /// Bus clock in Hz, exact
    pub bus_clock_rate: Ratio,
    pub bus_to_cpu_rate: Ratio,
    pub bus_to_dec_rate: Ratio,
    pub bus_clock_rate_hz: u64,
    pub cpu_clock_rate_hz: u64,
    pub dec_clock_rate_hz: u64,
}

impl ClockFrequencyInfo {
    pub fn from_result(result: &CalibrationResult) -> Self {
        let rates = derive_rates(result);
        Self {
            bus_clock_rate: result.bus_freq(),
            bus_to_cpu_rate: rates.bus_to_cpu_ratio,
            bus_to_dec_rate: rates.bus_to_decrementer_ratio,
            bus_clock_rate_hz: rates.bus_clock_hz,
            cpu_clock_rate_hz: rates.cpu_clock_hz,
            dec_clock_rate_hz: rates.decrementer_clock_hz,
        }
    }

    /// Rates in the form [`derive_rates`] returns them
    pub fn rates(&self) -> DerivedRates {
        DerivedRates {
            bus_clock_hz: self.bus_clock_rate_hz,
            cpu_clock_hz: self.cpu_clock_rate_hz,
            decrementer_clock_hz: self.dec_clock_rate_hz,
            bus_to_cpu_ratio: self.bus_to_cpu_rate,
            bus_to_decrementer_ratio: self.bus_to_dec_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_hz_bus() {
        let result = CalibrationResult::new(1_566_722, 1, 5).unwrap();
        let rates = derive_rates(&result);
        assert_eq!(rates.bus_clock_hz, 1_566_722);
        assert_eq!(rates.cpu_clock_hz, 3_916_805);
        assert_eq!(rates.decrementer_clock_hz, 391_680);
        assert_eq!(rates.bus_to_cpu_ratio, Ratio::new(5, 2));
        assert_eq!(rates.bus_to_decrementer_ratio, Ratio::new(1, 4));
    }

    #[test]
    fn test_thirds_bus_truncates() {
        let result = CalibrationResult::new(200_000_000, 3, 4).unwrap();
        let rates = derive_rates(&result);
        assert_eq!(rates.bus_clock_hz, 66_666_666);
        assert_eq!(rates.cpu_clock_hz, 133_333_333);
        assert_eq!(rates.decrementer_clock_hz, 16_666_666);
    }

    #[test]
    fn test_cpu_rate_uses_wide_intermediate() {
        // num * pll overflows u64 but the quotient does not
        let result = CalibrationResult::new(u64::MAX / 2, 1, 4).unwrap();
        assert_eq!(derive_rates(&result).cpu_clock_hz, u64::MAX - 1);

        let result = CalibrationResult::new(u64::MAX, 1, 8).unwrap();
        assert_eq!(derive_rates(&result).cpu_clock_hz, u64::MAX);
    }

    #[test]
    fn test_frequency_info() {
        let result = CalibrationResult::new(200_000_000, 3, 9).unwrap();
        let info = ClockFrequencyInfo::from_result(&result);
        assert_eq!(info.bus_clock_rate, Ratio::new(200_000_000, 3));
        assert_eq!(info.bus_to_cpu_rate, Ratio::new(9, 2));
        assert_eq!(info.bus_to_dec_rate, Ratio::new(1, 4));
        assert_eq!(info.cpu_clock_rate_hz, 300_000_000);
        assert_eq!(info.rates(), derive_rates(&result));
    }
}
