// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Bus Frequency Resolver
//!
//! Turns clock samples into a bus frequency and PLL multiplier.
//!
//! Each attempt computes a raw bus frequency from the tick ratio and snaps
//! it onto the nearest plausible value. The first tier that matches wins:
//!
//! 1. [`Tier::Table`]: a caller-supplied known frequency
//! 2. [`Tier::HalfMegahertz`]: the nearest multiple of 0.5 MHz
//! 3. [`Tier::FiftyThirds`]: the nearest multiple of 50/3 MHz
//! 4. [`Tier::Raw`]: the raw value itself
//!
//! Attempts repeat until one yields the same numerator as the attempt
//! before it, or the retry budget runs out.

use crate::config::CalibrationConfig;
use crate::err::{Error, Result, SampleFault};
use crate::{log_debug, log_error, log_info, log_warn};

use super::sampler::{Measurement, ReferenceAddress, Sampler};
use super::types::{CalibrationResult, FrequencyCandidate, Ratio};

/// Rounding step for whole-Hz bus frequencies
const HALF_MHZ: u128 = 500_000;

/// Rounding step for bus frequencies in thirds of a Hz
const FIFTY_MHZ: u128 = 50_000_000;

/// Which reconciliation rule produced a bus frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Matched the candidate at this table index
    Table(usize),
    /// Rounded to a multiple of 500 kHz
    HalfMegahertz,
    /// Rounded to a multiple of 50/3 MHz
    FiftyThirds,
    /// No match; raw estimate used as is
    Raw,
}

/// How a resolve loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Convergence {
    /// Two consecutive attempts produced the same numerator
    Converged { attempts: u32 },
    /// The retry budget ran out first; the last attempt was kept
    Exhausted { attempts: u32 },
}

impl Convergence {
    /// Number of samples taken
    pub fn attempts(&self) -> u32 {
        match *self {
            Convergence::Converged { attempts } | Convergence::Exhausted { attempts } => attempts,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, Convergence::Converged { .. })
    }
}

/// Everything computed from one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub measurement: Measurement,
    pub raw_bus_freq: u64,
    pub raw_cpu_freq: u64,
    pub bus_freq: Ratio,
    pub pll_multiplier_half_steps: u32,
    pub tier: Tier,
}

/// Final outcome of a resolve loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub result: CalibrationResult,
    pub tier: Tier,
    pub convergence: Convergence,
}

/// Snap a raw bus frequency onto a known or rounded value
///
/// `max_freq_diff` is the tolerance per unit of denominator. Never fails:
/// the raw value is the last resort. A non-zero `raw` never yields a zero
/// numerator.
pub fn reconcile(raw: u64, candidates: &[FrequencyCandidate], max_freq_diff: u64) -> (Ratio, Tier) {
    let raw_wide = u128::from(raw);
    let tolerance = u128::from(max_freq_diff);

    for (index, candidate) in candidates.iter().enumerate() {
        let den = u128::from(candidate.denominator);
        if u128::from(candidate.numerator).abs_diff(raw_wide * den) < tolerance * den {
            return (Ratio::new(candidate.numerator, candidate.denominator), Tier::Table(index));
        }
    }

    // A rounding tier never turns a non-zero estimate into 0 Hz
    let rounded = (raw_wide + HALF_MHZ / 2) / HALF_MHZ * HALF_MHZ;
    if rounded != 0 && rounded.abs_diff(raw_wide) < tolerance {
        if let Ok(numerator) = u64::try_from(rounded) {
            return (Ratio::new(numerator, 1), Tier::HalfMegahertz);
        }
    }

    let thirds = raw_wide * 3;
    let rounded = (thirds + FIFTY_MHZ / 2) / FIFTY_MHZ * FIFTY_MHZ;
    if rounded != 0 && rounded.abs_diff(thirds) < tolerance * 3 {
        if let Ok(numerator) = u64::try_from(rounded) {
            return (Ratio::new(numerator, 3), Tier::FiftyThirds);
        }
    }

    (Ratio::new(raw, 1), Tier::Raw)
}

/// Sample-and-reconcile loop over one candidate table
pub struct FrequencyResolver<'c> {
    config: CalibrationConfig,
    candidates: &'c [FrequencyCandidate],
}

impl<'c> FrequencyResolver<'c> {
    /// Check the configuration and candidate table up front
    ///
    /// An empty table is accepted.
    pub fn new(config: &CalibrationConfig, candidates: &'c [FrequencyCandidate]) -> Result<Self> {
        config.validate()?;

        if let Some(index) = candidates.iter().position(|c| !c.is_valid()) {
            return Err(Error::InvalidCandidate { index });
        }

        Ok(Self {
            config: *config,
            candidates,
        })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Compute frequencies from one sample
    ///
    /// All faults found in the sample are reported together.
    pub fn evaluate(&self, measurement: &Measurement) -> Result<Attempt> {
        let dec_ticks = measurement.decrementer_ticks();
        let ref_ticks = measurement.reference_ticks();
        let mut fault = SampleFault::empty();

        // PLL modes are any integer times one half
        let pll_raw = self.config.pll_reference / dec_ticks;
        let pll = pll_raw / 2 + (pll_raw & 1);
        if pll == 0 {
            fault |= SampleFault::PLL_OUT_OF_RANGE;
        }

        // u64 * u32 always fits in u128; only the shifted quotient can overflow
        let scaled = u128::from(self.config.reference_scale) * u128::from(dec_ticks)
            / u128::from(ref_ticks);
        let raw_bus_freq = match u64::try_from(scaled >> self.config.scale_shift) {
            Ok(raw) => raw,
            Err(_) => {
                fault |= SampleFault::SCALE_OVERFLOW;
                0
            }
        };
        if raw_bus_freq == 0 && !fault.contains(SampleFault::SCALE_OVERFLOW) {
            fault |= SampleFault::ZERO_BUS_ESTIMATE;
        }

        if !fault.is_empty() {
            log_error!(
                "clock sample ref={} dec={} rejected: {:?}",
                ref_ticks,
                dec_ticks,
                fault
            );
            return Err(Error::HardwareFault(fault));
        }

        let raw_cpu_freq = raw_bus_freq.saturating_mul(u64::from(pll)) / 2;
        let (bus_freq, tier) = reconcile(raw_bus_freq, self.candidates, self.config.max_freq_diff);

        log_debug!(
            "clock sample ref={} dec={}: raw bus {} Hz, raw cpu {} Hz, pll {}/2 -> {}/{} ({:?})",
            ref_ticks,
            dec_ticks,
            raw_bus_freq,
            raw_cpu_freq,
            pll,
            bus_freq.numerator,
            bus_freq.denominator,
            tier
        );

        Ok(Attempt {
            measurement: *measurement,
            raw_bus_freq,
            raw_cpu_freq,
            bus_freq,
            pll_multiplier_half_steps: pll,
            tier,
        })
    }

    /// Sample until two consecutive attempts agree on the numerator
    ///
    /// The caller is responsible for masking interrupts around each
    /// `sample` call. A hardware fault ends the loop immediately.
    pub fn resolve<S: Sampler>(&self, mut sampler: S, reference: ReferenceAddress) -> Result<Resolution> {
        let mut previous: Option<u64> = None;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let measurement = sampler.sample(reference).map_err(|err| {
                log_error!("clock sample {} failed: {}", attempts, err);
                err
            })?;
            let attempt = self.evaluate(&measurement)?;

            let result = CalibrationResult::new(
                attempt.bus_freq.numerator,
                attempt.bus_freq.denominator,
                attempt.pll_multiplier_half_steps,
            )?;

            if previous == Some(attempt.bus_freq.numerator) {
                log_info!(
                    "bus frequency {}/{} converged after {} attempts",
                    result.bus_freq_numerator(),
                    result.bus_freq_denominator(),
                    attempts
                );
                return Ok(Resolution {
                    result,
                    tier: attempt.tier,
                    convergence: Convergence::Converged { attempts },
                });
            }
            previous = Some(attempt.bus_freq.numerator);

            if attempts >= self.config.max_retries {
                log_warn!(
                    "bus frequency did not settle in {} attempts, keeping {}/{}",
                    attempts,
                    result.bus_freq_numerator(),
                    result.bus_freq_denominator()
                );
                if self.config.strict {
                    return Err(Error::NonConvergence { attempts, last: result });
                }
                return Ok(Resolution {
                    result,
                    tier: attempt.tier,
                    convergence: Convergence::Exhausted { attempts },
                });
            }
        }
    }
}

/// Resolve the bus frequency with the default tunables
///
/// The sampler must mask interrupts itself or be called with them masked.
/// Exhausting `max_retries` returns the last attempt's result.
pub fn resolve<S: Sampler>(
    sampler: S,
    reference: ReferenceAddress,
    candidates: &[FrequencyCandidate],
    max_retries: u32,
) -> Result<CalibrationResult> {
    let config = CalibrationConfig::default().with_max_retries(max_retries);
    let resolver = FrequencyResolver::new(&config, candidates)?;
    Ok(resolver.resolve(sampler, reference)?.result)
}
