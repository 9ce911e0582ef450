// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Clock Speed Determination
//!
//! Top-level calibration run: sample with interrupts masked, resolve the
//! bus frequency, derive the clock rates and publish them.

use crate::arch::{InterruptControl, InterruptGuard};
use crate::config::CalibrationConfig;
use crate::err::Result;
use crate::log_info;

use super::rates::{ClockFrequencyInfo, DerivedRates};
use super::resolver::{Convergence, FrequencyResolver, Tier};
use super::sampler::{Measurement, ReferenceAddress, Sampler};
use super::timebase::TimebaseSink;
use super::types::{CalibrationResult, FrequencyCandidate};

/// Outcome of a successful calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub result: CalibrationResult,
    /// What was published to the timebase
    pub info: ClockFrequencyInfo,
    /// Rule that produced the final bus frequency
    pub tier: Tier,
    pub convergence: Convergence,
}

impl Calibration {
    pub fn rates(&self) -> DerivedRates {
        self.info.rates()
    }
}

/// Sampler that masks interrupts for the duration of each sample
struct MaskedSampler<'i, S, I: InterruptControl> {
    inner: S,
    interrupts: &'i I,
}

impl<S: Sampler, I: InterruptControl> Sampler for MaskedSampler<'_, S, I> {
    fn sample(&mut self, reference: ReferenceAddress) -> Result<Measurement> {
        let _guard = InterruptGuard::new(self.interrupts);
        self.inner.sample(reference)
    }
}

/// Calibrate the bus and CPU clocks and publish the result
///
/// Interrupts are masked around every sample and restored between samples
/// and on every error path. `sink` is called exactly once on success and
/// never on failure.
///
/// # Arguments
///
/// * `sampler` - Tick-counting backend
/// * `interrupts` - Interrupt controller for the current CPU
/// * `reference` - Hardware address of the reference oscillator
/// * `candidates` - Known bus frequencies, most preferred first
/// * `config` - Calibration tunables
/// * `sink` - Receiver for the derived rates
pub fn determine_clock_speeds<S, I, T>(
    sampler: S,
    interrupts: &I,
    reference: ReferenceAddress,
    candidates: &[FrequencyCandidate],
    config: &CalibrationConfig,
    sink: &mut T,
) -> Result<Calibration>
where
    S: Sampler,
    I: InterruptControl,
    T: TimebaseSink + ?Sized,
{
    let resolver = FrequencyResolver::new(config, candidates)?;
    let masked = MaskedSampler {
        inner: sampler,
        interrupts,
    };
    let resolution = resolver.resolve(masked, reference)?;

    let info = ClockFrequencyInfo::from_result(&resolution.result);
    log_info!(
        "bus {}/{} Hz ({:?}), pll {}/2 after {:?}",
        info.bus_clock_rate.numerator,
        info.bus_clock_rate.denominator,
        resolution.tier,
        resolution.result.pll_multiplier_half_steps(),
        resolution.convergence
    );
    sink.publish(&info);

    Ok(Calibration {
        result: resolution.result,
        info,
        tier: resolution.tier,
        convergence: resolution.convergence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::testing::RecordingInterrupts;
    use crate::clock::testing::ScriptedSampler;
    use crate::clock::timebase::{self, GlobalTimebase};
    use crate::clock::types::Ratio;
    use crate::err::{Error, SampleFault};

    const VIA: ReferenceAddress = ReferenceAddress(0xF3016000);

    /// Fails the test if a sample is taken with interrupts enabled
    struct MaskCheckingSampler<'a> {
        interrupts: &'a RecordingInterrupts,
        inner: ScriptedSampler,
    }

    impl Sampler for MaskCheckingSampler<'_> {
        fn sample(&mut self, reference: ReferenceAddress) -> Result<Measurement> {
            assert!(!self.interrupts.enabled.get(), "sampled with interrupts enabled");
            self.inner.sample(reference)
        }
    }

    /// Sink that counts publications
    #[derive(Default)]
    struct CountingSink {
        published: Vec<ClockFrequencyInfo>,
    }

    impl TimebaseSink for CountingSink {
        fn publish(&mut self, info: &ClockFrequencyInfo) {
            self.published.push(*info);
        }
    }

    #[test]
    fn test_determine_clock_speeds() {
        let ints = RecordingInterrupts::new();
        let sampler = MaskCheckingSampler {
            interrupts: &ints,
            inner: ScriptedSampler::new(&[(56_402, 1_200_000), (56_402, 1_200_000)]),
        };
        let mut sink = CountingSink::default();

        let calibration = determine_clock_speeds(
            sampler,
            &ints,
            VIA,
            &[],
            &CalibrationConfig::default(),
            &mut sink,
        )
        .unwrap();

        assert_eq!(calibration.result, CalibrationResult::new(200_000_000, 3, 4).unwrap());
        assert_eq!(calibration.tier, Tier::FiftyThirds);
        assert_eq!(calibration.convergence, Convergence::Converged { attempts: 2 });

        let rates = calibration.rates();
        assert_eq!(rates.bus_clock_hz, 66_666_666);
        assert_eq!(rates.cpu_clock_hz, 133_333_333);
        assert_eq!(rates.decrementer_clock_hz, 16_666_666);
        assert_eq!(rates.bus_to_cpu_ratio, Ratio::new(4, 2));

        assert_eq!(sink.published, [calibration.info]);
        assert_eq!(ints.disables.get(), 2);
        assert!(ints.balanced());
    }

    #[test]
    fn test_interrupts_restored_between_samples() {
        let ints = RecordingInterrupts::new();
        let script = [(75_202, 1_200_000), (56_402, 1_200_000), (28_201, 1_200_000)];
        let sampler = MaskCheckingSampler {
            interrupts: &ints,
            inner: ScriptedSampler::new(&script).cycle(),
        };
        let mut sink = CountingSink::default();
        let config = CalibrationConfig::default().with_max_retries(5);

        let calibration =
            determine_clock_speeds(sampler, &ints, VIA, &[], &config, &mut sink).unwrap();

        assert_eq!(calibration.convergence, Convergence::Exhausted { attempts: 5 });
        assert_eq!(ints.disables.get(), 5);
        assert_eq!(ints.restores.get(), 5);
        assert!(ints.balanced());
        assert_eq!(sink.published.len(), 1);
    }

    #[test]
    fn test_fault_restores_interrupts_and_skips_publish() {
        let ints = RecordingInterrupts::new();
        let sampler = MaskCheckingSampler {
            interrupts: &ints,
            inner: ScriptedSampler::new(&[(37_601, 0)]),
        };
        let mut sink = CountingSink::default();

        let err = determine_clock_speeds(
            sampler,
            &ints,
            VIA,
            &[],
            &CalibrationConfig::default(),
            &mut sink,
        )
        .unwrap_err();

        assert_eq!(err, Error::HardwareFault(SampleFault::ZERO_DECREMENTER));
        assert!(ints.balanced());
        assert!(sink.published.is_empty());
    }

    #[test]
    fn test_strict_non_convergence_skips_publish() {
        let ints = RecordingInterrupts::new();
        let script = [(75_202, 1_200_000), (56_402, 1_200_000)];
        let mut sampler = ScriptedSampler::new(&script).cycle();
        let mut sink = CountingSink::default();
        let config = CalibrationConfig::default().with_max_retries(2).with_strict(true);

        let err = determine_clock_speeds(&mut sampler, &ints, VIA, &[], &config, &mut sink)
            .unwrap_err();

        assert!(matches!(err, Error::NonConvergence { attempts: 2, .. }));
        assert!(sink.published.is_empty());
        assert!(ints.balanced());
    }

    #[test]
    fn test_bad_table_samples_nothing() {
        let ints = RecordingInterrupts::new();
        let mut sampler = ScriptedSampler::repeating(37_601, 1_200_000);
        let mut sink = CountingSink::default();
        let table = [FrequencyCandidate::new(0, 1)];

        let err = determine_clock_speeds(
            &mut sampler,
            &ints,
            VIA,
            &table,
            &CalibrationConfig::default(),
            &mut sink,
        )
        .unwrap_err();

        assert_eq!(err, Error::InvalidCandidate { index: 0 });
        assert_eq!(sampler.calls(), 0);
        assert_eq!(ints.disables.get(), 0);
    }

    #[test]
    fn test_publishes_to_global_timebase() {
        let _lock = timebase::TEST_LOCK.lock();
        timebase::reset_for_test();

        let ints = RecordingInterrupts::new();
        let table = [FrequencyCandidate::hz(100_010_000)];
        let calibration = determine_clock_speeds(
            ScriptedSampler::repeating(37_601, 1_200_000),
            &ints,
            VIA,
            &table,
            &CalibrationConfig::from_cmdline("clock.tries=4"),
            &mut GlobalTimebase,
        )
        .unwrap();

        assert_eq!(calibration.tier, Tier::Table(0));
        assert_eq!(timebase::clock_info(), Some(calibration.info));
        assert_eq!(calibration.info.bus_clock_rate_hz, 100_010_000);
    }
}
