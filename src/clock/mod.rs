// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Bus and CPU Clock Calibration
//!
//! The decrementer runs at a fixed fraction of the bus clock, but the bus
//! clock itself is unknown at boot. It is measured by counting decrementer
//! ticks against a reference oscillator of known period, then snapped onto
//! a plausible bus frequency.
//!
//! # Layout
//!
//! - [`sampler`]: one reference/decrementer tick count pair
//! - [`resolver`]: raw estimate, reconciliation and the retry loop
//! - [`rates`]: CPU, bus and decrementer rates derived from the result
//! - [`timebase`]: publication of the rates to the timer code
//! - [`calibrate`]: the full run, with interrupts masked per sample

pub mod calibrate;
pub mod rates;
pub mod resolver;
pub mod sampler;
pub mod timebase;
pub mod types;

pub use calibrate::{determine_clock_speeds, Calibration};
pub use rates::{derive_rates, ClockFrequencyInfo, DerivedRates};
pub use resolver::{reconcile, resolve, Attempt, Convergence, FrequencyResolver, Resolution, Tier};
pub use sampler::{ClockTestData, Measurement, ReferenceAddress, RoutineSampler, Sampler};
#[cfg(target_arch = "powerpc")]
pub use sampler::via_sampler;
pub use timebase::{
    clock_info, publish_clock_info, register_timebase_callback, GlobalTimebase, TimebaseSink,
};
pub use types::{CalibrationResult, FrequencyCandidate, Ratio};

#[cfg(test)]
pub(crate) mod testing {
    use super::{Measurement, ReferenceAddress, Sampler};
    use crate::err::Result;

    /// Sampler that replays a fixed list of (reference, decrementer) counts
    pub struct ScriptedSampler {
        script: Vec<(u32, u32)>,
        cycle: bool,
        calls: u32,
        last_reference: Option<ReferenceAddress>,
    }

    impl ScriptedSampler {
        pub fn new(script: &[(u32, u32)]) -> Self {
            Self {
                script: script.to_vec(),
                cycle: false,
                calls: 0,
                last_reference: None,
            }
        }

        /// Same counts on every call
        pub fn repeating(reference_ticks: u32, decrementer_ticks: u32) -> Self {
            Self::new(&[(reference_ticks, decrementer_ticks)]).cycle()
        }

        /// Start over at the end of the script instead of panicking
        pub fn cycle(mut self) -> Self {
            self.cycle = true;
            self
        }

        pub fn calls(&self) -> u32 {
            self.calls
        }

        pub fn last_reference(&self) -> Option<ReferenceAddress> {
            self.last_reference
        }
    }

    impl Sampler for ScriptedSampler {
        fn sample(&mut self, reference: ReferenceAddress) -> Result<Measurement> {
            let mut index = self.calls as usize;
            if self.cycle {
                index %= self.script.len();
            }
            let (reference_ticks, decrementer_ticks) = *self
                .script
                .get(index)
                .unwrap_or_else(|| panic!("script exhausted after {} samples", self.calls));

            self.calls += 1;
            self.last_reference = Some(reference);
            Measurement::new(reference_ticks, decrementer_ticks)
        }
    }
}
