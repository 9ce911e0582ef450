// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Rustux Clock-Speed Calibration
//!
//! Determines the bus and CPU clock frequencies of a machine whose only
//! reliable time reference is a platform oscillator of known period (the VIA
//! timer) running next to the CPU decrementer.
//!
//! A calibration run samples both counters over the same window with
//! interrupts masked, turns the tick ratio into a raw bus frequency and a PLL
//! multiplier, snaps the raw frequency onto a known value, and repeats until
//! two consecutive runs agree. The result is reported as exact rationals so
//! the timekeeping code never sees floating point.
//!
//! # Usage
//!
//! ```ignore
//! use clockspeed::{arch::CpuInterrupts, clock, config::CalibrationConfig};
//!
//! let config = CalibrationConfig::from_cmdline(boot_args);
//! let calibration = clock::determine_clock_speeds(
//!     &mut sampler,
//!     &CpuInterrupts,
//!     clock::ReferenceAddress(via_base),
//!     &BUS_SPEEDS,
//!     &config,
//!     &mut clock::GlobalTimebase,
//! )?;
//! ```

#![cfg_attr(not(test), no_std)]

pub mod debug;
pub mod err;
pub mod config;
pub mod arch;
pub mod clock;

pub use clock::{
    determine_clock_speeds, resolve, Calibration, CalibrationResult, ClockFrequencyInfo,
    Convergence, DerivedRates, FrequencyCandidate, Measurement, ReferenceAddress, Sampler, Tier,
};
pub use config::CalibrationConfig;
pub use err::{Error, Result, SampleFault};
