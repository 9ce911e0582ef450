// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Calibration Error Codes
//!
//! Error type shared by every stage of a calibration run, together with the
//! kernel status code each error maps to.

use core::fmt;

use bitflags::bitflags;

use crate::clock::CalibrationResult;

/// Raw kernel status code
pub type Status = i32;

/// Invalid arguments status
pub const STATUS_INVALID_ARGS: Status = -2;

/// Timed out status
pub const STATUS_TIMED_OUT: Status = -7;

/// I/O (hardware) error status
pub const STATUS_IO: Status = -11;

bitflags! {
    /// Problems detected while turning one clock sample into frequencies
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SampleFault: u32 {
        /// The reference oscillator did not tick during the window
        const ZERO_REFERENCE = 1 << 0;
        /// The decrementer did not tick during the window
        const ZERO_DECREMENTER = 1 << 1;
        /// Decrementer count too large for any PLL multiplier
        const PLL_OUT_OF_RANGE = 1 << 2;
        /// Scaled bus estimate does not fit in 64 bits
        const SCALE_OVERFLOW = 1 << 3;
        /// The bus frequency came out as zero
        const ZERO_BUS_ESTIMATE = 1 << 4;
    }
}

/// Result type for calibration operations
pub type Result<T = ()> = core::result::Result<T, Error>;

/// Calibration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sample could not be trusted
    HardwareFault(SampleFault),

    /// The retry budget ran out before two attempts agreed
    ///
    /// Only returned when strict convergence is configured.
    NonConvergence {
        attempts: u32,
        last: CalibrationResult,
    },

    /// Candidate at `index` has a zero numerator or denominator
    InvalidCandidate { index: usize },

    /// Flat candidate list does not hold whole (numerator, denominator) pairs
    OddCandidateList { len: usize },

    /// Candidate list does not fit the destination table
    CandidateOverflow { capacity: usize },

    /// Bus frequency denominator or PLL multiplier is zero
    InvalidResult,

    /// Rejected configuration value
    InvalidConfig(&'static str),
}

impl Error {
    /// Convert error to status code
    pub fn status(&self) -> Status {
        match self {
            Error::HardwareFault(_) => STATUS_IO,
            Error::NonConvergence { .. } => STATUS_TIMED_OUT,
            Error::InvalidCandidate { .. }
            | Error::OddCandidateList { .. }
            | Error::CandidateOverflow { .. }
            | Error::InvalidResult
            | Error::InvalidConfig(_) => STATUS_INVALID_ARGS,
        }
    }

    /// Check if the error came from the hardware rather than the caller
    pub fn is_hardware_fault(&self) -> bool {
        matches!(self, Error::HardwareFault(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::HardwareFault(fault) => write!(f, "clock sample hardware fault ({:?})", fault),
            Error::NonConvergence { attempts, last } => write!(
                f,
                "bus frequency did not converge after {} attempts (last {}/{})",
                attempts,
                last.bus_freq_numerator(),
                last.bus_freq_denominator()
            ),
            Error::InvalidCandidate { index } => {
                write!(f, "bus frequency candidate {} has a zero term", index)
            }
            Error::OddCandidateList { len } => {
                write!(f, "bus frequency list has odd length {}", len)
            }
            Error::CandidateOverflow { capacity } => {
                write!(f, "bus frequency list exceeds {} entries", capacity)
            }
            Error::InvalidResult => write!(f, "zero bus denominator or PLL multiplier"),
            Error::InvalidConfig(what) => write!(f, "invalid calibration config: {}", what),
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        err.status()
    }
}
