// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Calibration Configuration
//!
//! Every tunable of a calibration run, with the defaults that match the
//! VIA-referenced platforms. Values can be overridden from the kernel boot
//! arguments:
//!
//! | Key               | Meaning                                    |
//! |-------------------|--------------------------------------------|
//! | `clock.tries`     | Maximum sample/resolve attempts            |
//! | `clock.max_diff`  | Match tolerance in Hz (per denominator)    |
//! | `clock.ref_scale` | Reference oscillator fixed-point scale     |
//! | `clock.ref_shift` | Right shift applied after scaling          |
//! | `clock.pll_ref`   | Decrementer ticks per PLL step             |
//! | `clock.strict`    | Fail instead of accepting no convergence   |
//!
//! Numbers may be decimal or `0x`-prefixed hex. A bare key counts as
//! `true`; `0`, `false` and `off` count as false. Unknown keys are ignored
//! and malformed values keep the default.
//!
//! ```ignore
//! let config = CalibrationConfig::from_cmdline("clock.tries=4 clock.strict");
//! ```

use crate::err::{Error, Result};
use crate::log_debug;

// ============================================================================
// Defaults
// ============================================================================

/// Default attempt budget
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Threshold for bus speed matches, in Hz per unit of denominator
pub const DEFAULT_MAX_FREQ_DIFF: u64 = 30_000;

/// 1 / 1.27655us times 2^24: the VIA timer frequency in fixed point
///
/// Retargeting to another reference oscillator means replacing this value
/// (and possibly [`VIA_SCALE_SHIFT`]).
pub const VIA_REFERENCE_SCALE: u64 = 0xBF401675E5D;

/// Shift that turns the scaled tick ratio into Hz
pub const VIA_SCALE_SHIFT: u32 = 22;

/// Decrementer ticks that correspond to one PLL step over the sample window
pub const PLL_REFERENCE_TICKS: u32 = 10_000_000;

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for one calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationConfig {
    /// Maximum number of sample/resolve attempts
    pub max_retries: u32,

    /// Tolerance for snapping a raw frequency onto a known one
    pub max_freq_diff: u64,

    /// Fixed-point scale of the reference oscillator
    pub reference_scale: u64,

    /// Right shift applied to the scaled ratio
    pub scale_shift: u32,

    /// Dividend used to derive the PLL multiplier from decrementer ticks
    pub pll_reference: u32,

    /// Treat an exhausted retry budget as an error
    pub strict: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            max_freq_diff: DEFAULT_MAX_FREQ_DIFF,
            reference_scale: VIA_REFERENCE_SCALE,
            scale_shift: VIA_SCALE_SHIFT,
            pll_reference: PLL_REFERENCE_TICKS,
            strict: false,
        }
    }
}

impl CalibrationConfig {
    /// Set the attempt budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the match tolerance
    pub fn with_max_freq_diff(mut self, max_freq_diff: u64) -> Self {
        self.max_freq_diff = max_freq_diff;
        self
    }

    /// Swap in a different reference oscillator
    pub fn with_reference(mut self, scale: u64, shift: u32) -> Self {
        self.reference_scale = scale;
        self.scale_shift = shift;
        self
    }

    /// Require convergence
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Build a configuration from kernel boot arguments
    ///
    /// Later occurrences of a key override earlier ones.
    pub fn from_cmdline(cmdline: &str) -> Self {
        let mut config = Self::default();

        for token in cmdline.split_ascii_whitespace() {
            let (key, value) = token.split_once('=').unwrap_or((token, ""));

            match key {
                "clock.tries" => set_parsed(&mut config.max_retries, value),
                "clock.max_diff" => set_parsed(&mut config.max_freq_diff, value),
                "clock.ref_scale" => set_parsed(&mut config.reference_scale, value),
                "clock.ref_shift" => set_parsed(&mut config.scale_shift, value),
                "clock.pll_ref" => set_parsed(&mut config.pll_reference, value),
                "clock.strict" => config.strict = parse_bool(value),
                _ => continue,
            }

            log_debug!("boot arg {}={}", key, value);
        }

        config
    }

    /// Reject values that would make a calibration run meaningless
    pub fn validate(&self) -> Result {
        if self.max_retries == 0 {
            return Err(Error::InvalidConfig("max_retries must be at least 1"));
        }
        if self.pll_reference == 0 {
            return Err(Error::InvalidConfig("pll_reference must be non-zero"));
        }
        if self.reference_scale == 0 {
            return Err(Error::InvalidConfig("reference_scale must be non-zero"));
        }
        if self.scale_shift >= u64::BITS {
            return Err(Error::InvalidConfig("scale_shift must be below 64"));
        }
        Ok(())
    }
}

// ============================================================================
// Value parsing
// ============================================================================

/// Parse an unsigned number as hex (`0x` prefix) or decimal
fn parse_uint(value: &str) -> Option<u64> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// Overwrite `slot` when `value` parses and fits
fn set_parsed<T: TryFrom<u64>>(slot: &mut T, value: &str) {
    if let Some(parsed) = parse_uint(value).and_then(|v| T::try_from(v).ok()) {
        *slot = parsed;
    }
}

/// Returns false if the value is "0", "false", or "off"
fn parse_bool(value: &str) -> bool {
    !matches!(value, "0" | "false" | "off")
}
