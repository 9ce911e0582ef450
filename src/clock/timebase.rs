// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Timebase Publication
//!
//! Calibrated clock rates are handed to a [`TimebaseSink`]. The default
//! sink, [`GlobalTimebase`], keeps the most recent [`ClockFrequencyInfo`]
//! for later readers and calls the timebase callback the timer driver
//! registered.
//!
//! The callback sees every publication exactly once. Registering it after
//! rates are already published calls it right away.
//!
//! # Usage
//!
//! ```ignore
//! fn timer_setup(info: &ClockFrequencyInfo) {
//!     set_decrementer_rate(info.dec_clock_rate_hz);
//! }
//!
//! register_timebase_callback(timer_setup);
//! ```

use spin::{Mutex, RwLock};

use crate::log_info;

use super::rates::ClockFrequencyInfo;

/// Receiver for calibrated clock rates
pub trait TimebaseSink {
    /// Called once per successful calibration run
    fn publish(&mut self, info: &ClockFrequencyInfo);
}

impl<F: FnMut(&ClockFrequencyInfo)> TimebaseSink for F {
    fn publish(&mut self, info: &ClockFrequencyInfo) {
        self(info)
    }
}

/// Timebase callback type
pub type TimebaseCallback = fn(&ClockFrequencyInfo);

/// Most recently published rates
static CLOCK_INFO: RwLock<Option<ClockFrequencyInfo>> = RwLock::new(None);

/// Registered timebase callback
///
/// Held while `CLOCK_INFO` is updated so a callback registered concurrently
/// with a publication is called exactly once.
static TIMEBASE_CALLBACK: Mutex<Option<TimebaseCallback>> = Mutex::new(None);

/// Sink that publishes through the process-wide timebase state
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalTimebase;

impl TimebaseSink for GlobalTimebase {
    fn publish(&mut self, info: &ClockFrequencyInfo) {
        publish_clock_info(info);
    }
}

/// Store `info` and notify the timebase callback
pub fn publish_clock_info(info: &ClockFrequencyInfo) {
    let callback = {
        let callback = TIMEBASE_CALLBACK.lock();
        *CLOCK_INFO.write() = Some(*info);
        *callback
    };

    log_info!(
        "clock rates: bus {} Hz, cpu {} Hz, decrementer {} Hz",
        info.bus_clock_rate_hz,
        info.cpu_clock_rate_hz,
        info.dec_clock_rate_hz
    );

    if let Some(callback) = callback {
        callback(info);
    }
}

/// Most recently published clock rates, if any
pub fn clock_info() -> Option<ClockFrequencyInfo> {
    *CLOCK_INFO.read()
}

/// Install the timebase callback, replacing any previous one
///
/// If rates are already published the callback runs immediately.
pub fn register_timebase_callback(callback: TimebaseCallback) {
    let current = {
        let mut slot = TIMEBASE_CALLBACK.lock();
        *slot = Some(callback);
        *CLOCK_INFO.read()
    };

    if let Some(info) = current {
        callback(&info);
    }
}

#[cfg(test)]
pub(crate) fn reset_for_test() {
    *TIMEBASE_CALLBACK.lock() = None;
    *CLOCK_INFO.write() = None;
}

/// Serializes tests that touch the global timebase
#[cfg(test)]
pub(crate) static TEST_LOCK: Mutex<()> = Mutex::new(());
