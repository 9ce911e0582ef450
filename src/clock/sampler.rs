// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Clock Sampling
//!
//! A sample counts reference-oscillator ticks and decrementer ticks over the
//! same window. The counting itself is done by a platform routine (usually
//! hand-written assembly that spins on the VIA timer); this module defines
//! the interface the resolver sees and the data block that routine fills in.
//!
//! Samplers do not mask interrupts themselves. The caller brackets every
//! `sample` call with an [`InterruptGuard`](crate::arch::InterruptGuard).

use core::num::NonZeroU32;

use memoffset::offset_of;

use crate::err::{Error, Result, SampleFault};

/// Opaque handle for the reference oscillator's hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReferenceAddress(pub u32);

/// One reference/decrementer tick count pair
///
/// Both counts are non-zero by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Measurement {
    reference_ticks: NonZeroU32,
    decrementer_ticks: NonZeroU32,
}

impl Measurement {
    /// Validate a raw tick count pair
    ///
    /// A zero count means the counter was stopped or never read; both
    /// problems are reported together.
    pub fn new(reference_ticks: u32, decrementer_ticks: u32) -> Result<Self> {
        match (NonZeroU32::new(reference_ticks), NonZeroU32::new(decrementer_ticks)) {
            (Some(reference_ticks), Some(decrementer_ticks)) => Ok(Self {
                reference_ticks,
                decrementer_ticks,
            }),
            (reference, decrementer) => {
                let mut fault = SampleFault::empty();
                fault.set(SampleFault::ZERO_REFERENCE, reference.is_none());
                fault.set(SampleFault::ZERO_DECREMENTER, decrementer.is_none());
                Err(Error::HardwareFault(fault))
            }
        }
    }

    pub fn reference_ticks(&self) -> u32 {
        self.reference_ticks.get()
    }

    pub fn decrementer_ticks(&self) -> u32 {
        self.decrementer_ticks.get()
    }
}

/// Source of clock samples
pub trait Sampler {
    /// Take one sample against the reference oscillator at `reference`
    ///
    /// Called with interrupts masked.
    fn sample(&mut self, reference: ReferenceAddress) -> Result<Measurement>;
}

impl<S: Sampler + ?Sized> Sampler for &mut S {
    fn sample(&mut self, reference: ReferenceAddress) -> Result<Measurement> {
        (**self).sample(reference)
    }
}

// ============================================================================
// Assembly routine ABI
// ============================================================================

/// Data block shared with the tick-counting routine
///
/// The routine reads `via_addr` and writes both tick counts. Field offsets
/// are part of the ABI.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClockTestData {
    pub via_addr: u32,
    pub via_ticks: u32,
    pub dec_ticks: u32,
}

pub const CLOCK_TEST_VIA_ADDR: usize = 0;
pub const CLOCK_TEST_VIA_TICKS: usize = 4;
pub const CLOCK_TEST_DEC_TICKS: usize = 8;

const _: () = assert!(offset_of!(ClockTestData, via_addr) == CLOCK_TEST_VIA_ADDR);
const _: () = assert!(offset_of!(ClockTestData, via_ticks) == CLOCK_TEST_VIA_TICKS);
const _: () = assert!(offset_of!(ClockTestData, dec_ticks) == CLOCK_TEST_DEC_TICKS);
const _: () = assert!(core::mem::size_of::<ClockTestData>() == 12);

impl ClockTestData {
    pub const fn new(reference: ReferenceAddress) -> Self {
        Self {
            via_addr: reference.0,
            via_ticks: 0,
            dec_ticks: 0,
        }
    }

    /// Counts left behind by the routine
    pub fn measurement(&self) -> Result<Measurement> {
        Measurement::new(self.via_ticks, self.dec_ticks)
    }
}

/// Tick-counting routine signature
pub type ClockTestRoutine = unsafe extern "C" fn(data: *mut ClockTestData);

/// Sampler backed by an external tick-counting routine
pub struct RoutineSampler {
    routine: ClockTestRoutine,
}

impl RoutineSampler {
    /// Wrap a tick-counting routine
    ///
    /// # Safety
    ///
    /// `routine` must only touch the `ClockTestData` it is handed and must
    /// be safe to run with interrupts masked.
    pub const unsafe fn new(routine: ClockTestRoutine) -> Self {
        Self { routine }
    }
}

impl Sampler for RoutineSampler {
    fn sample(&mut self, reference: ReferenceAddress) -> Result<Measurement> {
        let mut data = ClockTestData::new(reference);
        // SAFETY: contract of `RoutineSampler::new`; `data` outlives the call
        unsafe { (self.routine)(&mut data) };
        data.measurement()
    }
}

#[cfg(target_arch = "powerpc")]
extern "C" {
    /// Platform assembly that times the decrementer against the VIA timer
    fn pe_run_clock_test(data: *mut ClockTestData);
}

/// Sampler for the VIA timer on PowerPC platforms
#[cfg(target_arch = "powerpc")]
pub fn via_sampler() -> RoutineSampler {
    // SAFETY: pe_run_clock_test only reads the VIA at `via_addr` and the
    // decrementer, then stores into the block
    unsafe { RoutineSampler::new(pe_run_clock_test) }
}
