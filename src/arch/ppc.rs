// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! PowerPC interrupt masking via MSR[EE]
//!
//! The MSR update lives in the platform machine routines; this module only
//! binds to it.

use super::InterruptControl;

extern "C" {
    /// Set MSR[EE] to `enable` and return its previous value
    fn ml_set_interrupts_enabled(enable: bool) -> bool;
}

/// Interrupt control for the current PowerPC CPU
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuInterrupts;

impl InterruptControl for CpuInterrupts {
    type State = bool;

    #[inline]
    fn disable(&self) -> bool {
        // SAFETY: only toggles external interrupt delivery on this CPU
        unsafe { ml_set_interrupts_enabled(false) }
    }

    #[inline]
    fn restore(&self, was_enabled: bool) {
        // SAFETY: see `disable`
        unsafe {
            ml_set_interrupts_enabled(was_enabled);
        }
    }
}
