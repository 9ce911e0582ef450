// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! AMD64 (x86-64) interrupt masking via RFLAGS.IF

use x86_64::instructions::interrupts;

use super::InterruptControl;

/// Interrupt control for the current x86-64 CPU
///
/// Must run at CPL 0; `cli`/`sti` fault in user mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuInterrupts;

impl InterruptControl for CpuInterrupts {
    type State = bool;

    #[inline]
    fn disable(&self) -> bool {
        let was_enabled = interrupts::are_enabled();
        interrupts::disable();
        was_enabled
    }

    #[inline]
    fn restore(&self, was_enabled: bool) {
        if was_enabled {
            interrupts::enable();
        }
    }
}
