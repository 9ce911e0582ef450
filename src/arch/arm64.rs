// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! ARM64 interrupt masking via the DAIF register

use aarch64_cpu::registers::{ReadWriteable, Readable, Writeable, DAIF};

use super::InterruptControl;

/// Interrupt control for the current ARM64 CPU
///
/// Only IRQs are masked; the saved value restores all four DAIF bits.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuInterrupts;

impl InterruptControl for CpuInterrupts {
    type State = u64;

    #[inline]
    fn disable(&self) -> u64 {
        let daif = DAIF.get();
        DAIF.modify(DAIF::I::Masked);
        daif
    }

    #[inline]
    fn restore(&self, daif: u64) {
        DAIF.set(daif);
    }
}
