// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Interrupt Masking
//!
//! Clock samples must not be stretched by an interrupt handler running in
//! the middle of the window. This module defines the interrupt control
//! interface the calibration code needs and a guard that keeps the
//! mask/restore pair balanced on every exit path.
//!
//! CPU implementations are provided per architecture as [`CpuInterrupts`].

#[cfg(target_arch = "x86_64")]
mod amd64;
#[cfg(target_arch = "x86_64")]
pub use amd64::CpuInterrupts;

#[cfg(target_arch = "aarch64")]
mod arm64;
#[cfg(target_arch = "aarch64")]
pub use arm64::CpuInterrupts;

#[cfg(target_arch = "powerpc")]
mod ppc;
#[cfg(target_arch = "powerpc")]
pub use ppc::CpuInterrupts;

/// Architecture interrupt control
pub trait InterruptControl {
    /// Saved interrupt state
    type State: Copy;

    /// Disable interrupts and return previous state
    fn disable(&self) -> Self::State;

    /// Restore interrupt state
    ///
    /// # Arguments
    ///
    /// * `state` - State returned from `disable`
    fn restore(&self, state: Self::State);
}

impl<I: InterruptControl + ?Sized> InterruptControl for &I {
    type State = I::State;

    fn disable(&self) -> Self::State {
        (**self).disable()
    }

    fn restore(&self, state: Self::State) {
        (**self).restore(state)
    }
}

/// Interrupts masked for the lifetime of the guard
///
/// The previous state is restored on drop, including when the holder
/// returns early or unwinds.
pub struct InterruptGuard<'a, I: InterruptControl> {
    control: &'a I,
    saved: I::State,
}

impl<'a, I: InterruptControl> InterruptGuard<'a, I> {
    /// Mask interrupts until the guard is dropped
    pub fn new(control: &'a I) -> Self {
        let saved = control.disable();
        Self { control, saved }
    }

    /// State that will be restored on drop
    pub fn saved_state(&self) -> I::State {
        self.saved
    }
}

impl<I: InterruptControl> Drop for InterruptGuard<'_, I> {
    fn drop(&mut self) {
        self.control.restore(self.saved);
    }
}

/// Run `f` with interrupts masked
pub fn with_interrupts_disabled<I: InterruptControl, R>(control: &I, f: impl FnOnce() -> R) -> R {
    let _guard = InterruptGuard::new(control);
    f()
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingInterrupts;
    use super::*;

    #[test]
    fn test_guard_restores_on_drop() {
        let ints = RecordingInterrupts::new();
        {
            let guard = InterruptGuard::new(&ints);
            assert!(guard.saved_state());
            assert!(!ints.enabled.get());
        }
        assert!(ints.enabled.get());
        assert!(ints.balanced());
    }

    #[test]
    fn test_nested_guards_keep_outer_mask() {
        let ints = RecordingInterrupts::new();
        let outer = InterruptGuard::new(&ints);
        {
            let inner = InterruptGuard::new(&ints);
            assert!(!inner.saved_state());
        }
        // Inner restore must not re-enable under the outer guard
        assert!(!ints.enabled.get());
        drop(outer);
        assert!(ints.balanced());
    }

    #[test]
    fn test_with_interrupts_disabled_returns_value() {
        let ints = RecordingInterrupts::new();
        let seen = with_interrupts_disabled(&ints, || ints.enabled.get());
        assert!(!seen);
        assert!(ints.balanced());
    }

    #[test]
    fn test_guard_restores_on_unwind() {
        let ints = RecordingInterrupts::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = InterruptGuard::new(&ints);
            panic!("sampler fault");
        }));
        assert!(result.is_err());
        assert!(ints.balanced());
    }
}
