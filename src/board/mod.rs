//! Hardware boundary for the scheduler
//!
//! The scheduler core never touches a peripheral directly. It needs four
//! capabilities, and this module names them:
//!
//! - a monotonic millisecond clock ([`Clock`]),
//! - a periodic tick interrupt that calls [`WakeState::tick`] and nothing
//!   else ([`TickSource`]),
//! - a bounded blocking sleep ([`embedded_hal::delay::DelayNs`]),
//! - an interrupt-disable bracket (`critical-section`, used inside
//!   [`WakeState`]).
//!
//! Backends: [`EmbassyClock`] works anywhere an embassy time driver is
//! linked; `host` provides a thread-driven tick source and a sleeping
//! delay for std builds; `esp` drives the tick from an ESP32-C3 TIMG
//! periodic timer.
//!
//! [`WakeState`]: crate::kernel::WakeState
//! [`WakeState::tick`]: crate::kernel::WakeState::tick

#[cfg(all(target_arch = "riscv32", feature = "esp32c3"))]
pub mod esp;
#[cfg(feature = "std")]
pub mod host;

use core::fmt;

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// A periodic interrupt whose only job is to call `WakeState::tick`.
///
/// Failing to arm is fatal for the loop: without ticks the wake
/// threshold never reaches zero.
pub trait TickSource {
    type Error: fmt::Debug;

    fn arm(&mut self, tick_ms: u32) -> Result<(), Self::Error>;

    fn disarm(&mut self) -> Result<(), Self::Error>;
}

impl<T: TickSource + ?Sized> TickSource for &mut T {
    type Error = T::Error;

    fn arm(&mut self, tick_ms: u32) -> Result<(), Self::Error> {
        (**self).arm(tick_ms)
    }

    fn disarm(&mut self) -> Result<(), Self::Error> {
        (**self).disarm()
    }
}

/// Clock backed by the embassy time driver (esp-rtos on device, the
/// std driver on host).
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    #[inline]
    fn now_ms(&self) -> u64 {
        embassy_time::Instant::now().as_millis()
    }
}
