// Wake threshold shared between the drive loop and the tick interrupt
//
// The tick ISR only ever decrements the countdown; the loop overwrites
// it whenever the queue head changes. Both sides go through a critical
// section (riscv32imc has no atomic RMW). The run flag is a plain
// store/load so halt() is callable from an ISR, another thread or a
// handler. Each tick subtracts TICK_WEIGHT ms so the countdown stays
// in milliseconds whatever period the tick source runs at.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use critical_section::Mutex;

pub struct WakeState {
    // ms until the queue head is due, as estimated by the tick count
    countdown: Mutex<Cell<i32>>,
    // ms per tick
    tick_weight: AtomicU32,
    running: AtomicBool,
}

impl WakeState {
    pub const fn new() -> Self {
        Self {
            countdown: Mutex::new(Cell::new(0)),
            tick_weight: AtomicU32::new(1),
            running: AtomicBool::new(false),
        }
    }

    /// Called from the tick interrupt, once per tick. This is the only
    /// thing interrupt context is allowed to do.
    #[inline]
    pub fn tick(&self) {
        let weight = self.tick_weight.load(Ordering::Relaxed) as i32;
        critical_section::with(|cs| {
            let countdown = self.countdown.borrow(cs);
            countdown.set(countdown.get().saturating_sub(weight));
        });
    }

    /// Current countdown in ms. Zero or below means the head may be due.
    pub fn threshold(&self) -> i32 {
        critical_section::with(|cs| self.countdown.borrow(cs).get())
    }

    // overwrite, never adjust: the queue head is the source of truth
    pub(crate) fn store(&self, ms: i32) {
        critical_section::with(|cs| self.countdown.borrow(cs).set(ms));
    }

    pub(crate) fn set_tick_weight(&self, tick_ms: u32) {
        self.tick_weight.store(tick_ms.max(1), Ordering::Release);
    }

    pub fn tick_weight(&self) -> u32 {
        self.tick_weight.load(Ordering::Acquire)
    }

    /// Ask the drive loop to stop. Observed once per loop iteration; a
    /// handler or sleep already in progress runs to completion.
    #[inline]
    pub fn halt(&self) {
        self.running.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }
}

impl Default for WakeState {
    fn default() -> Self {
        Self::new()
    }
}

// ms from `now` until `deadline`, clamped into the countdown's range
pub(crate) fn ms_until(deadline: u64, now: u64) -> i32 {
    let delta = deadline as i64 - now as i64;
    delta.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
