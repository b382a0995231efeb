// Hosted backend: a ticker thread standing in for the timer interrupt
//
// The thread tracks wall-clock elapsed time and emits every tick that
// is due, so oversleeping by the OS scheduler is caught up on the next
// wakeup instead of slowing the countdown. ThreadDelay parks the
// caller; embassy's Delay would spin on the host.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::board::TickSource;
use crate::kernel::WakeState;

pub struct ThreadTicker {
    wake: &'static WakeState,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ThreadTicker {
    pub fn new(wake: &'static WakeState) -> Self {
        Self {
            wake,
            stop: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.thread.is_some()
    }
}

impl TickSource for ThreadTicker {
    type Error = io::Error;

    fn arm(&mut self, tick_ms: u32) -> Result<(), Self::Error> {
        if self.thread.is_some() {
            self.disarm()?;
        }

        let stop = Arc::new(AtomicBool::new(false));
        self.stop = stop.clone();
        let wake = self.wake;
        let period = Duration::from_millis(tick_ms.max(1) as u64);

        let handle = thread::Builder::new()
            .name("pulp-timers-tick".into())
            .spawn(move || {
                let start = Instant::now();
                let mut emitted: u64 = 0;
                while !stop.load(Ordering::Acquire) {
                    thread::sleep(period);
                    let due = (start.elapsed().as_nanos() / period.as_nanos()) as u64;
                    while emitted < due {
                        wake.tick();
                        emitted += 1;
                    }
                }
            })?;

        self.thread = Some(handle);
        debug!("tick thread armed at {}ms", tick_ms);
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), Self::Error> {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            handle
                .join()
                .map_err(|_| io::Error::other("tick thread panicked"))?;
            debug!("tick thread disarmed");
        }
        Ok(())
    }
}

impl Drop for ThreadTicker {
    fn drop(&mut self) {
        let _ = self.disarm();
    }
}

/// Blocking delay that parks the thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}
