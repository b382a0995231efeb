// ESP32-C3 tick source on a TIMG periodic timer
//
// Same setup as the pulp-os boot timer: the PeriodicTimer is parked in
// a critical-section Mutex so the ISR can clear its interrupt, and the
// ISR does nothing else but tick the registered WakeState.
//
// One ticker per chip: the ISR and its slots are statics.

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use esp_hal::Blocking;
use esp_hal::interrupt::Priority;
use esp_hal::time::Duration;
use esp_hal::timer::PeriodicTimer;
use log::info;

use crate::board::TickSource;
use crate::kernel::WakeState;

static TICK_TIMER: Mutex<RefCell<Option<PeriodicTimer<'static, Blocking>>>> =
    Mutex::new(RefCell::new(None));

static TICK_TARGET: Mutex<Cell<Option<&'static WakeState>>> = Mutex::new(Cell::new(None));

#[esp_hal::handler(priority = Priority::Priority1)]
fn tick_handler() {
    let target = critical_section::with(|cs| {
        if let Some(timer) = TICK_TIMER.borrow_ref_mut(cs).as_mut() {
            timer.clear_interrupt();
        }
        TICK_TARGET.borrow(cs).get()
    });
    if let Some(wake) = target {
        wake.tick();
    }
}

#[derive(Debug)]
pub enum EspTickError {
    Timer(esp_hal::timer::Error),
    // timer is still held by the ISR slot from a previous arm
    InUse,
}

pub struct EspTicker {
    timer: Option<PeriodicTimer<'static, Blocking>>,
    wake: &'static WakeState,
}

impl EspTicker {
    pub fn new(timer: PeriodicTimer<'static, Blocking>, wake: &'static WakeState) -> Self {
        Self {
            timer: Some(timer),
            wake,
        }
    }
}

impl TickSource for EspTicker {
    type Error = EspTickError;

    fn arm(&mut self, tick_ms: u32) -> Result<(), Self::Error> {
        let mut timer = self.timer.take().ok_or(EspTickError::InUse)?;
        let wake = self.wake;

        critical_section::with(|cs| {
            timer.set_interrupt_handler(tick_handler);
            if let Err(e) = timer.start(Duration::from_millis(tick_ms as u64)) {
                self.timer = Some(timer);
                return Err(EspTickError::Timer(e));
            }
            timer.listen();
            TICK_TARGET.borrow(cs).set(Some(wake));
            TICK_TIMER.borrow_ref_mut(cs).replace(timer);
            Ok(())
        })?;

        info!("tick timer armed at {}ms.", tick_ms);
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), Self::Error> {
        let timer = critical_section::with(|cs| {
            TICK_TARGET.borrow(cs).set(None);
            TICK_TIMER.borrow_ref_mut(cs).take()
        });

        if let Some(mut timer) = timer {
            timer.unlisten();
            timer.stop();
            self.timer = Some(timer);
            info!("tick timer stopped.");
        }
        Ok(())
    }
}
