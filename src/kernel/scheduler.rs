// Cooperative drive loop over the event queue
//
// Stopped -> start() -> Running -> stop() -> Stopped. While running,
// each step() either idles (empty queue), sleeps toward the wake
// threshold, or fires the head and reschedules it. Handlers run to
// completion on this context; the tick ISR only counts down.
//
// The loop only ever blocks in the delay: the idle quantum, the
// bounded wait while the threshold is positive, and the sleep right
// after a fire. halt() is observed between steps.

use alloc::boxed::Box;

use embedded_hal::delay::DelayNs;
use log::{debug, error, info, trace, warn};

use crate::board::{Clock, TickSource};
use crate::config::{Config, FailurePolicy};
use crate::error::{Error, HandlerError};
use crate::kernel::event::{EventId, Handler, TimerEvent};
use crate::kernel::queue::EventQueue;
use crate::kernel::wake::{WakeState, ms_until};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Stopped,
    Running,
}

/// What one pass of the loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Queue empty, slept the idle quantum.
    Idle,
    /// Queue empty and configured to exit; the loop has been halted.
    Drained,
    /// Head not due yet, slept toward it.
    Waiting,
    /// Fired this event.
    Fired(EventId),
}

/// Queue access handed to a running handler. Changes apply at once and
/// are picked up by the loop from its next step.
pub struct Registry<'a> {
    queue: &'a mut EventQueue,
    clock: &'a dyn Clock,
    wake: &'a WakeState,
}

impl Registry<'_> {
    pub fn register<F>(&mut self, handler: F, period_ms: u32, immediate: bool) -> EventId
    where
        F: FnMut(&mut Registry<'_>) -> Result<(), HandlerError> + Send + 'static,
    {
        insert(self.queue, self.clock, self.wake, Box::new(handler), period_ms, immediate)
    }

    pub fn unregister(&mut self, id: EventId) -> bool {
        remove(self.queue, self.clock, self.wake, id)
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Stop the loop after this handler returns.
    pub fn halt(&self) {
        self.wake.halt();
    }
}

fn insert(
    queue: &mut EventQueue,
    clock: &dyn Clock,
    wake: &WakeState,
    handler: Handler,
    period_ms: u32,
    immediate: bool,
) -> EventId {
    debug_assert!(period_ms > 0, "timer period must be non-zero");
    let now = clock.now_ms();
    let id = queue.add(TimerEvent::new(handler, period_ms, immediate, now), now, wake);
    debug!(
        "registered {} every {}ms{}",
        id,
        period_ms,
        if immediate { " (immediate)" } else { "" }
    );
    id
}

fn remove(queue: &mut EventQueue, clock: &dyn Clock, wake: &WakeState, id: EventId) -> bool {
    let removed = queue.remove(id, clock.now_ms(), wake).is_some();
    if removed {
        debug!("unregistered {}", id);
    }
    removed
}

pub struct Scheduler<'w, C, T, D> {
    queue: EventQueue,
    wake: &'w WakeState,
    clock: C,
    ticker: T,
    delay: D,
    config: Config,
    state: State,
}

impl<'w, C, T, D> Scheduler<'w, C, T, D>
where
    C: Clock,
    T: TickSource,
    D: DelayNs,
{
    pub fn new(wake: &'w WakeState, clock: C, ticker: T, delay: D, config: Config) -> Self {
        Self {
            queue: EventQueue::new(),
            wake,
            clock,
            ticker,
            delay,
            config,
            state: State::Stopped,
        }
    }

    /// Add a handler firing every `period_ms`, first at one period from
    /// now, or right away if `immediate`. Registering the same closure
    /// logic twice gives two independent events.
    pub fn register<F>(&mut self, handler: F, period_ms: u32, immediate: bool) -> EventId
    where
        F: FnMut(&mut Registry<'_>) -> Result<(), HandlerError> + Send + 'static,
    {
        insert(&mut self.queue, &self.clock, self.wake, Box::new(handler), period_ms, immediate)
    }

    /// Remove an event. Unknown or already removed ids are ignored.
    pub fn unregister(&mut self, id: EventId) -> bool {
        remove(&mut self.queue, &self.clock, self.wake, id)
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn wake(&self) -> &'w WakeState {
        self.wake
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    pub fn halt(&self) {
        self.wake.halt();
    }

    /// Start, drive until halted, stop. Blocks the calling context.
    pub fn run(&mut self) -> Result<(), Error<T::Error>> {
        self.start()?;

        while self.wake.is_running() {
            if let Err(e) = self.step() {
                self.stop()?;
                return Err(e);
            }
        }

        self.stop()
    }

    /// Re-baseline the queue, arm the tick source and go to Running.
    pub fn start(&mut self) -> Result<(), Error<T::Error>> {
        if self.state == State::Running {
            return Err(Error::AlreadyRunning);
        }

        self.queue.reset(self.clock.now_ms(), self.wake);

        self.wake.set_tick_weight(self.config.tick_ms());
        if let Err(e) = self.ticker.arm(self.config.tick_ms()) {
            error!("tick source failed to arm: {:?}", e);
            return Err(Error::Arm(e));
        }
        self.queue.recompute(self.clock.now_ms(), self.wake);

        self.state = State::Running;
        self.wake.set_running(true);
        info!(
            "event loop running: {} events, {}ms tick.",
            self.queue.len(),
            self.config.tick_ms()
        );
        Ok(())
    }

    /// Leave Running and disarm the tick source. Events stay queued.
    pub fn stop(&mut self) -> Result<(), Error<T::Error>> {
        if self.state != State::Running {
            return Err(Error::NotRunning);
        }

        self.state = State::Stopped;
        self.wake.set_running(false);
        if let Err(e) = self.ticker.disarm() {
            warn!("tick source failed to disarm: {:?}", e);
        }
        info!("event loop stopped: {} events pending.", self.queue.len());
        Ok(())
    }

    /// One pass of the loop.
    pub fn step(&mut self) -> Result<Step, Error<T::Error>> {
        if self.state != State::Running {
            return Err(Error::NotRunning);
        }

        let Some((id, next_fire)) = self.queue.head() else {
            if self.config.exit_when_empty() {
                self.wake.halt();
                return Ok(Step::Drained);
            }
            self.delay.delay_ms(self.config.idle_ms());
            return Ok(Step::Idle);
        };

        let threshold = self.wake.threshold();
        if threshold > 0 {
            // never past the threshold, and bounded so halt() is seen
            self.delay.delay_ms((threshold as u32).min(self.config.idle_ms()));
            return Ok(Step::Waiting);
        }

        let now = self.clock.now_ms();
        if now < next_fire {
            // ticks ran ahead of the clock; resync instead of spinning
            self.wake.store(ms_until(next_fire, now));
            return Ok(Step::Waiting);
        }

        trace!("firing {} ({}ms late)", id, now - next_fire);
        let result = self.fire(id);

        // the fired event is still the head unless it unregistered
        // itself: anything it added is due no earlier than now
        if self.queue.head().map(|(head, _)| head) == Some(id) {
            self.queue.update(self.clock.now_ms(), self.wake);
        }

        if let Err(source) = result {
            match self.config.failure_policy() {
                FailurePolicy::Propagate => {
                    error!("{} failed: {}", id, source);
                    return Err(Error::Handler { id, source });
                }
                FailurePolicy::LogAndContinue => warn!("{} failed: {}", id, source),
            }
        }

        let threshold = self.wake.threshold();
        if threshold > 0 {
            self.delay.delay_ms(threshold as u32);
        }
        Ok(Step::Fired(id))
    }

    fn fire(&mut self, id: EventId) -> Result<(), HandlerError> {
        let Some(mut handler) = self.queue.take_handler(id) else {
            return Ok(());
        };

        let result = {
            let mut registry = Registry {
                queue: &mut self.queue,
                clock: &self.clock,
                wake: self.wake,
            };
            handler(&mut registry)
        };

        self.queue.restore_handler(id, handler);
        result
    }
}

impl<C, T, D> Drop for Scheduler<'_, C, T, D> {
    fn drop(&mut self) {
        if self.state == State::Running {
            self.wake.set_running(false);
        }
    }
}
