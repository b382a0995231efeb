// Timer events: a handler, its fixed period and when it fires next
//
// Events are owned by the EventQueue once added; only the queue moves
// next_fire. Handlers are boxed closures, so identity comes from the
// EventId handed out at registration (slot index + generation).

use alloc::boxed::Box;
use core::fmt;

use crate::error::HandlerError;
use crate::kernel::scheduler::Registry;

/// A registered callback. Receives a [`Registry`] so it can add or
/// remove events (itself included) while it runs.
pub type Handler = Box<dyn FnMut(&mut Registry<'_>) -> Result<(), HandlerError> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

pub struct TimerEvent {
    // None only while the handler is being invoked
    pub(crate) handler: Option<Handler>,
    pub(crate) period_ms: u32,
    pub(crate) next_fire: u64,
    // still waiting on its "fire now" first run
    pub(crate) immediate: bool,
}

impl TimerEvent {
    pub fn new(handler: Handler, period_ms: u32, immediate: bool, now: u64) -> Self {
        let next_fire = if immediate {
            now
        } else {
            now + period_ms as u64
        };
        Self {
            handler: Some(handler),
            period_ms,
            next_fire,
            immediate,
        }
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Absolute monotonic time (ms) this event fires next.
    pub fn next_fire(&self) -> u64 {
        self.next_fire
    }

    // where reset() puts this event
    pub(crate) fn baseline(&self, now: u64) -> u64 {
        if self.immediate {
            now
        } else {
            now + self.period_ms as u64
        }
    }
}

impl fmt::Debug for TimerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEvent")
            .field("period_ms", &self.period_ms)
            .field("next_fire", &self.next_fire)
            .field("immediate", &self.immediate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler {
        Box::new(|_| Ok(()))
    }

    #[test]
    fn deferred_event_fires_one_period_out() {
        let ev = TimerEvent::new(noop(), 250, false, 1_000);
        assert_eq!(ev.next_fire(), 1_250);
        assert_eq!(ev.period_ms(), 250);
        assert_eq!(ev.baseline(2_000), 2_250);
    }

    #[test]
    fn immediate_event_fires_now() {
        let ev = TimerEvent::new(noop(), 250, true, 1_000);
        assert_eq!(ev.next_fire(), 1_000);
        assert_eq!(ev.baseline(2_000), 2_000);
    }

    #[test]
    fn id_display() {
        let id = EventId {
            index: 3,
            generation: 7,
        };
        assert_eq!(id.to_string(), "#3.7");
    }
}
