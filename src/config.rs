// Scheduler configuration
//
// Defaults match a 1ms tick and a 100ms idle quantum: an empty queue
// is re-checked ten times a second, which bounds how long a handler
// registered from another context waits before the loop notices it.

/// Tick interrupt period (ms)
pub const DEFAULT_TICK_MS: u32 = 1;

/// Sleep quantum while the queue is empty (ms)
pub const DEFAULT_IDLE_MS: u32 = 100;

/// What the loop does when a handler returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the loop and hand the error to the caller of `run()`.
    #[default]
    Propagate,
    /// Log it and keep going.
    LogAndContinue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    tick_ms: u32,
    idle_ms: u32,
    on_handler_error: FailurePolicy,
    exit_when_empty: bool,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            idle_ms: DEFAULT_IDLE_MS,
            on_handler_error: FailurePolicy::Propagate,
            exit_when_empty: false,
        }
    }

    // zero would stall the countdown
    pub const fn with_tick_ms(mut self, tick_ms: u32) -> Self {
        self.tick_ms = if tick_ms == 0 { 1 } else { tick_ms };
        self
    }

    // zero would busy-spin
    pub const fn with_idle_ms(mut self, idle_ms: u32) -> Self {
        self.idle_ms = if idle_ms == 0 { 1 } else { idle_ms };
        self
    }

    pub const fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_handler_error = policy;
        self
    }

    /// Return from `run()` once the last event is gone instead of
    /// idling until halted.
    pub const fn with_exit_when_empty(mut self, exit: bool) -> Self {
        self.exit_when_empty = exit;
        self
    }

    pub const fn tick_ms(&self) -> u32 {
        self.tick_ms
    }

    pub const fn idle_ms(&self) -> u32 {
        self.idle_ms
    }

    pub const fn failure_policy(&self) -> FailurePolicy {
        self.on_handler_error
    }

    pub const fn exit_when_empty(&self) -> bool {
        self.exit_when_empty
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.tick_ms(), 1);
        assert_eq!(cfg.idle_ms(), 100);
        assert_eq!(cfg.failure_policy(), FailurePolicy::Propagate);
        assert!(!cfg.exit_when_empty());
    }

    #[test]
    fn zero_periods_are_clamped() {
        let cfg = Config::new().with_tick_ms(0).with_idle_ms(0);
        assert_eq!(cfg.tick_ms(), 1);
        assert_eq!(cfg.idle_ms(), 1);
    }
}
