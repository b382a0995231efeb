// Cooperative timer-event scheduler for small devices
//
// Handlers are registered with a period and fired in time order on one
// context. A 1ms tick interrupt counts a wake threshold down so the
// loop can sleep until the next event instead of polling the clock.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod board;
pub mod config;
pub mod error;
pub mod kernel;

pub use board::{Clock, EmbassyClock, TickSource};
pub use config::{Config, FailurePolicy};
pub use error::{Error, HandlerError};
pub use kernel::{EventId, Registry, Scheduler, Step, WakeState};
