// Timer-event scheduler core
// Single context, no preemption. The tick interrupt only counts the
// wake threshold down; everything else happens in the drive loop,
// which sleeps through the delay between events.
//
// tasks: run the loop on a background thread (std only).

pub mod event;
pub mod queue;
pub mod scheduler;
#[cfg(feature = "std")]
pub mod tasks;
pub mod wake;

pub use event::{EventId, Handler, TimerEvent};
pub use queue::EventQueue;
pub use scheduler::{Registry, Scheduler, State, Step};
pub use wake::WakeState;
