// Run the event loop on its own thread
//
// Plain delegation: the scheduler moves to the new thread and is
// handed back when the loop returns, so it can be inspected or
// restarted. No extra locking; the queue still has a single owner.
// Stop it with WakeState::halt() from anywhere.

use std::io;
use std::thread::{self, JoinHandle};

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::board::{Clock, TickSource};
use crate::error::Error;
use crate::kernel::scheduler::Scheduler;

pub type LoopResult<C, T, D> = (
    Scheduler<'static, C, T, D>,
    Result<(), Error<<T as TickSource>::Error>>,
);

pub fn spawn<C, T, D>(
    mut scheduler: Scheduler<'static, C, T, D>,
) -> io::Result<JoinHandle<LoopResult<C, T, D>>>
where
    C: Clock + Send + 'static,
    T: TickSource + Send + 'static,
    T::Error: Send,
    D: DelayNs + Send + 'static,
{
    let handle = thread::Builder::new()
        .name("pulp-timers-loop".into())
        .spawn(move || {
            let result = scheduler.run();
            (scheduler, result)
        })?;
    debug!("event loop thread spawned");
    Ok(handle)
}
