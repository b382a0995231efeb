#![cfg(feature = "std")]

// Real-time runs of the loop on the host backend: ticker thread for the
// interrupt, embassy std driver for the clock, parked-thread delay.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use pulp_timers::board::host::{ThreadDelay, ThreadTicker};
use pulp_timers::kernel::tasks::spawn;
use pulp_timers::{Config, EmbassyClock, Scheduler, WakeState};

fn wake_state() -> &'static WakeState {
    Box::leak(Box::new(WakeState::new()))
}

fn host_scheduler(
    wake: &'static WakeState,
    config: Config,
) -> Scheduler<'static, EmbassyClock, ThreadTicker, ThreadDelay> {
    Scheduler::new(wake, EmbassyClock, ThreadTicker::new(wake), ThreadDelay, config)
}

fn sleep_until(start: Instant, ms: u64) {
    let target = start + Duration::from_millis(ms);
    let now = Instant::now();
    if target > now {
        thread::sleep(target - now);
    }
}

#[test]
fn immediate_handler_keeps_its_period() {
    let wake = wake_state();
    let fired = Arc::new(AtomicU32::new(0));

    let mut sched = host_scheduler(wake, Config::new());
    let counter = fired.clone();
    sched.register(
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
        200,
        true,
    );

    let start = Instant::now();
    let handle = spawn(sched).expect("spawn loop thread");

    sleep_until(start, 45);
    assert!(fired.load(Ordering::SeqCst) >= 1, "no run before 50ms");

    sleep_until(start, 651);
    assert!(fired.load(Ordering::SeqCst) >= 3, "fewer than 3 runs by 650ms");

    wake.halt();
    let (sched, result) = handle.join().expect("loop thread");
    result.expect("loop exits cleanly");
    assert!(!sched.is_running());
    assert_eq!(sched.queue().len(), 1);
}

#[test]
fn halt_from_another_thread_stops_an_idle_loop() {
    let wake = wake_state();
    let sched = host_scheduler(wake, Config::new().with_idle_ms(20));

    let handle = spawn(sched).expect("spawn loop thread");
    thread::sleep(Duration::from_millis(60));
    assert!(wake.is_running());

    let halted_at = Instant::now();
    wake.halt();
    let (sched, result) = handle.join().expect("loop thread");
    result.expect("loop exits cleanly");

    assert!(halted_at.elapsed() < Duration::from_millis(500));
    assert!(sched.queue().is_empty());
}

#[test]
fn run_returns_once_queue_drains() {
    let wake = wake_state();
    let fired = Arc::new(AtomicU32::new(0));

    let mut sched = host_scheduler(wake, Config::new().with_exit_when_empty(true));
    let counter = fired.clone();
    let id = sched.register(
        move |reg| {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                reg.halt();
            }
            Ok(())
        },
        30,
        false,
    );

    let (mut sched, result) = spawn(sched).expect("spawn").join().expect("loop thread");
    result.expect("loop exits cleanly");
    assert_eq!(fired.load(Ordering::SeqCst), 3);

    // halted, not drained: the event is still queued
    assert!(sched.unregister(id));
    let started = Instant::now();
    sched.run().expect("empty loop returns");
    assert!(!sched.is_running());
    assert!(started.elapsed() < Duration::from_millis(100));
}
