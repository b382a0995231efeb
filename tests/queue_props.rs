use proptest::prelude::*;

use pulp_timers::WakeState;
use pulp_timers::kernel::{EventId, EventQueue, TimerEvent};

#[derive(Debug, Clone)]
enum Op {
    Add { period: u32, immediate: bool },
    Remove(usize),
    Fire,
    Advance(u64),
    Reset,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1u32..2_000, any::<bool>()).prop_map(|(period, immediate)| Op::Add { period, immediate }),
        1 => (0usize..32).prop_map(Op::Remove),
        2 => Just(Op::Fire),
        2 => (0u64..500).prop_map(Op::Advance),
        1 => Just(Op::Reset),
    ]
}

fn event(period: u32, immediate: bool, now: u64) -> TimerEvent {
    TimerEvent::new(Box::new(|_| Ok(())), period, immediate, now)
}

fn fires(q: &EventQueue) -> Vec<u64> {
    q.iter().map(|(_, ev)| ev.next_fire()).collect()
}

proptest! {
    #[test]
    fn queue_stays_sorted_and_threshold_tracks_head(ops in prop::collection::vec(op(), 1..120)) {
        let wake = WakeState::new();
        let mut q = EventQueue::new();
        let mut now: u64 = 10_000;
        let mut ids: Vec<EventId> = Vec::new();
        let mut live = 0usize;

        for op in ops {
            match op {
                Op::Add { period, immediate } => {
                    ids.push(q.add(event(period, immediate, now), now, &wake));
                    live += 1;
                }
                Op::Remove(i) => {
                    if let Some(&id) = ids.get(i) {
                        let was_live = q.contains(id);
                        let removed = q.remove(id, now, &wake);
                        prop_assert_eq!(removed.is_some(), was_live);
                        if was_live {
                            live -= 1;
                        }
                    }
                }
                Op::Fire => q.update(now, &wake),
                Op::Advance(ms) => {
                    // the interrupt keeps pace with the clock
                    now += ms;
                    for _ in 0..ms {
                        wake.tick();
                    }
                }
                Op::Reset => q.reset(now, &wake),
            }

            let order = fires(&q);
            prop_assert!(order.windows(2).all(|w| w[0] <= w[1]), "unsorted: {:?}", order);
            prop_assert_eq!(q.len(), live);
            prop_assert_eq!(order.len(), live);

            if let Some((_, head)) = q.head() {
                prop_assert_eq!(wake.threshold() as i64, head as i64 - now as i64);
            }
        }
    }

    #[test]
    fn reset_puts_every_event_one_period_out(
        periods in prop::collection::vec(1u32..5_000, 1..40),
        later in 0u64..100_000,
    ) {
        let wake = WakeState::new();
        let mut q = EventQueue::new();
        for &p in &periods {
            q.add(event(p, false, 0), 0, &wake);
        }

        q.reset(later, &wake);
        for (_, ev) in q.iter() {
            prop_assert_eq!(ev.next_fire(), later + ev.period_ms() as u64);
        }
        let min = *periods.iter().min().unwrap();
        prop_assert_eq!(wake.threshold(), min as i32);
    }

    #[test]
    fn equal_deadlines_keep_registration_order(n in 2usize..20, period in 1u32..1_000) {
        let wake = WakeState::new();
        let mut q = EventQueue::new();
        let ids: Vec<EventId> = (0..n).map(|_| q.add(event(period, false, 0), 0, &wake)).collect();
        let order: Vec<EventId> = q.iter().map(|(id, _)| id).collect();
        prop_assert_eq!(order, ids);
    }

    #[test]
    fn late_update_advances_by_period_only(period in 1u32..10_000, late in 0u64..10_000) {
        let wake = WakeState::new();
        let mut q = EventQueue::new();
        let id = q.add(event(period, true, 0), 0, &wake);

        q.update(late, &wake);
        prop_assert_eq!(q.next_fire(id), Some(period as u64));
    }
}
