// Time-ordered event queue
//
// Singly linked list threaded through an arena: nodes live in `slots`,
// links are slot indices, freed slots are recycled with a bumped
// generation so stale EventIds never match. Order is ascending
// next_fire; a new node goes in front of the first node that is
// strictly later, so equal timestamps keep registration order.
//
// Every head change is followed by a WakeState recompute. The tick ISR
// trusts that countdown to reflect the real head.
//
// All operations are O(n). Fine for a handful of housekeeping timers.

use alloc::vec::Vec;

use log::debug;

use crate::kernel::event::{EventId, Handler, TimerEvent};
use crate::kernel::wake::{WakeState, ms_until};

struct Node {
    event: TimerEvent,
    next: Option<u32>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

pub struct EventQueue {
    slots: Vec<Slot>,
    free: Vec<u32>,
    head: Option<u32>,
    len: usize,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The next event due and when it fires.
    pub fn head(&self) -> Option<(EventId, u64)> {
        let index = self.head?;
        Some((self.id_at(index), self.node(index).event.next_fire))
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.live(id).is_some()
    }

    pub fn get(&self, id: EventId) -> Option<&TimerEvent> {
        self.live(id).map(|index| &self.node(index).event)
    }

    pub fn next_fire(&self, id: EventId) -> Option<u64> {
        self.get(id).map(TimerEvent::next_fire)
    }

    /// Events in firing order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            queue: self,
            cursor: self.head,
        }
    }

    /// Insert in order. Recomputes the wake threshold if the event
    /// lands at the head.
    pub fn add(&mut self, event: TimerEvent, now: u64, wake: &WakeState) -> EventId {
        let node = Node { event, next: None };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.len += 1;
        self.link(index, now, wake);
        self.id_at(index)
    }

    /// Unlink the event with this id. Absent or stale ids are a no-op.
    pub fn remove(&mut self, id: EventId, now: u64, wake: &WakeState) -> Option<TimerEvent> {
        self.live(id)?;

        let mut prev: Option<u32> = None;
        let mut cursor = self.head;
        while let Some(index) = cursor {
            if index == id.index {
                let next = self.node(index).next;
                match prev {
                    Some(p) => self.node_mut(p).next = next,
                    None => {
                        self.head = next;
                        self.recompute(now, wake);
                    }
                }
                return Some(self.release(index));
            }
            prev = Some(index);
            cursor = self.node(index).next;
        }
        None
    }

    /// Re-baseline every event to one period from `now` (or to `now`
    /// for events still owed their immediate first run), so time spent
    /// before the loop started doesn't show up as a burst of overdue
    /// events. Re-sorted stably since periods differ.
    pub fn reset(&mut self, now: u64, wake: &WakeState) {
        let mut order: Vec<u32> = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = self.node_mut(index);
            node.event.next_fire = node.event.baseline(now);
            cursor = node.next;
            order.push(index);
        }

        order.sort_by_key(|&index| self.node(index).event.next_fire);
        self.head = None;
        for &index in order.iter().rev() {
            let head = self.head;
            self.node_mut(index).next = head;
            self.head = Some(index);
        }

        debug!("queue reset: {} events re-baselined at {}ms", self.len, now);
        self.recompute(now, wake);
    }

    /// Reschedule the head after it fired: advance by exactly one
    /// period from its own schedule, not from `now`, so a late run
    /// doesn't push every later run back. Re-inserted if that moves it
    /// past its successor.
    pub fn update(&mut self, now: u64, wake: &WakeState) {
        let Some(index) = self.head else {
            return;
        };

        let node = self.node_mut(index);
        node.event.next_fire += node.event.period_ms as u64;
        node.event.immediate = false;
        let next_fire = node.event.next_fire;

        if let Some(next) = node.next
            && next_fire > self.node(next).event.next_fire
        {
            self.head = Some(next);
            self.link(index, now, wake);
        }
        self.recompute(now, wake);
    }

    /// Overwrite the wake threshold with the time left until the head.
    /// Leaves it alone when the queue is empty.
    pub fn recompute(&self, now: u64, wake: &WakeState) {
        if let Some((_, next_fire)) = self.head() {
            wake.store(ms_until(next_fire, now));
        }
    }

    // Lend a handler out for invocation. The node stays queued.
    pub(crate) fn take_handler(&mut self, id: EventId) -> Option<Handler> {
        let index = self.live(id)?;
        self.node_mut(index).event.handler.take()
    }

    // Give it back; dropped if the event went away meanwhile.
    pub(crate) fn restore_handler(&mut self, id: EventId, handler: Handler) {
        if let Some(index) = self.live(id) {
            self.node_mut(index).event.handler = Some(handler);
        }
    }

    // `index` holds an unlinked node; put it in order
    fn link(&mut self, index: u32, now: u64, wake: &WakeState) {
        let next_fire = self.node(index).event.next_fire;

        let mut prev: Option<u32> = None;
        let mut cursor = self.head;
        while let Some(at) = cursor {
            let node = self.node(at);
            if node.event.next_fire > next_fire {
                break;
            }
            prev = Some(at);
            cursor = node.next;
        }

        self.node_mut(index).next = cursor;
        match prev {
            Some(p) => self.node_mut(p).next = Some(index),
            None => {
                self.head = Some(index);
                self.recompute(now, wake);
            }
        }
    }

    fn release(&mut self, index: u32) -> TimerEvent {
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        let node = slot.node.take();
        self.free.push(index);
        self.len -= 1;
        match node {
            Some(node) => node.event,
            None => unreachable!("released an empty slot"),
        }
    }

    fn live(&self, id: EventId) -> Option<u32> {
        let slot = self.slots.get(id.index as usize)?;
        (slot.generation == id.generation && slot.node.is_some()).then_some(id.index)
    }

    fn id_at(&self, index: u32) -> EventId {
        EventId {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    // links only ever point at occupied slots
    fn node(&self, index: u32) -> &Node {
        match &self.slots[index as usize].node {
            Some(node) => node,
            None => unreachable!("dangling link to slot {}", index),
        }
    }

    fn node_mut(&mut self, index: u32) -> &mut Node {
        match &mut self.slots[index as usize].node {
            Some(node) => node,
            None => unreachable!("dangling link to slot {}", index),
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a> {
    queue: &'a EventQueue,
    cursor: Option<u32>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (EventId, &'a TimerEvent);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let node = self.queue.node(index);
        self.cursor = node.next;
        Some((self.queue.id_at(index), &node.event))
    }
}
