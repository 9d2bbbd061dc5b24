//! Typed reactor events with pre-allocated ring buffers.
//!
//! The reactor emits events while it steps; listeners receive them in batch
//! when the host calls [`EventBus::deliver`]. Each event kind has its own
//! [`EventBuffer`] ring buffer with a configurable capacity, and every event
//! renders as a (name, free-text value) pair for recording sinks.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use crate::fixed::Ticks;
use crate::id::RegionId;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A reactor event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Cycle --
    CycleStart {
        tick: Ticks,
    },
    CycleEnd {
        tick: Ticks,
    },

    // -- Fuel movement --
    Transmute {
        region: RegionId,
        assemblies: usize,
        tick: Ticks,
    },
    Discharge {
        region: RegionId,
        assemblies: usize,
        tick: Ticks,
    },
    DischargeFailed {
        region: RegionId,
        needed: usize,
        room: usize,
        tick: Ticks,
    },
    Load {
        region: RegionId,
        assemblies: usize,
        tick: Ticks,
    },

    // -- Lifecycle --
    Retired {
        tick: Ticks,
    },
    DecommissionReady {
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CycleStart,
    CycleEnd,
    Transmute,
    Discharge,
    DischargeFailed,
    Load,
    Retired,
    DecommissionReady,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 8;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::CycleStart { .. } => EventKind::CycleStart,
            Event::CycleEnd { .. } => EventKind::CycleEnd,
            Event::Transmute { .. } => EventKind::Transmute,
            Event::Discharge { .. } => EventKind::Discharge,
            Event::DischargeFailed { .. } => EventKind::DischargeFailed,
            Event::Load { .. } => EventKind::Load,
            Event::Retired { .. } => EventKind::Retired,
            Event::DecommissionReady { .. } => EventKind::DecommissionReady,
        }
    }

    pub fn tick(&self) -> Ticks {
        match self {
            Event::CycleStart { tick }
            | Event::CycleEnd { tick }
            | Event::Transmute { tick, .. }
            | Event::Discharge { tick, .. }
            | Event::DischargeFailed { tick, .. }
            | Event::Load { tick, .. }
            | Event::Retired { tick }
            | Event::DecommissionReady { tick } => *tick,
        }
    }

    /// Record name. Successful and failed discharges share `DISCHARGE`.
    pub fn name(&self) -> &'static str {
        match self {
            Event::CycleStart { .. } => "CYCLE_START",
            Event::CycleEnd { .. } => "CYCLE_END",
            Event::Transmute { .. } => "TRANSMUTE",
            Event::Discharge { .. } | Event::DischargeFailed { .. } => "DISCHARGE",
            Event::Load { .. } => "LOAD",
            Event::Retired { .. } => "RETIRED",
            Event::DecommissionReady { .. } => "DECOMMISSION",
        }
    }

    /// Free-text record value.
    pub fn value(&self) -> String {
        match self {
            Event::Transmute {
                region, assemblies, ..
            }
            | Event::Discharge {
                region, assemblies, ..
            }
            | Event::Load {
                region, assemblies, ..
            } => format!("{assemblies} assemblies ({region})"),
            Event::DischargeFailed { .. } => "failed".to_string(),
            Event::CycleStart { .. }
            | Event::CycleEnd { .. }
            | Event::Retired { .. }
            | Event::DecommissionReady { .. } => String::new(),
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer -- pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer. A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Iterate over events from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        // head is the oldest entry once the buffer has wrapped
        let start = if self.len < self.capacity() { 0 } else { self.head };
        (0..self.len).filter_map(move |i| self.events[(start + i) % self.capacity()].as_ref())
    }

    pub fn clear(&mut self) {
        self.events.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Holds one ring buffer per event kind, listener lists, and suppression
/// flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<PassiveListener>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            default_capacity,
        }
    }

    /// Suppress an event kind. Suppressed events are never buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-op if its kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Register a passive listener. Listeners run in registration order.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.listeners[kind.index()].push(listener);
    }

    /// Hand every buffered event to its listeners, oldest first, then clear
    /// the buffers.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            for listener in &mut self.listeners[idx] {
                for event in buffer.iter() {
                    listener(event);
                }
            }
            buffer.clear();
        }
    }

    /// Get the buffer for an event kind (read-only).
    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Undelivered events of one kind, oldest first.
    pub fn pending(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.buffer(kind).into_iter().flat_map(|b| b.iter())
    }

    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn load(tick: Ticks) -> Event {
        Event::Load {
            region: RegionId(0),
            assemblies: 3,
            tick,
        }
    }

    #[test]
    fn event_names_and_values() {
        assert_eq!(load(0).name(), "LOAD");
        assert_eq!(load(0).value(), "3 assemblies (region 0)");
        let failed = Event::DischargeFailed {
            region: RegionId(1),
            needed: 2,
            room: 0,
            tick: 4,
        };
        assert_eq!(failed.name(), "DISCHARGE");
        assert_eq!(failed.value(), "failed");
        assert_eq!(failed.tick(), 4);
        assert_eq!(Event::DecommissionReady { tick: 9 }.name(), "DECOMMISSION");
    }

    #[test]
    fn ring_buffer_drops_oldest() {
        let mut buf = EventBuffer::new(2);
        buf.push(load(0));
        buf.push(load(1));
        buf.push(load(2));
        let ticks: Vec<_> = buf.iter().map(Event::tick).collect();
        assert_eq!(ticks, vec![1, 2]);
        assert_eq!(buf.total_written(), 3);
    }

    #[test]
    fn event_buffer_zero_capacity_clamped() {
        let buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
    }

    #[test]
    fn suppressed_events_are_not_buffered() {
        let mut bus = EventBus::new(8);
        bus.suppress(EventKind::Load);
        bus.emit(load(0));
        assert!(bus.is_suppressed(EventKind::Load));
        assert!(bus.buffer(EventKind::Load).is_none());
    }

    #[test]
    fn deliver_calls_listeners_in_order_and_clears() {
        let mut bus = EventBus::new(8);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.on_passive(
            EventKind::Load,
            Box::new(move |e| sink.borrow_mut().push((e.name(), e.tick()))),
        );

        bus.emit(load(3));
        bus.emit(load(4));
        bus.emit(Event::CycleStart { tick: 4 });
        assert_eq!(bus.pending(EventKind::Load).count(), 2);
        bus.deliver();

        assert_eq!(*seen.borrow(), vec![("LOAD", 3), ("LOAD", 4)]);
        assert_eq!(bus.pending(EventKind::Load).count(), 0);
        assert_eq!(bus.pending(EventKind::CycleStart).count(), 0);
    }
}
