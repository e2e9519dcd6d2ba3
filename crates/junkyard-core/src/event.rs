//! Yard change notifications and the listener bus that fans them out.
//!
//! [`YardState`](crate::yard::YardState) records a [`YardEvent`] for every
//! mutation. The owning [`Simulation`](crate::sim::Simulation) drains those
//! records after each call or tick and publishes them through an
//! [`EventBus`], in emission order.
//!
//! # Listeners
//!
//! Listeners are passive: they get `&YardEvent` and no access to the yard, so
//! a listener can never re-enter yard mutation while a tick is in progress.
//! For each event, the listeners registered for its kind run in
//! `(priority, registration order)`.
//!
//! # Suppression
//!
//! A suppressed kind is neither delivered nor logged. Emission counters still
//! advance so statistics stay accurate.

use crate::fixed::Ticks;
use crate::yard::{ItemInstance, MachineInstance};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Why an item left the yard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalReason {
    /// Its cell no longer holds a conveyor.
    OffConveyor,
    /// It reached the far edge of a conveyor with nothing downstream.
    DeadEnd,
    /// Removed explicitly by a caller.
    Removed,
}

/// A change to the yard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YardEvent {
    MachinePlaced {
        machine: MachineInstance,
    },
    MachineRemoved {
        machine: MachineInstance,
    },
    ItemAdded {
        item: ItemInstance,
    },
    ItemRemoved {
        item: ItemInstance,
        reason: RemovalReason,
    },
    TickCompleted {
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for subscription and suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MachinePlaced,
    MachineRemoved,
    ItemAdded,
    ItemRemoved,
    TickCompleted,
}

const EVENT_KIND_COUNT: usize = 5;

impl YardEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            YardEvent::MachinePlaced { .. } => EventKind::MachinePlaced,
            YardEvent::MachineRemoved { .. } => EventKind::MachineRemoved,
            YardEvent::ItemAdded { .. } => EventKind::ItemAdded,
            YardEvent::ItemRemoved { .. } => EventKind::ItemRemoved,
            YardEvent::TickCompleted { .. } => EventKind::TickCompleted,
        }
    }
}

impl EventKind {
    pub fn all() -> [EventKind; EVENT_KIND_COUNT] {
        [
            EventKind::MachinePlaced,
            EventKind::MachineRemoved,
            EventKind::ItemAdded,
            EventKind::ItemRemoved,
            EventKind::TickCompleted,
        ]
    }

    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventLog: fixed-capacity history
// ---------------------------------------------------------------------------

/// Ring buffer of the most recent published events. When full, the oldest
/// entry is overwritten.
#[derive(Debug)]
pub struct EventLog {
    events: Vec<Option<YardEvent>>,
    head: usize,
    len: usize,
    total_written: u64,
}

impl EventLog {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: YardEvent) {
        let capacity = self.capacity();
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % capacity;
        if self.len < capacity {
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

    /// Events overwritten because the log was full.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &YardEvent> + '_ {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        (0..self.len).filter_map(move |i| {
            let slot = (start + i) % self.capacity();
            self.events[slot].as_ref()
        })
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
        self.total_written = 0;
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type Listener = Box<dyn FnMut(&YardEvent)>;

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&YardEvent) -> bool>;

/// Priority level for listeners. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ListenerPriority {
    Pre = 0,
    #[default]
    Normal = 1,
    Post = 2,
}

/// Handle returned by subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    priority: ListenerPriority,
    filter: Option<EventFilter>,
    listener: Listener,
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("filtered", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Fans yard events out to listeners and keeps a short history.
pub struct EventBus {
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    emitted: [u64; EVENT_KIND_COUNT],
    log: EventLog,
    next_listener: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("suppressed", &self.suppressed)
            .field("emitted", &self.emitted)
            .field("log_len", &self.log.len())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// A bus whose history keeps the last `log_capacity` events.
    pub fn new(log_capacity: usize) -> Self {
        Self {
            listeners: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            emitted: [0; EVENT_KIND_COUNT],
            log: EventLog::new(log_capacity),
            next_listener: 0,
        }
    }

    /// Subscribe with normal priority and no filter.
    pub fn subscribe(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.subscribe_filtered(kind, ListenerPriority::Normal, None, listener)
    }

    /// Subscribe with explicit priority and optional filter.
    pub fn subscribe_filtered(
        &mut self,
        kind: EventKind,
        priority: ListenerPriority,
        filter: Option<EventFilter>,
        listener: Listener,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        let list = &mut self.listeners[kind.index()];
        list.push(ListenerEntry {
            id,
            priority,
            filter,
            listener,
        });
        // Ids grow monotonically, so they double as registration order.
        list.sort_by_key(|entry| (entry.priority, entry.id.0));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        for list in &mut self.listeners {
            if let Some(pos) = list.iter().position(|entry| entry.id == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Deliver one event to its listeners and append it to the history.
    pub fn publish(&mut self, event: &YardEvent) {
        let idx = event.kind().index();
        self.emitted[idx] += 1;
        if self.suppressed[idx] {
            return;
        }
        for entry in &mut self.listeners[idx] {
            if let Some(filter) = &entry.filter
                && !filter(event)
            {
                continue;
            }
            (entry.listener)(event);
        }
        self.log.push(event.clone());
    }

    /// Deliver a batch in order.
    pub fn publish_all(&mut self, events: &[YardEvent]) {
        for event in events {
            self.publish(event);
        }
    }

    /// Events of this kind published so far, suppressed ones included.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.emitted[kind.index()]
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners[kind.index()].len()
    }

    /// Recent delivered events, oldest first.
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Clear history and counters. Listeners and suppression are kept.
    pub fn reset(&mut self) {
        self.log.clear();
        self.emitted = [0; EVENT_KIND_COUNT];
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
