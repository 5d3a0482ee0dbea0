//! Trailing-edge coalescing of high-frequency input events.
//!
//! Every `schedule` hands out a ticket and starts a new generation for its
//! slot. The caller waits out the quiet window and then asks for the payload
//! with the ticket; only the newest ticket of a slot gets it, older ones find
//! themselves superseded. Nothing is ever cancelled explicitly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How input sources share debounce slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DebounceScope {
    /// One slot for the whole page: switching fields within the window drops
    /// the first field's pending send.
    Global,
    /// One slot per (host, field) pair.
    #[default]
    PerField,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CoalesceKey {
    pub host: u64,
    pub field: String,
}

impl CoalesceKey {
    pub fn new(host: u64, field: impl Into<String>) -> Self {
        Self {
            host,
            field: field.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    slot: Option<CoalesceKey>,
    generation: u64,
}

struct Pending<T> {
    generation: u64,
    payload: T,
}

pub struct Coalescer<T> {
    scope: DebounceScope,
    next_generation: u64,
    pending: HashMap<Option<CoalesceKey>, Pending<T>>,
}

impl<T> Coalescer<T> {
    pub fn new(scope: DebounceScope) -> Self {
        Self {
            scope,
            next_generation: 0,
            pending: HashMap::new(),
        }
    }

    /// Replaces whatever is pending in `key`'s slot.
    pub fn schedule(&mut self, key: CoalesceKey, payload: T) -> Ticket {
        let slot = match self.scope {
            DebounceScope::Global => None,
            DebounceScope::PerField => Some(key),
        };
        self.next_generation += 1;
        let generation = self.next_generation;
        self.pending
            .insert(slot.clone(), Pending { generation, payload });
        Ticket { slot, generation }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.pending
            .get(&ticket.slot)
            .is_some_and(|pending| pending.generation == ticket.generation)
    }

    /// The payload, if `ticket` is still the newest of its slot.
    pub fn take_if_current(&mut self, ticket: &Ticket) -> Option<T> {
        if !self.is_current(ticket) {
            return None;
        }
        self.pending.remove(&ticket.slot).map(|pending| pending.payload)
    }

    /// Drops every pending payload. Tickets already handed out become stale.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_yields_only_the_last_payload() {
        let mut coalescer = Coalescer::new(DebounceScope::PerField);
        let tickets: Vec<_> = (1..=5)
            .map(|n| coalescer.schedule(CoalesceKey::new(1, "q"), n))
            .collect();
        let sent: Vec<_> = tickets
            .iter()
            .filter_map(|ticket| coalescer.take_if_current(ticket))
            .collect();
        assert_eq!(sent, [5]);
        assert_eq!(coalescer.pending_len(), 0);
    }

    #[test]
    fn per_field_slots_do_not_starve_each_other() {
        let mut coalescer = Coalescer::new(DebounceScope::PerField);
        let name = coalescer.schedule(CoalesceKey::new(1, "name"), "felix");
        let email = coalescer.schedule(CoalesceKey::new(1, "email"), "f@x");
        assert_eq!(coalescer.take_if_current(&name), Some("felix"));
        assert_eq!(coalescer.take_if_current(&email), Some("f@x"));
    }

    #[test]
    fn global_slot_drops_the_first_field() {
        let mut coalescer = Coalescer::new(DebounceScope::Global);
        let name = coalescer.schedule(CoalesceKey::new(1, "name"), "felix");
        let email = coalescer.schedule(CoalesceKey::new(2, "email"), "f@x");
        assert_eq!(coalescer.take_if_current(&name), None);
        assert_eq!(coalescer.take_if_current(&email), Some("f@x"));
    }

    #[test]
    fn a_ticket_pays_out_once() {
        let mut coalescer = Coalescer::new(DebounceScope::PerField);
        let ticket = coalescer.schedule(CoalesceKey::new(1, "q"), ());
        assert!(coalescer.take_if_current(&ticket).is_some());
        assert!(coalescer.take_if_current(&ticket).is_none());
    }
}
