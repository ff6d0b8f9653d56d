// SPDX-License-Identifier: Apache-2.0

//! Synchronous mutation events for logic networks.
//!
//! Subscribers are closures that receive the event plus a `LevelContext`
//! through which they may inspect the structure around the affected node and
//! update levels. Handlers run in registration order, immediately, on the
//! thread performing the mutation.

use std::ops::{Deref, DerefMut};

use crate::network::LogicNetwork;
use crate::network::gate::{NodeRef, Signal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// A node was created or revived.
    Add(NodeRef),
    /// A node's fanins were rewritten in place.
    Modified {
        node: NodeRef,
        old_fanins: Vec<Signal>,
    },
    /// A node was taken out of the network.
    Delete(NodeRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// View of the network handed to event handlers.
pub trait LevelContext {
    fn fanins(&self, node: NodeRef) -> &[Signal];
    fn fanouts(&self, node: NodeRef) -> &[NodeRef];
    fn is_dead(&self, node: NodeRef) -> bool;
    fn level(&self, node: NodeRef) -> u32;
    fn set_level(&mut self, node: NodeRef, level: u32);
}

pub type EventHandler = Box<dyn FnMut(&NetworkEvent, &mut dyn LevelContext)>;

#[derive(Default)]
pub struct NetworkEvents {
    next_id: u64,
    handlers: Vec<(SubscriptionId, EventHandler)>,
}

impl NetworkEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    /// Releases a subscription; returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        self.handlers.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn fire(&mut self, event: &NetworkEvent, ctx: &mut dyn LevelContext) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(event, ctx);
        }
    }
}

impl std::fmt::Debug for NetworkEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkEvents")
            .field("subscriptions", &self.handlers.len())
            .finish()
    }
}

/// Borrows a network for the duration of a pass and releases every
/// subscription made through it when dropped.
pub struct ScopedSubscriptions<'a, N: LogicNetwork> {
    ntk: &'a mut N,
    ids: Vec<SubscriptionId>,
}

impl<'a, N: LogicNetwork> ScopedSubscriptions<'a, N> {
    pub fn new(ntk: &'a mut N) -> Self {
        Self {
            ntk,
            ids: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, handler: EventHandler) -> SubscriptionId {
        let id = self.ntk.subscribe(handler);
        self.ids.push(id);
        id
    }
}

impl<N: LogicNetwork> Deref for ScopedSubscriptions<'_, N> {
    type Target = N;

    fn deref(&self) -> &N {
        self.ntk
    }
}

impl<N: LogicNetwork> DerefMut for ScopedSubscriptions<'_, N> {
    fn deref_mut(&mut self) -> &mut N {
        self.ntk
    }
}

impl<N: LogicNetwork> Drop for ScopedSubscriptions<'_, N> {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            let released = self.ntk.unsubscribe(id);
            debug_assert!(released, "subscription {:?} was already released", id);
        }
    }
}
