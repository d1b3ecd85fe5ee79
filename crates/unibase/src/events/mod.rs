//! Scene transition events
//!
//! Key principles:
//! - Handlers register per event type (only interested handlers are notified)
//! - Handler returns bool (true = consumed, stops forwarding)
//! - Events are queued with `send` and delivered by `dispatch`

use std::collections::HashMap;

use crate::scene::catalog::SceneGroupId;
use crate::scene::coordinator::{TransitionError, TransitionId};

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A group transition was accepted
    TransitionStarted,
    /// Smoothed load progress moved
    ProgressChanged,
    /// A group transition finished and its scenes are active
    TransitionCompleted,
    /// A group transition failed or was cancelled
    TransitionFailed,
}

/// Event emitted by the scene loader
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// A group transition was accepted
    TransitionStarted {
        /// Transition id
        id: TransitionId,
        /// Target group
        group: SceneGroupId,
    },
    /// Smoothed load progress moved
    ProgressChanged {
        /// Transition id
        id: TransitionId,
        /// Ratio in `[0, 1]`
        ratio: f32,
    },
    /// A group transition finished and its scenes are active
    TransitionCompleted {
        /// Transition id
        id: TransitionId,
        /// Target group
        group: SceneGroupId,
    },
    /// A group transition failed or was cancelled
    TransitionFailed {
        /// Transition id
        id: TransitionId,
        /// Target group
        group: SceneGroupId,
        /// Why it stopped
        error: TransitionError,
    },
}

impl SceneEvent {
    /// Type used for handler lookup
    pub fn event_type(&self) -> EventType {
        match self {
            Self::TransitionStarted { .. } => EventType::TransitionStarted,
            Self::ProgressChanged { .. } => EventType::ProgressChanged,
            Self::TransitionCompleted { .. } => EventType::TransitionCompleted,
            Self::TransitionFailed { .. } => EventType::TransitionFailed,
        }
    }

    /// Transition the event belongs to
    pub fn transition_id(&self) -> TransitionId {
        match self {
            Self::TransitionStarted { id, .. }
            | Self::ProgressChanged { id, .. }
            | Self::TransitionCompleted { id, .. }
            | Self::TransitionFailed { id, .. } => *id,
        }
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
/// Returns false to allow forwarding to other handlers
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &SceneEvent) -> bool;
}

impl<F> EventHandler for F
where
    F: FnMut(&SceneEvent) -> bool,
{
    fn on_event(&mut self, event: &SceneEvent) -> bool {
        self(event)
    }
}

/// Event system with registration and queuing
/// Follows chain of responsibility pattern
pub struct EventSystem {
    queue: Vec<SceneEvent>,
    handlers: HashMap<EventType, Vec<Box<dyn EventHandler>>>,
    delivered: u64,
}

impl EventSystem {
    /// Create a new empty event system
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            handlers: HashMap::new(),
            delivered: 0,
        }
    }

    /// Register a handler for a specific event type
    /// Only handlers registered for this type will be notified
    pub fn register_handler(&mut self, event_type: EventType, handler: Box<dyn EventHandler>) {
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// Register the same kind of handler for every event type
    pub fn register_for_all<H, F>(&mut self, mut make: F)
    where
        H: EventHandler + 'static,
        F: FnMut() -> H,
    {
        for event_type in [
            EventType::TransitionStarted,
            EventType::ProgressChanged,
            EventType::TransitionCompleted,
            EventType::TransitionFailed,
        ] {
            self.register_handler(event_type, Box::new(make()));
        }
    }

    /// Queue an event for the next dispatch
    pub fn send(&mut self, event: SceneEvent) {
        self.queue.push(event);
    }

    /// Dispatch all pending events in send order
    pub fn dispatch(&mut self) {
        let pending = std::mem::take(&mut self.queue);
        for event in pending {
            self.dispatch_event(&event);
        }
    }

    /// Dispatch single event to registered handlers
    /// Stops on first handler that returns true (consumed)
    fn dispatch_event(&mut self, event: &SceneEvent) {
        self.delivered += 1;
        if let Some(handlers) = self.handlers.get_mut(&event.event_type()) {
            for handler in handlers.iter_mut() {
                if handler.on_event(event) {
                    break;
                }
            }
        }
    }

    /// Events waiting for dispatch
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Events dispatched since creation
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Drop queued events without delivering them
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn started(id: u64) -> SceneEvent {
        SceneEvent::TransitionStarted { id: TransitionId::new(id), group: "Gameplay".into() }
    }

    #[test]
    fn test_dispatch_reaches_registered_type_only() {
        let mut system = EventSystem::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        system.register_handler(
            EventType::TransitionStarted,
            Box::new(move |event: &SceneEvent| {
                sink.borrow_mut().push(event.clone());
                false
            }),
        );

        system.send(started(1));
        system.send(SceneEvent::ProgressChanged { id: TransitionId::new(1), ratio: 0.5 });
        assert_eq!(system.pending(), 2);
        system.dispatch();

        assert_eq!(system.pending(), 0);
        assert_eq!(system.delivered(), 2);
        assert_eq!(*seen.borrow(), vec![started(1)]);
    }

    #[test]
    fn test_event_consumption() {
        let mut system = EventSystem::new();
        let counts = Rc::new(RefCell::new([0_u32; 2]));

        for (slot, consume) in [(0, true), (1, false)] {
            let counts = Rc::clone(&counts);
            system.register_handler(
                EventType::TransitionStarted,
                Box::new(move |_: &SceneEvent| {
                    counts.borrow_mut()[slot] += 1;
                    consume
                }),
            );
        }

        system.send(started(7));
        system.dispatch();

        // Only first handler should have received event
        assert_eq!(*counts.borrow(), [1, 0]);
    }

    #[test]
    fn test_clear_drops_queue() {
        let mut system = EventSystem::new();
        system.send(started(1));
        system.clear();
        system.dispatch();
        assert_eq!(system.delivered(), 0);
    }
}
