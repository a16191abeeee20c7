//! Event bus for progression and AI notifications.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use umbra_common::{EntityId, SpotId};

use crate::enemy::EnemyState;

/// Events published by spots, agents and puzzles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An agent started hiding in a spot
    SpotEntered {
        /// Spot id
        spot: SpotId,
        /// Hiding agent
        agent: EntityId,
    },
    /// An agent left a spot
    SpotReleased {
        /// Spot id
        spot: SpotId,
        /// Agent that left
        agent: EntityId,
    },
    /// An enemy changed state
    EnemyStateChanged {
        /// Enemy id
        agent: EntityId,
        /// Previous state
        from: EnemyState,
        /// New state
        to: EnemyState,
    },
    /// A puzzle step was matched
    PuzzleAdvanced {
        /// Steps matched so far
        step: usize,
        /// Steps in the full sequence
        total: usize,
    },
    /// A wrong spot reset the puzzle
    PuzzleReset,
    /// The full sequence was matched
    PuzzleSolved,
}

/// Sending half handed to spots and agents.
pub type EventSender = Sender<GameEvent>;

/// Publishes without blocking; a full or closed channel drops the event.
pub fn notify(sender: Option<&EventSender>, event: GameEvent) {
    if let Some(sender) = sender {
        let _ = sender.try_send(event);
    }
}

/// Bounded multi-producer event bus.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }
}
