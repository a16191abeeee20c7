//! Ordered hide-spot puzzle.
//!
//! Hiding in spots in a fixed order solves the puzzle. A wrong spot sends
//! progress back to the start. What solving unlocks is up to the listener of
//! [`GameEvent::PuzzleSolved`].

use tracing::{debug, info};
use umbra_common::SpotId;

use crate::events::{notify, EventSender, GameEvent};

/// Result of registering one spot with the puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuzzleProgress {
    /// Correct spot, more to go
    Advanced,
    /// Correct spot, sequence complete
    Completed,
    /// Wrong spot, progress cleared
    Reset,
    /// Puzzle was already complete; input ignored
    AlreadySolved,
}

/// Spot sequence that must be visited in order.
#[derive(Debug, Clone, Default)]
pub struct SequencePuzzle {
    correct_order: Vec<SpotId>,
    step: usize,
    notifier: Option<EventSender>,
}

impl SequencePuzzle {
    /// Creates a puzzle with the given solution.
    #[must_use]
    pub fn new(correct_order: Vec<SpotId>) -> Self {
        Self {
            correct_order,
            step: 0,
            notifier: None,
        }
    }

    /// Publishes progress to `sender`.
    #[must_use]
    pub fn with_notifier(mut self, sender: EventSender) -> Self {
        self.notifier = Some(sender);
        self
    }

    /// Returns the solution.
    #[must_use]
    pub fn correct_order(&self) -> &[SpotId] {
        &self.correct_order
    }

    /// Returns the number of matched steps.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.step
    }

    /// Checks whether the sequence is complete.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.step >= self.correct_order.len()
    }

    /// Registers a hide in `spot`.
    pub fn register(&mut self, spot: SpotId) -> PuzzleProgress {
        let Some(&expected) = self.correct_order.get(self.step) else {
            return PuzzleProgress::AlreadySolved;
        };

        if spot != expected {
            debug!("Wrong spot {spot} (expected {expected}), puzzle reset");
            self.step = 0;
            notify(self.notifier.as_ref(), GameEvent::PuzzleReset);
            return PuzzleProgress::Reset;
        }

        self.step += 1;
        let total = self.correct_order.len();
        notify(
            self.notifier.as_ref(),
            GameEvent::PuzzleAdvanced {
                step: self.step,
                total,
            },
        );

        if self.is_solved() {
            info!("Puzzle solved");
            notify(self.notifier.as_ref(), GameEvent::PuzzleSolved);
            PuzzleProgress::Completed
        } else {
            debug!("Puzzle step {}/{total}", self.step);
            PuzzleProgress::Advanced
        }
    }

    /// Feeds every `SpotEntered` event in `events` to the puzzle.
    ///
    /// Returns the progress of each registered spot in order.
    pub fn consume<'a, I>(&mut self, events: I) -> Vec<PuzzleProgress>
    where
        I: IntoIterator<Item = &'a GameEvent>,
    {
        events
            .into_iter()
            .filter_map(|event| match event {
                GameEvent::SpotEntered { spot, .. } => Some(self.register(*spot)),
                _ => None,
            })
            .collect()
    }
}
