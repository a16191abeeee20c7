//! Registry of all enemies in a level.

use std::collections::HashMap;

use glam::Vec2;
use thiserror::Error;
use tracing::{debug, warn};
use umbra_common::EntityId;

use crate::enemy::{AgentBody, EnemyAgent, EnemyConfig, TickReport};
use crate::target::TargetStatus;
use crate::wander::RoamBounds;
use crate::world::WorldQuery;

/// Error types for roster operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    /// Agent not found
    #[error("Enemy not found: {0}")]
    NotFound(EntityId),
    /// Agent already registered
    #[error("Enemy already registered: {0}")]
    AlreadyRegistered(EntityId),
}

/// Result type for roster operations.
pub type RosterResult<T> = Result<T, RosterError>;

/// Position store shared by all agents.
pub trait AgentStorage {
    /// Gets an agent's position.
    fn position(&self, agent: EntityId) -> Option<Vec2>;
    /// Sets an agent's position.
    fn move_position(&mut self, agent: EntityId, position: Vec2);
}

impl AgentStorage for HashMap<EntityId, Vec2> {
    fn position(&self, agent: EntityId) -> Option<Vec2> {
        self.get(&agent).copied()
    }

    fn move_position(&mut self, agent: EntityId, position: Vec2) {
        self.insert(agent, position);
    }
}

/// Borrowed view of one agent's slot in an [`AgentStorage`].
struct StoredBody<'a, S: ?Sized> {
    storage: &'a mut S,
    agent: EntityId,
    position: Vec2,
}

impl<S: AgentStorage + ?Sized> AgentBody for StoredBody<'_, S> {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn move_position(&mut self, position: Vec2) {
        self.position = position;
        self.storage.move_position(self.agent, position);
    }
}

/// All enemies of a level, updated together each tick.
#[derive(Debug, Default)]
pub struct EnemyRoster {
    agents: HashMap<EntityId, EnemyAgent>,
    next_seed: u64,
}

impl EnemyRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty roster whose spawned agents derive seeds from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            agents: HashMap::new(),
            next_seed: seed,
        }
    }

    /// Returns the number of agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Returns whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Gets an agent.
    #[must_use]
    pub fn get(&self, agent: EntityId) -> Option<&EnemyAgent> {
        self.agents.get(&agent)
    }

    /// Gets a mutable agent.
    pub fn get_mut(&mut self, agent: EntityId) -> Option<&mut EnemyAgent> {
        self.agents.get_mut(&agent)
    }

    /// Iterates over all agents in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &EnemyAgent)> {
        self.agents.iter().map(|(id, agent)| (*id, agent))
    }

    /// Spawns a new agent and records its position in `storage`.
    pub fn spawn<S: AgentStorage + ?Sized>(
        &mut self,
        storage: &mut S,
        config: EnemyConfig,
        position: Vec2,
        bounds: Option<RoamBounds>,
    ) -> EntityId {
        let id = EntityId::new();
        self.next_seed = self.next_seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut agent = EnemyAgent::new(id, config, position, self.next_seed);
        agent.set_roam_bounds(bounds);

        storage.move_position(id, position);
        self.agents.insert(id, agent);
        debug!("Spawned {id} at {position}");
        id
    }

    /// Registers an existing agent.
    pub fn register(&mut self, agent: EnemyAgent) -> RosterResult<()> {
        let id = agent.id();
        if self.agents.contains_key(&id) {
            return Err(RosterError::AlreadyRegistered(id));
        }
        self.agents.insert(id, agent);
        Ok(())
    }

    /// Removes an agent.
    pub fn despawn(&mut self, agent: EntityId) -> RosterResult<EnemyAgent> {
        self.agents.remove(&agent).ok_or(RosterError::NotFound(agent))
    }

    /// Ticks every agent against the same target.
    ///
    /// Agents are updated in id order. Agents without a stored position are
    /// skipped.
    pub fn update_all<W, S>(
        &mut self,
        dt: f32,
        world: &W,
        storage: &mut S,
        target: Option<&TargetStatus>,
    ) -> Vec<(EntityId, TickReport)>
    where
        W: WorldQuery + ?Sized,
        S: AgentStorage + ?Sized,
    {
        let mut ids: Vec<EntityId> = self.agents.keys().copied().collect();
        ids.sort_unstable();

        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(agent) = self.agents.get_mut(&id) else {
                continue;
            };
            let Some(position) = storage.position(id) else {
                warn!("{id} has no stored position, skipping");
                continue;
            };

            let mut body = StoredBody {
                storage: &mut *storage,
                agent: id,
                position,
            };
            reports.push((id, agent.update(dt, world, &mut body, target)));
        }
        reports
    }
}
