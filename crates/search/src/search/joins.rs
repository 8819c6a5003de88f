//! Join bookkeeping.
//!
//! Joining a one-to-many relation multiplies base rows, so the first join
//! switches on duplicate suppression (`DISTINCT`). [`JoinSet`] records which
//! entities are attached and makes sure suppression is applied exactly once
//! no matter how many joins follow.

use super::whitelist::Entity;

/// The set of entities joined onto the base inventory scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinSet {
    joined: Vec<Entity>,
    distinct: bool,
    suppression_applications: u32,
}

impl JoinSet {
    /// Creates an empty join set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins `entity` unless it is the base or already joined.
    ///
    /// Returns true if a new join was recorded.
    pub fn ensure_joined(&mut self, entity: Entity) -> bool {
        if entity == Entity::Inventory || self.joined.contains(&entity) {
            return false;
        }
        tracing::trace!(entity = %entity, "joining related entity");
        self.joined.push(entity);
        self.apply_distinct();
        true
    }

    /// Turns on duplicate suppression. Does nothing if it is already on.
    pub fn apply_distinct(&mut self) {
        if !self.distinct {
            self.distinct = true;
            self.suppression_applications += 1;
        }
    }

    /// Returns true if duplicate suppression is on.
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Number of times suppression was switched on. Never more than one.
    pub fn suppression_applications(&self) -> u32 {
        self.suppression_applications
    }

    /// Joined entities in join order.
    pub fn entities(&self) -> &[Entity] {
        &self.joined
    }

    /// Returns true if nothing is joined.
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty()
    }
}
