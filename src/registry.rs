//! Authoritative store for every live ship.
//!
//! Each ship id maps to exactly one entry, and the entry's [`Presence`] says whether
//! the ship is simulated abstractly or owned by the entity host. Moving a ship
//! between the two is a single tag flip on that entry, so no iteration can observe
//! a ship in both stores or in neither.

use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::factions::FactionId;
use crate::ships::{Ship, ShipId, ShipRole};
use crate::world::SectorId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Presence {
    Abstract,
    Materialized(Entity),
}

#[derive(Clone, Debug)]
pub struct ShipEntry {
    pub ship: Ship,
    pub presence: Presence,
}

impl ShipEntry {
    pub fn is_materialized(&self) -> bool {
        matches!(self.presence, Presence::Materialized(_))
    }

    pub fn entity(&self) -> Option<Entity> {
        match self.presence {
            Presence::Materialized(entity) => Some(entity),
            Presence::Abstract => None,
        }
    }
}

/// Per-faction, per-role hull numbering.
#[derive(Debug, Default, Clone)]
pub struct NameGenerator {
    counters: BTreeMap<(FactionId, ShipRole), u32>,
}

impl NameGenerator {
    pub fn next_name(&mut self, tag: &str, faction: &FactionId, role: ShipRole) -> String {
        let counter = self.counters.entry((faction.clone(), role)).or_insert(0);
        *counter += 1;
        format!("{} {}-{:03}", tag, role.label(), counter)
    }

    /// Continues numbering after ships that already exist.
    pub fn resume(&mut self, faction: &FactionId, role: ShipRole, issued: u32) {
        let counter = self.counters.entry((faction.clone(), role)).or_insert(0);
        *counter = (*counter).max(issued);
    }
}

#[derive(Resource, Debug, Default, Clone)]
pub struct ShipRegistry {
    entries: BTreeMap<ShipId, ShipEntry>,
    next_id: u64,
    pub names: NameGenerator,
}

impl ShipRegistry {
    pub fn allocate_id(&mut self) -> ShipId {
        self.next_id = self.next_id.max(1);
        let id = ShipId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Adds an abstract ship. Refuses ids that are already registered.
    pub fn insert(&mut self, ship: Ship) -> bool {
        if self.entries.contains_key(&ship.id) {
            return false;
        }
        self.next_id = self.next_id.max(ship.id.0 + 1);
        self.entries.insert(
            ship.id,
            ShipEntry {
                ship,
                presence: Presence::Abstract,
            },
        );
        true
    }

    pub fn remove(&mut self, id: ShipId) -> Option<ShipEntry> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: ShipId) -> Option<&ShipEntry> {
        self.entries.get(&id)
    }

    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.entries.get(&id).map(|entry| &entry.ship)
    }

    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.entries.get_mut(&id).map(|entry| &mut entry.ship)
    }

    pub fn contains(&self, id: ShipId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShipEntry> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ShipEntry> {
        self.entries.values_mut()
    }

    /// Snapshot of abstract ship ids in registry order.
    pub fn abstract_ids(&self) -> Vec<ShipId> {
        self.ids_where(|entry| !entry.is_materialized())
    }

    /// Snapshot of materialized ship ids in registry order.
    pub fn materialized_ids(&self) -> Vec<ShipId> {
        self.ids_where(ShipEntry::is_materialized)
    }

    pub fn ids_in_sector(&self, sector: SectorId) -> Vec<ShipId> {
        self.ids_where(|entry| entry.ship.sector == sector)
    }

    /// Idle ships of a faction from both stores.
    pub fn idle_ids(&self, faction: &FactionId) -> Vec<ShipId> {
        self.ids_where(|entry| &entry.ship.faction == faction && entry.ship.is_idle())
    }

    pub fn count_by_role(&self, faction: &FactionId) -> BTreeMap<ShipRole, u32> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.values() {
            if &entry.ship.faction == faction {
                *counts.entry(entry.ship.role).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn count_by_faction(&self) -> BTreeMap<FactionId, u32> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.values() {
            *counts.entry(entry.ship.faction.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Flags an abstract ship as owned by the host entity.
    pub fn mark_materialized(&mut self, id: ShipId, entity: Entity) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) if !entry.is_materialized() => {
                entry.presence = Presence::Materialized(entity);
                true
            }
            _ => false,
        }
    }

    /// Returns the ship to the abstract store, yielding the entity it had.
    pub fn mark_abstract(&mut self, id: ShipId) -> Option<Entity> {
        let entry = self.entries.get_mut(&id)?;
        let entity = entry.entity()?;
        entry.presence = Presence::Abstract;
        Some(entity)
    }

    fn ids_where(&self, predicate: impl Fn(&ShipEntry) -> bool) -> Vec<ShipId> {
        self.entries
            .iter()
            .filter(|(_, entry)| predicate(entry))
            .map(|(id, _)| *id)
            .collect()
    }
}
