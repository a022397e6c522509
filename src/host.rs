//! Live entity side of the materialization boundary.

use bevy::prelude::*;

use crate::ships::{DefensePools, Ship, ShipId};
use crate::world::SectorId;

/// Sector the player currently occupies.
#[derive(Resource, Debug, Clone, Copy, Eq, PartialEq)]
pub struct ActiveSector(pub SectorId);

/// Marks an entity as the live stand-in for a registry ship.
#[derive(Component, Debug, Clone, Copy, Eq, PartialEq)]
pub struct LiveShip {
    pub id: ShipId,
}

/// Live defensive state for a materialized ship.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct LiveDefense(pub DefensePools);

/// Fields the entity side may have changed since spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveSnapshot {
    pub position: Vec2,
    pub defense: DefensePools,
}

const LIVE_SHIP_Z: f32 = 0.4;

/// Whatever owns materialized ships while the player watches them.
pub trait EntityHost {
    fn active_sector(&self) -> Option<SectorId>;
    fn set_active_sector(&mut self, sector: SectorId);
    fn spawn_ship(&mut self, ship: &Ship) -> Entity;
    /// Removes the entity, returning its final live state.
    fn despawn_ship(&mut self, entity: Entity) -> Option<LiveSnapshot>;
    fn snapshot(&self, entity: Entity) -> Option<LiveSnapshot>;
    fn push(&mut self, entity: Entity, ship: &Ship);
}

impl EntityHost for World {
    fn active_sector(&self) -> Option<SectorId> {
        self.get_resource::<ActiveSector>().map(|sector| sector.0)
    }

    fn set_active_sector(&mut self, sector: SectorId) {
        self.insert_resource(ActiveSector(sector));
    }

    fn spawn_ship(&mut self, ship: &Ship) -> Entity {
        self.spawn((
            LiveShip { id: ship.id },
            LiveDefense(ship.defense),
            Name::new(ship.name.clone()),
            Transform::from_xyz(ship.position.x, ship.position.y, LIVE_SHIP_Z),
        ))
        .id()
    }

    fn despawn_ship(&mut self, entity: Entity) -> Option<LiveSnapshot> {
        let snapshot = EntityHost::snapshot(self, entity);
        if !self.despawn(entity) {
            return None;
        }
        snapshot
    }

    fn snapshot(&self, entity: Entity) -> Option<LiveSnapshot> {
        let transform = self.get::<Transform>(entity)?;
        let defense = self.get::<LiveDefense>(entity)?;
        Some(LiveSnapshot {
            position: transform.translation.truncate(),
            defense: defense.0,
        })
    }

    fn push(&mut self, entity: Entity, ship: &Ship) {
        if let Some(mut transform) = self.get_mut::<Transform>(entity) {
            transform.translation.x = ship.position.x;
            transform.translation.y = ship.position.y;
        }
        if let Some(mut defense) = self.get_mut::<LiveDefense>(entity) {
            defense.0 = ship.defense;
        }
    }
}
