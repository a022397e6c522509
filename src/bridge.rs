//! Moves ships across the abstract/materialized boundary.
//!
//! The registry keeps one entry per ship. Crossing the boundary spawns or despawns
//! the live entity and flips that entry's presence tag in the same call, and every
//! batch walks an id snapshot taken before the first mutation.

use bevy::prelude::*;
use rand::Rng;

use crate::behavior::reroute;
use crate::host::EntityHost;
use crate::registry::ShipRegistry;
use crate::ships::{Ship, ShipId};
use crate::world::{random_position, SectorGraph, SectorId};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub materialized: Vec<ShipId>,
    pub dematerialized: Vec<ShipId>,
}

impl TransitionReport {
    pub fn is_empty(&self) -> bool {
        self.materialized.is_empty() && self.dematerialized.is_empty()
    }
}

/// Spawns a live entity for an abstract ship. Position is re-rolled inside the sector.
pub fn materialize(
    registry: &mut ShipRegistry,
    host: &mut impl EntityHost,
    graph: &SectorGraph,
    rng: &mut impl Rng,
    id: ShipId,
) -> bool {
    let Some(entry) = registry.get(id) else {
        return false;
    };
    if entry.is_materialized() {
        return false;
    }

    let radius = graph.radius(entry.ship.sector);
    let position = random_position(rng, radius);
    let Some(ship) = registry.ship_mut(id) else {
        return false;
    };
    ship.position = position;

    let entity = host.spawn_ship(ship);
    if !registry.mark_materialized(id, entity) {
        host.despawn_ship(entity);
        return false;
    }
    debug!("Materialized {} as {:?}", id, entity);
    true
}

/// Despawns a ship's live entity and folds its final live state into the record.
pub fn dematerialize(registry: &mut ShipRegistry, host: &mut impl EntityHost, id: ShipId) -> bool {
    let Some(entity) = registry.mark_abstract(id) else {
        return false;
    };
    let snapshot = host.despawn_ship(entity);
    if let (Some(ship), Some(snapshot)) = (registry.ship_mut(id), snapshot) {
        ship.position = snapshot.position;
        ship.defense = snapshot.defense;
        ship.defense.clamp();
    }
    debug!("Dematerialized {} from {:?}", id, entity);
    true
}

/// Swaps the live set when the player enters `sector`. Ships leaving the live set are
/// recorded in `sector` with their last live position.
pub fn change_player_sector(
    registry: &mut ShipRegistry,
    host: &mut impl EntityHost,
    graph: &SectorGraph,
    rng: &mut impl Rng,
    sector: SectorId,
) -> TransitionReport {
    let mut report = TransitionReport::default();

    for id in registry.materialized_ids() {
        if !dematerialize(registry, host, id) {
            continue;
        }
        if let Some(ship) = registry.ship_mut(id) {
            reroute(ship, graph, sector);
        }
        report.dematerialized.push(id);
    }

    host.set_active_sector(sector);

    for id in registry.ids_in_sector(sector) {
        if materialize(registry, host, graph, rng, id) {
            report.materialized.push(id);
        }
    }

    info!(
        "Player entered {} ({} ships in, {} out)",
        graph.name(sector),
        report.materialized.len(),
        report.dematerialized.len()
    );
    report
}

/// Applies the boundary rule after ships have moved: live ships outside the active
/// sector go abstract, abstract ships inside it go live.
pub fn reconcile(
    registry: &mut ShipRegistry,
    host: &mut impl EntityHost,
    graph: &SectorGraph,
    rng: &mut impl Rng,
) -> TransitionReport {
    let mut report = TransitionReport::default();
    let Some(active) = host.active_sector() else {
        return report;
    };

    for id in registry.materialized_ids() {
        let left = registry.ship(id).is_some_and(|ship| ship.sector != active);
        if left && dematerialize(registry, host, id) {
            report.dematerialized.push(id);
        }
    }

    for id in registry.abstract_ids() {
        let arrived = registry.ship(id).is_some_and(|ship| ship.sector == active);
        if arrived && materialize(registry, host, graph, rng, id) {
            report.materialized.push(id);
        }
    }

    report
}

/// Moves the player to a ship's sector. Returns whether the ship exists.
pub fn jump_to_ship(
    registry: &mut ShipRegistry,
    host: &mut impl EntityHost,
    graph: &SectorGraph,
    rng: &mut impl Rng,
    id: ShipId,
) -> bool {
    let Some(sector) = registry.ship(id).map(|ship| ship.sector) else {
        return false;
    };
    if host.active_sector() != Some(sector) {
        change_player_sector(registry, host, graph, rng, sector);
    }
    true
}

/// Copies live position and defense from the host into materialized records.
pub fn pull_live_state(registry: &mut ShipRegistry, host: &impl EntityHost) {
    for entry in registry.iter_mut() {
        let Some(entity) = entry.entity() else {
            continue;
        };
        if let Some(snapshot) = host.snapshot(entity) {
            entry.ship.position = snapshot.position;
            entry.ship.defense = snapshot.defense;
            entry.ship.defense.clamp();
        }
    }
}

/// Writes materialized records back onto their live entities.
pub fn push_live_state(registry: &ShipRegistry, host: &mut impl EntityHost) {
    for entry in registry.iter() {
        if let Some(entity) = entry.entity() {
            host.push(entity, &entry.ship);
        }
    }
}

/// Every ship in its abstract form, with live state folded in for materialized ones.
pub fn abstract_view(registry: &ShipRegistry, host: &impl EntityHost) -> Vec<Ship> {
    registry
        .iter()
        .map(|entry| {
            let mut ship = entry.ship.clone();
            if let Some(snapshot) = entry.entity().and_then(|entity| host.snapshot(entity)) {
                ship.position = snapshot.position;
                ship.defense = snapshot.defense;
            }
            ship
        })
        .collect()
}
