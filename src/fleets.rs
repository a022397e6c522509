//! Commissioning ships: starting fleets and replacements.

use bevy::prelude::*;
use rand::Rng;

use crate::factions::{FactionId, FactionRegistry};
use crate::registry::ShipRegistry;
use crate::ships::{Ship, ShipClasses, ShipId, ShipRole};
use crate::world::{random_position, SectorGraph};

/// Builds one ship for `faction` at its base sector and registers it as abstract.
///
/// Returns `None` when the faction, its base sector or the hull class for `role`
/// is missing from reference data.
pub fn commission_ship(
    registry: &mut ShipRegistry,
    factions: &mut FactionRegistry,
    classes: &ShipClasses,
    graph: &SectorGraph,
    faction: &FactionId,
    role: ShipRole,
    rng: &mut impl Rng,
) -> Option<ShipId> {
    let config = factions.config(faction)?;
    let sector = config.base_sector()?;
    let Some(class) = config
        .ship_classes
        .get(&role)
        .and_then(|name| classes.get(name))
    else {
        warn!("{} has no hull class for {}", faction, role.label());
        return None;
    };

    let id = registry.allocate_id();
    let name = registry.names.next_name(&config.tag, faction, role);
    let position = random_position(rng, graph.radius(sector));
    let ship = Ship::new(id, faction.clone(), role, class, name, sector, position);
    if !registry.insert(ship) {
        return None;
    }
    factions.record_commission(faction);
    Some(id)
}

/// Spawns every faction's starting composition. Returns the number of ships built.
pub fn seed_starting_fleets(
    registry: &mut ShipRegistry,
    factions: &mut FactionRegistry,
    classes: &ShipClasses,
    graph: &SectorGraph,
    rng: &mut impl Rng,
) -> usize {
    let mut built = 0;
    for faction in factions.ids() {
        let composition = factions
            .config(&faction)
            .map(|config| config.starting_composition.clone())
            .unwrap_or_default();
        for (role, count) in composition {
            for _ in 0..count {
                if commission_ship(registry, factions, classes, graph, &faction, role, rng)
                    .is_some()
                {
                    built += 1;
                }
            }
        }
    }
    info!("Seeded {} ships across {} factions", built, factions.len());
    built
}
