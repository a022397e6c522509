//! Headless stand-in for the player: sector tour and jump-to-ship requests.

use bevy::prelude::*;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

use crate::bridge::{change_player_sector, jump_to_ship};
use crate::host::EntityHost;
use crate::plugins::core::{EventLog, SimConfig, SimRng, SimTimers};
use crate::plugins::sim::SimSet;
use crate::registry::ShipRegistry;
use crate::ships::ShipId;
use crate::world::SectorGraph;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        let requests = app
            .world()
            .get_resource::<SimConfig>()
            .map(|config| JumpRequests::queued(&config.jump_to))
            .unwrap_or_default();
        app.insert_resource(requests).add_systems(
            FixedUpdate,
            (player_tour.run_if(tour_due), process_jump_requests)
                .chain()
                .in_set(SimSet::Player),
        );
    }
}

/// Ships the operator asked to jump to, oldest first.
#[derive(Resource, Debug, Default)]
pub struct JumpRequests {
    pending: VecDeque<ShipId>,
}

impl JumpRequests {
    pub fn queued(ids: &[ShipId]) -> Self {
        Self {
            pending: ids.iter().copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn tour_due(timers: Res<SimTimers>) -> bool {
    timers
        .tour
        .as_ref()
        .is_some_and(|timer| timer.just_finished())
}

/// Moves the player through a random gate of the current sector.
fn player_tour(world: &mut World) {
    let Some(current) = world.active_sector() else {
        return;
    };
    world.try_resource_scope(|world, mut registry: Mut<ShipRegistry>| {
        world.try_resource_scope(|world, graph: Mut<SectorGraph>| {
            world.try_resource_scope(|world, mut rng: Mut<SimRng>| {
                let Some(next) = graph.neighbors(current).choose(&mut rng.0).copied() else {
                    return;
                };
                let report = change_player_sector(&mut registry, world, &graph, &mut rng.0, next);
                if let Some(mut log) = world.get_resource_mut::<EventLog>() {
                    log.push(format!(
                        "Jumped to {} ({} contacts)",
                        graph.name(next),
                        report.materialized.len()
                    ));
                }
            })
        })
    });
}

fn process_jump_requests(world: &mut World) {
    let pending: Vec<ShipId> = match world.get_resource_mut::<JumpRequests>() {
        Some(mut requests) if !requests.is_empty() => requests.pending.drain(..).collect(),
        _ => return,
    };
    world.try_resource_scope(|world, mut registry: Mut<ShipRegistry>| {
        world.try_resource_scope(|world, graph: Mut<SectorGraph>| {
            world.try_resource_scope(|world, mut rng: Mut<SimRng>| {
                for id in pending {
                    let found = jump_to_ship(&mut registry, world, &graph, &mut rng.0, id);
                    let entry = if found {
                        format!("Jumped to ship {}", id)
                    } else {
                        format!("Ship {} not found", id)
                    };
                    info!("{}", entry);
                    if let Some(mut log) = world.get_resource_mut::<EventLog>() {
                        log.push(entry);
                    }
                }
            })
        })
    });
}
