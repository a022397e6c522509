//! Ship simulation systems: abstract ticks, the live-ship hook and the boundary.

use bevy::prelude::*;

use crate::behavior::{advance_ships, SimContext, TickReport};
use crate::bridge::{pull_live_state, push_live_state, reconcile};
use crate::factions::FactionRegistry;
use crate::pirates::RaidLog;
use crate::plugins::core::{notify, EventLog, SimClock, SimRng, SimTimers};
use crate::registry::ShipRegistry;
use crate::stations::StationMarkets;
use crate::world::SectorGraph;

// =============================================================================
// Systems
// =============================================================================

#[allow(clippy::too_many_arguments)]
pub fn tick_abstract_ships(
    mut commands: Commands,
    time: Res<Time<Fixed>>,
    clock: Res<SimClock>,
    graph: Res<SectorGraph>,
    mut registry: ResMut<ShipRegistry>,
    mut factions: ResMut<FactionRegistry>,
    mut markets: ResMut<StationMarkets>,
    mut raids: ResMut<RaidLog>,
    mut rng: ResMut<SimRng>,
    mut log: Option<ResMut<EventLog>>,
) {
    let ids = registry.abstract_ids();
    let mut ctx = SimContext {
        graph: &graph,
        factions: &mut factions,
        markets: &mut markets,
        raids: &mut raids,
        now: clock.now(),
    };
    let report = advance_ships(&mut registry, &ids, &mut ctx, &mut rng.0, time.delta_secs());
    settle(&mut commands, &graph, &report, &mut log);
}

/// Same state machine for ships the player can see, on the live-ship throttle.
#[allow(clippy::too_many_arguments)]
pub fn tick_live_ships(
    mut commands: Commands,
    timers: Res<SimTimers>,
    clock: Res<SimClock>,
    graph: Res<SectorGraph>,
    mut registry: ResMut<ShipRegistry>,
    mut factions: ResMut<FactionRegistry>,
    mut markets: ResMut<StationMarkets>,
    mut raids: ResMut<RaidLog>,
    mut rng: ResMut<SimRng>,
    mut log: Option<ResMut<EventLog>>,
) {
    let ids = registry.materialized_ids();
    if ids.is_empty() {
        return;
    }
    let dt = timers.live_ai.duration().as_secs_f32();
    let mut ctx = SimContext {
        graph: &graph,
        factions: &mut factions,
        markets: &mut markets,
        raids: &mut raids,
        now: clock.now(),
    };
    let report = advance_ships(&mut registry, &ids, &mut ctx, &mut rng.0, dt);
    settle(&mut commands, &graph, &report, &mut log);
}

pub fn pull_live_ships(world: &mut World) {
    world.try_resource_scope(|world, mut registry: Mut<ShipRegistry>| {
        pull_live_state(&mut registry, world);
    });
}

pub fn push_live_ships(world: &mut World) {
    world.try_resource_scope(|world, registry: Mut<ShipRegistry>| {
        push_live_state(&registry, world);
    });
}

/// Moves ships across the boundary after they changed sector.
pub fn reconcile_boundary(world: &mut World) {
    world.try_resource_scope(|world, mut registry: Mut<ShipRegistry>| {
        world.try_resource_scope(|world, graph: Mut<SectorGraph>| {
            world.try_resource_scope(|world, mut rng: Mut<SimRng>| {
                let report = reconcile(&mut registry, world, &graph, &mut rng.0);
                if !report.is_empty() {
                    debug!(
                        "Boundary: {} jumped in, {} jumped out",
                        report.materialized.len(),
                        report.dematerialized.len()
                    );
                }
            })
        })
    });
}

fn settle(
    commands: &mut Commands,
    graph: &SectorGraph,
    report: &TickReport,
    log: &mut Option<ResMut<EventLog>>,
) {
    for destroyed in &report.destroyed {
        if let Some(entity) = destroyed.entity {
            commands.entity(entity).try_despawn();
        }
        notify(
            log,
            format!("{} lost in {}", destroyed.name, graph.name(destroyed.sector)),
        );
    }
    for (_, sector) in &report.surveyed {
        debug!("Survey complete in {}", graph.name(*sector));
    }
}
