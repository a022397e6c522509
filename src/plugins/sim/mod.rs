//! Simulation plugin: the fixed tick and every cadence layered on it.

mod factions;
mod pirates;
mod ships;
mod stations;

use bevy::prelude::*;

use crate::plugins::core::{SimClock, SimConfig, SimTimers};

// =============================================================================
// Plugin
// =============================================================================

pub struct SimPlugin;

/// Phases of one fixed step, in execution order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimSet {
    Clock,
    Ships,
    Boundary,
    Player,
    Factions,
    Persist,
}

impl Plugin for SimPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimTickCount>()
            .configure_sets(
                FixedUpdate,
                (
                    SimSet::Clock,
                    SimSet::Ships,
                    SimSet::Boundary,
                    SimSet::Player,
                    SimSet::Factions,
                    SimSet::Persist,
                )
                    .chain()
                    .run_if(sim_not_paused),
            )
            .add_systems(FixedUpdate, tick_simulation.in_set(SimSet::Clock))
            .add_systems(
                FixedUpdate,
                (
                    ships::tick_abstract_ships,
                    (
                        ships::pull_live_ships,
                        ships::tick_live_ships,
                        ships::push_live_ships,
                    )
                        .chain()
                        .run_if(live_ai_due),
                )
                    .chain()
                    .in_set(SimSet::Ships),
            )
            .add_systems(
                FixedUpdate,
                ships::reconcile_boundary.in_set(SimSet::Boundary),
            )
            .add_systems(
                FixedUpdate,
                (
                    factions::tick_faction_ai.run_if(faction_ai_due),
                    pirates::evaluate_raids.run_if(raids_due),
                    stations::restock_markets.run_if(restock_due),
                    factions::close_ledger_windows.run_if(ledger_due),
                    factions::report_status.run_if(report_due),
                    factions::report_ship_listings.run_if(report_due),
                )
                    .chain()
                    .in_set(SimSet::Factions),
            );
    }
}

// =============================================================================
// Resources
// =============================================================================

#[derive(Resource, Default)]
pub struct SimTickCount {
    pub tick: u64,
}

// =============================================================================
// Run Conditions
// =============================================================================

fn sim_not_paused(config: Res<SimConfig>) -> bool {
    !config.paused
}

fn live_ai_due(timers: Res<SimTimers>) -> bool {
    timers.live_ai.just_finished()
}

fn faction_ai_due(timers: Res<SimTimers>) -> bool {
    timers.faction_ai.just_finished()
}

fn raids_due(timers: Res<SimTimers>) -> bool {
    timers.raids.just_finished()
}

fn restock_due(timers: Res<SimTimers>) -> bool {
    timers.restock.just_finished()
}

fn ledger_due(timers: Res<SimTimers>) -> bool {
    timers.ledger.just_finished()
}

fn report_due(timers: Res<SimTimers>) -> bool {
    timers.report.just_finished()
}

// =============================================================================
// Systems
// =============================================================================

fn tick_simulation(
    time: Res<Time<Fixed>>,
    mut counter: ResMut<SimTickCount>,
    mut clock: ResMut<SimClock>,
    mut timers: ResMut<SimTimers>,
) {
    counter.tick = counter.tick.saturating_add(1);
    clock.elapsed += time.delta_secs_f64();
    timers.tick(time.delta());

    if counter.tick.is_multiple_of(100) {
        debug!("Sim tick {} at {:.1}s", counter.tick, clock.elapsed);
    }
}
