//! Raid evaluation for the hostile faction.

use bevy::prelude::*;

use crate::factions::FactionRegistry;
use crate::host::ActiveSector;
use crate::pirates::{evaluate_raid, RaidLog, RaidPlanner};
use crate::plugins::core::{notify, EventLog, SimClock, SimConfig, SimRng};
use crate::registry::ShipRegistry;
use crate::world::SectorGraph;

// =============================================================================
// Systems
// =============================================================================

#[allow(clippy::too_many_arguments)]
pub fn evaluate_raids(
    config: Res<SimConfig>,
    clock: Res<SimClock>,
    graph: Res<SectorGraph>,
    factions: Res<FactionRegistry>,
    active: Option<Res<ActiveSector>>,
    mut registry: ResMut<ShipRegistry>,
    mut raids: ResMut<RaidLog>,
    mut rng: ResMut<SimRng>,
    mut log: Option<ResMut<EventLog>>,
) {
    let planner = RaidPlanner {
        graph: &graph,
        factions: &factions,
        config: &config.raid,
        player_sector: active.map(|sector| sector.0),
        now: clock.now(),
    };
    raids.prune(planner.now);

    let Some(launch) = evaluate_raid(&mut registry, &planner, &mut raids, &mut rng.0) else {
        return;
    };
    if launch.threatens_player {
        notify(
            &mut log,
            format!(
                "Warning: {} raiders inbound to {}",
                launch.ships.len(),
                graph.name(launch.target)
            ),
        );
    }
}
