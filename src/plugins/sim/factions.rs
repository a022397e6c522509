//! Faction systems: AI cycle, ledger windows and the periodic status report.

use bevy::prelude::*;

use crate::faction_ai::{run_faction_ai, AiContext};
use crate::factions::FactionRegistry;
use crate::pirates::RaidLog;
use crate::plugins::core::{notify, EventLog, SimClock, SimConfig, SimRng};
use crate::registry::ShipRegistry;
use crate::reports::{
    describe_raid_event, faction_summaries, raid_feed, ship_listing, sort_rows, ShipSort,
};
use crate::ships::ShipClasses;
use crate::stations::StationMarkets;
use crate::world::SectorGraph;

// =============================================================================
// Systems
// =============================================================================

#[allow(clippy::too_many_arguments)]
pub fn tick_faction_ai(
    clock: Res<SimClock>,
    graph: Res<SectorGraph>,
    markets: Res<StationMarkets>,
    classes: Res<ShipClasses>,
    mut registry: ResMut<ShipRegistry>,
    mut factions: ResMut<FactionRegistry>,
    mut rng: ResMut<SimRng>,
    mut log: Option<ResMut<EventLog>>,
) {
    let mut ctx = AiContext {
        graph: &graph,
        factions: &mut factions,
        markets: &markets,
        classes: &classes,
        now: clock.now(),
    };
    let report = run_faction_ai(&mut registry, &mut ctx, &mut rng.0);

    if !report.assigned.is_empty() {
        debug!("Faction AI assigned {} tasks", report.assigned.len());
    }
    for id in &report.commissioned {
        if let Some(ship) = registry.ship(*id) {
            notify(
                &mut log,
                format!("{} commissioned at {}", ship.name, graph.name(ship.sector)),
            );
        }
    }
}

pub fn close_ledger_windows(clock: Res<SimClock>, mut factions: ResMut<FactionRegistry>) {
    let now = clock.now();
    for faction in factions.iter_mut() {
        faction.ledger.reset_window(now);
    }
    debug!("Ledger windows closed at {:.0}s", now);
}

pub fn report_status(
    clock: Res<SimClock>,
    graph: Res<SectorGraph>,
    factions: Res<FactionRegistry>,
    registry: Res<ShipRegistry>,
    raids: Res<RaidLog>,
) {
    info!(
        "Status at {:.0}s: {} ships ({} live)",
        clock.now(),
        registry.len(),
        registry.materialized_ids().len()
    );
    for summary in faction_summaries(&factions) {
        info!("{}", summary.line());
    }
    for event in raid_feed(&raids, clock.now()).iter().take(5) {
        info!("Raid feed: {}", describe_raid_event(event, &graph));
    }
}

/// Logs every faction's fleet, live ships included, in the configured order.
pub fn report_ship_listings(world: &mut World) {
    let world: &World = world;
    let sort = world
        .get_resource::<SimConfig>()
        .map_or(ShipSort::default(), |config| config.listing_sort);
    let (Some(factions), Some(registry), Some(graph)) = (
        world.get_resource::<FactionRegistry>(),
        world.get_resource::<ShipRegistry>(),
        world.get_resource::<SectorGraph>(),
    ) else {
        return;
    };

    for id in factions.ids() {
        let mut rows = ship_listing(registry, world, graph, &id);
        sort_rows(&mut rows, sort);
        let live = rows.iter().filter(|row| row.materialized).count();
        info!("Fleet {}: {} ships, {} live", id, rows.len(), live);
        for row in &rows {
            debug!("  {}", row.line());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factions::tests::config;
    use crate::factions::FactionId;
    use crate::registry::tests::test_class;
    use crate::ships::ShipRole;
    use crate::world::{Gate, SectorInfo};
    use bevy::ecs::system::SystemState;

    fn world() -> World {
        let sectors = [1, 9]
            .into_iter()
            .map(|id| SectorInfo {
                id,
                name: format!("S{}", id),
                security: 0.5,
                radius: 300.0,
            })
            .collect::<Vec<_>>();
        let mut miners = config("miners", false);
        miners.replacement_costs.insert(ShipRole::Miner, 1_000.0);

        let mut world = World::default();
        world.insert_resource(SectorGraph::build(sectors, &[Gate { from: 1, to: 9 }]));
        world.insert_resource(StationMarkets::default());
        world.insert_resource(ShipClasses::new([test_class()]));
        world.insert_resource(ShipRegistry::default());
        world.insert_resource(FactionRegistry::from_configs([miners], 0.0));
        world.insert_resource(SimRng::seeded(8));
        world.insert_resource(SimClock { elapsed: 60.0 });
        world.init_resource::<EventLog>();
        world
    }

    #[test]
    fn faction_ai_replaces_missing_ships_and_notes_them() {
        let mut world = world();
        let mut system_state: SystemState<(
            Res<SimClock>,
            Res<SectorGraph>,
            Res<StationMarkets>,
            Res<ShipClasses>,
            ResMut<ShipRegistry>,
            ResMut<FactionRegistry>,
            ResMut<SimRng>,
            Option<ResMut<EventLog>>,
        )> = SystemState::new(&mut world);
        let (clock, graph, markets, classes, registry, factions, rng, log) =
            system_state.get_mut(&mut world);
        tick_faction_ai(clock, graph, markets, classes, registry, factions, rng, log);
        system_state.apply(&mut world);

        let miners = FactionId::from("miners");
        assert_eq!(world.resource::<ShipRegistry>().len(), 1);
        assert_eq!(world.resource::<FactionRegistry>().treasury(&miners), 19_000.0);
        let entries = world.resource::<EventLog>().entries();
        assert!(entries.iter().any(|entry| entry.contains("commissioned at S1")));
    }

    #[test]
    fn ship_listing_report_tolerates_missing_resources() {
        let mut empty = World::default();
        report_ship_listings(&mut empty);

        let mut world = world();
        world.resource_mut::<ShipRegistry>().insert(crate::registry::tests::test_ship(
            1,
            "miners",
            ShipRole::Miner,
            9,
        ));
        world.insert_resource(SimConfig {
            listing_sort: ShipSort::Health,
            ..Default::default()
        });
        report_ship_listings(&mut world);
        assert_eq!(world.resource::<ShipRegistry>().len(), 1);
    }

    #[test]
    fn ledger_window_reset_clears_totals() {
        let mut world = world();
        let miners = FactionId::from("miners");
        world.resource_mut::<FactionRegistry>().credit(&miners, 360.0);

        let mut system_state: SystemState<(Res<SimClock>, ResMut<FactionRegistry>)> =
            SystemState::new(&mut world);
        let (clock, factions) = system_state.get_mut(&mut world);
        close_ledger_windows(clock, factions);
        system_state.apply(&mut world);

        let faction = world.resource::<FactionRegistry>().get(&miners).unwrap().clone();
        assert_eq!(faction.ledger.income, 0.0);
        assert!((faction.ledger.income_rate - 21_600.0).abs() < 1e-6);
        assert_eq!(faction.ledger.window_started_at, 60.0);
    }
}
