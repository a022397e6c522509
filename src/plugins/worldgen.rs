use bevy::prelude::*;

use crate::bridge::change_player_sector;
use crate::catalog::{Catalog, ReferenceData};
use crate::persistence::{fresh_state, load_or_seed, FileStore, LoadedState};
use crate::pirates::RaidLog;
use crate::plugins::core::{EventLog, SimClock, SimConfig, SimRng};
use crate::ships::ShipClasses;
use crate::stations::StationMarkets;
use crate::world::SectorGraph;

pub struct WorldGenPlugin;

impl Plugin for WorldGenPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RaidLog>()
            .add_systems(Startup, build_world);
    }
}

/// Save location used by the autosave and the startup load.
#[derive(Resource, Debug, Clone)]
pub struct SaveStore(pub FileStore);

fn build_world(world: &mut World) {
    let Some(catalog) = world.get_resource::<Catalog>().cloned() else {
        error!("No reference catalog; world not built");
        return;
    };
    let config = world
        .get_resource::<SimConfig>()
        .cloned()
        .unwrap_or_default();
    let now = world.get_resource::<SimClock>().map_or(0.0, SimClock::now);
    let mut rng = world
        .remove_resource::<SimRng>()
        .unwrap_or_else(|| SimRng::seeded(config.seed));

    let graph = SectorGraph::build(catalog.sectors().to_vec(), catalog.gates());
    let classes = ShipClasses::new(catalog.ship_classes().to_vec());
    let markets = StationMarkets::new(catalog.markets().to_vec(), catalog.trade_goods().to_vec());
    let store = FileStore::new(config.save_dir.clone());

    let LoadedState {
        factions,
        mut ships,
        from_save,
        ..
    } = if config.fresh_start {
        fresh_state(&catalog, &classes, &graph, &mut rng.0, now)
    } else {
        load_or_seed(&store, &catalog, &classes, &graph, &mut rng.0, now)
    };

    let start = catalog.player_start();
    change_player_sector(&mut ships, world, &graph, &mut rng.0, start);

    info!(
        "World ready: {} sectors, {} factions, {} ships ({})",
        graph.sectors().len(),
        factions.len(),
        ships.len(),
        if from_save { "restored" } else { "fresh" }
    );
    if let Some(mut log) = world.get_resource_mut::<EventLog>() {
        log.push(format!("Player start: {}", graph.name(start)));
    }

    world.insert_resource(graph);
    world.insert_resource(classes);
    world.insert_resource(markets);
    world.insert_resource(factions);
    world.insert_resource(ships);
    world.insert_resource(SaveStore(store));
    world.insert_resource(rng);
}
