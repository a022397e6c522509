use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use std::time::Duration;

mod behavior;
mod bridge;
mod catalog;
mod economy;
mod faction_ai;
mod factions;
mod fleets;
mod host;
mod ore;
mod persistence;
mod pirates;
mod plugins;
mod registry;
mod reports;
mod ships;
mod stations;
mod world;

use catalog::Catalog;
use plugins::core::SimConfig;

const FRAME_SECONDS: f64 = 1.0 / 60.0;

fn main() {
    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            FRAME_SECONDS,
        ))),
        LogPlugin::default(),
    ));

    let config = SimConfig::from_args(std::env::args().skip(1));
    let catalog = match Catalog::builtin() {
        Ok(catalog) => catalog,
        Err(error) => {
            error!("Reference data unusable: {}", error);
            std::process::exit(1);
        }
    };

    app.insert_resource(config)
        .insert_resource(catalog)
        .add_plugins((
            plugins::core::CorePlugin,
            plugins::worldgen::WorldGenPlugin,
            plugins::sim::SimPlugin,
            plugins::player::PlayerPlugin,
            plugins::saveload::SaveLoadPlugin,
        ))
        .run();
}
