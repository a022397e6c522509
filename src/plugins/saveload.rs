use bevy::prelude::*;

use crate::factions::FactionRegistry;
use crate::persistence::save_state;
use crate::plugins::core::{EventLog, SimClock, SimTimers};
use crate::plugins::sim::SimSet;
use crate::plugins::worldgen::SaveStore;
use crate::registry::ShipRegistry;

pub struct SaveLoadPlugin;

impl Plugin for SaveLoadPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            autosave.run_if(autosave_due).in_set(SimSet::Persist),
        );
    }
}

fn autosave_due(timers: Res<SimTimers>) -> bool {
    timers.autosave.just_finished()
}

fn autosave(world: &mut World) {
    world.try_resource_scope(|world, mut store: Mut<SaveStore>| {
        let (Some(factions), Some(registry)) = (
            world.get_resource::<FactionRegistry>(),
            world.get_resource::<ShipRegistry>(),
        ) else {
            return;
        };

        let now = world.get_resource::<SimClock>().map_or(0.0, SimClock::now);
        let message = match save_state(&mut store.0, factions, registry, world, now) {
            Ok(count) => {
                info!("Saved {} ships to {}", count, store.0.dir().display());
                format!("Autosaved {} ships", count)
            }
            Err(error) => {
                error!("Save failed: {}", error);
                format!("Save failed: {}", error)
            }
        };
        if let Some(mut log) = world.get_resource_mut::<EventLog>() {
            log.push(message);
        }
    });
}
