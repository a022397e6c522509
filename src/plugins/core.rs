use bevy::prelude::*;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Duration;

use crate::pirates::RaidConfig;
use crate::reports::ShipSort;
use crate::ships::ShipId;

pub struct CorePlugin;

#[derive(Resource, Debug, Clone)]
pub struct SimConfig {
    pub tick_hz: f32,
    pub paused: bool,
    pub seed: u64,
    pub faction_ai_seconds: f32,
    pub raid_seconds: f32,
    pub restock_seconds: f32,
    /// Throttle for ships the player can see.
    pub live_ai_seconds: f32,
    pub autosave_seconds: f32,
    pub ledger_window_seconds: f32,
    pub report_seconds: f32,
    /// Zero keeps the player parked in the start sector.
    pub tour_seconds: f32,
    pub raid: RaidConfig,
    pub save_dir: PathBuf,
    pub fresh_start: bool,
    /// Ships to jump the player to once the world is up, in order.
    pub jump_to: Vec<ShipId>,
    pub listing_sort: ShipSort,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_hz: 10.0,
            paused: false,
            seed: 12345,
            faction_ai_seconds: 5.0,
            raid_seconds: 20.0,
            restock_seconds: 10.0,
            live_ai_seconds: 0.5,
            autosave_seconds: 60.0,
            ledger_window_seconds: 600.0,
            report_seconds: 30.0,
            tour_seconds: 45.0,
            raid: RaidConfig::default(),
            save_dir: PathBuf::from("saves"),
            fresh_start: false,
            jump_to: Vec::new(),
            listing_sort: ShipSort::default(),
        }
    }
}

impl SimConfig {
    /// Applies `--seed`, `--save-dir`, `--fresh`, `--jump <ship>` and `--sort <key>`.
    /// Anything else is ignored.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Self {
        let mut config = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--seed" => match args.next().map(|value| value.parse::<u64>()) {
                    Some(Ok(seed)) => config.seed = seed,
                    _ => warn!("--seed expects an unsigned integer"),
                },
                "--save-dir" => match args.next() {
                    Some(dir) => config.save_dir = PathBuf::from(dir),
                    None => warn!("--save-dir expects a path"),
                },
                "--fresh" => config.fresh_start = true,
                "--jump" => match args.next().map(|value| value.parse::<u64>()) {
                    Some(Ok(id)) => config.jump_to.push(ShipId(id)),
                    _ => warn!("--jump expects a ship number"),
                },
                "--sort" => match args.next().as_deref().and_then(ShipSort::parse) {
                    Some(sort) => config.listing_sort = sort,
                    None => warn!("--sort expects name, role, state, sector or health"),
                },
                other => warn!("Ignoring unknown argument {}", other),
            }
        }
        config
    }
}

#[derive(Resource, Debug)]
pub struct EventLog {
    entries: Vec<String>,
    max_entries: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            max_entries: 8,
        }
    }
}

impl EventLog {
    pub fn push(&mut self, entry: String) {
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let overflow = self.entries.len() - self.max_entries;
            self.entries.drain(0..overflow);
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Best-effort notice; a missing log is not an error.
pub fn notify(log: &mut Option<ResMut<EventLog>>, entry: String) {
    if let Some(log) = log.as_mut() {
        log.push(entry);
    }
}

/// Simulated seconds since startup.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct SimClock {
    pub elapsed: f64,
}

impl SimClock {
    pub fn now(&self) -> f64 {
        self.elapsed
    }
}

#[derive(Resource, Debug)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

/// Coarse cadences layered on the fixed tick.
#[derive(Resource, Debug)]
pub struct SimTimers {
    pub faction_ai: Timer,
    pub raids: Timer,
    pub restock: Timer,
    pub live_ai: Timer,
    pub autosave: Timer,
    pub ledger: Timer,
    pub report: Timer,
    pub tour: Option<Timer>,
}

impl SimTimers {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            faction_ai: repeating(config.faction_ai_seconds),
            raids: repeating(config.raid_seconds),
            restock: repeating(config.restock_seconds),
            live_ai: repeating(config.live_ai_seconds),
            autosave: repeating(config.autosave_seconds),
            ledger: repeating(config.ledger_window_seconds),
            report: repeating(config.report_seconds),
            tour: (config.tour_seconds > 0.0).then(|| repeating(config.tour_seconds)),
        }
    }

    pub fn tick(&mut self, delta: Duration) {
        self.faction_ai.tick(delta);
        self.raids.tick(delta);
        self.restock.tick(delta);
        self.live_ai.tick(delta);
        self.autosave.tick(delta);
        self.ledger.tick(delta);
        self.report.tick(delta);
        if let Some(tour) = self.tour.as_mut() {
            tour.tick(delta);
        }
    }
}

fn repeating(seconds: f32) -> Timer {
    Timer::from_seconds(seconds.max(0.001), TimerMode::Repeating)
}

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<SimConfig>()
            .cloned()
            .unwrap_or_default();
        let fixed_time = fixed_time_from_config(&config);
        let timers = SimTimers::from_config(&config);
        let rng = SimRng::seeded(config.seed);

        app.insert_resource(fixed_time)
            .insert_resource(timers)
            .insert_resource(rng)
            .insert_resource(config)
            .init_resource::<SimClock>()
            .init_resource::<EventLog>();
    }
}

pub fn fixed_time_from_config(config: &SimConfig) -> Time<Fixed> {
    let tick_hz = if config.tick_hz <= 0.0 {
        10.0
    } else {
        config.tick_hz
    };
    let seconds = 1.0 / tick_hz;
    Time::<Fixed>::from_duration(Duration::from_secs_f32(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn sim_config_default_values() {
        let config = SimConfig::default();
        assert_eq!(config.tick_hz, 10.0);
        assert!(!config.paused);
        assert_eq!(config.faction_ai_seconds, 5.0);
        assert_eq!(config.raid_seconds, 20.0);
        assert_eq!(config.live_ai_seconds, 0.5);
    }

    #[test]
    fn event_log_push_trims_oldest_entries() {
        let mut log = EventLog::default();
        for index in 0..12 {
            log.push(format!("entry-{}", index));
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 8);
        assert_eq!(entries.first().map(String::as_str), Some("entry-4"));
        assert_eq!(entries.last().map(String::as_str), Some("entry-11"));
    }

    #[test]
    fn fixed_time_from_config_clamps_non_positive_tick_rate() {
        let config = SimConfig {
            tick_hz: 0.0,
            ..Default::default()
        };
        let fixed = fixed_time_from_config(&config);
        assert_eq!(fixed.timestep().as_secs_f32(), 0.1);
    }

    #[test]
    fn args_override_seed_dir_and_fresh() {
        let config = SimConfig::from_args(args(&["--seed", "99", "--save-dir", "/tmp/x", "--fresh"]));
        assert_eq!(config.seed, 99);
        assert_eq!(config.save_dir, PathBuf::from("/tmp/x"));
        assert!(config.fresh_start);
    }

    #[test]
    fn args_queue_jumps_and_pick_listing_sort() {
        let config = SimConfig::from_args(args(&["--jump", "12", "--sort", "health", "--jump", "3"]));
        assert_eq!(config.jump_to, vec![ShipId(12), ShipId(3)]);
        assert_eq!(config.listing_sort, ShipSort::Health);
    }

    #[test]
    fn bad_args_keep_defaults() {
        let config = SimConfig::from_args(args(&["--seed", "many", "--wat", "--sort", "speed"]));
        assert_eq!(config.seed, SimConfig::default().seed);
        assert!(!config.fresh_start);
        assert_eq!(config.listing_sort, ShipSort::Sector);
    }

    #[test]
    fn timers_fire_on_their_own_cadence() {
        let mut timers = SimTimers::from_config(&SimConfig::default());
        let step = Duration::from_millis(500);
        let mut ai = 0;
        let mut live = 0;
        for _ in 0..20 {
            timers.tick(step);
            if timers.faction_ai.just_finished() {
                ai += 1;
            }
            if timers.live_ai.just_finished() {
                live += 1;
            }
        }
        assert_eq!(ai, 2);
        assert_eq!(live, 20);
    }

    #[test]
    fn zero_tour_interval_disables_tour() {
        let config = SimConfig {
            tour_seconds: 0.0,
            ..Default::default()
        };
        assert!(SimTimers::from_config(&config).tour.is_none());
    }

    #[test]
    fn notify_without_log_is_noop() {
        let mut world = World::default();
        let mut system_state: bevy::ecs::system::SystemState<Option<ResMut<EventLog>>> =
            bevy::ecs::system::SystemState::new(&mut world);
        let mut log = system_state.get_mut(&mut world);
        notify(&mut log, "nobody listens".to_string());

        world.init_resource::<EventLog>();
        let mut system_state: bevy::ecs::system::SystemState<Option<ResMut<EventLog>>> =
            bevy::ecs::system::SystemState::new(&mut world);
        let mut log = system_state.get_mut(&mut world);
        notify(&mut log, "heard".to_string());
        assert_eq!(world.resource::<EventLog>().entries(), ["heard".to_string()]);
    }
}
