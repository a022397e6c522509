//! Raid planning for the hostile faction, plus the raid event feed.

use bevy::prelude::*;
use rand::Rng;
use std::collections::VecDeque;

use crate::behavior::begin_task;
use crate::factions::{FactionId, FactionRegistry};
use crate::registry::ShipRegistry;
use crate::ships::{ShipId, Task, TaskKind};
use crate::world::{SectorGraph, SectorId};

/// How long raid events stay in the feed, in seconds.
pub const RAID_EVENT_WINDOW_SECONDS: f64 = 30.0;

#[derive(Clone, Debug, PartialEq)]
pub struct RaidConfig {
    /// Chance that an evaluation tick does anything at all.
    pub raid_chance: f32,
    pub min_raid_size: usize,
    pub max_raid_size: usize,
    /// Score added to sectors on the raid preference list.
    pub preferred_bonus: f32,
}

impl Default for RaidConfig {
    fn default() -> Self {
        Self {
            raid_chance: 0.35,
            min_raid_size: 2,
            max_raid_size: 4,
            preferred_bonus: 3.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RaidEventKind {
    Kill,
    Plunder,
    Launch,
    Defended,
}

impl RaidEventKind {
    pub fn label(self) -> &'static str {
        match self {
            RaidEventKind::Kill => "kill",
            RaidEventKind::Plunder => "plunder",
            RaidEventKind::Launch => "launch",
            RaidEventKind::Defended => "defended",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RaidEvent {
    pub kind: RaidEventKind,
    pub at: f64,
    pub actor: String,
    pub actor_faction: FactionId,
    pub target: String,
    pub target_faction: Option<FactionId>,
    pub sector: SectorId,
    pub value: f64,
}

#[derive(Resource, Debug, Clone)]
pub struct RaidLog {
    events: VecDeque<RaidEvent>,
    window: f64,
}

impl Default for RaidLog {
    fn default() -> Self {
        Self {
            events: VecDeque::new(),
            window: RAID_EVENT_WINDOW_SECONDS,
        }
    }
}

impl RaidLog {
    pub fn push(&mut self, event: RaidEvent) {
        let now = event.at;
        self.events.push_back(event);
        self.prune(now);
    }

    /// Drops events older than the window.
    pub fn prune(&mut self, now: f64) {
        while self
            .events
            .front()
            .is_some_and(|event| now - event.at > self.window)
        {
            self.events.pop_front();
        }
    }

    /// Events inside the window ending at `now`, oldest first.
    pub fn recent(&self, now: f64) -> Vec<&RaidEvent> {
        self.events
            .iter()
            .filter(|event| now - event.at <= self.window)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RaidLaunch {
    pub target: SectorId,
    pub ships: Vec<ShipId>,
    pub threatens_player: bool,
}

pub struct RaidPlanner<'a> {
    pub graph: &'a SectorGraph,
    pub factions: &'a FactionRegistry,
    pub config: &'a RaidConfig,
    pub player_sector: Option<SectorId>,
    pub now: f64,
}

/// One raid evaluation tick. Returns the launched group, if any.
pub fn evaluate_raid(
    registry: &mut ShipRegistry,
    planner: &RaidPlanner,
    raids: &mut RaidLog,
    rng: &mut impl Rng,
) -> Option<RaidLaunch> {
    if rng.gen::<f32>() >= planner.config.raid_chance {
        return None;
    }

    let pirates = planner.factions.hostile_faction()?;
    let pirate_id = pirates.id().clone();

    let idle: Vec<ShipId> = registry
        .idle_ids(&pirate_id)
        .into_iter()
        .filter(|id| registry.ship(*id).is_some_and(|ship| ship.role.is_raider()))
        .collect();
    let min_size = planner.config.min_raid_size.max(1);
    if idle.len() < min_size {
        return None;
    }

    let target = pick_raid_target(registry, planner, &pirate_id)?;

    let max_size = planner.config.max_raid_size.max(min_size);
    let group_size = rng.gen_range(min_size..=max_size).min(idle.len());
    let ships: Vec<ShipId> = idle.into_iter().take(group_size).collect();

    for id in &ships {
        if let Some(ship) = registry.ship_mut(*id) {
            begin_task(ship, Task::new(TaskKind::Raid, target), planner.graph);
        }
    }

    let leader = ships
        .first()
        .and_then(|id| registry.ship(*id))
        .map_or_else(|| pirates.config.name.clone(), |ship| ship.name.clone());
    raids.push(RaidEvent {
        kind: RaidEventKind::Launch,
        at: planner.now,
        actor: leader,
        actor_faction: pirate_id,
        target: planner.graph.name(target),
        target_faction: None,
        sector: target,
        value: 0.0,
    });

    let threatens_player = planner.player_sector == Some(target);
    if threatens_player {
        warn!(
            "Pirate raid of {} ships inbound to {}",
            ships.len(),
            planner.graph.name(target)
        );
    } else {
        info!(
            "Pirate raid of {} ships launched toward {}",
            ships.len(),
            planner.graph.name(target)
        );
    }

    Some(RaidLaunch {
        target,
        ships,
        threatens_player,
    })
}

/// Highest-scoring sector by non-hostile presence plus preference bonus.
/// Ties go to the first sector in graph order.
fn pick_raid_target(
    registry: &ShipRegistry,
    planner: &RaidPlanner,
    pirate_id: &FactionId,
) -> Option<SectorId> {
    let config = planner.factions.config(pirate_id)?;
    let mut best: Option<(SectorId, f32)> = None;

    for sector in planner.graph.sector_ids() {
        if config.avoids(sector) {
            continue;
        }
        let presence = registry
            .iter()
            .filter(|entry| entry.ship.sector == sector)
            .filter(|entry| !planner.factions.is_hostile(&entry.ship.faction))
            .count() as f32;
        let bonus = if config.preferred.raid.contains(&sector) {
            planner.config.preferred_bonus
        } else {
            0.0
        };
        let score = presence + bonus;
        if score <= 0.0 {
            continue;
        }
        if best.map_or(true, |(_, current)| score > current) {
            best = Some((sector, score));
        }
    }

    best.map(|(sector, _)| sector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factions::tests::config;
    use crate::registry::tests::test_ship;
    use crate::ships::{AiState, ShipRole};
    use crate::world::{Gate, SectorInfo};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn graph() -> SectorGraph {
        let sectors = (1..=9)
            .map(|id| SectorInfo {
                id,
                name: format!("S{}", id),
                security: 0.5,
                radius: 500.0,
            })
            .collect::<Vec<_>>();
        let gates = (1..9)
            .map(|id| Gate {
                from: id,
                to: id + 1,
            })
            .collect::<Vec<_>>();
        SectorGraph::build(sectors, &gates)
    }

    fn factions(preferred_raid: Vec<SectorId>) -> FactionRegistry {
        let mut pirates = config("pirates", true);
        pirates.preferred.raid = preferred_raid;
        FactionRegistry::from_configs([config("miners", false), pirates], 0.0)
    }

    fn raid_config() -> RaidConfig {
        RaidConfig {
            raid_chance: 1.0,
            min_raid_size: 2,
            max_raid_size: 4,
            preferred_bonus: 3.0,
        }
    }

    fn event(kind: RaidEventKind, at: f64) -> RaidEvent {
        RaidEvent {
            kind,
            at,
            actor: "Corsair".to_string(),
            actor_faction: FactionId::from("pirates"),
            target: "Prospector".to_string(),
            target_faction: Some(FactionId::from("miners")),
            sector: 3,
            value: 100.0,
        }
    }

    #[test]
    fn raid_launch_targets_busiest_sector() {
        let graph = graph();
        let factions = factions(Vec::new());
        let config = raid_config();
        let mut registry = ShipRegistry::default();
        registry.insert(test_ship(1, "pirates", ShipRole::Raider, 9));
        registry.insert(test_ship(2, "pirates", ShipRole::Raider, 9));
        registry.insert(test_ship(3, "miners", ShipRole::Miner, 4));
        registry.insert(test_ship(4, "miners", ShipRole::Miner, 6));
        registry.insert(test_ship(5, "miners", ShipRole::Hauler, 6));
        let planner = RaidPlanner {
            graph: &graph,
            factions: &factions,
            config: &config,
            player_sector: None,
            now: 10.0,
        };
        let mut raids = RaidLog::default();
        let mut rng = StdRng::seed_from_u64(21);

        let launch = evaluate_raid(&mut registry, &planner, &mut raids, &mut rng).unwrap();

        assert_eq!(launch.target, 6);
        assert_eq!(launch.ships, vec![ShipId(1), ShipId(2)]);
        let recent = raids.recent(10.0);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].kind, RaidEventKind::Launch);
        assert_eq!(recent[0].sector, 6);
        for id in &launch.ships {
            let ship = registry.ship(*id).unwrap();
            assert_eq!(ship.state, AiState::Traveling);
            assert_eq!(ship.task.as_ref().map(|task| task.kind), Some(TaskKind::Raid));
        }
    }

    #[test]
    fn raid_launch_always_fires_with_full_chance() {
        let graph = graph();
        let factions = factions(Vec::new());
        let config = raid_config();
        for seed in 0..20 {
            let mut registry = ShipRegistry::default();
            registry.insert(test_ship(1, "pirates", ShipRole::Raider, 9));
            registry.insert(test_ship(2, "pirates", ShipRole::Raider, 9));
            registry.insert(test_ship(3, "miners", ShipRole::Miner, 5));
            let planner = RaidPlanner {
                graph: &graph,
                factions: &factions,
                config: &config,
                player_sector: None,
                now: 0.0,
            };
            let mut raids = RaidLog::default();
            let mut rng = StdRng::seed_from_u64(seed);
            let launch = evaluate_raid(&mut registry, &planner, &mut raids, &mut rng);
            assert_eq!(launch.map(|launch| launch.target), Some(5));
            assert_eq!(raids.len(), 1);
        }
    }

    #[test]
    fn preferred_bonus_outweighs_small_presence() {
        let graph = graph();
        let factions = factions(vec![3]);
        let config = raid_config();
        let mut registry = ShipRegistry::default();
        registry.insert(test_ship(1, "pirates", ShipRole::Raider, 9));
        registry.insert(test_ship(2, "pirates", ShipRole::Raider, 9));
        registry.insert(test_ship(3, "miners", ShipRole::Miner, 4));
        registry.insert(test_ship(4, "miners", ShipRole::Miner, 4));
        registry.insert(test_ship(5, "miners", ShipRole::Miner, 3));
        let planner = RaidPlanner {
            graph: &graph,
            factions: &factions,
            config: &config,
            player_sector: Some(3),
            now: 0.0,
        };
        let mut raids = RaidLog::default();
        let mut rng = StdRng::seed_from_u64(2);

        let launch = evaluate_raid(&mut registry, &planner, &mut raids, &mut rng).unwrap();
        assert_eq!(launch.target, 3);
        assert!(launch.threatens_player);
    }

    #[test]
    fn raid_requires_minimum_group() {
        let graph = graph();
        let factions = factions(Vec::new());
        let config = raid_config();
        let mut registry = ShipRegistry::default();
        registry.insert(test_ship(1, "pirates", ShipRole::Raider, 9));
        let mut busy = test_ship(2, "pirates", ShipRole::Raider, 9);
        busy.state = AiState::Raiding;
        registry.insert(busy);
        registry.insert(test_ship(3, "miners", ShipRole::Miner, 5));
        let planner = RaidPlanner {
            graph: &graph,
            factions: &factions,
            config: &config,
            player_sector: None,
            now: 0.0,
        };
        let mut raids = RaidLog::default();
        let mut rng = StdRng::seed_from_u64(2);

        assert!(evaluate_raid(&mut registry, &planner, &mut raids, &mut rng).is_none());
        assert!(raids.is_empty());
    }

    #[test]
    fn zero_chance_never_launches() {
        let graph = graph();
        let factions = factions(Vec::new());
        let mut config = raid_config();
        config.raid_chance = 0.0;
        let mut registry = ShipRegistry::default();
        registry.insert(test_ship(1, "pirates", ShipRole::Raider, 9));
        registry.insert(test_ship(2, "pirates", ShipRole::Raider, 9));
        registry.insert(test_ship(3, "miners", ShipRole::Miner, 5));
        let planner = RaidPlanner {
            graph: &graph,
            factions: &factions,
            config: &config,
            player_sector: None,
            now: 0.0,
        };
        let mut raids = RaidLog::default();
        let mut rng = StdRng::seed_from_u64(2);
        assert!(evaluate_raid(&mut registry, &planner, &mut raids, &mut rng).is_none());
    }

    #[test]
    fn group_size_capped_by_idle_ships() {
        let graph = graph();
        let factions = factions(Vec::new());
        let mut config = raid_config();
        config.min_raid_size = 2;
        config.max_raid_size = 10;
        let mut registry = ShipRegistry::default();
        for id in 1..=3 {
            registry.insert(test_ship(id, "pirates", ShipRole::Raider, 9));
        }
        registry.insert(test_ship(10, "miners", ShipRole::Miner, 5));
        let planner = RaidPlanner {
            graph: &graph,
            factions: &factions,
            config: &config,
            player_sector: None,
            now: 0.0,
        };
        let mut raids = RaidLog::default();
        let mut rng = StdRng::seed_from_u64(8);
        let launch = evaluate_raid(&mut registry, &planner, &mut raids, &mut rng).unwrap();
        assert!(launch.ships.len() >= 2 && launch.ships.len() <= 3);
    }

    #[test]
    fn raid_log_keeps_rolling_window() {
        let mut raids = RaidLog::default();
        raids.push(event(RaidEventKind::Kill, 0.0));
        raids.push(event(RaidEventKind::Plunder, 20.0));
        assert_eq!(raids.recent(25.0).len(), 2);
        assert_eq!(raids.recent(45.0).len(), 1);

        raids.push(event(RaidEventKind::Defended, 40.0));
        assert_eq!(raids.len(), 2);
        assert_eq!(raids.recent(40.0)[0].kind, RaidEventKind::Plunder);
    }
}
