use bevy::prelude::*;
use std::collections::{HashMap, VecDeque};

pub type SectorId = u32;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SectorInfo {
    pub id: SectorId,
    pub name: String,
    /// 1.0 is patrolled core space, 0.0 is lawless.
    pub security: f32,
    #[serde(default = "default_radius")]
    pub radius: f32,
}

fn default_radius() -> f32 {
    600.0
}

impl SectorInfo {
    pub fn difficulty(&self) -> f32 {
        (1.0 - self.security).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Gate {
    pub from: SectorId,
    pub to: SectorId,
}

/// Gate network over sectors. Built once; adjacency keeps gate declaration order so
/// breadth-first ties always resolve the same way.
#[derive(Resource, Debug, Default, Clone)]
pub struct SectorGraph {
    sectors: Vec<SectorInfo>,
    index: HashMap<SectorId, usize>,
    adjacency: HashMap<SectorId, Vec<SectorId>>,
}

impl SectorGraph {
    pub fn build(sectors: Vec<SectorInfo>, gates: &[Gate]) -> Self {
        let mut index = HashMap::new();
        let mut adjacency: HashMap<SectorId, Vec<SectorId>> = HashMap::new();

        for (i, sector) in sectors.iter().enumerate() {
            index.insert(sector.id, i);
            adjacency.entry(sector.id).or_default();
        }

        for gate in gates {
            if !index.contains_key(&gate.from) || !index.contains_key(&gate.to) {
                warn!("Ignoring gate {} <-> {}: unknown sector", gate.from, gate.to);
                continue;
            }
            if gate.from == gate.to {
                continue;
            }
            link(&mut adjacency, gate.from, gate.to);
            link(&mut adjacency, gate.to, gate.from);
        }

        Self {
            sectors,
            index,
            adjacency,
        }
    }

    pub fn contains(&self, id: SectorId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn sector(&self, id: SectorId) -> Option<&SectorInfo> {
        self.index.get(&id).map(|i| &self.sectors[*i])
    }

    pub fn sectors(&self) -> &[SectorInfo] {
        &self.sectors
    }

    pub fn sector_ids(&self) -> Vec<SectorId> {
        self.sectors.iter().map(|sector| sector.id).collect()
    }

    pub fn neighbors(&self, id: SectorId) -> &[SectorId] {
        self.adjacency.get(&id).map_or(&[], |n| n.as_slice())
    }

    pub fn name(&self, id: SectorId) -> String {
        self.sector(id)
            .map_or_else(|| format!("Sector-{}", id), |sector| sector.name.clone())
    }

    /// Unknown sectors count as lawless.
    pub fn difficulty(&self, id: SectorId) -> f32 {
        self.sector(id).map_or(1.0, SectorInfo::difficulty)
    }

    pub fn radius(&self, id: SectorId) -> f32 {
        self.sector(id).map_or(default_radius(), |sector| sector.radius)
    }

    /// Minimum-hop path from `from` to `to`, excluding `from`.
    ///
    /// Returns an empty path when the endpoints match and `None` when either sector
    /// is unknown or no gate chain connects them.
    pub fn shortest_path(&self, from: SectorId, to: SectorId) -> Option<Vec<SectorId>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }

        let mut queue: VecDeque<SectorId> = VecDeque::new();
        let mut came_from: HashMap<SectorId, SectorId> = HashMap::new();
        queue.push_back(from);
        came_from.insert(from, from);

        while let Some(sector) = queue.pop_front() {
            if sector == to {
                let mut path = Vec::new();
                let mut current = sector;
                while current != from {
                    path.push(current);
                    current = *came_from.get(&current)?;
                }
                path.reverse();
                return Some(path);
            }

            for neighbor in self.neighbors(sector) {
                if !came_from.contains_key(neighbor) {
                    came_from.insert(*neighbor, sector);
                    queue.push_back(*neighbor);
                }
            }
        }

        None
    }
}

fn link(adjacency: &mut HashMap<SectorId, Vec<SectorId>>, from: SectorId, to: SectorId) {
    let neighbors = adjacency.entry(from).or_default();
    if !neighbors.contains(&to) {
        neighbors.push(to);
    }
}

/// Random point inside a sector's playable disc.
pub fn random_position(rng: &mut impl rand::Rng, radius: f32) -> Vec2 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = rng.gen_range(0.0..radius.max(1.0));
    Vec2::new(angle.cos() * distance, angle.sin() * distance)
}
