//! Faction configuration, relationships and economic state.

use bevy::prelude::*;
use std::collections::BTreeMap;
use std::fmt;

use crate::economy::Ledger;
use crate::ships::ShipRole;
use crate::world::SectorId;

#[derive(
    Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct FactionId(pub String);

impl From<&str> for FactionId {
    fn from(value: &str) -> Self {
        FactionId(value.to_string())
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relationship between two factions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Relationship {
    /// Will attack on sight
    Hostile,
    /// Will not attack, but not allied
    Neutral,
}

/// Sector preferences per activity. Empty lists fall back to the home sector.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PreferredSectors {
    #[serde(default)]
    pub mining: Vec<SectorId>,
    #[serde(default)]
    pub trade: Vec<SectorId>,
    #[serde(default)]
    pub hunting: Vec<SectorId>,
    #[serde(default)]
    pub raid: Vec<SectorId>,
    #[serde(default)]
    pub ambush: Vec<SectorId>,
    #[serde(default)]
    pub survey: Vec<SectorId>,
    #[serde(default)]
    pub support: Vec<SectorId>,
}

impl PreferredSectors {
    pub fn for_role(&self, role: ShipRole) -> &[SectorId] {
        match role {
            ShipRole::Miner => &self.mining,
            ShipRole::Hauler => &self.trade,
            ShipRole::Ratter => &self.hunting,
            ShipRole::Raider => &self.raid,
            ShipRole::Bomber => &self.ambush,
            ShipRole::Surveyor => &self.survey,
            ShipRole::Logistics => &self.support,
        }
    }
}

/// Static faction data, re-derived from reference data on every load.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FactionConfig {
    pub id: FactionId,
    pub name: String,
    pub tag: String,
    #[serde(default)]
    pub hostile: bool,
    #[serde(default)]
    pub home_sector: Option<SectorId>,
    /// Where homeless factions regroup and repair.
    #[serde(default)]
    pub retreat_sector: Option<SectorId>,
    pub starting_treasury: f64,
    #[serde(default)]
    pub priorities: BTreeMap<ShipRole, f32>,
    #[serde(default)]
    pub preferred: PreferredSectors,
    #[serde(default)]
    pub avoided: Vec<SectorId>,
    pub starting_composition: BTreeMap<ShipRole, u32>,
    #[serde(default)]
    pub replacement_costs: BTreeMap<ShipRole, f64>,
    pub ship_classes: BTreeMap<ShipRole, String>,
}

impl FactionConfig {
    /// Home for normal factions, the retreat point for the homeless.
    pub fn base_sector(&self) -> Option<SectorId> {
        self.home_sector.or(self.retreat_sector)
    }

    pub fn avoids(&self, sector: SectorId) -> bool {
        self.avoided.contains(&sector)
    }

    pub fn priority(&self, role: ShipRole) -> f32 {
        self.priorities.get(&role).copied().unwrap_or(1.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Faction {
    pub config: FactionConfig,
    pub ledger: Ledger,
    pub ship_count: u32,
    pub ships_lost: u32,
}

impl Faction {
    pub fn new(config: FactionConfig, now: f64) -> Self {
        let ledger = Ledger::new(config.starting_treasury, now);
        Self {
            config,
            ledger,
            ship_count: 0,
            ships_lost: 0,
        }
    }

    pub fn id(&self) -> &FactionId {
        &self.config.id
    }

    pub fn is_hostile(&self) -> bool {
        self.config.hostile
    }
}

#[derive(Resource, Debug, Default, Clone)]
pub struct FactionRegistry {
    factions: BTreeMap<FactionId, Faction>,
}

impl FactionRegistry {
    pub fn from_configs(configs: impl IntoIterator<Item = FactionConfig>, now: f64) -> Self {
        let mut registry = Self::default();
        for config in configs {
            registry.insert(Faction::new(config, now));
        }
        registry
    }

    pub fn insert(&mut self, faction: Faction) {
        self.factions.insert(faction.id().clone(), faction);
    }

    pub fn get(&self, id: &FactionId) -> Option<&Faction> {
        self.factions.get(id)
    }

    pub fn get_mut(&mut self, id: &FactionId) -> Option<&mut Faction> {
        self.factions.get_mut(id)
    }

    pub fn config(&self, id: &FactionId) -> Option<&FactionConfig> {
        self.get(id).map(|faction| &faction.config)
    }

    pub fn ids(&self) -> Vec<FactionId> {
        self.factions.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Faction> {
        self.factions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Faction> {
        self.factions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.factions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }

    /// The faction hostile to everyone, if configured.
    pub fn hostile_faction(&self) -> Option<&Faction> {
        self.factions.values().find(|faction| faction.is_hostile())
    }

    pub fn is_hostile(&self, id: &FactionId) -> bool {
        self.get(id).is_some_and(Faction::is_hostile)
    }

    /// Get the relationship from one faction toward another.
    pub fn relationship(&self, from: &FactionId, to: &FactionId) -> Relationship {
        if from == to {
            // Same faction is neutral (no friendly fire)
            return Relationship::Neutral;
        }
        if self.is_hostile(from) || self.is_hostile(to) {
            Relationship::Hostile
        } else {
            Relationship::Neutral
        }
    }

    pub fn are_hostile(&self, a: &FactionId, b: &FactionId) -> bool {
        self.relationship(a, b) == Relationship::Hostile
    }

    pub fn credit(&mut self, id: &FactionId, amount: f64) {
        if let Some(faction) = self.get_mut(id) {
            faction.ledger.credit(amount);
        }
    }

    pub fn debit(&mut self, id: &FactionId, amount: f64) {
        if let Some(faction) = self.get_mut(id) {
            faction.ledger.debit(amount);
        }
    }

    pub fn treasury(&self, id: &FactionId) -> f64 {
        self.get(id).map_or(0.0, |faction| faction.ledger.treasury)
    }

    pub fn record_commission(&mut self, id: &FactionId) {
        if let Some(faction) = self.get_mut(id) {
            faction.ship_count = faction.ship_count.saturating_add(1);
        }
    }

    pub fn record_loss(&mut self, id: &FactionId) {
        if let Some(faction) = self.get_mut(id) {
            faction.ship_count = faction.ship_count.saturating_sub(1);
            faction.ships_lost = faction.ships_lost.saturating_add(1);
        }
    }

    pub fn set_ship_counts(&mut self, counts: &BTreeMap<FactionId, u32>) {
        for faction in self.factions.values_mut() {
            faction.ship_count = counts.get(&faction.config.id).copied().unwrap_or(0);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
