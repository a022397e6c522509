use bevy::prelude::*;
use std::collections::BTreeMap;
use std::fmt;

use crate::factions::FactionId;
use crate::ore::OreKind;
use crate::world::SectorId;

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ShipId(pub u64);

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:05}", self.0)
    }
}

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum ShipRole {
    Miner,
    Hauler,
    Ratter,
    Raider,
    Bomber,
    Surveyor,
    Logistics,
}

impl ShipRole {
    pub const ALL: [ShipRole; 7] = [
        ShipRole::Miner,
        ShipRole::Hauler,
        ShipRole::Ratter,
        ShipRole::Raider,
        ShipRole::Bomber,
        ShipRole::Surveyor,
        ShipRole::Logistics,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ShipRole::Miner => "Miner",
            ShipRole::Hauler => "Hauler",
            ShipRole::Ratter => "Ratter",
            ShipRole::Raider => "Raider",
            ShipRole::Bomber => "Bomber",
            ShipRole::Surveyor => "Surveyor",
            ShipRole::Logistics => "Logistics",
        }
    }

    /// Cheap prey for raiders: slow, loaded, lightly armed.
    pub fn is_soft_target(self) -> bool {
        matches!(self, ShipRole::Miner | ShipRole::Hauler)
    }

    pub fn is_raider(self) -> bool {
        matches!(self, ShipRole::Raider | ShipRole::Bomber)
    }
}

#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum AiState {
    #[default]
    Idle,
    Traveling,
    Mining,
    Returning,
    TradingBuy,
    TradingSell,
    Ratting,
    Raiding,
    Fleeing,
    Surveying,
    Repairing,
    Docking,
}

impl AiState {
    pub fn label(self) -> &'static str {
        match self {
            AiState::Idle => "idle",
            AiState::Traveling => "traveling",
            AiState::Mining => "mining",
            AiState::Returning => "returning",
            AiState::TradingBuy => "trading-buy",
            AiState::TradingSell => "trading-sell",
            AiState::Ratting => "ratting",
            AiState::Raiding => "raiding",
            AiState::Fleeing => "fleeing",
            AiState::Surveying => "surveying",
            AiState::Repairing => "repairing",
            AiState::Docking => "docking",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DefensePools {
    pub shield: f32,
    pub shield_max: f32,
    pub armor: f32,
    pub armor_max: f32,
    pub hull: f32,
    pub hull_max: f32,
}

impl DefensePools {
    pub fn full(shield: f32, armor: f32, hull: f32) -> Self {
        Self {
            shield,
            shield_max: shield,
            armor,
            armor_max: armor,
            hull,
            hull_max: hull,
        }
    }

    pub fn restore_all(&mut self) {
        self.shield = self.shield_max;
        self.armor = self.armor_max;
        self.hull = self.hull_max;
    }

    /// Restores a fraction of maximum shield and armor.
    pub fn restore_fraction(&mut self, fraction: f32) {
        self.shield = (self.shield + self.shield_max * fraction).clamp(0.0, self.shield_max);
        self.armor = (self.armor + self.armor_max * fraction).clamp(0.0, self.armor_max);
    }

    /// Hull takes the full amount, shields drain at half rate.
    pub fn apply_damage(&mut self, amount: f32) {
        if amount <= 0.0 {
            return;
        }
        self.hull = (self.hull - amount).clamp(0.0, self.hull_max);
        self.shield = (self.shield - amount * 0.5).clamp(0.0, self.shield_max);
    }

    pub fn clamp(&mut self) {
        self.shield = self.shield.clamp(0.0, self.shield_max);
        self.armor = self.armor.clamp(0.0, self.armor_max);
        self.hull = self.hull.clamp(0.0, self.hull_max);
    }

    pub fn is_destroyed(&self) -> bool {
        self.hull <= 0.0
    }

    pub fn hull_fraction(&self) -> f32 {
        ratio(self.hull, self.hull_max)
    }

    pub fn shield_fraction(&self) -> f32 {
        ratio(self.shield, self.shield_max)
    }

    pub fn armor_fraction(&self) -> f32 {
        ratio(self.armor, self.armor_max)
    }
}

fn ratio(value: f32, max: f32) -> f32 {
    if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GoodLot {
    pub quantity: u32,
    pub unit_volume: f32,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Cargo {
    pub ore: BTreeMap<OreKind, u32>,
    pub goods: BTreeMap<String, GoodLot>,
    pub capacity: f32,
    pub used: f32,
}

impl Cargo {
    pub fn with_capacity(capacity: f32) -> Self {
        Self {
            capacity: capacity.max(0.0),
            ..Default::default()
        }
    }

    pub fn free_space(&self) -> f32 {
        (self.capacity - self.used).max(0.0)
    }

    pub fn utilization(&self) -> f32 {
        ratio(self.used, self.capacity)
    }

    pub fn is_empty(&self) -> bool {
        self.ore.is_empty() && self.goods.is_empty()
    }

    /// Add ore up to free volume. Returns the units actually added.
    pub fn add_ore(&mut self, kind: OreKind, units: u32) -> u32 {
        let added = units.min(fits(self.free_space(), kind.unit_volume()));
        if added > 0 {
            *self.ore.entry(kind).or_insert(0) += added;
            self.recompute();
        }
        added
    }

    pub fn ore_value(&self) -> f64 {
        self.ore
            .iter()
            .map(|(kind, units)| kind.unit_value() * f64::from(*units))
            .sum()
    }

    /// Empties the ore hold. Returns its sale value.
    pub fn clear_ore(&mut self) -> f64 {
        let value = self.ore_value();
        self.ore.clear();
        self.recompute();
        value
    }

    /// Removes a fraction of every ore stack. Returns the value removed.
    pub fn take_ore_fraction(&mut self, fraction: f32) -> f64 {
        let fraction = fraction.clamp(0.0, 1.0);
        let mut value = 0.0;
        for (kind, units) in self.ore.iter_mut() {
            let taken = ((*units as f32) * fraction).floor() as u32;
            *units -= taken;
            value += kind.unit_value() * f64::from(taken);
        }
        self.ore.retain(|_, units| *units > 0);
        self.recompute();
        value
    }

    /// Add trade goods up to free volume. Returns the quantity actually added.
    pub fn add_goods(&mut self, good: &str, quantity: u32, unit_volume: f32) -> u32 {
        let added = quantity.min(fits(self.free_space(), unit_volume));
        if added > 0 {
            let lot = self.goods.entry(good.to_string()).or_insert(GoodLot {
                quantity: 0,
                unit_volume,
            });
            lot.quantity += added;
            self.recompute();
        }
        added
    }

    /// Removes up to `quantity` of a good. Returns the quantity actually removed.
    pub fn remove_goods(&mut self, good: &str, quantity: u32) -> u32 {
        let Some(lot) = self.goods.get_mut(good) else {
            return 0;
        };
        let removed = quantity.min(lot.quantity);
        lot.quantity -= removed;
        if lot.quantity == 0 {
            self.goods.remove(good);
        }
        self.recompute();
        removed
    }

    /// Removes a fraction of every goods lot. Returns (good, quantity) pairs taken.
    pub fn take_goods_fraction(&mut self, fraction: f32) -> Vec<(String, u32)> {
        let fraction = fraction.clamp(0.0, 1.0);
        let mut taken = Vec::new();
        for (good, lot) in self.goods.iter_mut() {
            let amount = ((lot.quantity as f32) * fraction).floor() as u32;
            if amount > 0 {
                lot.quantity -= amount;
                taken.push((good.clone(), amount));
            }
        }
        self.goods.retain(|_, lot| lot.quantity > 0);
        self.recompute();
        taken
    }

    fn recompute(&mut self) {
        let ore: f32 = self
            .ore
            .iter()
            .map(|(kind, units)| kind.unit_volume() * (*units as f32))
            .sum();
        let goods: f32 = self
            .goods
            .values()
            .map(|lot| lot.unit_volume * (lot.quantity as f32))
            .sum();
        // Summation order can round a full hold a hair past capacity.
        self.used = (ore + goods).min(self.capacity);
    }
}

fn fits(free: f32, unit_volume: f32) -> u32 {
    if unit_volume <= 0.0 {
        return u32::MAX;
    }
    let mut units = (free / unit_volume).floor().max(0.0) as u32;
    // The division can round either side of an exact multiple; settle on the product.
    if (units as f32 + 1.0) * unit_volume <= free {
        units += 1;
    }
    if units > 0 && units as f32 * unit_volume > free {
        units -= 1;
    }
    units
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TaskKind {
    Mine,
    Haul,
    Hunt,
    Raid,
    Ambush,
    Survey,
    Support,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum HaulStage {
    Pickup,
    Delivery,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HaulOrder {
    pub good: String,
    pub source: SectorId,
    pub destination: SectorId,
    pub quantity: u32,
    pub stage: HaulStage,
    #[serde(default)]
    pub paid: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    pub target: SectorId,
    #[serde(default)]
    pub haul: Option<HaulOrder>,
}

impl Task {
    pub fn new(kind: TaskKind, target: SectorId) -> Self {
        Self {
            kind,
            target,
            haul: None,
        }
    }

    pub fn haul(order: HaulOrder) -> Self {
        Self {
            kind: TaskKind::Haul,
            target: order.source,
            haul: Some(order),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TravelPurpose {
    #[default]
    Task,
    Return,
    Flee,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Navigation {
    pub path: Vec<SectorId>,
    pub index: usize,
    pub hop_progress: f32,
    pub purpose: TravelPurpose,
}

impl Navigation {
    pub fn next_hop(&self) -> Option<SectorId> {
        self.path.get(self.index).copied()
    }

    pub fn remaining(&self) -> &[SectorId] {
        self.path.get(self.index..).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.path.clear();
        self.index = 0;
        self.hop_progress = 0.0;
        self.purpose = TravelPurpose::Task;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShipStats {
    pub credits_earned: f64,
    pub kills: u32,
    pub ore_value_mined: f64,
}

/// Base stats for a hull design, read from reference data.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShipClass {
    pub name: String,
    pub shield: f32,
    pub armor: f32,
    pub hull: f32,
    pub cargo_capacity: f32,
}

#[derive(Resource, Debug, Default, Clone)]
pub struct ShipClasses {
    classes: BTreeMap<String, ShipClass>,
}

impl ShipClasses {
    pub fn new(classes: impl IntoIterator<Item = ShipClass>) -> Self {
        Self {
            classes: classes
                .into_iter()
                .map(|class| (class.name.clone(), class))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ShipClass> {
        self.classes.get(name)
    }
}

/// One ship, abstract or materialized. The registry owns it either way.
#[derive(Clone, Debug, PartialEq)]
pub struct Ship {
    pub id: ShipId,
    pub faction: FactionId,
    pub role: ShipRole,
    pub class: String,
    pub name: String,
    pub sector: SectorId,
    pub position: Vec2,
    pub defense: DefensePools,
    pub cargo: Cargo,
    pub task: Option<Task>,
    pub state: AiState,
    pub nav: Navigation,
    pub stats: ShipStats,
    /// Seconds into the current work cycle (mining, hunting, raiding...).
    pub cycle_progress: f32,
    /// Seconds spent on a time-boxed task (surveying, repairing).
    pub task_elapsed: f32,
}

impl Ship {
    pub fn new(
        id: ShipId,
        faction: FactionId,
        role: ShipRole,
        class: &ShipClass,
        name: String,
        sector: SectorId,
        position: Vec2,
    ) -> Self {
        Self {
            id,
            faction,
            role,
            class: class.name.clone(),
            name,
            sector,
            position,
            defense: DefensePools::full(class.shield, class.armor, class.hull),
            cargo: Cargo::with_capacity(class.cargo_capacity),
            task: None,
            state: AiState::Idle,
            nav: Navigation::default(),
            stats: ShipStats::default(),
            cycle_progress: 0.0,
            task_elapsed: 0.0,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, AiState::Idle)
    }

    /// Drops the current task and waits for the next assignment.
    pub fn go_idle(&mut self) {
        self.task = None;
        self.state = AiState::Idle;
        self.nav.clear();
        self.cycle_progress = 0.0;
        self.task_elapsed = 0.0;
    }

    pub fn enter(&mut self, state: AiState) {
        self.state = state;
        self.cycle_progress = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Cargo {
        pub(crate) fn ore_units(&self) -> u32 {
            self.ore.values().sum()
        }

        pub(crate) fn goods_quantity(&self, good: &str) -> u32 {
            self.goods.get(good).map_or(0, |lot| lot.quantity)
        }
    }

    fn class() -> ShipClass {
        ShipClass {
            name: "Prospector".to_string(),
            shield: 100.0,
            armor: 80.0,
            hull: 120.0,
            cargo_capacity: 200.0,
        }
    }

    #[test]
    fn ship_id_displays_padded() {
        assert_eq!(ShipId(42).to_string(), "#00042");
    }

    #[test]
    fn cargo_add_ore_clamps_to_capacity() {
        let mut cargo = Cargo::with_capacity(10.0);
        let added = cargo.add_ore(OreKind::RareMetals, 20);
        assert_eq!(added, 5);
        assert_eq!(cargo.used, 10.0);
        assert_eq!(cargo.add_ore(OreKind::CommonOre, 3), 0);
    }

    #[test]
    fn cargo_used_never_exceeds_capacity() {
        let mut cargo = Cargo::with_capacity(37.0);
        for units in [5, 9, 13, 2, 40] {
            cargo.add_ore(OreKind::Silicates, units);
            cargo.add_goods("fuel-cells", units, 2.5);
            assert!(cargo.used <= cargo.capacity);
        }
    }

    #[test]
    fn cargo_rejects_unit_that_only_nearly_fits() {
        let mut cargo = Cargo::with_capacity(10.0 - 5e-5);
        assert_eq!(cargo.add_ore(OreKind::CommonOre, 20), 9);
        assert!(cargo.free_space() < 1.0);
        assert_eq!(cargo.add_ore(OreKind::CommonOre, 1), 0);
        assert!(cargo.used <= cargo.capacity);

        let mut cargo = Cargo::with_capacity(1.0);
        assert_eq!(cargo.add_goods("spice", 20, 0.1), 10);
        assert!(cargo.used <= cargo.capacity);
    }

    #[test]
    fn cargo_clear_ore_returns_value() {
        let mut cargo = Cargo::with_capacity(100.0);
        cargo.add_ore(OreKind::CommonOre, 10);
        cargo.add_ore(OreKind::FuelOre, 5);
        assert_eq!(cargo.clear_ore(), 10.0 * 12.0 + 5.0 * 18.0);
        assert_eq!(cargo.used, 0.0);
        assert!(cargo.ore.is_empty());
    }

    #[test]
    fn cargo_take_ore_fraction_removes_floor() {
        let mut cargo = Cargo::with_capacity(100.0);
        cargo.add_ore(OreKind::CommonOre, 10);
        let value = cargo.take_ore_fraction(0.35);
        assert_eq!(value, 3.0 * 12.0);
        assert_eq!(cargo.ore_units(), 7);
    }

    #[test]
    fn cargo_goods_round_trip_volume() {
        let mut cargo = Cargo::with_capacity(50.0);
        assert_eq!(cargo.add_goods("medical", 10, 2.0), 10);
        assert_eq!(cargo.used, 20.0);
        assert_eq!(cargo.remove_goods("medical", 4), 4);
        assert_eq!(cargo.goods_quantity("medical"), 6);
        assert_eq!(cargo.remove_goods("medical", 100), 6);
        assert!(cargo.is_empty());
        assert_eq!(cargo.used, 0.0);
    }

    #[test]
    fn cargo_remove_missing_good_is_zero() {
        let mut cargo = Cargo::with_capacity(50.0);
        assert_eq!(cargo.remove_goods("nothing", 3), 0);
    }

    #[test]
    fn defense_damage_hits_hull_and_half_shield() {
        let mut pools = DefensePools::full(100.0, 50.0, 100.0);
        pools.apply_damage(40.0);
        assert_eq!(pools.hull, 60.0);
        assert_eq!(pools.shield, 80.0);
        assert_eq!(pools.armor, 50.0);
    }

    #[test]
    fn defense_pools_clamp_at_zero() {
        let mut pools = DefensePools::full(10.0, 10.0, 10.0);
        pools.apply_damage(500.0);
        assert_eq!(pools.hull, 0.0);
        assert_eq!(pools.shield, 0.0);
        assert!(pools.is_destroyed());
    }

    #[test]
    fn defense_restore_fraction_caps_at_max() {
        let mut pools = DefensePools::full(100.0, 100.0, 100.0);
        pools.shield = 95.0;
        pools.armor = 20.0;
        pools.restore_fraction(0.1);
        assert_eq!(pools.shield, 100.0);
        assert_eq!(pools.armor, 30.0);
    }

    #[test]
    fn new_ship_starts_idle_with_full_pools() {
        let ship = Ship::new(
            ShipId(1),
            FactionId::from("miners"),
            ShipRole::Miner,
            &class(),
            "Prospector-001".to_string(),
            3,
            Vec2::ZERO,
        );
        assert!(ship.is_idle());
        assert_eq!(ship.defense.hull_fraction(), 1.0);
        assert_eq!(ship.cargo.capacity, 200.0);
    }

    #[test]
    fn navigation_remaining_tracks_index() {
        let nav = Navigation {
            path: vec![2, 3, 4],
            index: 1,
            hop_progress: 0.0,
            purpose: TravelPurpose::Task,
        };
        assert_eq!(nav.next_hop(), Some(3));
        assert_eq!(nav.remaining(), &[3, 4]);
    }

    #[test]
    fn soft_targets_are_miners_and_haulers() {
        assert!(ShipRole::Miner.is_soft_target());
        assert!(ShipRole::Hauler.is_soft_target());
        assert!(!ShipRole::Ratter.is_soft_target());
    }
}
