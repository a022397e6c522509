//! Read-only reference data: sectors, gates, goods, markets, hulls and factions.

use bevy::prelude::*;

use crate::factions::FactionConfig;
use crate::ships::ShipClass;
use crate::stations::{Market, TradeGood};
use crate::world::{Gate, SectorId, SectorInfo};

/// Lookup interface the simulation consumes. Implementations are immutable.
pub trait ReferenceData {
    fn sectors(&self) -> &[SectorInfo];
    fn gates(&self) -> &[Gate];
    fn trade_goods(&self) -> &[TradeGood];
    fn markets(&self) -> &[Market];
    fn ship_classes(&self) -> &[ShipClass];
    fn faction_configs(&self) -> &[FactionConfig];
    fn player_start(&self) -> SectorId;
}

#[derive(Resource, Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Catalog {
    pub sectors: Vec<SectorInfo>,
    pub gates: Vec<Gate>,
    pub goods: Vec<TradeGood>,
    pub markets: Vec<Market>,
    pub ship_classes: Vec<ShipClass>,
    pub factions: Vec<FactionConfig>,
    pub player_start: SectorId,
}

impl Catalog {
    pub fn builtin() -> Result<Self, String> {
        Self::from_ron(CATALOG_RON)
    }

    pub fn from_ron(source: &str) -> Result<Self, String> {
        let catalog = match ron::de::from_str::<Catalog>(source) {
            Ok(catalog) => catalog,
            Err(error) => return Err(format!("Catalog parse error: {}", error)),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), String> {
        if self.sectors.is_empty() {
            return Err("Catalog has no sectors".to_string());
        }
        if self.factions.is_empty() {
            return Err("Catalog has no factions".to_string());
        }

        let hostile = self.factions.iter().filter(|config| config.hostile).count();
        if hostile != 1 {
            return Err(format!("Expected one hostile faction, found {}", hostile));
        }

        let known = |id: SectorId| self.sectors.iter().any(|sector| sector.id == id);
        if !known(self.player_start) {
            return Err(format!("Unknown player start sector {}", self.player_start));
        }
        for config in &self.factions {
            match config.base_sector() {
                Some(sector) if known(sector) => {}
                Some(sector) => {
                    return Err(format!("Faction {} has unknown base {}", config.id, sector))
                }
                None => return Err(format!("Faction {} has no home or retreat", config.id)),
            }
        }

        Ok(())
    }
}

impl ReferenceData for Catalog {
    fn sectors(&self) -> &[SectorInfo] {
        &self.sectors
    }

    fn gates(&self) -> &[Gate] {
        &self.gates
    }

    fn trade_goods(&self) -> &[TradeGood] {
        &self.goods
    }

    fn markets(&self) -> &[Market] {
        &self.markets
    }

    fn ship_classes(&self) -> &[ShipClass] {
        &self.ship_classes
    }

    fn faction_configs(&self) -> &[FactionConfig] {
        &self.factions
    }

    fn player_start(&self) -> SectorId {
        self.player_start
    }
}

const CATALOG_RON: &str = r#"
(
    sectors: [
        (id: 1, name: "Solace Prime", security: 0.95),
        (id: 2, name: "Meridian", security: 0.8),
        (id: 3, name: "Ashfall Belt", security: 0.55),
        (id: 4, name: "Corvid Reach", security: 0.45),
        (id: 5, name: "Helix Junction", security: 0.7),
        (id: 6, name: "Tern's Drift", security: 0.3),
        (id: 7, name: "Blackwater", security: 0.1),
        (id: 8, name: "Outer Vigil", security: 0.35),
    ],
    gates: [
        (from: 1, to: 2),
        (from: 1, to: 5),
        (from: 2, to: 3),
        (from: 2, to: 5),
        (from: 3, to: 4),
        (from: 5, to: 4),
        (from: 5, to: 8),
        (from: 4, to: 6),
        (from: 8, to: 6),
        (from: 6, to: 7),
    ],
    goods: [
        (id: "food", name: "Food Rations", unit_volume: 1.0, base_price: 12.0),
        (id: "fuel-cells", name: "Fuel Cells", unit_volume: 1.0, base_price: 20.0),
        (id: "medical", name: "Medical Supplies", unit_volume: 0.5, base_price: 45.0),
        (id: "alloys", name: "Refined Alloys", unit_volume: 2.0, base_price: 60.0),
    ],
    markets: [
        (
            station: "Solace Exchange",
            sector: 1,
            listings: {
                "food": (stock: 400, baseline_stock: 400, sell_price: 10.0, buy_price: 9.0),
                "medical": (stock: 50, baseline_stock: 50, sell_price: 55.0, buy_price: 52.0),
                "alloys": (stock: 20, baseline_stock: 20, sell_price: 75.0, buy_price: 72.0),
            },
        ),
        (
            station: "Meridian Refinery",
            sector: 2,
            listings: {
                "alloys": (stock: 150, baseline_stock: 150, sell_price: 52.0, buy_price: 48.0),
                "fuel-cells": (stock: 40, baseline_stock: 40, sell_price: 24.0, buy_price: 22.0),
                "food": (stock: 30, baseline_stock: 30, sell_price: 15.0, buy_price: 14.0),
            },
        ),
        (
            station: "Ashfall Works",
            sector: 3,
            listings: {
                "fuel-cells": (stock: 250, baseline_stock: 250, sell_price: 16.0, buy_price: 14.0),
                "food": (stock: 10, baseline_stock: 10, sell_price: 18.0, buy_price: 17.0),
            },
        ),
        (
            station: "Helix Bazaar",
            sector: 5,
            listings: {
                "medical": (stock: 120, baseline_stock: 120, sell_price: 40.0, buy_price: 37.0),
                "food": (stock: 80, baseline_stock: 80, sell_price: 13.0, buy_price: 12.0),
                "fuel-cells": (stock: 60, baseline_stock: 60, sell_price: 21.0, buy_price: 19.0),
                "alloys": (stock: 30, baseline_stock: 30, sell_price: 66.0, buy_price: 63.0),
            },
        ),
        (
            station: "Vigil Depot",
            sector: 8,
            listings: {
                "medical": (stock: 5, baseline_stock: 5, sell_price: 62.0, buy_price: 58.0),
                "fuel-cells": (stock: 10, baseline_stock: 10, sell_price: 30.0, buy_price: 27.0),
            },
        ),
    ],
    ship_classes: [
        (name: "Prospector", shield: 80.0, armor: 60.0, hull: 120.0, cargo_capacity: 200.0),
        (name: "Mule", shield: 100.0, armor: 90.0, hull: 160.0, cargo_capacity: 400.0),
        (name: "Warden", shield: 180.0, armor: 140.0, hull: 150.0, cargo_capacity: 30.0),
        (name: "Pathfinder", shield: 60.0, armor: 40.0, hull: 80.0, cargo_capacity: 20.0),
        (name: "Mender", shield: 150.0, armor: 120.0, hull: 140.0, cargo_capacity: 40.0),
        (name: "Corsair", shield: 120.0, armor: 100.0, hull: 130.0, cargo_capacity: 120.0),
        (name: "Marauder", shield: 160.0, armor: 150.0, hull: 170.0, cargo_capacity: 80.0),
    ],
    factions: [
        (
            id: "combine",
            name: "Ashfall Mining Combine",
            tag: "AMC",
            home_sector: Some(2),
            starting_treasury: 60000.0,
            priorities: {Miner: 3.0, Hauler: 2.0, Ratter: 1.5, Logistics: 1.0, Surveyor: 0.5},
            preferred: (
                mining: [3, 4],
                trade: [2, 3, 5],
                hunting: [3, 4],
                survey: [4, 6],
                support: [3],
            ),
            avoided: [7],
            starting_composition: {Miner: 6, Hauler: 2, Ratter: 2, Surveyor: 1, Logistics: 1},
            replacement_costs: {Miner: 4000.0, Hauler: 6500.0, Ratter: 9000.0, Surveyor: 3000.0, Logistics: 8000.0},
            ship_classes: {Miner: "Prospector", Hauler: "Mule", Ratter: "Warden", Surveyor: "Pathfinder", Logistics: "Mender"},
        ),
        (
            id: "guild",
            name: "Helix Trade Guild",
            tag: "HTG",
            home_sector: Some(5),
            starting_treasury: 80000.0,
            priorities: {Hauler: 3.0, Miner: 1.0, Ratter: 1.5},
            preferred: (
                mining: [4],
                trade: [1, 2, 3, 5, 8],
                hunting: [5, 8],
            ),
            avoided: [6, 7],
            starting_composition: {Hauler: 5, Miner: 2, Ratter: 2},
            replacement_costs: {Hauler: 6500.0, Miner: 4000.0, Ratter: 9000.0},
            ship_classes: {Hauler: "Mule", Miner: "Prospector", Ratter: "Warden"},
        ),
        (
            id: "vanguard",
            name: "Vigil Vanguard",
            tag: "VGD",
            home_sector: Some(1),
            starting_treasury: 70000.0,
            priorities: {Ratter: 3.0, Logistics: 2.0, Surveyor: 1.0, Miner: 0.5},
            preferred: (
                mining: [2],
                hunting: [4, 6, 8],
                survey: [6, 7, 8],
                support: [4, 8],
            ),
            starting_composition: {Ratter: 5, Logistics: 2, Surveyor: 2, Miner: 1},
            replacement_costs: {Ratter: 9000.0, Logistics: 8000.0, Surveyor: 3000.0, Miner: 4000.0},
            ship_classes: {Ratter: "Warden", Logistics: "Mender", Surveyor: "Pathfinder", Miner: "Prospector"},
        ),
        (
            id: "reavers",
            name: "Blackwater Reavers",
            tag: "BWR",
            hostile: true,
            retreat_sector: Some(7),
            starting_treasury: 25000.0,
            priorities: {Raider: 3.0, Bomber: 1.5},
            preferred: (
                raid: [3, 4, 8],
                ambush: [6, 4],
            ),
            avoided: [1],
            starting_composition: {Raider: 6, Bomber: 2},
            replacement_costs: {Raider: 5000.0, Bomber: 8000.0},
            ship_classes: {Raider: "Corsair", Bomber: "Marauder"},
        ),
    ],
    player_start: 2,
)
"#;
