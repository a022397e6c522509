//! Read-only projections for operators: faction summaries, ship listings, raid feed.

use std::cmp::Ordering;

use crate::bridge::abstract_view;
use crate::factions::{FactionId, FactionRegistry};
use crate::host::EntityHost;
use crate::pirates::{RaidEvent, RaidLog};
use crate::registry::ShipRegistry;
use crate::ships::{AiState, HaulStage, Ship, ShipId, ShipRole, Task, TaskKind};
use crate::world::{SectorGraph, SectorId};

#[derive(Clone, Debug, PartialEq)]
pub struct FactionSummary {
    pub id: FactionId,
    pub name: String,
    pub tag: String,
    pub hostile: bool,
    pub treasury: f64,
    pub income_rate: f64,
    pub expense_rate: f64,
    pub ship_count: u32,
    pub ships_lost: u32,
}

pub fn faction_summaries(factions: &FactionRegistry) -> Vec<FactionSummary> {
    factions
        .iter()
        .map(|faction| FactionSummary {
            id: faction.id().clone(),
            name: faction.config.name.clone(),
            tag: faction.config.tag.clone(),
            hostile: faction.is_hostile(),
            treasury: faction.ledger.treasury,
            income_rate: faction.ledger.income_rate,
            expense_rate: faction.ledger.expense_rate,
            ship_count: faction.ship_count,
            ships_lost: faction.ships_lost,
        })
        .collect()
}

impl FactionSummary {
    pub fn line(&self) -> String {
        format!(
            "[{}] {}  {:.0} cr  +{:.0}/h -{:.0}/h  ships {} lost {}",
            self.tag,
            self.name,
            self.treasury,
            self.income_rate,
            self.expense_rate,
            self.ship_count,
            self.ships_lost
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShipRow {
    pub id: ShipId,
    pub name: String,
    pub role: ShipRole,
    pub sector: SectorId,
    pub location: String,
    pub state: AiState,
    pub task: String,
    pub cargo_used: f32,
    pub cargo_capacity: f32,
    pub shield_pct: u32,
    pub armor_pct: u32,
    pub hull_pct: u32,
    pub materialized: bool,
}

impl ShipRow {
    pub fn line(&self) -> String {
        format!(
            "{} {} ({}) {} | {} | {} | cargo {:.0}/{:.0} | S{}% A{}% H{}%{}",
            self.id,
            self.name,
            self.role.label(),
            self.location,
            self.state.label(),
            self.task,
            self.cargo_used,
            self.cargo_capacity,
            self.shield_pct,
            self.armor_pct,
            self.hull_pct,
            if self.materialized { " [live]" } else { "" }
        )
    }
}

/// Every ship of `faction`, live ones included, in id order.
pub fn ship_listing(
    registry: &ShipRegistry,
    host: &impl EntityHost,
    graph: &SectorGraph,
    faction: &FactionId,
) -> Vec<ShipRow> {
    abstract_view(registry, host)
        .iter()
        .filter(|ship| &ship.faction == faction)
        .map(|ship| {
            let materialized = registry
                .get(ship.id)
                .is_some_and(|entry| entry.is_materialized());
            ship_row(ship, graph, materialized)
        })
        .collect()
}

fn ship_row(ship: &Ship, graph: &SectorGraph, materialized: bool) -> ShipRow {
    let location = match ship.nav.next_hop() {
        Some(next) if ship.state == AiState::Traveling => {
            format!("{} -> {}", graph.name(ship.sector), graph.name(next))
        }
        _ => graph.name(ship.sector),
    };
    ShipRow {
        id: ship.id,
        name: ship.name.clone(),
        role: ship.role,
        sector: ship.sector,
        location,
        state: ship.state,
        task: describe_task(ship.task.as_ref(), graph),
        cargo_used: ship.cargo.used,
        cargo_capacity: ship.cargo.capacity,
        shield_pct: percent(ship.defense.shield_fraction()),
        armor_pct: percent(ship.defense.armor_fraction()),
        hull_pct: percent(ship.defense.hull_fraction()),
        materialized,
    }
}

fn percent(fraction: f32) -> u32 {
    (fraction * 100.0).round() as u32
}

pub fn describe_task(task: Option<&Task>, graph: &SectorGraph) -> String {
    let Some(task) = task else {
        return "Awaiting orders".to_string();
    };
    let target = graph.name(task.target);
    match (task.kind, &task.haul) {
        (TaskKind::Haul, Some(order)) => {
            let source = graph.name(order.source);
            let destination = graph.name(order.destination);
            match order.stage {
                HaulStage::Pickup => format!(
                    "Buying {} {} at {} for {}",
                    order.quantity, order.good, source, destination
                ),
                HaulStage::Delivery => format!(
                    "Delivering {} {} to {}",
                    order.quantity, order.good, destination
                ),
            }
        }
        (TaskKind::Haul, None) => format!("Hauling in {}", target),
        (TaskKind::Mine, _) => format!("Mining in {}", target),
        (TaskKind::Hunt, _) => format!("Hunting pirates in {}", target),
        (TaskKind::Raid, _) => format!("Raiding {}", target),
        (TaskKind::Ambush, _) => format!("Ambushing in {}", target),
        (TaskKind::Survey, _) => format!("Surveying {}", target),
        (TaskKind::Support, _) => format!("Repairing allies in {}", target),
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ShipSort {
    Name,
    Role,
    State,
    #[default]
    Sector,
    Health,
}

impl ShipSort {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "name" => Some(ShipSort::Name),
            "role" => Some(ShipSort::Role),
            "state" => Some(ShipSort::State),
            "sector" => Some(ShipSort::Sector),
            "health" => Some(ShipSort::Health),
            _ => None,
        }
    }
}

pub fn sort_rows(rows: &mut [ShipRow], sort: ShipSort) {
    rows.sort_by(|a, b| {
        let order = match sort {
            ShipSort::Name => a.name.cmp(&b.name),
            ShipSort::Role => a.role.cmp(&b.role),
            ShipSort::State => a.state.label().cmp(b.state.label()),
            ShipSort::Sector => a.sector.cmp(&b.sector),
            ShipSort::Health => a.hull_pct.cmp(&b.hull_pct),
        };
        match order {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        }
    });
}

/// Raid events from the last window, newest first.
pub fn raid_feed(raids: &RaidLog, now: f64) -> Vec<RaidEvent> {
    let mut events: Vec<RaidEvent> = raids.recent(now).into_iter().cloned().collect();
    events.reverse();
    events
}

pub fn describe_raid_event(event: &RaidEvent, graph: &SectorGraph) -> String {
    let sector = graph.name(event.sector);
    if event.value > 0.0 {
        format!(
            "{} {} {} in {} ({:.0} cr)",
            event.actor,
            event.kind.label(),
            event.target,
            sector,
            event.value
        )
    } else {
        format!(
            "{} {} {} in {}",
            event.actor,
            event.kind.label(),
            event.target,
            sector
        )
    }
}
