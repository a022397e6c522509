//! Task state machine shared by abstract and materialized ships.
//!
//! Every routine takes the RNG explicitly, so a tick replays identically for the
//! same seed. Ships are advanced in registry order from an id snapshot; ships that
//! die mid-tick are removed from the registry immediately and reported so the
//! caller can despawn their live entity, if any.

use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::factions::{FactionId, FactionRegistry};
use crate::ore::roll_yield;
use crate::pirates::{RaidEvent, RaidEventKind, RaidLog};
use crate::registry::ShipRegistry;
use crate::ships::{
    AiState, HaulStage, Navigation, Ship, ShipId, ShipRole, Task, TaskKind, TravelPurpose,
};
use crate::stations::{affordable_quantity, StationMarkets};
use crate::world::{random_position, SectorGraph, SectorId};

// =============================================================================
// Tuning
// =============================================================================

pub const HOP_SECONDS: f32 = 8.0;
pub const MINING_CYCLE_SECONDS: f32 = 12.0;
/// Cargo utilization at which miners head home to sell.
pub const CARGO_HIGH_WATER: f32 = 0.9;
pub const HUNT_CYCLE_SECONDS: f32 = 15.0;
/// Hunting time before a ratter heads home to rearm.
pub const HUNT_SHIFT_SECONDS: f32 = 120.0;
pub const RAID_CYCLE_SECONDS: f32 = 10.0;
pub const RAID_SHIFT_SECONDS: f32 = 90.0;
pub const SURVEY_SECONDS: f32 = 30.0;
pub const REPAIR_SECONDS: f32 = 60.0;
pub const REPAIR_PULSE_SECONDS: f32 = 5.0;
pub const REPAIR_FRACTION: f32 = 0.1;
/// Hull fraction below which a damaged ship disengages.
pub const LOW_HEALTH: f32 = 0.3;

pub const BOUNTY_BASE: f64 = 250.0;
pub const BOUNTY_SPAN: f64 = 350.0;
/// Paid for destroying a hostile faction ship.
pub const HOSTILE_BOUNTY: f64 = 1_500.0;
const DAMAGE_MIN: f32 = 0.1;
const DAMAGE_MAX: f32 = 0.3;

const SOFT_TARGET_WEIGHT: u32 = 3;
const HARD_TARGET_WEIGHT: u32 = 1;
const AMBUSH_KILL_BONUS: f32 = 0.15;
const PLUNDER_MIN: f32 = 0.2;
const PLUNDER_MAX: f32 = 0.5;

// =============================================================================
// Context
// =============================================================================

/// Shared state a ship step reads and writes besides the registry.
pub struct SimContext<'a> {
    pub graph: &'a SectorGraph,
    pub factions: &'a mut FactionRegistry,
    pub markets: &'a mut StationMarkets,
    pub raids: &'a mut RaidLog,
    pub now: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DestroyedShip {
    pub id: ShipId,
    pub name: String,
    pub faction: FactionId,
    pub sector: SectorId,
    pub entity: Option<Entity>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub destroyed: Vec<DestroyedShip>,
    /// Ships that changed sector this tick.
    pub relocated: Vec<ShipId>,
    /// Completed surveys as (ship, sector).
    pub surveyed: Vec<(ShipId, SectorId)>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.destroyed.is_empty() && self.relocated.is_empty() && self.surveyed.is_empty()
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Advances every ship in `ids`, in order. Ids that vanish mid-tick are skipped.
pub fn advance_ships(
    registry: &mut ShipRegistry,
    ids: &[ShipId],
    ctx: &mut SimContext,
    rng: &mut impl Rng,
    dt: f32,
) -> TickReport {
    let mut report = TickReport::default();
    for id in ids {
        advance_ship(registry, *id, ctx, rng, dt, &mut report);
    }
    report
}

pub fn advance_ship(
    registry: &mut ShipRegistry,
    id: ShipId,
    ctx: &mut SimContext,
    rng: &mut impl Rng,
    dt: f32,
    report: &mut TickReport,
) {
    let Some(state) = registry.ship(id).map(|ship| ship.state) else {
        return;
    };

    match state {
        AiState::Idle | AiState::Docking => {}
        AiState::Traveling => {
            if let Some(ship) = registry.ship_mut(id) {
                travel(ship, ctx.graph, rng, dt, report);
            }
        }
        AiState::Mining => {
            if let Some(ship) = registry.ship_mut(id) {
                mine(ship, rng, dt);
            }
        }
        AiState::Returning => {
            if let Some(ship) = registry.ship_mut(id) {
                return_home(ship, ctx);
            }
        }
        AiState::TradingBuy => {
            if let Some(ship) = registry.ship_mut(id) {
                buy_goods(ship, ctx);
            }
        }
        AiState::TradingSell => {
            if let Some(ship) = registry.ship_mut(id) {
                sell_goods(ship, ctx);
            }
        }
        AiState::Ratting => hunt(registry, id, ctx, rng, dt, report),
        AiState::Raiding => raid(registry, id, ctx, rng, dt, report),
        AiState::Fleeing => {
            if let Some(ship) = registry.ship_mut(id) {
                flee(ship, ctx);
            }
        }
        AiState::Surveying => {
            if let Some(ship) = registry.ship_mut(id) {
                survey(ship, dt, report);
            }
        }
        AiState::Repairing => repair(registry, id, dt),
    }
}

/// Hands a ship a task and sets it moving. Ships already at the target start work.
pub fn begin_task(ship: &mut Ship, task: Task, graph: &SectorGraph) {
    let target = task.target;
    ship.task = Some(task);
    ship.task_elapsed = 0.0;
    ship.cycle_progress = 0.0;
    if !start_travel(ship, graph, target, TravelPurpose::Task) {
        arrive(ship);
    }
}

/// Plots a path and enters `Traveling`. Returns false when there is nowhere to go,
/// either because the ship is already there or no gate chain connects the sectors.
pub fn start_travel(
    ship: &mut Ship,
    graph: &SectorGraph,
    destination: SectorId,
    purpose: TravelPurpose,
) -> bool {
    match graph.shortest_path(ship.sector, destination) {
        Some(path) if !path.is_empty() => {
            ship.nav = Navigation {
                path,
                index: 0,
                hop_progress: 0.0,
                purpose,
            };
            ship.enter(AiState::Traveling);
            true
        }
        _ => {
            if ship.sector != destination {
                debug!("{} has no route to sector {}", ship.name, destination);
            }
            ship.nav.clear();
            ship.nav.purpose = purpose;
            false
        }
    }
}

/// Work state implied by the current task once the ship is on site.
pub fn working_state(task: Option<&Task>) -> AiState {
    let Some(task) = task else {
        return AiState::Idle;
    };
    match task.kind {
        TaskKind::Mine => AiState::Mining,
        TaskKind::Haul => match task.haul.as_ref().map(|order| order.stage) {
            Some(HaulStage::Delivery) => AiState::TradingSell,
            _ => AiState::TradingBuy,
        },
        TaskKind::Hunt => AiState::Ratting,
        TaskKind::Raid | TaskKind::Ambush => AiState::Raiding,
        TaskKind::Survey => AiState::Surveying,
        TaskKind::Support => AiState::Repairing,
    }
}

// =============================================================================
// Movement
// =============================================================================

fn travel(
    ship: &mut Ship,
    graph: &SectorGraph,
    rng: &mut impl Rng,
    dt: f32,
    report: &mut TickReport,
) {
    ship.nav.hop_progress += dt;
    while ship.nav.hop_progress >= HOP_SECONDS {
        let Some(next) = ship.nav.next_hop() else {
            break;
        };
        ship.nav.hop_progress -= HOP_SECONDS;
        ship.nav.index += 1;
        ship.sector = next;
        ship.position = random_position(rng, graph.radius(next));
        if !report.relocated.contains(&ship.id) {
            report.relocated.push(ship.id);
        }
    }

    if ship.nav.next_hop().is_none() {
        arrive(ship);
    }
}

/// Places a ship in `sector` outside normal travel. A ship under way replans from
/// there toward its old destination, or arrives if it can't.
pub fn reroute(ship: &mut Ship, graph: &SectorGraph, sector: SectorId) {
    if ship.sector == sector {
        return;
    }
    ship.sector = sector;
    if ship.state != AiState::Traveling {
        return;
    }
    let purpose = ship.nav.purpose;
    let destination = ship.nav.remaining().last().copied();
    let replanned =
        destination.is_some_and(|destination| start_travel(ship, graph, destination, purpose));
    if !replanned {
        arrive(ship);
    }
}

fn arrive(ship: &mut Ship) {
    let purpose = ship.nav.purpose;
    ship.nav.clear();
    match purpose {
        TravelPurpose::Return => ship.enter(AiState::Returning),
        TravelPurpose::Flee => {
            ship.defense.restore_all();
            ship.go_idle();
        }
        TravelPurpose::Task => {
            let state = working_state(ship.task.as_ref());
            if state == AiState::Idle {
                ship.go_idle();
            } else {
                ship.enter(state);
            }
        }
    }
}

// =============================================================================
// Economy states
// =============================================================================

fn mine(ship: &mut Ship, rng: &mut impl Rng, dt: f32) {
    ship.cycle_progress += dt;
    while ship.cycle_progress >= MINING_CYCLE_SECONDS {
        ship.cycle_progress -= MINING_CYCLE_SECONDS;
        let (kind, units) = roll_yield(rng);
        let added = ship.cargo.add_ore(kind, units);
        ship.stats.ore_value_mined += kind.unit_value() * f64::from(added);

        if added == 0 || ship.cargo.utilization() >= CARGO_HIGH_WATER {
            ship.enter(AiState::Returning);
            return;
        }
    }
}

fn return_home(ship: &mut Ship, ctx: &mut SimContext) {
    let Some(base) = ctx
        .factions
        .config(&ship.faction)
        .and_then(|config| config.base_sector())
    else {
        ship.go_idle();
        return;
    };

    if ship.sector != base && start_travel(ship, ctx.graph, base, TravelPurpose::Return) {
        return;
    }

    let sale = ship.cargo.clear_ore();
    if sale > 0.0 {
        ctx.factions.credit(&ship.faction, sale);
        ship.stats.credits_earned += sale;
        debug!("{} sold ore for {:.0} cr", ship.name, sale);
    }
    ship.defense.restore_all();
    ship.go_idle();
}

fn buy_goods(ship: &mut Ship, ctx: &mut SimContext) {
    let Some(mut order) = ship.task.as_ref().and_then(|task| task.haul.clone()) else {
        ship.go_idle();
        return;
    };
    let unit_volume = ctx.markets.good(&order.good).map_or(1.0, |good| good.unit_volume);
    let treasury = ctx.factions.treasury(&ship.faction);
    let Some(listing) = ctx.markets.listing_mut(order.source, &order.good) else {
        ship.go_idle();
        return;
    };

    let stock = if order.quantity > 0 {
        listing.stock.min(order.quantity)
    } else {
        listing.stock
    };
    let quantity = affordable_quantity(
        treasury,
        listing.sell_price,
        stock,
        ship.cargo.free_space(),
        unit_volume,
    );
    if quantity == 0 {
        ship.go_idle();
        return;
    }

    let loaded = ship.cargo.add_goods(&order.good, quantity, unit_volume);
    if loaded == 0 {
        ship.go_idle();
        return;
    }
    let cost = listing.sell_price * f64::from(loaded);
    listing.stock -= loaded;
    ctx.factions.debit(&ship.faction, cost);

    order.quantity = loaded;
    order.stage = HaulStage::Delivery;
    order.paid = cost;
    let destination = order.destination;
    ship.task = Some(Task {
        kind: TaskKind::Haul,
        target: destination,
        haul: Some(order),
    });

    if !start_travel(ship, ctx.graph, destination, TravelPurpose::Task) {
        arrive(ship);
    }
}

fn sell_goods(ship: &mut Ship, ctx: &mut SimContext) {
    let Some(order) = ship.task.as_ref().and_then(|task| task.haul.clone()) else {
        ship.go_idle();
        return;
    };

    let sold = ship.cargo.remove_goods(&order.good, order.quantity);
    if sold > 0 {
        let revenue = match ctx.markets.listing_mut(order.destination, &order.good) {
            Some(listing) => {
                listing.stock = listing.stock.saturating_add(sold);
                listing.buy_price * f64::from(sold)
            }
            None => ctx.markets.base_value(&order.good, sold),
        };
        ctx.factions.credit(&ship.faction, revenue);
        ship.stats.credits_earned += (revenue - order.paid).max(0.0);
        debug!(
            "{} delivered {} {} for {:.0} cr",
            ship.name, sold, order.good, revenue
        );
    }
    ship.go_idle();
}

// =============================================================================
// Combat states
// =============================================================================

fn hunt(
    registry: &mut ShipRegistry,
    id: ShipId,
    ctx: &mut SimContext,
    rng: &mut impl Rng,
    dt: f32,
    report: &mut TickReport,
) {
    let Some(ship) = registry.ship_mut(id) else {
        return;
    };
    ship.cycle_progress += dt;
    ship.task_elapsed += dt;
    if ship.cycle_progress < HUNT_CYCLE_SECONDS {
        return;
    }
    ship.cycle_progress -= HUNT_CYCLE_SECONDS;

    resolve_hunt(registry, id, ctx, rng, report);

    if let Some(ship) = registry.ship_mut(id) {
        if ship.state == AiState::Ratting && ship.task_elapsed >= HUNT_SHIFT_SECONDS {
            ship.enter(AiState::Returning);
        }
    }
}

fn resolve_hunt(
    registry: &mut ShipRegistry,
    id: ShipId,
    ctx: &mut SimContext,
    rng: &mut impl Rng,
    report: &mut TickReport,
) {
    let Some((faction, sector)) = registry.ship(id).map(|s| (s.faction.clone(), s.sector)) else {
        return;
    };

    let prey = registry.ids_in_sector(sector).into_iter().find(|other| {
        *other != id
            && registry
                .ship(*other)
                .is_some_and(|ship| ctx.factions.are_hostile(&faction, &ship.faction))
    });

    if let Some(prey) = prey {
        let Some(prey_role) = registry.ship(prey).map(|ship| ship.role) else {
            return;
        };
        if rng.gen::<f32>() < hostile_kill_chance(prey_role) {
            let Some(victim) = retire(registry, prey, ctx, report) else {
                return;
            };
            ctx.factions.credit(&faction, HOSTILE_BOUNTY);
            let Some(ship) = registry.ship_mut(id) else {
                return;
            };
            ship.stats.kills += 1;
            ship.stats.credits_earned += HOSTILE_BOUNTY;
            info!("{} destroyed raider {} in sector {}", ship.name, victim.name, sector);
            ctx.raids.push(RaidEvent {
                kind: RaidEventKind::Defended,
                at: ctx.now,
                actor: victim.name,
                actor_faction: victim.faction,
                target: ship.name.clone(),
                target_faction: Some(faction),
                sector,
                value: HOSTILE_BOUNTY,
            });
        } else {
            take_hit(registry, id, ctx, rng, report);
        }
        return;
    }

    let difficulty = ctx.graph.difficulty(sector);
    let win_chance = (0.85 - 0.4 * difficulty).clamp(0.3, 0.95);
    if rng.gen::<f32>() < win_chance {
        let bounty = (BOUNTY_BASE + rng.gen_range(0.0..BOUNTY_SPAN)) * (1.0 + f64::from(difficulty));
        ctx.factions.credit(&faction, bounty);
        if let Some(ship) = registry.ship_mut(id) {
            ship.stats.kills += 1;
            ship.stats.credits_earned += bounty;
        }
    } else {
        take_hit(registry, id, ctx, rng, report);
    }
}

fn hostile_kill_chance(role: ShipRole) -> f32 {
    match role {
        ShipRole::Bomber => 0.35,
        ShipRole::Raider => 0.5,
        _ => 0.6,
    }
}

fn raid(
    registry: &mut ShipRegistry,
    id: ShipId,
    ctx: &mut SimContext,
    rng: &mut impl Rng,
    dt: f32,
    report: &mut TickReport,
) {
    let Some(faction) = registry.ship(id).map(|ship| ship.faction.clone()) else {
        return;
    };
    let Some(ship) = registry.ship_mut(id) else {
        return;
    };
    if !ctx.factions.is_hostile(&faction) {
        ship.go_idle();
        return;
    }

    ship.cycle_progress += dt;
    ship.task_elapsed += dt;
    if ship.cycle_progress < RAID_CYCLE_SECONDS {
        return;
    }
    ship.cycle_progress -= RAID_CYCLE_SECONDS;

    resolve_raid(registry, id, ctx, rng, report);

    if let Some(ship) = registry.ship_mut(id) {
        if ship.state == AiState::Raiding && ship.task_elapsed >= RAID_SHIFT_SECONDS {
            ship.enter(AiState::Returning);
        }
    }
}

fn resolve_raid(
    registry: &mut ShipRegistry,
    id: ShipId,
    ctx: &mut SimContext,
    rng: &mut impl Rng,
    report: &mut TickReport,
) {
    let Some(raider) = registry.ship(id) else {
        return;
    };
    let faction = raider.faction.clone();
    let sector = raider.sector;
    let ambush = raider.role == ShipRole::Bomber
        || raider.task.as_ref().is_some_and(|task| task.kind == TaskKind::Ambush);

    let Some(target) = pick_raid_victim(registry, id, ctx.factions, rng) else {
        if let Some(ship) = registry.ship_mut(id) {
            ship.go_idle();
        }
        return;
    };
    let Some(soft) = registry.ship(target).map(|ship| ship.role.is_soft_target()) else {
        return;
    };

    let mut kill_chance: f32 = if soft { 0.45 } else { 0.2 };
    if ambush {
        kill_chance += AMBUSH_KILL_BONUS;
    }
    if rng.gen::<f32>() < kill_chance {
        let loot = registry
            .ship(target)
            .map_or(0.0, |ship| cargo_value(ship, ctx.markets));
        let Some(victim) = retire(registry, target, ctx, report) else {
            return;
        };
        ctx.factions.credit(&faction, loot);
        let Some(ship) = registry.ship_mut(id) else {
            return;
        };
        ship.stats.kills += 1;
        ship.stats.credits_earned += loot;
        info!("{} destroyed {} in sector {}", ship.name, victim.name, sector);
        ctx.raids.push(RaidEvent {
            kind: RaidEventKind::Kill,
            at: ctx.now,
            actor: ship.name.clone(),
            actor_faction: faction,
            target: victim.name,
            target_faction: Some(victim.faction),
            sector,
            value: loot,
        });
        return;
    }

    let plunder_chance = if soft { 0.6 } else { 0.3 };
    if rng.gen::<f32>() < plunder_chance {
        let fraction = rng.gen_range(PLUNDER_MIN..PLUNDER_MAX);
        let taken = registry.ship_mut(target).map(|victim| {
            let ore = victim.cargo.take_ore_fraction(fraction);
            let goods = victim.cargo.take_goods_fraction(fraction);
            (ore, goods, victim.name.clone(), victim.faction.clone())
        });
        if let Some((ore, goods, victim_name, victim_faction)) = taken {
            let value = ore
                + goods
                    .iter()
                    .map(|(good, quantity)| ctx.markets.base_value(good, *quantity))
                    .sum::<f64>();
            if value > 0.0 {
                ctx.factions.credit(&faction, value);
                if let Some(ship) = registry.ship_mut(id) {
                    ship.stats.credits_earned += value;
                    ctx.raids.push(RaidEvent {
                        kind: RaidEventKind::Plunder,
                        at: ctx.now,
                        actor: ship.name.clone(),
                        actor_faction: faction.clone(),
                        target: victim_name,
                        target_faction: Some(victim_faction),
                        sector,
                        value,
                    });
                }
            }
        }
    }

    let retaliation_chance = if soft { 0.25 } else { 0.55 };
    if rng.gen::<f32>() < retaliation_chance {
        let defender = registry
            .ship(target)
            .map(|ship| (ship.name.clone(), ship.faction.clone()));
        let raider_name = registry.ship(id).map(|ship| ship.name.clone());
        if let (Some((name, defender_faction)), Some(raider_name)) = (defender, raider_name) {
            ctx.raids.push(RaidEvent {
                kind: RaidEventKind::Defended,
                at: ctx.now,
                actor: raider_name,
                actor_faction: faction,
                target: name,
                target_faction: Some(defender_faction),
                sector,
                value: 0.0,
            });
        }
        take_hit(registry, id, ctx, rng, report);
    }
}

/// Weighted pick among co-located non-hostile ships. Miners and haulers weigh more.
pub fn pick_raid_victim(
    registry: &ShipRegistry,
    raider: ShipId,
    factions: &FactionRegistry,
    rng: &mut impl Rng,
) -> Option<ShipId> {
    let sector = registry.ship(raider)?.sector;
    let candidates: Vec<(ShipId, u32)> = registry
        .ids_in_sector(sector)
        .into_iter()
        .filter(|id| *id != raider)
        .filter_map(|id| {
            let ship = registry.ship(id)?;
            if factions.is_hostile(&ship.faction) {
                return None;
            }
            let weight = if ship.role.is_soft_target() {
                SOFT_TARGET_WEIGHT
            } else {
                HARD_TARGET_WEIGHT
            };
            Some((id, weight))
        })
        .collect();

    candidates
        .choose_weighted(rng, |(_, weight)| *weight)
        .ok()
        .map(|(id, _)| *id)
}

fn cargo_value(ship: &Ship, markets: &StationMarkets) -> f64 {
    let goods: f64 = ship
        .cargo
        .goods
        .iter()
        .map(|(good, lot)| markets.base_value(good, lot.quantity))
        .sum();
    ship.cargo.ore_value() + goods
}

/// Randomized combat damage. Kills or sends the ship fleeing as needed.
fn take_hit(
    registry: &mut ShipRegistry,
    id: ShipId,
    ctx: &mut SimContext,
    rng: &mut impl Rng,
    report: &mut TickReport,
) {
    let Some(ship) = registry.ship_mut(id) else {
        return;
    };
    let damage = ship.defense.hull_max * rng.gen_range(DAMAGE_MIN..DAMAGE_MAX);
    ship.defense.apply_damage(damage);

    if ship.defense.is_destroyed() {
        retire(registry, id, ctx, report);
    } else if ship.defense.hull_fraction() < LOW_HEALTH {
        debug!("{} breaking off at {:.0}% hull", ship.name, ship.defense.hull_fraction() * 100.0);
        ship.enter(AiState::Fleeing);
    }
}

/// Removes a dead ship from the registry and books the loss.
fn retire(
    registry: &mut ShipRegistry,
    id: ShipId,
    ctx: &mut SimContext,
    report: &mut TickReport,
) -> Option<DestroyedShip> {
    let entry = registry.remove(id)?;
    ctx.factions.record_loss(&entry.ship.faction);
    warn!(
        "{} ({}) destroyed in {}",
        entry.ship.name,
        entry.ship.faction,
        ctx.graph.name(entry.ship.sector)
    );
    let destroyed = DestroyedShip {
        id,
        name: entry.ship.name.clone(),
        faction: entry.ship.faction.clone(),
        sector: entry.ship.sector,
        entity: entry.entity(),
    };
    report.destroyed.push(destroyed.clone());
    Some(destroyed)
}

// =============================================================================
// Support states
// =============================================================================

fn flee(ship: &mut Ship, ctx: &SimContext) {
    let base = ctx
        .factions
        .config(&ship.faction)
        .and_then(|config| config.base_sector());
    if let Some(base) = base {
        if ship.sector != base && start_travel(ship, ctx.graph, base, TravelPurpose::Flee) {
            return;
        }
    }
    ship.defense.restore_all();
    ship.go_idle();
}

fn survey(ship: &mut Ship, dt: f32, report: &mut TickReport) {
    ship.task_elapsed += dt;
    if ship.task_elapsed >= SURVEY_SECONDS {
        report.surveyed.push((ship.id, ship.sector));
        ship.go_idle();
    }
}

fn repair(registry: &mut ShipRegistry, id: ShipId, dt: f32) {
    let Some(ship) = registry.ship_mut(id) else {
        return;
    };
    ship.task_elapsed += dt;
    ship.cycle_progress += dt;

    let mut pulses = 0;
    while ship.cycle_progress >= REPAIR_PULSE_SECONDS {
        ship.cycle_progress -= REPAIR_PULSE_SECONDS;
        pulses += 1;
    }
    let done = ship.task_elapsed >= REPAIR_SECONDS;
    let faction = ship.faction.clone();
    let sector = ship.sector;

    if pulses > 0 {
        for other in registry.ids_in_sector(sector) {
            if let Some(patient) = registry.ship_mut(other) {
                if patient.faction == faction {
                    for _ in 0..pulses {
                        patient.defense.restore_fraction(REPAIR_FRACTION);
                    }
                }
            }
        }
    }

    if done {
        if let Some(ship) = registry.ship_mut(id) {
            ship.go_idle();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
