//! Periodic faction decisions: task assignment for idle ships and fleet replacement.

use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::behavior::begin_task;
use crate::factions::{FactionConfig, FactionId, FactionRegistry};
use crate::fleets::commission_ship;
use crate::registry::ShipRegistry;
use crate::ships::{HaulOrder, HaulStage, Ship, ShipClasses, ShipId, ShipRole, Task, TaskKind};
use crate::stations::{affordable_quantity, StationMarkets};
use crate::world::{SectorGraph, SectorId};

/// Treasury a faction keeps after buying a replacement hull.
pub const REPLACEMENT_RESERVE: f64 = 5_000.0;
/// Roles below this share of their starting count get replaced (70%, as tenths).
const REPLACEMENT_THRESHOLD_TENTHS: u32 = 7;

pub struct AiContext<'a> {
    pub graph: &'a SectorGraph,
    pub factions: &'a mut FactionRegistry,
    pub markets: &'a StationMarkets,
    pub classes: &'a ShipClasses,
    pub now: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AiReport {
    pub assigned: Vec<(ShipId, TaskKind)>,
    pub commissioned: Vec<ShipId>,
}

/// One faction-AI cycle for every faction, in id order.
pub fn run_faction_ai(
    registry: &mut ShipRegistry,
    ctx: &mut AiContext,
    rng: &mut impl Rng,
) -> AiReport {
    let mut report = AiReport::default();

    for faction in ctx.factions.ids() {
        if let Some(entry) = ctx.factions.get_mut(&faction) {
            entry.ledger.refresh_rates(ctx.now);
        }
        assign_idle_ships(registry, ctx, &faction, rng, &mut report);
        replace_losses(registry, ctx, &faction, rng, &mut report);
    }

    report
}

fn assign_idle_ships(
    registry: &mut ShipRegistry,
    ctx: &AiContext,
    faction: &FactionId,
    rng: &mut impl Rng,
    report: &mut AiReport,
) {
    let Some(config) = ctx.factions.config(faction) else {
        return;
    };
    let treasury = ctx.factions.treasury(faction);

    for id in registry.idle_ids(faction) {
        let Some(ship) = registry.ship_mut(id) else {
            continue;
        };
        let Some(task) = plan_task(ship, config, ctx, treasury, rng) else {
            continue;
        };
        debug!(
            "{} tasked {:?} toward sector {}",
            ship.name, task.kind, task.target
        );
        report.assigned.push((id, task.kind));
        begin_task(ship, task, ctx.graph);
    }
}

/// Role-specific task for an idle ship, or `None` to leave it idle.
pub fn plan_task(
    ship: &Ship,
    config: &FactionConfig,
    ctx: &AiContext,
    treasury: f64,
    rng: &mut impl Rng,
) -> Option<Task> {
    match ship.role {
        ShipRole::Miner => pick_sector(config, ShipRole::Miner, ctx.graph, rng)
            .map(|sector| Task::new(TaskKind::Mine, sector)),
        ShipRole::Hauler => plan_haul(ship, config, ctx, treasury),
        ShipRole::Ratter => pick_sector(config, ShipRole::Ratter, ctx.graph, rng)
            .map(|sector| Task::new(TaskKind::Hunt, sector)),
        // Hostile raiders wait for the raid planner to group them.
        ShipRole::Raider => None,
        ShipRole::Bomber => pick_sector(config, ShipRole::Bomber, ctx.graph, rng)
            .map(|sector| Task::new(TaskKind::Ambush, sector)),
        ShipRole::Surveyor => pick_sector(config, ShipRole::Surveyor, ctx.graph, rng)
            .map(|sector| Task::new(TaskKind::Survey, sector)),
        ShipRole::Logistics => pick_sector(config, ShipRole::Logistics, ctx.graph, rng)
            .map(|sector| Task::new(TaskKind::Support, sector)),
    }
}

/// Random preferred sector for the role, skipping avoided and unknown sectors.
/// Falls back to the faction's base sector.
pub fn pick_sector(
    config: &FactionConfig,
    role: ShipRole,
    graph: &SectorGraph,
    rng: &mut impl Rng,
) -> Option<SectorId> {
    let candidates: Vec<SectorId> = config
        .preferred
        .for_role(role)
        .iter()
        .copied()
        .filter(|sector| graph.contains(*sector) && !config.avoids(*sector))
        .collect();

    candidates
        .choose(rng)
        .copied()
        .or_else(|| config.base_sector())
}

fn plan_haul(ship: &Ship, config: &FactionConfig, ctx: &AiContext, treasury: f64) -> Option<Task> {
    let mut sectors: Vec<SectorId> = config
        .preferred
        .trade
        .iter()
        .copied()
        .filter(|sector| !config.avoids(*sector))
        .collect();
    if sectors.is_empty() {
        sectors.extend(config.base_sector());
    }

    let route = ctx.markets.best_route(&sectors)?;
    let stock = ctx.markets.listing(route.source, &route.good)?.stock;
    let unit_volume = ctx
        .markets
        .good(&route.good)
        .map_or(1.0, |good| good.unit_volume);
    let quantity = affordable_quantity(
        treasury,
        route.buy_price,
        stock,
        ship.cargo.free_space(),
        unit_volume,
    );
    if quantity == 0 {
        return None;
    }

    Some(Task::haul(HaulOrder {
        good: route.good,
        source: route.source,
        destination: route.destination,
        quantity,
        stage: HaulStage::Pickup,
        paid: 0.0,
    }))
}

/// True when `count` is under 70% of `target`.
pub fn below_replacement_threshold(count: u32, target: u32) -> bool {
    u64::from(count) * 10 < u64::from(target) * u64::from(REPLACEMENT_THRESHOLD_TENTHS)
}

/// Buys one hull per under-strength role, highest AI priority first, while the
/// treasury stays above the reserve.
fn replace_losses(
    registry: &mut ShipRegistry,
    ctx: &mut AiContext,
    faction: &FactionId,
    rng: &mut impl Rng,
    report: &mut AiReport,
) {
    let Some(config) = ctx.factions.config(faction) else {
        return;
    };
    let counts = registry.count_by_role(faction);

    let mut shortfall: Vec<(ShipRole, f32, f64)> = config
        .starting_composition
        .iter()
        .filter(|(role, target)| {
            below_replacement_threshold(counts.get(*role).copied().unwrap_or(0), **target)
        })
        .filter_map(|(role, _)| {
            let cost = config.replacement_costs.get(role).copied()?;
            Some((*role, config.priority(*role), cost))
        })
        .collect();
    shortfall.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (role, _, cost) in shortfall {
        let affordable = ctx
            .factions
            .get(faction)
            .is_some_and(|entry| entry.ledger.can_afford(cost, REPLACEMENT_RESERVE));
        if !affordable {
            debug!("{} cannot afford a {} ({:.0} cr)", faction, role.label(), cost);
            continue;
        }

        let Some(id) = commission_ship(
            registry,
            ctx.factions,
            ctx.classes,
            ctx.graph,
            faction,
            role,
            rng,
        ) else {
            continue;
        };
        ctx.factions.debit(faction, cost);
        info!("{} commissioned replacement {} {}", faction, role.label(), id);
        report.commissioned.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factions::tests::config;
    use crate::registry::tests::{test_class, test_ship};
    use crate::ships::AiState;
    use crate::stations::{Listing, Market, TradeGood};
    use crate::world::{Gate, SectorInfo};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn graph() -> SectorGraph {
        let sectors = (1..=9)
            .map(|id| SectorInfo {
                id,
                name: format!("S{}", id),
                security: 0.5,
                radius: 300.0,
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

    fn listing(stock: u32, sell: f64, buy: f64) -> Listing {
        Listing {
            stock,
            baseline_stock: stock,
            sell_price: sell,
            buy_price: buy,
        }
    }

    fn market(sector: SectorId, good: &str, listing: Listing) -> Market {
        Market {
            station: format!("Station-{}", sector),
            sector,
            listings: [(good.to_string(), listing)].into(),
        }
    }

    fn markets() -> StationMarkets {
        StationMarkets::new(
            vec![
                market(2, "ore", listing(100, 10.0, 8.0)),
                market(3, "ore", listing(10, 20.0, 15.0)),
                market(4, "ice", listing(100, 10.0, 8.0)),
                market(5, "ice", listing(10, 20.0, 12.0)),
            ],
            vec![
                TradeGood {
                    id: "ore".to_string(),
                    name: "Ore".to_string(),
                    unit_volume: 1.0,
                    base_price: 10.0,
                },
                TradeGood {
                    id: "ice".to_string(),
                    name: "Ice".to_string(),
                    unit_volume: 1.0,
                    base_price: 10.0,
                },
            ],
        )
    }

    fn miners_config(composition: u32, treasury: f64) -> FactionConfig {
        let mut config = config("miners", false);
        config.starting_composition = BTreeMap::from([(ShipRole::Miner, composition)]);
        config.replacement_costs = BTreeMap::from([(ShipRole::Miner, 1_000.0)]);
        config.starting_treasury = treasury;
        config.preferred.mining = vec![3];
        config.preferred.trade = vec![2, 3, 4, 5];
        config
    }

    fn fill_miners(registry: &mut ShipRegistry, count: u64) {
        for id in 1..=count {
            let mut ship = test_ship(id, "miners", ShipRole::Miner, 1);
            ship.state = AiState::Mining;
            registry.insert(ship);
        }
    }

    fn run(
        registry: &mut ShipRegistry,
        factions: &mut FactionRegistry,
        markets: &StationMarkets,
        seed: u64,
    ) -> AiReport {
        let graph = graph();
        let classes = ShipClasses::new([test_class()]);
        let mut ctx = AiContext {
            graph: &graph,
            factions,
            markets,
            classes: &classes,
            now: 60.0,
        };
        let mut rng = StdRng::seed_from_u64(seed);
        run_faction_ai(registry, &mut ctx, &mut rng)
    }

    #[test]
    fn threshold_boundary_is_seventy_percent() {
        assert!(below_replacement_threshold(69, 100));
        assert!(!below_replacement_threshold(70, 100));
        assert!(below_replacement_threshold(6, 10));
        assert!(!below_replacement_threshold(7, 10));
        assert!(!below_replacement_threshold(0, 0));
    }

    #[test]
    fn replacement_at_sixty_nine_percent_buys_one() {
        let mut factions = FactionRegistry::from_configs([miners_config(100, 50_000.0)], 0.0);
        let mut registry = ShipRegistry::default();
        fill_miners(&mut registry, 69);

        let report = run(&mut registry, &mut factions, &markets(), 1);

        assert_eq!(report.commissioned.len(), 1);
        assert_eq!(registry.len(), 70);
        assert_eq!(factions.treasury(&FactionId::from("miners")), 49_000.0);
    }

    #[test]
    fn replacement_at_seventy_percent_buys_nothing() {
        let mut factions = FactionRegistry::from_configs([miners_config(100, 50_000.0)], 0.0);
        let mut registry = ShipRegistry::default();
        fill_miners(&mut registry, 70);

        let report = run(&mut registry, &mut factions, &markets(), 1);

        assert!(report.commissioned.is_empty());
        assert_eq!(registry.len(), 70);
    }

    #[test]
    fn replacement_respects_reserve() {
        let mut factions = FactionRegistry::from_configs([miners_config(10, 5_500.0)], 0.0);
        let mut registry = ShipRegistry::default();

        let report = run(&mut registry, &mut factions, &markets(), 1);

        assert!(report.commissioned.is_empty());
        assert_eq!(factions.treasury(&FactionId::from("miners")), 5_500.0);
    }

    #[test]
    fn replacement_prefers_high_priority_roles() {
        let mut config = miners_config(10, 6_500.0);
        config.starting_composition.insert(ShipRole::Hauler, 10);
        config.replacement_costs.insert(ShipRole::Hauler, 1_000.0);
        config.ship_classes.insert(ShipRole::Hauler, "Prospector".to_string());
        config.priorities.insert(ShipRole::Hauler, 3.0);
        config.priorities.insert(ShipRole::Miner, 1.0);
        let mut factions = FactionRegistry::from_configs([config], 0.0);
        let mut registry = ShipRegistry::default();

        let report = run(&mut registry, &mut factions, &markets(), 1);

        assert_eq!(report.commissioned.len(), 1);
        let bought = registry.ship(report.commissioned[0]).unwrap();
        assert_eq!(bought.role, ShipRole::Hauler);
    }

    #[test]
    fn idle_miner_gets_mining_task() {
        let mut factions = FactionRegistry::from_configs([miners_config(1, 50_000.0)], 0.0);
        let mut registry = ShipRegistry::default();
        registry.insert(test_ship(1, "miners", ShipRole::Miner, 1));

        let report = run(&mut registry, &mut factions, &markets(), 1);

        assert_eq!(report.assigned, vec![(ShipId(1), TaskKind::Mine)]);
        let ship = registry.ship(ShipId(1)).unwrap();
        assert_eq!(ship.task.as_ref().map(|task| task.target), Some(3));
        assert_eq!(ship.state, AiState::Traveling);
    }

    #[test]
    fn idle_ship_at_target_starts_working() {
        let mut factions = FactionRegistry::from_configs([miners_config(1, 50_000.0)], 0.0);
        let mut registry = ShipRegistry::default();
        registry.insert(test_ship(1, "miners", ShipRole::Miner, 3));

        run(&mut registry, &mut factions, &markets(), 1);

        assert_eq!(registry.ship(ShipId(1)).unwrap().state, AiState::Mining);
    }

    #[test]
    fn hauler_picks_most_profitable_route() {
        let mut factions = FactionRegistry::from_configs([miners_config(0, 50_000.0)], 0.0);
        let mut registry = ShipRegistry::default();
        registry.insert(test_ship(1, "miners", ShipRole::Hauler, 2));

        run(&mut registry, &mut factions, &markets(), 1);

        let ship = registry.ship(ShipId(1)).unwrap();
        let order = ship.task.as_ref().and_then(|task| task.haul.clone()).unwrap();
        assert_eq!(order.good, "ore");
        assert_eq!((order.source, order.destination), (2, 3));
        assert_eq!(order.quantity, 100);
        assert_eq!(ship.state, AiState::TradingBuy);
    }

    #[test]
    fn avoided_sectors_are_never_targeted() {
        let mut config = miners_config(0, 50_000.0);
        config.preferred.mining = vec![3, 4];
        config.avoided = vec![3];
        let graph = graph();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert_eq!(pick_sector(&config, ShipRole::Miner, &graph, &mut rng), Some(4));
        }
    }

    #[test]
    fn empty_preferences_fall_back_to_home() {
        let config = miners_config(0, 50_000.0);
        let graph = graph();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(pick_sector(&config, ShipRole::Ratter, &graph, &mut rng), Some(1));
    }

    #[test]
    fn hostile_raiders_are_left_for_raid_planner() {
        let mut factions = FactionRegistry::from_configs([config("pirates", true)], 0.0);
        let mut registry = ShipRegistry::default();
        registry.insert(test_ship(1, "pirates", ShipRole::Raider, 9));

        let report = run(&mut registry, &mut factions, &markets(), 1);

        assert!(report.assigned.is_empty());
        assert!(registry.ship(ShipId(1)).unwrap().is_idle());
    }

    #[test]
    fn ai_refreshes_ledger_rates() {
        let mut factions = FactionRegistry::from_configs([miners_config(0, 50_000.0)], 0.0);
        factions.credit(&FactionId::from("miners"), 100.0);
        let mut registry = ShipRegistry::default();

        run(&mut registry, &mut factions, &markets(), 1);

        let ledger = &factions.get(&FactionId::from("miners")).unwrap().ledger;
        assert!((ledger.income_rate - 6_000.0).abs() < 1e-6);
    }
}
