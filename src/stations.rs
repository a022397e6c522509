use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::world::SectorId;

/// Fraction of the gap to baseline stock recovered per restock tick.
pub const RESTOCK_FRACTION: f32 = 0.1;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TradeGood {
    pub id: String,
    pub name: String,
    pub unit_volume: f32,
    pub base_price: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Listing {
    pub stock: u32,
    pub baseline_stock: u32,
    /// Price a ship pays the station.
    pub sell_price: f64,
    /// Price the station pays a ship.
    pub buy_price: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Market {
    pub station: String,
    pub sector: SectorId,
    pub listings: BTreeMap<String, Listing>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TradeRoute {
    pub good: String,
    pub source: SectorId,
    pub destination: SectorId,
    pub buy_price: f64,
    pub sell_price: f64,
}

impl TradeRoute {
    pub fn profit_per_unit(&self) -> f64 {
        self.sell_price - self.buy_price
    }
}

#[derive(Resource, Debug, Default, Clone)]
pub struct StationMarkets {
    markets: BTreeMap<SectorId, Market>,
    goods: BTreeMap<String, TradeGood>,
}

impl StationMarkets {
    pub fn new(markets: Vec<Market>, goods: Vec<TradeGood>) -> Self {
        Self {
            markets: markets
                .into_iter()
                .map(|market| (market.sector, market))
                .collect(),
            goods: goods.into_iter().map(|good| (good.id.clone(), good)).collect(),
        }
    }

    pub fn market(&self, sector: SectorId) -> Option<&Market> {
        self.markets.get(&sector)
    }

    pub fn listing_mut(&mut self, sector: SectorId, good: &str) -> Option<&mut Listing> {
        self.markets
            .get_mut(&sector)
            .and_then(|market| market.listings.get_mut(good))
    }

    pub fn listing(&self, sector: SectorId, good: &str) -> Option<&Listing> {
        self.market(sector)
            .and_then(|market| market.listings.get(good))
    }

    pub fn good(&self, id: &str) -> Option<&TradeGood> {
        self.goods.get(id)
    }

    /// Nominal value of goods, used when pricing plunder.
    pub fn base_value(&self, good: &str, quantity: u32) -> f64 {
        self.good(good)
            .map_or(0.0, |good| good.base_price * f64::from(quantity))
    }

    /// Single most profitable (good, source, destination) across `sectors`.
    ///
    /// Sources are scanned in the given sector order, then goods in id order, then
    /// destinations in sector order; the first strictly better profit wins.
    pub fn best_route(&self, sectors: &[SectorId]) -> Option<TradeRoute> {
        let mut best: Option<TradeRoute> = None;

        for source in sectors {
            let Some(source_market) = self.markets.get(source) else {
                continue;
            };
            for (good, offer) in &source_market.listings {
                if offer.stock == 0 {
                    continue;
                }
                for destination in sectors {
                    if destination == source {
                        continue;
                    }
                    let Some(bid) = self.listing(*destination, good) else {
                        continue;
                    };
                    let profit = bid.buy_price - offer.sell_price;
                    if profit <= 0.0 {
                        continue;
                    }
                    let better = best
                        .as_ref()
                        .map_or(true, |current| profit > current.profit_per_unit());
                    if better {
                        best = Some(TradeRoute {
                            good: good.clone(),
                            source: *source,
                            destination: *destination,
                            buy_price: offer.sell_price,
                            sell_price: bid.buy_price,
                        });
                    }
                }
            }
        }

        best
    }

    /// Moves every listing's stock toward its baseline.
    pub fn restock(&mut self, fraction: f32) {
        for market in self.markets.values_mut() {
            for listing in market.listings.values_mut() {
                listing.stock = restocked(listing.stock, listing.baseline_stock, fraction);
            }
        }
    }
}

pub fn restocked(stock: u32, baseline: u32, fraction: f32) -> u32 {
    if stock == baseline {
        return stock;
    }
    let gap = stock.abs_diff(baseline);
    let step = ((gap as f32) * fraction).ceil().max(1.0) as u32;
    let step = step.min(gap);
    if stock < baseline {
        stock + step
    } else {
        stock - step
    }
}

/// Units a buyer can take given treasury, station stock and free cargo volume.
pub fn affordable_quantity(
    treasury: f64,
    unit_price: f64,
    stock: u32,
    free_volume: f32,
    unit_volume: f32,
) -> u32 {
    if treasury <= 0.0 || unit_price <= 0.0 || stock == 0 || free_volume <= 0.0 {
        return 0;
    }
    let by_money = (treasury / unit_price).floor().min(f64::from(u32::MAX)) as u32;
    let by_volume = if unit_volume > 0.0 {
        (free_volume / unit_volume).floor() as u32
    } else {
        u32::MAX
    };
    stock.min(by_money).min(by_volume)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(stock: u32, sell: f64, buy: f64) -> Listing {
        Listing {
            stock,
            baseline_stock: stock,
            sell_price: sell,
            buy_price: buy,
        }
    }

    fn market(sector: SectorId, entries: &[(&str, Listing)]) -> Market {
        Market {
            station: format!("Station-{}", sector),
            sector,
            listings: entries
                .iter()
                .map(|(good, listing)| (good.to_string(), listing.clone()))
                .collect(),
        }
    }

    #[test]
    fn best_route_picks_highest_margin() {
        let markets = StationMarkets::new(
            vec![
                market(1, &[("ore", listing(100, 10.0, 8.0))]),
                market(2, &[("ore", listing(0, 20.0, 15.0))]),
                market(3, &[("ice", listing(100, 10.0, 8.0))]),
                market(4, &[("ice", listing(0, 20.0, 12.0))]),
            ],
            Vec::new(),
        );
        let route = markets.best_route(&[1, 2, 3, 4]).unwrap();
        assert_eq!(route.good, "ore");
        assert_eq!((route.source, route.destination), (1, 2));
        assert_eq!(route.profit_per_unit(), 5.0);
    }

    #[test]
    fn best_route_ignores_unprofitable_and_empty() {
        let markets = StationMarkets::new(
            vec![
                market(1, &[("ore", listing(0, 10.0, 8.0))]),
                market(2, &[("ore", listing(10, 20.0, 9.0))]),
            ],
            Vec::new(),
        );
        assert!(markets.best_route(&[1, 2]).is_none());
    }

    #[test]
    fn best_route_tie_keeps_first_found() {
        let markets = StationMarkets::new(
            vec![
                market(1, &[("ore", listing(10, 10.0, 8.0))]),
                market(2, &[("ore", listing(10, 10.0, 15.0))]),
                market(3, &[("ore", listing(10, 10.0, 15.0))]),
            ],
            Vec::new(),
        );
        let route = markets.best_route(&[1, 2, 3]).unwrap();
        assert_eq!((route.source, route.destination), (1, 2));
    }

    #[test]
    fn best_route_only_considers_listed_sectors() {
        let markets = StationMarkets::new(
            vec![
                market(1, &[("ore", listing(10, 10.0, 8.0))]),
                market(2, &[("ore", listing(10, 10.0, 50.0))]),
            ],
            Vec::new(),
        );
        assert!(markets.best_route(&[1]).is_none());
    }

    #[test]
    fn affordable_quantity_clamps_every_limit() {
        assert_eq!(affordable_quantity(100.0, 10.0, 50, 500.0, 1.0), 10);
        assert_eq!(affordable_quantity(10_000.0, 10.0, 5, 500.0, 1.0), 5);
        assert_eq!(affordable_quantity(10_000.0, 10.0, 50, 20.0, 4.0), 5);
        assert_eq!(affordable_quantity(-5.0, 10.0, 50, 20.0, 4.0), 0);
    }

    #[test]
    fn restocked_moves_toward_baseline() {
        assert_eq!(restocked(0, 100, 0.1), 10);
        assert_eq!(restocked(150, 100, 0.1), 145);
        assert_eq!(restocked(99, 100, 0.1), 100);
        assert_eq!(restocked(100, 100, 0.1), 100);
    }

    #[test]
    fn restock_applies_to_all_listings() {
        let mut markets = StationMarkets::new(
            vec![market(1, &[("ore", listing(100, 10.0, 8.0))])],
            Vec::new(),
        );
        if let Some(listing) = markets.listing_mut(1, "ore") {
            listing.stock = 0;
        }
        markets.restock(RESTOCK_FRACTION);
        assert_eq!(markets.listing(1, "ore").map(|l| l.stock), Some(10));
    }
}
