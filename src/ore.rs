use rand::Rng;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum OreKind {
    #[default]
    CommonOre,
    FuelOre,
    Silicates,
    RareMetals,
}

impl OreKind {
    pub const ALL: [OreKind; 4] = [
        OreKind::CommonOre,
        OreKind::FuelOre,
        OreKind::Silicates,
        OreKind::RareMetals,
    ];

    /// Credits paid per unit at a home station.
    pub fn unit_value(self) -> f64 {
        match self {
            OreKind::CommonOre => 12.0,
            OreKind::FuelOre => 18.0,
            OreKind::Silicates => 25.0,
            OreKind::RareMetals => 60.0,
        }
    }

    /// Cargo volume per unit.
    pub fn unit_volume(self) -> f32 {
        match self {
            OreKind::CommonOre => 1.0,
            OreKind::FuelOre => 1.0,
            OreKind::Silicates => 1.5,
            OreKind::RareMetals => 2.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OreKind::CommonOre => "Common Ore",
            OreKind::FuelOre => "Fuel Ore",
            OreKind::Silicates => "Silicates",
            OreKind::RareMetals => "Rare Metals",
        }
    }
}

pub const MINING_YIELD_MIN: u32 = 20;
pub const MINING_YIELD_MAX: u32 = 50;

/// One mining cycle's haul: a uniform ore type and unit count.
pub fn roll_yield(rng: &mut impl Rng) -> (OreKind, u32) {
    let kind = OreKind::ALL[rng.gen_range(0..OreKind::ALL.len())];
    let units = rng.gen_range(MINING_YIELD_MIN..=MINING_YIELD_MAX);
    (kind, units)
}

#[cfg(test)]
mod tests {
    use super::{roll_yield, OreKind, MINING_YIELD_MAX, MINING_YIELD_MIN};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ore_kind_default_is_common_ore() {
        assert_eq!(OreKind::default(), OreKind::CommonOre);
    }

    #[test]
    fn roll_yield_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let (kind, units) = roll_yield(&mut rng);
            assert!(OreKind::ALL.contains(&kind));
            assert!((MINING_YIELD_MIN..=MINING_YIELD_MAX).contains(&units));
        }
    }

    #[test]
    fn roll_yield_covers_every_kind() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(roll_yield(&mut rng).0);
        }
        assert_eq!(seen.len(), OreKind::ALL.len());
    }

    #[test]
    fn rarer_ore_is_worth_more() {
        assert!(OreKind::RareMetals.unit_value() > OreKind::CommonOre.unit_value());
    }
}
