//! Station market systems.

use bevy::prelude::*;

use crate::stations::{StationMarkets, RESTOCK_FRACTION};

// =============================================================================
// Systems
// =============================================================================

pub fn restock_markets(mut markets: ResMut<StationMarkets>) {
    markets.restock(RESTOCK_FRACTION);
}
