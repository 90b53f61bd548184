//! Real Las Vegas / Henderson locations for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap.

use fleet_planner::models::Location;

/// A named point.
#[derive(Debug, Clone, Copy)]
pub struct Place {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Place {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lng).with_address(self.name)
    }
}

// ============================================================================
// Depots (vehicle start positions)
// ============================================================================

pub const DEPOTS: &[Place] = &[
    Place::new("Wynn Las Vegas", 36.1263781, -115.1658180),
    Place::new("MGM Grand", 36.1023654, -115.1688720),
    Place::new("Longhorn Casino", 36.1070664, -115.0591256),
];

// ============================================================================
// Pickups (Strip restaurants)
// ============================================================================

pub const PICKUPS: &[Place] = &[
    Place::new("Hard Rock Cafe", 36.1041592, -115.1722166),
    Place::new("SW Steakhouse", 36.1262145, -115.1669146),
    Place::new("Public House", 36.1219193, -115.1689317),
    Place::new("Brooklyn Bowl", 36.1175388, -115.1695094),
    Place::new("Gordon Ramsay BurGR", 36.1107195, -115.1720818),
    Place::new("Spago by Wolfgang Puck", 36.1139368, -115.1741462),
    Place::new("Grand Lux Cafe", 36.1216416, -115.1685024),
    Place::new("Bacchanal Buffet", 36.1159581, -115.1762929),
];

// ============================================================================
// Deliveries (Henderson, North and South)
// ============================================================================

pub const DELIVERIES: &[Place] = &[
    Place::new("Green Valley Ranch Area", 36.0308, -115.0825),
    Place::new("Sunset Station Area", 36.0614, -115.0631),
    Place::new("Islander's Grill", 36.0335058, -114.9856162),
    Place::new("Monarca Mexican Restaurant", 36.1440711, -115.0634197),
    Place::new("Beers and Bets", 36.1428945, -115.1573836),
    Place::new("Bootlegger Bistro", 36.0492047, -115.1715744),
    Place::new("Mikos Izakaya", 36.0429503, -115.1527627),
    Place::new("Budget Suites South", 36.0366259, -115.1713361),
];
