//! The shared map: named zones and room-membership lookup

/// An axis-aligned zone on the map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub id: &'static str,
    pub name: &'static str,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Zone {
    /// Edges are inclusive
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

pub const ZONES: [Zone; 5] = [
    Zone {
        id: "cafeteria",
        name: "Cafeteria",
        x: 100.0,
        y: 100.0,
        width: 120.0,
        height: 80.0,
    },
    Zone {
        id: "medbay",
        name: "Medbay",
        x: 400.0,
        y: 100.0,
        width: 120.0,
        height: 80.0,
    },
    Zone {
        id: "electrical",
        name: "Electrical",
        x: 100.0,
        y: 400.0,
        width: 120.0,
        height: 80.0,
    },
    Zone {
        id: "reactor",
        name: "Reactor",
        x: 400.0,
        y: 400.0,
        width: 120.0,
        height: 80.0,
    },
    Zone {
        id: "central",
        name: "Central Hub",
        x: 225.0,
        y: 225.0,
        width: 150.0,
        height: 100.0,
    },
];

/// First zone containing the point, if any
pub fn zone_at(x: f64, y: f64) -> Option<&'static Zone> {
    ZONES.iter().find(|zone| zone.contains(x, y))
}

/// Zone label for a position. Outside every zone the previous label is kept.
pub fn resolve_zone(x: f64, y: f64, fallback: &str) -> String {
    zone_at(x, y)
        .map(|zone| zone.id.to_string())
        .unwrap_or_else(|| fallback.to_string())
}
