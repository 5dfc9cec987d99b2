//! # Primitives
//!
//! Identifiers, planar geometry and shared constants.
//!
//! All coordinates are projected metric coordinates. Nothing here reprojects.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Quarter-hour slots in one day.
pub const QUARTER_HOURS_PER_DAY: usize = 96;

/// Hours in a non-leap year.
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// Year used when no explicit profile period is requested.
pub const DEFAULT_PROFILE_YEAR: i32 = 2024;

/// Annual consumption every standard profile is normalised to (kWh).
pub const REFERENCE_CONSUMPTION_KWH: f64 = 1000.0;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Cadastral building identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(pub String);

impl BuildingId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BuildingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// A point in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in metres.
    #[must_use]
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// Orthogonal projection of `p` onto segment `a`–`b`, clamped to the segment.
///
/// Returns the projected point and its distance from `p`.
#[must_use]
pub fn project_onto_segment(p: &Point, a: &Point, b: &Point) -> (Point, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return (*a, p.distance(a));
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * dx, a.y + t * dy);
    (proj, p.distance(&proj))
}

/// Signed shoelace sum over a closed ring (first vertex not repeated).
fn shoelace(ring: &[Point]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

/// Drop a trailing vertex equal to the first one.
fn open_ring(polygon: &[Point]) -> &[Point] {
    match (polygon.first(), polygon.last()) {
        (Some(first), Some(last)) if polygon.len() > 1 && first == last => {
            &polygon[..polygon.len() - 1]
        }
        _ => polygon,
    }
}

/// Polygon area in m². Accepts open or closed rings.
#[must_use]
pub fn polygon_area(polygon: &[Point]) -> f64 {
    let ring = open_ring(polygon);
    if ring.len() < 3 {
        return 0.0;
    }
    shoelace(ring).abs()
}

/// Polygon perimeter in metres.
#[must_use]
pub fn polygon_perimeter(polygon: &[Point]) -> f64 {
    let ring = open_ring(polygon);
    if ring.len() < 2 {
        return 0.0;
    }
    let n = ring.len();
    (0..n).map(|i| ring[i].distance(&ring[(i + 1) % n])).sum()
}

/// Area-weighted centroid. Falls back to the vertex mean for degenerate rings.
#[must_use]
pub fn polygon_centroid(polygon: &[Point]) -> Option<Point> {
    let ring = open_ring(polygon);
    if ring.is_empty() {
        return None;
    }
    let signed = if ring.len() >= 3 { shoelace(ring) } else { 0.0 };
    if signed.abs() < f64::EPSILON {
        let n = ring.len() as f64;
        let (sx, sy) = ring
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        return Some(Point::new(sx / n, sy / n));
    }
    let n = ring.len();
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        let cross = a.x * b.y - b.x * a.y;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    Some(Point::new(cx / (6.0 * signed), cy / (6.0 * signed)))
}

// =============================================================================
// TESTS
// =============================================================================
