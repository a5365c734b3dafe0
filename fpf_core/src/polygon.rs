//! Rings, ring sets and the fixed-point grid shared by the VO builder,
//! the clipping engine and the metric calculator.
//!
//! Orientation convention in velocity space (x = east, y = north):
//! exterior rings counter-clockwise (positive signed area), holes clockwise.

use geo::{Coord, LineString, MultiPolygon, Polygon};

/// A closed ring of `[east, north]` vertices. The closing edge is implicit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ring {
    pub points: Vec<[f64; 2]>,
}

impl Ring {
    pub fn new(points: Vec<[f64; 2]>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point reflection through the origin.
    pub fn reflected(&self) -> Ring {
        Ring::new(self.points.iter().map(|p| [-p[0], -p[1]]).collect())
    }

    /// Same vertices in opposite winding.
    pub fn reversed(&self) -> Ring {
        let mut points = self.points.clone();
        points.reverse();
        Ring::new(points)
    }

    /// Translation by `[dx, dy]`.
    pub fn translated(&self, offset: [f64; 2]) -> Ring {
        Ring::new(
            self.points
                .iter()
                .map(|p| [p[0] + offset[0], p[1] + offset[1]])
                .collect(),
        )
    }

    pub fn is_finite(&self) -> bool {
        self.points.iter().all(|p| p[0].is_finite() && p[1].is_finite())
    }
}

/// Canonical result shape of every clipping operation: a list of rings,
/// possibly empty, possibly of length one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RingSet {
    pub rings: Vec<Ring>,
}

impl RingSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(rings: Vec<Ring>) -> Self {
        Self { rings }
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter()
    }
}

/// Integer grid that velocity-space coordinates are snapped to before any
/// boolean operation, and on which areas are integrated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPoint {
    scale: f64,
}

impl FixedPoint {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    pub fn to_fixed(&self, v: f64) -> i64 {
        (v * self.scale).round() as i64
    }

    pub fn from_fixed(&self, v: i64) -> f64 {
        v as f64 / self.scale
    }

    /// Snaps a ring onto the grid.
    pub fn quantize(&self, ring: &Ring) -> Vec<[i64; 2]> {
        ring.points
            .iter()
            .map(|p| [self.to_fixed(p[0]), self.to_fixed(p[1])])
            .collect()
    }

    /// Twice the signed shoelace area of a grid ring, exact in i128.
    pub fn doubled_area(points: &[[i64; 2]]) -> i128 {
        let n = points.len();
        if n < 3 {
            return 0;
        }
        (0..n)
            .map(|k| {
                let [x0, y0] = points[k];
                let [x1, y1] = points[(k + 1) % n];
                x0 as i128 * y1 as i128 - x1 as i128 * y0 as i128
            })
            .sum()
    }

    /// Signed area of a ring (positive when counter-clockwise), integrated on
    /// the grid and scaled back to (m/s)².
    pub fn signed_area(&self, ring: &Ring) -> f64 {
        Self::doubled_area(&self.quantize(ring)) as f64 / (2.0 * self.scale * self.scale)
    }

    /// Area of a ring set: the sum of signed ring areas, so clockwise holes subtract.
    pub fn area(&self, set: &RingSet) -> f64 {
        set.iter().map(|ring| self.signed_area(ring)).sum()
    }

    /// Ring in grid space as a geo line string, for the boolean-ops sweep.
    pub(crate) fn to_geo(&self, ring: &Ring) -> LineString<f64> {
        self.quantize(ring)
            .into_iter()
            .map(|[x, y]| Coord { x: x as f64, y: y as f64 })
            .collect::<Vec<_>>()
            .into()
    }

    /// Grid-space line string back to a velocity-space ring (closing vertex dropped).
    pub(crate) fn from_geo(&self, ls: &LineString<f64>) -> Ring {
        let mut points: Vec<[f64; 2]> = ls
            .coords()
            .map(|c| [self.from_fixed(c.x.round() as i64), self.from_fixed(c.y.round() as i64)])
            .collect();
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Ring::new(points)
    }

    /// Flattens a sweep result into a ring set, exteriors then their holes.
    /// Input polygons are expected to be oriented already.
    pub(crate) fn ring_set(&self, mp: &MultiPolygon<f64>) -> RingSet {
        let mut rings = Vec::new();
        for poly in mp.iter() {
            rings.push(self.from_geo(poly.exterior()));
            rings.extend(poly.interiors().iter().map(|hole| self.from_geo(hole)));
        }
        RingSet::new(rings.into_iter().filter(|r| r.len() >= 3).collect())
    }

    /// A single grid-space polygon without holes.
    pub(crate) fn polygon(&self, ring: &Ring) -> Polygon<f64> {
        Polygon::new(self.to_geo(ring), vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Ring {
        Ring::new(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]])
    }

    #[test]
    fn test_signed_area_follows_winding() {
        let fixed = FixedPoint::new(2f64.powi(31));
        assert_relative_eq!(fixed.signed_area(&unit_square()), 1.0, epsilon = 1e-12);
        assert_relative_eq!(fixed.signed_area(&unit_square().reversed()), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_holes_subtract() {
        let fixed = FixedPoint::new(1e6);
        let outer = Ring::new(vec![[-2.0, -2.0], [2.0, -2.0], [2.0, 2.0], [-2.0, 2.0]]);
        let hole = unit_square().reversed();

        let set = RingSet::new(vec![outer, hole]);
        assert_relative_eq!(fixed.area(&set), 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_large_coordinates_do_not_overflow() {
        let fixed = FixedPoint::new(2f64.powi(31));
        let big = Ring::new(vec![[-900.0, -900.0], [900.0, -900.0], [900.0, 900.0], [-900.0, 900.0]]);
        assert_relative_eq!(fixed.signed_area(&big), 1800.0 * 1800.0, max_relative = 1e-12);
    }

    #[test]
    fn test_degenerate_ring_has_no_area() {
        assert_eq!(FixedPoint::doubled_area(&[[0, 0], [5, 5]]), 0);
        assert_eq!(FixedPoint::doubled_area(&[[0, 0], [1, 1], [2, 2]]), 0);
    }

    #[test]
    fn test_geo_roundtrip_drops_closing_vertex() {
        let fixed = FixedPoint::new(1024.0);
        let ring = Ring::new(vec![[0.5, 0.25], [1.0, 0.0], [0.0, 1.0]]);
        let back = fixed.from_geo(&fixed.to_geo(&ring));
        assert_eq!(back, ring);
    }

    #[test]
    fn test_reflection() {
        let ring = Ring::new(vec![[1.0, 2.0], [-3.0, 4.0]]);
        assert_eq!(ring.reflected().points, vec![[-1.0, -2.0], [3.0, -4.0]]);
        assert_eq!(ring.translated([1.0, 1.0]).points, vec![[2.0, 3.0], [-2.0, 5.0]]);
    }
}
