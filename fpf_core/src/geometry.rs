//! Geometry Kernel - pairwise bearing and distance for one traffic snapshot.
//!
//! Uses a flat-earth (equirectangular) approximation around the mean latitude
//! of each pair. Separation minima downstream were calibrated against this
//! approximation, so it is kept instead of full WGS-84 geodesics.
//!
//! Pairs are enumerated once per bucket as `(i, j)` with `i < j`, `i`
//! ascending then `j` ascending:
//!
//! ```text
//! n = 5:  i = [0,0,0,0,1,1,1,2,2,3]
//!         j = [1,2,3,4,2,3,4,3,4,4]
//! ```
//!
//! The stored bearing is always `i -> j`. Consumers looking from `j` apply the
//! mirror convention (see `obstacle`).

use std::f64::consts::{PI, TAU};

use crate::traffic::AircraftState;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Bearing (radians, [0, 2π), clockwise from north) and distance (meters)
/// from point 1 to point 2.
pub fn qdrdist(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> (f64, f64) {
    let dlat = (lat2 - lat1).to_radians();
    // Wrap across the antimeridian
    let dlon = ((lon2 - lon1 + 180.0).rem_euclid(360.0) - 180.0).to_radians();
    let cavelat = ((lat1 + lat2) * 0.5).to_radians().cos();

    let east = dlon * cavelat;
    let dist = EARTH_RADIUS * (dlat * dlat + east * east).sqrt();
    let qdr = east.atan2(dlat).rem_euclid(TAU);

    (qdr, dist)
}

/// Number of unordered pairs among `n` aircraft.
pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// All unordered pairs `(i, j)` with `i < j` in deterministic order.
pub fn pair_indices(n: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::with_capacity(pair_count(n));
    for i in 0..n {
        for j in (i + 1)..n {
            pairs.push((i, j));
        }
    }
    pairs
}

/// Slot of the unordered pair `{a, b}` in [`pair_indices`] order.
pub fn pair_index(n: usize, a: usize, b: usize) -> usize {
    let (i, j) = if a < b { (a, b) } else { (b, a) };
    i * (2 * n - i - 1) / 2 + (j - i - 1)
}

/// Geometry of one unordered pair, stored from the lower index's point of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairGeometry {
    /// Lower index
    pub i: usize,
    /// Higher index
    pub j: usize,
    /// Bearing i -> j in radians, [0, 2π)
    pub bearing: f64,
    /// Flat-earth distance in meters
    pub distance: f64,
}

impl PairGeometry {
    /// True when `own` is the higher index, i.e. the stored bearing points at it.
    pub fn is_mirrored_for(&self, own: usize) -> bool {
        own == self.j
    }

    /// Bearing from `own` towards the other aircraft of the pair.
    pub fn bearing_from(&self, own: usize) -> f64 {
        if self.is_mirrored_for(own) {
            (self.bearing + PI).rem_euclid(TAU)
        } else {
            self.bearing
        }
    }

    /// The other member of the pair.
    pub fn other(&self, own: usize) -> usize {
        if own == self.i {
            self.j
        } else {
            self.i
        }
    }
}

/// Pairwise geometry for a whole bucket. Computed once, read by every aircraft.
#[derive(Debug, Clone, Default)]
pub struct PairwiseGeometry {
    n: usize,
    pairs: Vec<PairGeometry>,
}

impl PairwiseGeometry {
    /// Computes bearing and distance for all n(n-1)/2 pairs.
    pub fn compute(aircraft: &[AircraftState]) -> Self {
        let n = aircraft.len();
        let pairs = pair_indices(n)
            .into_iter()
            .map(|(i, j)| {
                let (a, b) = (&aircraft[i], &aircraft[j]);
                let (bearing, distance) = qdrdist(a.latitude, a.longitude, b.latitude, b.longitude);
                PairGeometry { i, j, bearing, distance }
            })
            .collect();

        Self { n, pairs }
    }

    /// Geometry of the unordered pair `{a, b}`.
    pub fn get(&self, a: usize, b: usize) -> Option<&PairGeometry> {
        if a == b || a >= self.n || b >= self.n {
            return None;
        }
        self.pairs.get(pair_index(self.n, a, b))
    }

    /// Pairs involving `own` whose distance is strictly below `range` meters.
    pub fn neighbors(&self, own: usize, range: f64) -> impl Iterator<Item = &PairGeometry> + '_ {
        (0..self.n)
            .filter(move |&other| other != own)
            .filter_map(move |other| self.get(own, other))
            .filter(move |pair| pair.distance < range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::{AircraftState, TrafficRow};
    use approx::assert_relative_eq;

    fn aircraft_at(callsign: &str, lat: f64, lon: f64) -> AircraftState {
        AircraftState::from_row(&TrafficRow::new(0.0, callsign, lat, lon, 0.0, 0.0, "TAXI"), false)
            .unwrap()
    }

    #[test]
    fn test_pair_indices_order() {
        let (i, j): (Vec<usize>, Vec<usize>) = pair_indices(5).into_iter().unzip();
        assert_eq!(i, vec![0, 0, 0, 0, 1, 1, 1, 2, 2, 3]);
        assert_eq!(j, vec![1, 2, 3, 4, 2, 3, 4, 3, 4, 4]);
    }

    #[test]
    fn test_pair_count() {
        assert_eq!(pair_count(0), 0);
        assert_eq!(pair_count(1), 0);
        assert_eq!(pair_indices(7).len(), 21);
    }

    #[test]
    fn test_pair_index_roundtrip() {
        for n in 2..9 {
            for (slot, (i, j)) in pair_indices(n).into_iter().enumerate() {
                assert_eq!(pair_index(n, i, j), slot);
                assert_eq!(pair_index(n, j, i), slot);
            }
        }
    }

    #[test]
    fn test_qdrdist_cardinal_bearings() {
        let (qdr, dist) = qdrdist(0.0, 0.0, 1.0, 0.0);
        assert!(qdr.abs() < 1e-12);
        assert_relative_eq!(dist, EARTH_RADIUS * 1f64.to_radians(), epsilon = 1e-6);

        let (qdr, _) = qdrdist(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(qdr, PI / 2.0, epsilon = 1e-12);

        let (qdr, _) = qdrdist(0.0, 0.0, -1.0, 0.0);
        assert_relative_eq!(qdr, PI, epsilon = 1e-12);

        let (qdr, _) = qdrdist(0.0, 0.0, 0.0, -1.0);
        assert_relative_eq!(qdr, 1.5 * PI, epsilon = 1e-12);
    }

    #[test]
    fn test_qdrdist_scales_longitude_by_latitude() {
        let (_, at_equator) = qdrdist(0.0, 0.0, 0.0, 0.01);
        let (_, at_sixty) = qdrdist(60.0, 0.0, 60.0, 0.01);
        assert_relative_eq!(at_sixty / at_equator, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_qdrdist_identical_points() {
        let (qdr, dist) = qdrdist(33.4, -112.0, 33.4, -112.0);
        assert_eq!(dist, 0.0);
        assert_eq!(qdr, 0.0);
    }

    #[test]
    fn test_antimeridian_wrap() {
        let (qdr, dist) = qdrdist(0.0, 179.99, 0.0, -179.99);
        assert_relative_eq!(qdr, PI / 2.0, epsilon = 1e-9);
        assert_relative_eq!(dist, EARTH_RADIUS * 0.02f64.to_radians(), epsilon = 1e-3);
    }

    #[test]
    fn test_bearing_from_both_sides() {
        let fleet = vec![aircraft_at("A", 33.0, -112.0), aircraft_at("B", 33.01, -112.0)];
        let geometry = PairwiseGeometry::compute(&fleet);
        let pair = geometry.get(1, 0).unwrap();

        assert_eq!((pair.i, pair.j), (0, 1));
        assert!(pair.bearing_from(0).abs() < 1e-9);
        assert_relative_eq!(pair.bearing_from(1), PI, epsilon = 1e-9);
        assert_eq!(pair.other(0), 1);
        assert!(pair.is_mirrored_for(1));
    }

    #[test]
    fn test_neighbors_respect_range() {
        let fleet = vec![
            aircraft_at("A", 33.0, -112.0),
            aircraft_at("B", 33.001, -112.0),
            aircraft_at("C", 34.0, -112.0),
        ];
        let geometry = PairwiseGeometry::compute(&fleet);

        let near: Vec<usize> = geometry.neighbors(0, 1_000.0).map(|p| p.other(0)).collect();
        assert_eq!(near, vec![1]);

        let all: Vec<usize> = geometry.neighbors(2, 1e9).map(|p| p.other(2)).collect();
        assert_eq!(all, vec![0, 1]);
        assert!(geometry.get(1, 1).is_none());
    }
}
