//! Traffic oracle for scenario runs.
//!
//! The oracle holds the true state of every simulated aircraft on a local
//! east/north plane around a reference point:
//! - Constant-velocity kinematics
//! - Surveillance reports (`TrafficRow`s) with optional Gaussian position noise
//! - Conversion from the local plane back to latitude/longitude

use fpf_core::geometry::EARTH_RADIUS;
use fpf_core::traffic::{ground_velocity, KNOTS_TO_MPS};
use fpf_core::TrafficRow;
use nalgebra::Vector2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// A simulated aircraft.
#[derive(Debug, Clone)]
pub struct SimAircraft {
    pub callsign: String,

    /// Position [east, north] in meters from the reference point
    pub position: Vector2<f64>,

    /// Ground speed in knots
    pub ground_speed: f64,

    /// Track in degrees from true north
    pub heading: f64,

    /// Status label reported with every row (e.g. "TAXI")
    pub status: String,
}

impl SimAircraft {
    /// Velocity [east, north] in m/s.
    pub fn velocity(&self) -> Vector2<f64> {
        ground_velocity(self.ground_speed * KNOTS_TO_MPS, self.heading)
    }
}

/// Ground-truth traffic generator.
pub struct TrafficOracle {
    rng: ChaCha8Rng,

    /// Reference point (degrees)
    reference: (f64, f64),

    aircraft: Vec<SimAircraft>,

    current_time: f64,

    /// Position noise standard deviation (meters), 0 disables noise
    position_noise_std: f64,
}

impl TrafficOracle {
    /// Creates an oracle around `(latitude, longitude)`.
    pub fn new(seed: u64, latitude: f64, longitude: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            reference: (latitude, longitude),
            aircraft: Vec::new(),
            current_time: 0.0,
            position_noise_std: 0.0,
        }
    }

    pub fn set_position_noise(&mut self, std_dev: f64) {
        self.position_noise_std = std_dev;
    }

    /// Adds an aircraft at `[east, north]` meters from the reference point.
    pub fn spawn(
        &mut self,
        callsign: &str,
        east: f64,
        north: f64,
        ground_speed: f64,
        heading: f64,
        status: &str,
    ) -> usize {
        self.aircraft.push(SimAircraft {
            callsign: callsign.to_string(),
            position: Vector2::new(east, north),
            ground_speed,
            heading,
            status: status.to_string(),
        });
        self.aircraft.len() - 1
    }

    /// Adds `count` aircraft scattered over a square of `half_width` meters,
    /// with random headings and surface speeds.
    pub fn spawn_random(&mut self, count: usize, half_width: f64) {
        for i in 0..count {
            let east = self.rng.gen_range(-half_width..half_width);
            let north = self.rng.gen_range(-half_width..half_width);
            let heading = self.rng.gen_range(0.0..360.0);
            let (speed, status) = if self.rng.gen_bool(0.3) {
                (self.rng.gen_range(0.0..4.0), "PUSHBACK")
            } else {
                (self.rng.gen_range(0.0..25.0), "TAXI")
            };
            self.spawn(&format!("SIM{:03}", i), east, north, speed, heading, status);
        }
    }

    /// Advances every aircraft by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.current_time += dt;
        for aircraft in &mut self.aircraft {
            let velocity = aircraft.velocity();
            aircraft.position += velocity * dt;
        }
    }

    pub fn time(&self) -> f64 {
        self.current_time
    }

    pub fn aircraft(&self) -> &[SimAircraft] {
        &self.aircraft
    }

    /// Latitude/longitude of a point on the local plane.
    pub fn to_geodetic(&self, position: &Vector2<f64>) -> (f64, f64) {
        let (lat0, lon0) = self.reference;
        let lat = lat0 + (position.y / EARTH_RADIUS).to_degrees();
        let lon = lon0 + (position.x / (EARTH_RADIUS * lat0.to_radians().cos())).to_degrees();
        (lat, lon)
    }

    /// One report per aircraft at the current time.
    pub fn reports(&mut self) -> Vec<TrafficRow> {
        let noise = Normal::new(0.0, self.position_noise_std)
            .ok()
            .filter(|_| self.position_noise_std > 0.0);

        let mut rows = Vec::with_capacity(self.aircraft.len());
        for aircraft in &self.aircraft {
            let mut position = aircraft.position;
            if let Some(normal) = &noise {
                position += Vector2::new(normal.sample(&mut self.rng), normal.sample(&mut self.rng));
            }
            let (lat, lon) = self.to_geodetic(&position);
            rows.push(TrafficRow::new(
                self.current_time,
                aircraft.callsign.clone(),
                lat,
                lon,
                aircraft.ground_speed,
                aircraft.heading,
                &aircraft.status,
            ));
        }
        rows
    }

    /// Reports every `interval` seconds for `duration` seconds, starting now.
    pub fn record(&mut self, duration: f64, interval: f64) -> Vec<TrafficRow> {
        let steps = (duration / interval).floor() as u64;
        let mut rows = self.reports();
        for _ in 0..steps {
            self.step(interval);
            rows.extend(self.reports());
        }
        rows
    }
}
