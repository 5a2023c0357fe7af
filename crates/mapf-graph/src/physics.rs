//! Drive-train models converting distances into arrival times.
//!
//! # Pluggability
//!
//! The reservation table only sees the [`Physics`] trait.  [`KinematicPhysics`]
//! models a robot that accelerates, cruises, and brakes with constant rates;
//! [`ConstantSpeed`] is a simpler model useful for coarse planning and tests.
//!
//! # Motion profile
//!
//! A straight hop from speed `v0` to standstill is split into up to three
//! phases:
//!
//! ```text
//! speed
//! ^
//! |   _____________
//! |  /             \
//! | /               \
//! |/                 \
//! +-------------------X--> distance
//! |--|                     acceleration
//!    |-------------|       cruise at max speed
//!                  |--|    braking
//! ```
//!
//! Short hops never reach max speed (no cruise phase); a robot already moving
//! fast enough may only need to brake.

use std::f64::consts::{PI, TAU};

use mapf_core::TOLERANCE;

use crate::{GraphError, GraphResult};

// ── Physics trait ─────────────────────────────────────────────────────────────

/// Converts distances along a straight hop into timestamps.
///
/// Implementations must be `Send + Sync` so planners running on Rayon
/// workers can share one model.
pub trait Physics: Send + Sync {
    /// Seconds needed to travel `distance` starting at `current_speed` and
    /// ending at standstill.
    fn time_to_move(&self, current_speed: f64, distance: f64) -> f64;

    /// Absolute arrival times at each of `checkpoint_distances` (measured from
    /// the hop start) for a hop of `total_distance` that begins at
    /// `start_time` with `current_speed`.
    fn checkpoint_times(
        &self,
        current_speed: f64,
        start_time: f64,
        total_distance: f64,
        checkpoint_distances: &[f64],
    ) -> Vec<f64>;

    /// Seconds needed to rotate on the spot between two headings (radians).
    fn time_to_turn(&self, _from_rad: f64, _to_rad: f64) -> f64 {
        0.0
    }
}

// ── MotionProfile ─────────────────────────────────────────────────────────────

/// Phase breakdown of one straight hop.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MotionProfile {
    pub acceleration_duration: f64,
    pub acceleration_distance: f64,
    pub cruise_duration:       f64,
    pub cruise_distance:       f64,
    pub braking_duration:      f64,
    pub braking_distance:      f64,
    /// Highest speed reached; the speed at which braking begins.
    pub top_speed:             f64,
}

impl MotionProfile {
    #[inline]
    pub fn total_duration(&self) -> f64 {
        self.acceleration_duration + self.cruise_duration + self.braking_duration
    }
}

// ── KinematicPhysics ──────────────────────────────────────────────────────────

/// Constant-acceleration, constant-deceleration robot with a speed cap.
#[derive(Copy, Clone, Debug)]
pub struct KinematicPhysics {
    /// m/s².
    pub acceleration: f64,
    /// m/s², positive.
    pub deceleration: f64,
    /// m/s.
    pub max_speed:    f64,
    /// Seconds for a full 2π turn on the spot.
    pub turn_speed:   f64,

    full_speed_braking_time:     f64,
    full_speed_braking_distance: f64,
}

impl KinematicPhysics {
    pub fn new(acceleration: f64, deceleration: f64, max_speed: f64, turn_speed: f64) -> GraphResult<Self> {
        for (name, v) in [
            ("acceleration", acceleration),
            ("deceleration", deceleration),
            ("max_speed", max_speed),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(GraphError::InvalidPhysics(format!("{name} must be positive, got {v}")));
            }
        }
        if !turn_speed.is_finite() || turn_speed < 0.0 {
            return Err(GraphError::InvalidPhysics(format!(
                "turn_speed must be non-negative, got {turn_speed}"
            )));
        }

        let full_speed_braking_time = max_speed / deceleration;
        Ok(Self {
            acceleration,
            deceleration,
            max_speed,
            turn_speed,
            full_speed_braking_time,
            full_speed_braking_distance: deceleration * full_speed_braking_time * full_speed_braking_time / 2.0,
        })
    }

    /// Distance needed to come to a stop from `current_speed`.
    #[inline]
    pub fn stopping_distance(&self, current_speed: f64) -> f64 {
        current_speed * current_speed / (2.0 * self.deceleration)
    }

    /// Phase breakdown for a hop of `distance` starting at `current_speed`.
    pub fn profile(&self, current_speed: f64, distance: f64) -> MotionProfile {
        let (a, b, v_max) = (self.acceleration, self.deceleration, self.max_speed);
        let v0 = current_speed;

        // Braking alone covers the hop.
        let braking_time = v0 / b;
        let braking_distance = b * braking_time * braking_time / 2.0;
        if braking_distance >= distance {
            return MotionProfile {
                braking_duration: braking_time,
                braking_distance,
                top_speed: v0,
                ..MotionProfile::default()
            };
        }

        // Already at full speed: cruise, then brake.
        if v0 >= v_max {
            let cruise_distance = distance - self.full_speed_braking_distance;
            return MotionProfile {
                cruise_duration: cruise_distance / v_max,
                cruise_distance,
                braking_duration: self.full_speed_braking_time,
                braking_distance: self.full_speed_braking_distance,
                top_speed: v_max,
                ..MotionProfile::default()
            };
        }

        // Accelerate, cruise, brake.
        let accel_time = (v_max - v0) / a;
        let accel_distance = a * accel_time * accel_time / 2.0 + v0 * accel_time;
        if accel_distance + self.full_speed_braking_distance <= distance {
            let cruise_distance = distance - accel_distance - self.full_speed_braking_distance;
            return MotionProfile {
                acceleration_duration: accel_time,
                acceleration_distance: accel_distance,
                cruise_duration:       cruise_distance / v_max,
                cruise_distance,
                braking_duration:      self.full_speed_braking_time,
                braking_distance:      self.full_speed_braking_distance,
                top_speed:             v_max,
            };
        }

        // Max speed is never reached: accelerate straight into braking.  The
        // current speed is treated as the tail of a virtual run from rest
        // lasting `tx` seconds.
        let tx = v0 / a;
        let virtual_distance = distance + a / 2.0 * tx * tx;
        let acceleration_duration = (virtual_distance / (a / 2.0 + a * a / (2.0 * b))).sqrt() - tx;
        let braking_duration = (virtual_distance / (b / 2.0 + b * b / (2.0 * a))).sqrt();
        let acceleration_distance = a * acceleration_duration * acceleration_duration / 2.0
            + v0 * acceleration_duration;
        MotionProfile {
            acceleration_duration,
            acceleration_distance,
            cruise_duration: 0.0,
            cruise_distance: 0.0,
            braking_duration,
            braking_distance: distance - acceleration_distance,
            top_speed: a * acceleration_duration + v0,
        }
    }

    /// Seconds after the hop start at which `distance` is reached.
    fn time_at(&self, profile: &MotionProfile, current_speed: f64, distance: f64) -> f64 {
        let a = self.acceleration;
        if distance <= profile.acceleration_distance {
            return ((2.0 * a * distance + current_speed * current_speed).sqrt() - current_speed) / a;
        }
        let cruise_end = profile.acceleration_distance + profile.cruise_distance;
        if distance <= cruise_end {
            return profile.acceleration_duration + (distance - profile.acceleration_distance) / profile.top_speed;
        }
        // Solve s = v t - b t² / 2 for the braking phase.
        let v = profile.top_speed;
        let s = distance - cruise_end;
        let disc = (v * v - 2.0 * self.deceleration * s).max(0.0);
        profile.acceleration_duration + profile.cruise_duration + (v - disc.sqrt()) / self.deceleration
    }
}

impl Physics for KinematicPhysics {
    fn time_to_move(&self, current_speed: f64, distance: f64) -> f64 {
        self.profile(current_speed, distance).total_duration()
    }

    fn checkpoint_times(
        &self,
        current_speed: f64,
        start_time: f64,
        total_distance: f64,
        checkpoint_distances: &[f64],
    ) -> Vec<f64> {
        let profile = self.profile(current_speed, total_distance);
        let total = profile.total_duration();
        checkpoint_distances
            .iter()
            .map(|&d| {
                // The destination is pinned to the exact total to avoid drift.
                if (d - total_distance).abs() <= TOLERANCE {
                    start_time + total
                } else {
                    start_time + self.time_at(&profile, current_speed, d)
                }
            })
            .collect()
    }

    fn time_to_turn(&self, from_rad: f64, to_rad: f64) -> f64 {
        orientation_difference(from_rad, to_rad).abs() / TAU * self.turn_speed
    }
}

/// Signed shortest rotation from `current` to `target`, in `(-π, π]`.
fn orientation_difference(current: f64, target: f64) -> f64 {
    let diff = if target > current { target - current } else { target - current + TAU };
    if diff < PI { diff } else { diff - TAU }
}

// ── ConstantSpeed ─────────────────────────────────────────────────────────────

/// Moves at a fixed speed with instant starts and stops.
#[derive(Copy, Clone, Debug)]
pub struct ConstantSpeed {
    /// m/s.
    pub speed: f64,
}

impl ConstantSpeed {
    pub fn new(speed: f64) -> GraphResult<Self> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(GraphError::InvalidPhysics(format!("speed must be positive, got {speed}")));
        }
        Ok(Self { speed })
    }
}

impl Physics for ConstantSpeed {
    fn time_to_move(&self, _current_speed: f64, distance: f64) -> f64 {
        distance / self.speed
    }

    fn checkpoint_times(
        &self,
        _current_speed: f64,
        start_time: f64,
        _total_distance: f64,
        checkpoint_distances: &[f64],
    ) -> Vec<f64> {
        checkpoint_distances.iter().map(|d| start_time + d / self.speed).collect()
    }
}
