//! World extent and containment
//!
//! Every distance/direction query in the engine goes through `WorldBounds`
//! so that wrap-around worlds measure the short way across the seam.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Both axes wrap modulo the world size; positions lie in [0, w) x [0, h)
    #[default]
    Wrap,
    /// Positions are clamped to [0, w] x [0, h] and velocity reflects inward
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
    pub mode: BoundaryMode,
}

impl WorldBounds {
    pub fn new(width: f32, height: f32, mode: BoundaryMode) -> Self {
        Self { width, height, mode }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Shortest displacement from `from` to `to`
    pub fn delta(&self, from: Vec2, to: Vec2) -> Vec2 {
        let mut d = to - from;
        if self.mode == BoundaryMode::Wrap {
            d.x = wrap_component(d.x, self.width);
            d.y = wrap_component(d.y, self.height);
        }
        d
    }

    pub fn distance(&self, a: Vec2, b: Vec2) -> f32 {
        self.delta(a, b).length()
    }

    /// Map a position back into the world, returning the adjusted velocity
    ///
    /// Clamp mode reflects the outward velocity component scaled by
    /// `restitution`, which acts as the inward restoring push.
    pub fn contain(&self, position: Vec2, velocity: Vec2, restitution: f32) -> (Vec2, Vec2) {
        let position = if position.is_finite() { position } else { self.center() };
        match self.mode {
            BoundaryMode::Wrap => (
                Vec2::new(
                    wrap_coordinate(position.x, self.width),
                    wrap_coordinate(position.y, self.height),
                ),
                velocity,
            ),
            BoundaryMode::Clamp => {
                let mut pos = position;
                let mut vel = velocity;
                if pos.x < 0.0 {
                    pos.x = 0.0;
                    vel.x = vel.x.abs() * restitution;
                } else if pos.x > self.width {
                    pos.x = self.width;
                    vel.x = -vel.x.abs() * restitution;
                }
                if pos.y < 0.0 {
                    pos.y = 0.0;
                    vel.y = vel.y.abs() * restitution;
                } else if pos.y > self.height {
                    pos.y = self.height;
                    vel.y = -vel.y.abs() * restitution;
                }
                (pos, vel)
            }
        }
    }

    /// Point contained by the world without touching velocity
    pub fn contain_point(&self, position: Vec2) -> Vec2 {
        self.contain(position, Vec2::ZERO, 0.0).0
    }

    pub fn contains(&self, position: Vec2) -> bool {
        match self.mode {
            BoundaryMode::Wrap => {
                (0.0..self.width).contains(&position.x) && (0.0..self.height).contains(&position.y)
            }
            BoundaryMode::Clamp => {
                (0.0..=self.width).contains(&position.x) && (0.0..=self.height).contains(&position.y)
            }
        }
    }

    pub fn random_point<R: Rng>(&self, rng: &mut R) -> Vec2 {
        let raw = Vec2::new(rng.gen::<f32>() * self.width, rng.gen::<f32>() * self.height);
        self.contain_point(raw)
    }
}

fn wrap_component(d: f32, extent: f32) -> f32 {
    if extent <= 0.0 {
        return d;
    }
    let half = extent / 2.0;
    if d > half {
        d - extent
    } else if d < -half {
        d + extent
    } else {
        d
    }
}

fn wrap_coordinate(value: f32, extent: f32) -> f32 {
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs
    if wrapped >= extent || !wrapped.is_finite() {
        0.0
    } else {
        wrapped
    }
}
