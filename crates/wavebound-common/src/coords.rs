//! World-space geometry helpers.
//!
//! Positions are `glam::Vec2` in world units with +y pointing down-screen,
//! angles are radians measured from +x.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Rectangular playfield anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    /// Width in world units
    pub width: f32,
    /// Height in world units
    pub height: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::new(2000.0, 2000.0)
    }
}

impl WorldBounds {
    /// Creates bounds of the given size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Center of the playfield.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Clamps a point so it stays `margin` units away from every edge.
    #[must_use]
    pub fn clamp(&self, point: Vec2, margin: f32) -> Vec2 {
        let margin_x = margin.min(self.width * 0.5);
        let margin_y = margin.min(self.height * 0.5);
        Vec2::new(
            point.x.clamp(margin_x, self.width - margin_x),
            point.y.clamp(margin_y, self.height - margin_y),
        )
    }

    /// Check whether a point lies inside the bounds.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.y >= 0.0 && point.x <= self.width && point.y <= self.height
    }
}

/// Angle of the vector pointing from `from` to `to`.
#[must_use]
pub fn angle_between(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Wraps an angle into `(-PI, PI]`.
#[must_use]
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Unit vector for an angle.
#[must_use]
pub fn direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Circle-circle overlap test.
#[must_use]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) <= r * r
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_respects_margin() {
        let bounds = WorldBounds::new(2000.0, 2000.0);
        let p = bounds.clamp(Vec2::new(-40.0, 2500.0), 50.0);
        assert_eq!(p, Vec2::new(50.0, 1950.0));

        let inside = Vec2::new(700.0, 800.0);
        assert_eq!(bounds.clamp(inside, 50.0), inside);
    }

    #[test]
    fn test_wrap_angle_range() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-5);
        assert!((wrap_angle(-PI / 2.0 - TAU) + PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(0.25) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_angle_and_direction_agree() {
        let a = angle_between(Vec2::ZERO, Vec2::new(0.0, 10.0));
        assert!((a - PI / 2.0).abs() < 1e-6);
        let d = direction(a);
        assert!(d.x.abs() < 1e-6);
        assert!((d.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_circles_overlap() {
        assert!(circles_overlap(Vec2::ZERO, 10.0, Vec2::new(15.0, 0.0), 6.0));
        assert!(!circles_overlap(Vec2::ZERO, 10.0, Vec2::new(17.0, 0.0), 6.0));
    }

    proptest! {
        #[test]
        fn prop_clamp_stays_inside(x in -5000.0f32..5000.0, y in -5000.0f32..5000.0, margin in 0.0f32..100.0) {
            let bounds = WorldBounds::new(2000.0, 2000.0);
            let p = bounds.clamp(Vec2::new(x, y), margin);
            prop_assert!(p.x >= margin && p.x <= 2000.0 - margin);
            prop_assert!(p.y >= margin && p.y <= 2000.0 - margin);
        }

        #[test]
        fn prop_wrap_angle_in_range(angle in -100.0f32..100.0) {
            let w = wrap_angle(angle);
            prop_assert!(w > -PI - 1e-4 && w <= PI + 1e-4);
            prop_assert!((direction(w) - direction(angle)).length() < 1e-3);
        }
    }
}
