//! Steering math helpers.
//!
//! Pure functions over `glam::Vec2` shared by the sensor, the wall navigator
//! and the hide protocol. World space is y-up: `Cardinal::Up` is `+Y`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Squared length below which a direction is treated as "no direction".
pub const NEAR_ZERO_SQ: f32 = 0.001;

/// One of the four screen-aligned directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cardinal {
    /// +Y
    Up,
    /// -Y
    #[default]
    Down,
    /// -X
    Left,
    /// +X
    Right,
}

impl Cardinal {
    /// All four directions, in up/down/left/right order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Returns the unit vector for this direction.
    #[must_use]
    pub const fn to_vec2(self) -> Vec2 {
        match self {
            Self::Up => Vec2::Y,
            Self::Down => Vec2::NEG_Y,
            Self::Left => Vec2::NEG_X,
            Self::Right => Vec2::X,
        }
    }

    /// Snaps an arbitrary direction to the nearest cardinal.
    ///
    /// The horizontal axis wins only when strictly larger in magnitude, so
    /// exact diagonals resolve vertically. Near-zero input yields `Down`.
    #[must_use]
    pub fn from_direction(v: Vec2) -> Self {
        if !v.is_finite() || v.length_squared() < NEAR_ZERO_SQ {
            return Self::Down;
        }

        if v.x.abs() > v.y.abs() {
            if v.x >= 0.0 {
                Self::Right
            } else {
                Self::Left
            }
        } else if v.y >= 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// Quantizes a direction to one of the four cardinal unit vectors.
#[must_use]
pub fn quantize_to_4(v: Vec2) -> Vec2 {
    Cardinal::from_direction(v).to_vec2()
}

/// Rotates `v` counter-clockwise by `degrees`.
#[must_use]
pub fn rotate_degrees(v: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(v)
}

/// Perpendicular pointing to the left of `v` (counter-clockwise).
#[must_use]
pub fn left_perp(v: Vec2) -> Vec2 {
    v.perp()
}

/// Perpendicular pointing to the right of `v` (clockwise).
#[must_use]
pub fn right_perp(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}

/// Unit direction from `from` to `to`, or zero when the points coincide.
#[must_use]
pub fn direction_to(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalize_or_zero()
}

/// Adds a steering offset to a desired heading and renormalizes.
///
/// Falls back to the plain heading when the offset cancels it out exactly.
#[must_use]
pub fn blend_heading(heading: Vec2, offset: Vec2) -> Vec2 {
    let blended = (heading + offset).normalize_or_zero();
    if blended == Vec2::ZERO {
        heading.normalize_or_zero()
    } else {
        blended
    }
}

/// Angular offsets (degrees) of an evenly spread fan of `count` rays.
///
/// A single ray has offset zero. Offsets run from `-spread / 2` (right of
/// forward) to `+spread / 2` (left of forward).
pub fn fan_offsets(count: usize, spread_degrees: f32) -> impl Iterator<Item = f32> {
    let step = if count > 1 {
        spread_degrees / (count - 1) as f32
    } else {
        0.0
    };
    let start = if count > 1 { -spread_degrees / 2.0 } else { 0.0 };
    (0..count).map(move |i| start + step * i as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_quantize_examples() {
        assert_eq!(quantize_to_4(Vec2::new(3.0, 1.0)), Vec2::new(1.0, 0.0));
        assert_eq!(quantize_to_4(Vec2::new(0.0, 0.0)), Vec2::new(0.0, -1.0));
        assert_eq!(quantize_to_4(Vec2::new(-1.0, 5.0)), Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_quantize_ties_resolve_vertically() {
        assert_eq!(Cardinal::from_direction(Vec2::new(1.0, 1.0)), Cardinal::Up);
        assert_eq!(Cardinal::from_direction(Vec2::new(-2.0, -2.0)), Cardinal::Down);
    }

    #[test]
    fn test_quantize_tiny_input_defaults_down() {
        assert_eq!(Cardinal::from_direction(Vec2::new(0.01, 0.02)), Cardinal::Down);
        assert_eq!(Cardinal::from_direction(Vec2::new(f32::NAN, 1.0)), Cardinal::Down);
    }

    #[test]
    fn test_rotate_degrees() {
        assert!(approx(rotate_degrees(Vec2::X, 90.0), Vec2::Y));
        assert!(approx(rotate_degrees(Vec2::X, -90.0), Vec2::NEG_Y));
        assert!(approx(rotate_degrees(Vec2::Y, 180.0), Vec2::NEG_Y));
    }

    #[test]
    fn test_perpendiculars() {
        assert!(approx(left_perp(Vec2::X), Vec2::Y));
        assert!(approx(right_perp(Vec2::X), Vec2::NEG_Y));
        assert!(left_perp(Vec2::new(0.3, 0.7)).dot(Vec2::new(0.3, 0.7)).abs() < 1e-6);
    }

    #[test]
    fn test_direction_to() {
        assert!(approx(direction_to(Vec2::ZERO, Vec2::new(0.0, 4.0)), Vec2::Y));
        assert_eq!(direction_to(Vec2::ONE, Vec2::ONE), Vec2::ZERO);
    }

    #[test]
    fn test_blend_heading_cancel_falls_back() {
        let heading = Vec2::X;
        assert!(approx(blend_heading(heading, Vec2::NEG_X), Vec2::X));
        assert!(approx(blend_heading(heading, Vec2::ZERO), Vec2::X));
    }

    #[test]
    fn test_fan_offsets() {
        let five: Vec<f32> = fan_offsets(5, 60.0).collect();
        assert_eq!(five, vec![-30.0, -15.0, 0.0, 15.0, 30.0]);

        let one: Vec<f32> = fan_offsets(1, 60.0).collect();
        assert_eq!(one, vec![0.0]);

        assert_eq!(fan_offsets(0, 60.0).count(), 0);
    }

    proptest! {
        #[test]
        fn prop_quantize_is_idempotent(x in -100.0f32..100.0, y in -100.0f32..100.0) {
            let once = quantize_to_4(Vec2::new(x, y));
            prop_assert_eq!(quantize_to_4(once), once);
            prop_assert!((once.length() - 1.0).abs() < 1e-6);
        }

        #[test]
        fn prop_rotation_preserves_length(x in -10.0f32..10.0, y in -10.0f32..10.0, deg in -360.0f32..360.0) {
            let v = Vec2::new(x, y);
            prop_assert!((rotate_degrees(v, deg).length() - v.length()).abs() < 1e-3);
        }
    }
}
