//! World query interface consumed by the AI.
//!
//! The AI never owns physics. Everything it needs from the world goes through
//! [`WorldQuery`]: a raycast and a circle-overlap test, both filtered by a
//! [`LayerMask`]. [`ObstacleWorld`] is a small analytic implementation made of
//! circles and axis-aligned boxes, used by the headless simulation and tests.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use umbra_common::ColliderId;

/// Bit set of collision layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Matches nothing.
    pub const NONE: Self = Self(0);
    /// Matches every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// Default layer for walls and props.
    pub const OBSTACLES: Self = Self(1);

    /// Mask containing a single layer index (0-31).
    #[must_use]
    pub const fn layer(index: u32) -> Self {
        Self(1 << (index & 31))
    }

    /// Checks whether any bit of `other` is set in this mask.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::OBSTACLES
    }
}

/// Result of a raycast that hit something.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the ray to the hit point
    pub distance: f32,
    /// World position of the hit
    pub point: Vec2,
    /// Surface normal at the hit point (unit length)
    pub normal: Vec2,
    /// Collider that was hit, if the world tracks collider identity
    pub collider: Option<ColliderId>,
}

/// Physics/world query service.
pub trait WorldQuery {
    /// Casts a ray and returns the closest hit within `max_distance`.
    ///
    /// `direction` does not need to be normalized; a zero direction never hits.
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit>;

    /// Checks whether a circle overlaps any collider on `mask`.
    fn overlap_circle(&self, point: Vec2, radius: f32, mask: LayerMask) -> bool;

    /// Casts a ray from `from` to `to`.
    fn linecast(&self, from: Vec2, to: Vec2, mask: LayerMask) -> Option<RayHit> {
        let delta = to - from;
        let distance = delta.length();
        if distance <= f32::EPSILON {
            return None;
        }
        self.raycast(from, delta / distance, distance, mask)
    }
}

/// Shape of a static obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ObstacleShape {
    /// Disc obstacle (pillars, barrels)
    Circle {
        /// Center position
        center: Vec2,
        /// Radius
        radius: f32,
    },
    /// Axis-aligned box obstacle (walls, crates)
    Rect {
        /// Minimum corner
        min: Vec2,
        /// Maximum corner
        max: Vec2,
    },
}

impl ObstacleShape {
    /// Intersects a unit-direction ray with this shape.
    ///
    /// Returns `(distance, normal)`. A ray starting inside the shape hits at
    /// distance zero with the normal facing back along the ray.
    fn ray_intersection(&self, origin: Vec2, dir: Vec2) -> Option<(f32, Vec2)> {
        match *self {
            Self::Circle { center, radius } => {
                let m = origin - center;
                let b = m.dot(dir);
                let c = m.length_squared() - radius * radius;
                if c <= 0.0 {
                    return Some((0.0, -dir));
                }
                if b > 0.0 {
                    return None;
                }
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let t = -b - disc.sqrt();
                let point = origin + dir * t;
                let normal = (point - center).normalize_or_zero();
                Some((t, if normal == Vec2::ZERO { -dir } else { normal }))
            },
            Self::Rect { min, max } => {
                let o = origin.to_array();
                let d = dir.to_array();
                let lo = min.to_array();
                let hi = max.to_array();

                let mut t_enter = f32::NEG_INFINITY;
                let mut t_exit = f32::INFINITY;
                let mut normal = Vec2::ZERO;

                for axis in 0..2 {
                    if d[axis].abs() < 1e-8 {
                        if o[axis] < lo[axis] || o[axis] > hi[axis] {
                            return None;
                        }
                        continue;
                    }
                    let inv = 1.0 / d[axis];
                    let t1 = (lo[axis] - o[axis]) * inv;
                    let t2 = (hi[axis] - o[axis]) * inv;
                    let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
                    if near > t_enter {
                        t_enter = near;
                        normal = if axis == 0 {
                            Vec2::new(-d[0].signum(), 0.0)
                        } else {
                            Vec2::new(0.0, -d[1].signum())
                        };
                    }
                    t_exit = t_exit.min(far);
                    if t_enter > t_exit {
                        return None;
                    }
                }

                if t_exit < 0.0 {
                    return None;
                }
                if t_enter < 0.0 {
                    return Some((0.0, -dir));
                }
                Some((t_enter, normal))
            },
        }
    }

    /// Checks whether a circle overlaps this shape.
    fn overlaps_circle(&self, point: Vec2, radius: f32) -> bool {
        match *self {
            Self::Circle { center, radius: r } => point.distance(center) < r + radius,
            Self::Rect { min, max } => point.clamp(min, max).distance(point) < radius,
        }
    }
}

/// A static obstacle on one collision layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    /// Collider identity reported in hits
    pub id: ColliderId,
    /// Geometry
    pub shape: ObstacleShape,
    /// Layer bits of this obstacle
    pub layer: LayerMask,
}

/// Analytic world made of static circles and boxes.
#[derive(Debug, Clone, Default)]
pub struct ObstacleWorld {
    obstacles: Vec<Obstacle>,
    next_id: u32,
}

impl ObstacleWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an obstacle on the default layer and returns its collider id.
    pub fn add(&mut self, shape: ObstacleShape) -> ColliderId {
        self.add_on_layer(shape, LayerMask::OBSTACLES)
    }

    /// Adds an obstacle on a specific layer and returns its collider id.
    pub fn add_on_layer(&mut self, shape: ObstacleShape, layer: LayerMask) -> ColliderId {
        let id = ColliderId::new(self.next_id);
        self.next_id += 1;
        self.obstacles.push(Obstacle { id, shape, layer });
        id
    }

    /// Adds a circle obstacle.
    pub fn add_circle(&mut self, center: Vec2, radius: f32) -> ColliderId {
        self.add(ObstacleShape::Circle { center, radius })
    }

    /// Adds a box obstacle from two corners (any order).
    pub fn add_rect(&mut self, a: Vec2, b: Vec2) -> ColliderId {
        self.add(ObstacleShape::Rect {
            min: a.min(b),
            max: a.max(b),
        })
    }

    /// Returns all obstacles.
    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Returns the number of obstacles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    /// Returns whether the world has no obstacles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

impl WorldQuery for ObstacleWorld {
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec2::ZERO || max_distance <= 0.0 {
            return None;
        }

        self.obstacles
            .iter()
            .filter(|o| o.layer.intersects(mask))
            .filter_map(|o| {
                let (distance, normal) = o.shape.ray_intersection(origin, dir)?;
                (distance <= max_distance).then_some(RayHit {
                    distance,
                    point: origin + dir * distance,
                    normal,
                    collider: Some(o.id),
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn overlap_circle(&self, point: Vec2, radius: f32, mask: LayerMask) -> bool {
        self.obstacles
            .iter()
            .any(|o| o.layer.intersects(mask) && o.shape.overlaps_circle(point, radius))
    }
}
