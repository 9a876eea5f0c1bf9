//! Geometry primitives: vectors, block positions, faces, boxes, and rotations.
//!
//! Angles are in degrees and follow the host's conventions: yaw 0 looks
//! towards +Z and grows clockwise seen from above, pitch is positive when
//! looking down and is clamped to `[-90, 90]`.

use core::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A point or offset in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// East-west coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// North-south coordinate.
    pub z: f64,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Create a vector from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product.
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Squared euclidean length.
    pub fn length_sq(self) -> f64 {
        self.dot(self)
    }

    /// Squared distance to `other`.
    pub fn distance_sq(self, other: Self) -> f64 {
        (other - self).length_sq()
    }

    /// Distance to `other`.
    pub fn distance(self, other: Self) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Component along `axis`.
    pub const fn component(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Return a copy with the component along `axis` replaced.
    #[must_use]
    pub const fn with_component(self, axis: Axis, value: f64) -> Self {
        match axis {
            Axis::X => Self::new(value, self.y, self.z),
            Axis::Y => Self::new(self.x, value, self.z),
            Axis::Z => Self::new(self.x, self.y, value),
        }
    }

    /// The block containing this point.
    pub fn block_pos(self) -> BlockPos {
        BlockPos::new(floor_to_i32(self.x), floor_to_i32(self.y), floor_to_i32(self.z))
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn floor_to_i32(value: f64) -> i32 {
    value.floor().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

/// Integer coordinates of one block cell.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BlockPos {
    /// East-west coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// North-south coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Create a position from its components.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighbouring position across `face`.
    #[must_use]
    pub const fn offset(self, face: Direction) -> Self {
        let (dx, dy, dz) = face.step();
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.z.saturating_add(dz),
        )
    }

    /// The position `n` blocks below.
    #[must_use]
    pub const fn down(self, n: i32) -> Self {
        Self::new(self.x, self.y.saturating_sub(n), self.z)
    }

    /// The minimum corner of this cell.
    pub fn corner(self) -> Vec3 {
        Vec3::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }

    /// The centre of this cell.
    pub fn center(self) -> Vec3 {
        self.corner() + Vec3::new(0.5, 0.5, 0.5)
    }

    /// Coordinate along `axis`.
    pub const fn component(self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

impl core::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// A coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// East-west.
    X,
    /// Vertical.
    Y,
    /// North-south.
    Z,
}

impl Axis {
    /// The face pointing towards negative coordinates on this axis.
    pub const fn negative(self) -> Direction {
        match self {
            Self::X => Direction::West,
            Self::Y => Direction::Down,
            Self::Z => Direction::North,
        }
    }

    /// The face pointing towards positive coordinates on this axis.
    pub const fn positive(self) -> Direction {
        match self {
            Self::X => Direction::East,
            Self::Y => Direction::Up,
            Self::Z => Direction::South,
        }
    }
}

/// One of the six faces of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Negative Y.
    Down,
    /// Positive Y.
    Up,
    /// Negative Z.
    North,
    /// Positive Z.
    South,
    /// Negative X.
    West,
    /// Positive X.
    East,
}

impl Direction {
    /// All faces in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Down,
        Self::Up,
        Self::North,
        Self::South,
        Self::West,
        Self::East,
    ];

    /// The four horizontal faces.
    pub const HORIZONTAL: [Self; 4] = [Self::North, Self::South, Self::West, Self::East];

    /// Unit step across this face.
    pub const fn step(self) -> (i32, i32, i32) {
        match self {
            Self::Down => (0, -1, 0),
            Self::Up => (0, 1, 0),
            Self::North => (0, 0, -1),
            Self::South => (0, 0, 1),
            Self::West => (-1, 0, 0),
            Self::East => (1, 0, 0),
        }
    }

    /// Outward unit normal.
    pub fn normal(self) -> Vec3 {
        let (x, y, z) = self.step();
        Vec3::new(f64::from(x), f64::from(y), f64::from(z))
    }

    /// The face on the other side of the block.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Down => Self::Up,
            Self::Up => Self::Down,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// The axis this face is perpendicular to.
    pub const fn axis(self) -> Axis {
        match self {
            Self::Down | Self::Up => Axis::Y,
            Self::North | Self::South => Axis::Z,
            Self::West | Self::East => Axis::X,
        }
    }

    /// Whether the face points towards positive coordinates.
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::Up | Self::South | Self::East)
    }

    /// Whether the face is one of the four horizontal ones.
    pub const fn is_horizontal(self) -> bool {
        !matches!(self, Self::Down | Self::Up)
    }

    /// Parse a face name as used in block properties.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "down" => Some(Self::Down),
            "up" => Some(Self::Up),
            "north" => Some(Self::North),
            "south" => Some(Self::South),
            "west" => Some(Self::West),
            "east" => Some(Self::East),
            _ => None,
        }
    }
}

/// An axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// The unit cube in block-local coordinates.
    pub const FULL_CUBE: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::new(1.0, 1.0, 1.0),
    };

    /// Create a box from two corners in any order.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Translate a block-local box into the cell at `pos`.
    #[must_use]
    pub fn at(self, pos: BlockPos) -> Self {
        self.translate(pos.corner())
    }

    /// Move the box by `offset`.
    #[must_use]
    pub fn translate(self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Shrink the box by `amount` on every side.
    ///
    /// A side that would cross its opposite collapses onto the centre.
    #[must_use]
    pub fn contract(self, amount: f64) -> Self {
        let center = self.center();
        let shrink = |min: f64, max: f64, mid: f64| {
            let lo = (min + amount).min(mid);
            let hi = (max - amount).max(mid);
            (lo, hi)
        };
        let (min_x, max_x) = shrink(self.min.x, self.max.x, center.x);
        let (min_y, max_y) = shrink(self.min.y, self.max.y, center.y);
        let (min_z, max_z) = shrink(self.min.z, self.max.z, center.z);
        Self {
            min: Vec3::new(min_x, min_y, min_z),
            max: Vec3::new(max_x, max_y, max_z),
        }
    }

    /// Centre of the box.
    pub fn center(self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Extent along `axis`.
    pub fn length(self, axis: Axis) -> f64 {
        self.max.component(axis) - self.min.component(axis)
    }

    /// Whether `point` lies inside the box (borders included).
    pub fn contains(self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Whether two boxes overlap with a non-zero volume.
    pub fn intersects(self, other: Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// The flat box covering one face.
    #[must_use]
    pub fn face(self, face: Direction) -> Self {
        let axis = face.axis();
        let plane = if face.is_positive() {
            self.max.component(axis)
        } else {
            self.min.component(axis)
        };
        Self {
            min: self.min.with_component(axis, plane),
            max: self.max.with_component(axis, plane),
        }
    }

    /// The point of `face` closest to `target`.
    pub fn closest_on_face(self, face: Direction, target: Vec3) -> Vec3 {
        let flat = self.face(face);
        Vec3::new(
            target.x.clamp(flat.min.x, flat.max.x),
            target.y.clamp(flat.min.y, flat.max.y),
            target.z.clamp(flat.min.z, flat.max.z),
        )
    }

    /// Faces of this box that can be seen from `eye`.
    ///
    /// A face is visible when the eye lies beyond it along the face's axis.
    pub fn visible_faces(self, eye: Vec3) -> Vec<Direction> {
        let center = self.center();
        let mut faces = Vec::with_capacity(3);
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let diff = eye.component(axis) - center.component(axis);
            let limit = self.length(axis) / 2.0;
            if diff < -limit {
                faces.push(axis.negative());
            } else if diff > limit {
                faces.push(axis.positive());
            }
        }
        faces
    }
}

/// A look direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Horizontal angle in degrees.
    pub yaw: f64,
    /// Vertical angle in degrees, positive looking down.
    pub pitch: f64,
}

impl Rotation {
    /// Create a rotation, clamping the pitch.
    pub const fn new(yaw: f64, pitch: f64) -> Self {
        Self {
            yaw,
            pitch: pitch.clamp(-90.0, 90.0),
        }
    }

    /// The rotation that aims from `eye` at `target`.
    pub fn between(eye: Vec3, target: Vec3) -> Self {
        let d = target - eye;
        let horizontal = d.x.hypot(d.z);
        let yaw = d.z.atan2(d.x).to_degrees() - 90.0;
        let pitch = -d.y.atan2(horizontal).to_degrees();
        Self::new(wrap_degrees(yaw), pitch)
    }

    /// Angular distance to `other`, taking yaw wrap-around into account.
    pub fn angle_to(self, other: Self) -> f64 {
        let yaw = wrap_degrees(other.yaw - self.yaw);
        let pitch = other.pitch - self.pitch;
        yaw.hypot(pitch)
    }

    /// Unit vector pointing along this rotation.
    pub fn direction(self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        Vec3::new(
            -yaw.sin() * pitch.cos(),
            -pitch.sin(),
            yaw.cos() * pitch.cos(),
        )
    }
}

/// Wrap an angle into `[-180, 180)`.
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped.is_nan() { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn offset_and_opposite_are_inverse() {
        let pos = BlockPos::new(3, 64, -7);
        for face in Direction::ALL {
            assert_eq!(pos.offset(face).offset(face.opposite()), pos);
        }
    }

    #[test]
    fn rotation_towards_south_is_zero_yaw() {
        let rotation = Rotation::between(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0));
        assert!(close(rotation.yaw, 0.0));
        assert!(close(rotation.pitch, 0.0));
    }

    #[test]
    fn rotation_straight_down_clamps_pitch() {
        let rotation = Rotation::between(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO);
        assert!(close(rotation.pitch, 90.0));
    }

    #[test]
    fn rotation_direction_roundtrip() {
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let target = Vec3::new(-4.0, 0.5, 7.0);
        let rotation = Rotation::between(eye, target);
        let dir = rotation.direction();
        let expected = target - eye;
        let scale = expected.length_sq().sqrt();
        assert!(close(dir.x * scale, expected.x));
        assert!(close(dir.y * scale, expected.y));
        assert!(close(dir.z * scale, expected.z));
    }

    #[test]
    fn angle_wraps_around() {
        let a = Rotation::new(179.0, 0.0);
        let b = Rotation::new(-179.0, 0.0);
        assert!(close(a.angle_to(b), 2.0));
    }

    #[test]
    fn visible_faces_from_above_corner() {
        let cube = Aabb::FULL_CUBE;
        let faces = cube.visible_faces(Vec3::new(2.0, 3.0, 0.5));
        assert_eq!(faces, vec![Direction::East, Direction::Up]);
    }

    #[test]
    fn closest_point_is_clamped_onto_face() {
        let cube = Aabb::FULL_CUBE.at(BlockPos::new(0, 0, 0));
        let point = cube.closest_on_face(Direction::Up, Vec3::new(3.0, 5.0, 0.25));
        assert!(close(point.x, 1.0));
        assert!(close(point.y, 1.0));
        assert!(close(point.z, 0.25));
    }

    #[test]
    fn contract_never_inverts() {
        let thin = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.0001, 1.0));
        let contracted = thin.contract(0.01);
        assert!(contracted.min.y <= contracted.max.y);
    }

    #[test]
    fn block_pos_of_negative_point() {
        assert_eq!(Vec3::new(-0.5, 0.2, 1.9).block_pos(), BlockPos::new(-1, 0, 1));
    }
}
