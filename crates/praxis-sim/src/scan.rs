//! Candidate aim points on block shapes.
//!
//! A scan takes the outline boxes of one block and the faces it may be
//! clicked on, and turns them into aim points. The fast path yields one
//! point per face, the point closest to the eye. Strict mode lays a grid
//! over every face and confirms each point with a ray cast.
//!
//! Points beyond the reach are kept as misses. A scan with no hits but some
//! misses means the block is out of reach; a scan with neither means no
//! permitted face could be seen at all.

use praxis_core::config::BuildConfig;
use praxis_types::{Aabb, Axis, BlockPos, Direction, Rotation, Vec3};

use crate::world::{Viewpoint, WorldView};

/// Which half of a block along one axis may be scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanHalf {
    /// The half towards negative coordinates.
    Lesser,
    /// The half towards positive coordinates.
    Greater,
}

/// Restricts a scan to one half of the block along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceScan {
    /// The allowed half.
    pub half: ScanHalf,
    /// The axis the block is split along.
    pub axis: Axis,
}

impl SurfaceScan {
    /// Restrict to the lower or upper half of the block.
    pub const fn vertical(half: ScanHalf) -> Self {
        Self {
            half,
            axis: Axis::Y,
        }
    }
}

/// One valid aim point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Block the point belongs to.
    pub pos: BlockPos,
    /// The aim point.
    pub point: Vec3,
    /// Face the point lies on.
    pub face: Direction,
    /// Rotation that aims at the point.
    pub rotation: Rotation,
    /// Squared distance from the eye.
    pub distance_sq: f64,
}

/// Everything one scan found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// Points in reach.
    pub hits: Vec<Hit>,
    /// Points beyond the reach.
    pub misses: Vec<Vec3>,
}

impl ScanOutcome {
    /// Squared distance of the nearest miss.
    pub fn nearest_miss_sq(&self, eye: Vec3) -> Option<f64> {
        self.misses
            .iter()
            .map(|point| eye.distance_sq(*point))
            .min_by(f64::total_cmp)
    }
}

/// The block being scanned.
#[derive(Debug, Clone, Copy)]
pub struct ScanTarget<'a> {
    /// Position of the block.
    pub pos: BlockPos,
    /// Its outline boxes in world coordinates.
    pub boxes: &'a [Aabb],
    /// Faces it may be clicked on.
    pub faces: &'a [Direction],
    /// Optional half restriction.
    pub surface: Option<SurfaceScan>,
    /// Block the half restriction is measured from. Differs from `pos`
    /// when a neighbour is clicked to place into `origin`.
    pub origin: BlockPos,
}

impl<'a> ScanTarget<'a> {
    /// Scan `boxes` of the block at `pos` on `faces`, without restriction.
    pub const fn new(pos: BlockPos, boxes: &'a [Aabb], faces: &'a [Direction]) -> Self {
        Self {
            pos,
            boxes,
            faces,
            surface: None,
            origin: pos,
        }
    }

    /// Restrict the scan to one half of `origin`.
    #[must_use]
    pub const fn restricted(mut self, surface: Option<SurfaceScan>, origin: BlockPos) -> Self {
        self.surface = surface;
        self.origin = origin;
        self
    }
}

/// Scan every box of `target` for aim points.
pub fn scan_shape(
    world: &dyn WorldView,
    view: &Viewpoint,
    config: &BuildConfig,
    target: &ScanTarget<'_>,
) -> ScanOutcome {
    let reach_sq = config.reach * config.reach;
    let mut outcome = ScanOutcome::default();

    for aabb in target.boxes {
        let Some((scan_box, invalid)) =
            scan_box(*aabb, config.shrink_factor, target.surface, target.origin)
        else {
            continue;
        };
        let visible = aabb.visible_faces(view.eye);
        let facing_only = config.check_side_visibility || config.strict_ray_cast;
        let faces: Vec<Direction> = target
            .faces
            .iter()
            .copied()
            .filter(|face| !facing_only || visible.contains(face))
            .filter(|face| !invalid.contains(face))
            .collect();

        let points = if config.strict_ray_cast {
            scan_surfaces(scan_box, &faces, config.resolution)
        } else {
            scan_closest_points(scan_box, view.eye, &faces)
        };

        for (point, face) in points {
            let distance_sq = view.eye.distance_sq(point);
            if distance_sq > reach_sq {
                outcome.misses.push(point);
                continue;
            }
            let rotation = Rotation::between(view.eye, point);
            if config.strict_ray_cast {
                let confirmed = world
                    .ray_cast(view.eye, rotation, config.reach)
                    .is_some_and(|hit| hit.pos == target.pos && hit.face == face);
                if !confirmed {
                    continue;
                }
            }
            outcome.hits.push(Hit {
                pos: target.pos,
                point,
                face,
                rotation,
                distance_sq,
            });
        }
    }

    outcome
}

/// One point per face: the point of the face closest to `eye`.
pub fn scan_closest_points(
    scan_box: Aabb,
    eye: Vec3,
    faces: &[Direction],
) -> Vec<(Vec3, Direction)> {
    faces
        .iter()
        .map(|face| (scan_box.closest_on_face(*face, eye), *face))
        .collect()
}

/// A `(resolution + 1)²` grid of points on every face.
pub fn scan_surfaces(
    scan_box: Aabb,
    faces: &[Direction],
    resolution: u32,
) -> Vec<(Vec3, Direction)> {
    let steps = resolution.max(1);
    let mut points = Vec::new();
    for face in faces {
        let flat = scan_box.face(*face);
        let (a, b) = other_axes(face.axis());
        for i in 0..=steps {
            for j in 0..=steps {
                let point = flat
                    .min
                    .with_component(a, lerp(flat, a, i, steps))
                    .with_component(b, lerp(flat, b, j, steps));
                points.push((point, *face));
            }
        }
    }
    points
}

fn lerp(flat: Aabb, axis: Axis, step: u32, steps: u32) -> f64 {
    let min = flat.min.component(axis);
    let max = flat.max.component(axis);
    min + (max - min) * f64::from(step) / f64::from(steps)
}

const fn other_axes(axis: Axis) -> (Axis, Axis) {
    match axis {
        Axis::X => (Axis::Y, Axis::Z),
        Axis::Y => (Axis::X, Axis::Z),
        Axis::Z => (Axis::X, Axis::Y),
    }
}

/// The box actually scanned, plus the faces the restriction cut away.
///
/// Returns `None` when the restriction leaves nothing of the box.
fn scan_box(
    aabb: Aabb,
    shrink: f64,
    surface: Option<SurfaceScan>,
    origin: BlockPos,
) -> Option<(Aabb, Vec<Direction>)> {
    let contracted = aabb.contract(shrink);
    let Some(surface) = surface else {
        return Some((contracted, Vec::new()));
    };

    let axis = surface.axis;
    let min = contracted.min.component(axis);
    let max = contracted.max.component(axis);
    let base = f64::from(origin.component(axis));
    let (lo, hi, cut) = match surface.half {
        ScanHalf::Greater => {
            let lo = (base + 0.501).max(min);
            (lo, max, (lo > min).then(|| axis.negative()))
        }
        ScanHalf::Lesser => {
            let hi = (base + 0.499).min(max);
            (min, hi, (hi < max).then(|| axis.positive()))
        }
    };
    if lo > hi {
        return None;
    }

    let restricted = Aabb {
        min: contracted.min.with_component(axis, lo),
        max: contracted.max.with_component(axis, hi),
    };
    Some((restricted, cut.into_iter().collect()))
}
