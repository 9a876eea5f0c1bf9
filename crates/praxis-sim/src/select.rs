//! Picking one aim point out of many valid ones.

use praxis_core::config::PointSelection;
use praxis_types::{Rotation, Vec3};

use crate::scan::Hit;

/// Select one hit according to `selection`.
///
/// Ties are broken by the first hit in scan order, so the choice is
/// stable for a given set of hits.
pub fn select(selection: PointSelection, current: Rotation, hits: &[Hit]) -> Option<&Hit> {
    match selection {
        PointSelection::ByRotation => hits.iter().min_by(|a, b| {
            current
                .angle_to(a.rotation)
                .total_cmp(&current.angle_to(b.rotation))
        }),
        PointSelection::Optimum => {
            let mean = mean_point(hits)?;
            hits.iter()
                .min_by(|a, b| mean.distance_sq(a.point).total_cmp(&mean.distance_sq(b.point)))
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_point(hits: &[Hit]) -> Option<Vec3> {
    if hits.is_empty() {
        return None;
    }
    let sum = hits.iter().fold(Vec3::ZERO, |acc, hit| acc + hit.point);
    Some(sum * (1.0 / hits.len() as f64))
}
