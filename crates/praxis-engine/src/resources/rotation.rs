//! The player's look direction.

use praxis_core::config::RotationConfig;
use praxis_core::manager::{Admission, Resource, Retention};
use praxis_core::request::Request;
use praxis_types::{Rotation, Stage, wrap_degrees};

use crate::world::SharedWorld;

/// Rotations closer than this many degrees count as reached.
pub const TOLERANCE_DEGREES: f64 = 0.001;

/// Turns the player towards the active request's rotation.
#[derive(Debug)]
pub struct RotationResource {
    world: SharedWorld,
    keep_ticks: u32,
    turn_speed: f64,
}

impl RotationResource {
    /// A rotation resource over `world`.
    pub const fn new(world: SharedWorld, config: &RotationConfig) -> Self {
        Self {
            world,
            keep_ticks: config.keep_ticks,
            turn_speed: config.turn_speed,
        }
    }

    /// Turn one step towards `target`.
    fn turn(&self, target: Rotation) {
        let current = self.world.player().rotation;
        if self.turn_speed <= 0.0 {
            self.world.set_rotation(target);
            return;
        }
        let yaw = wrap_degrees(target.yaw - current.yaw);
        let pitch = target.pitch - current.pitch;
        let angle = yaw.hypot(pitch);
        if angle <= self.turn_speed {
            self.world.set_rotation(target);
            return;
        }
        let scale = self.turn_speed / angle;
        self.world.set_rotation(Rotation::new(
            wrap_degrees(current.yaw + yaw * scale),
            current.pitch + pitch * scale,
        ));
    }
}

impl Resource for RotationResource {
    type Payload = Rotation;

    fn apply(&mut self, _stage: Stage, request: &mut Request<Rotation>) -> Admission {
        self.turn(*request.payload());
        Admission::Accepted
    }

    fn is_done(&self, request: &Request<Rotation>) -> bool {
        self.world.player().rotation.angle_to(*request.payload()) < TOLERANCE_DEGREES
    }

    fn end_tick(&mut self, active: Option<&mut Request<Rotation>>) -> Retention {
        let Some(request) = active else {
            return Retention::Keep;
        };
        if request.age().matched_ticks >= self.keep_ticks {
            return Retention::Release;
        }
        if !self.is_done(request) {
            self.turn(*request.payload());
        }
        Retention::Keep
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use praxis_core::manager::RequestStatus;
    use praxis_sim::grid::GridWorld;
    use praxis_types::{OwnerId, Vec3};

    use super::*;
    use crate::resources::bench::Bench;

    fn world() -> SharedWorld {
        SharedWorld::new(GridWorld::default(), Vec3::ZERO)
    }

    #[test]
    fn instant_turn_reaches_the_target() {
        let world = world();
        let mut bench = Bench::new(RotationResource::new(world.clone(), &RotationConfig::default()));
        bench.open();
        let id = bench
            .manager
            .request(Request::new(OwnerId::new(), Rotation::new(90.0, 30.0)), false);
        assert!(bench.manager.is_done(id));
        assert!((world.player().rotation.yaw - 90.0).abs() < 1e-9);
        assert!((world.player().rotation.pitch - 30.0).abs() < 1e-9);
    }

    #[test]
    fn limited_turn_speed_takes_several_ticks() {
        let world = world();
        let config = RotationConfig {
            keep_ticks: 1,
            turn_speed: 30.0,
        };
        let mut bench = Bench::new(RotationResource::new(world.clone(), &config));
        bench.open();
        let id = bench
            .manager
            .request(Request::new(OwnerId::new(), Rotation::new(90.0, 0.0)), false);
        assert!(!bench.manager.is_done(id));
        assert!((world.player().rotation.yaw - 30.0).abs() < 1e-9);

        bench.finish_tick();
        bench.open();
        assert!(!bench.manager.is_done(id));
        bench.finish_tick();
        bench.open();
        assert!(bench.manager.is_done(id));
    }

    #[test]
    fn released_after_keep_ticks() {
        let mut bench = Bench::new(RotationResource::new(world(), &RotationConfig::default()));
        bench.open();
        let id = bench
            .manager
            .request(Request::new(OwnerId::new(), Rotation::new(10.0, 0.0)), false);
        bench.finish_tick();
        bench.idle(1);
        assert_eq!(bench.manager.status(id), RequestStatus::Active);
        bench.idle(1);
        assert_eq!(bench.manager.status(id), RequestStatus::Unknown);
    }

    #[test]
    fn turning_takes_the_short_way_round() {
        let world = world();
        world.set_rotation(Rotation::new(170.0, 0.0));
        let config = RotationConfig {
            keep_ticks: 1,
            turn_speed: 20.0,
        };
        let mut bench = Bench::new(RotationResource::new(world.clone(), &config));
        bench.open();
        let id = bench
            .manager
            .request(Request::new(OwnerId::new(), Rotation::new(-175.0, 0.0)), false);
        assert!(bench.manager.is_done(id));
        assert!((world.player().rotation.yaw + 175.0).abs() < 1e-9);
    }
}
