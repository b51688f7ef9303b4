//! The five-body rope chain, backed by rapier3d.
//!
//! `anchor` is a fixed body. `j1..j3` are light dynamic balls linked by rope
//! joints (free rotation, bounded separation), and the card hangs from `j3` on
//! a ball joint whose pivot sits above the card's centre. The solver enforces
//! the joint lengths; nothing here recomputes them.

use rapier3d::na::{Point3, UnitQuaternion, Vector3};
use rapier3d::parry::query::{Ray, RayCast};
use rapier3d::parry::shape::Cuboid;
use rapier3d::prelude::*;

use crate::config::{CardConfig, PhysicsConfig};
use crate::error::LanyardError;
use crate::segment::{MotionMode, SegmentId};

/// Wraps the rapier pipeline and the handle table for the chain's bodies.
pub struct PhysicsChain {
    physics: PhysicsConfig,
    card: CardConfig,
    gravity: Vector3<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    handles: [RigidBodyHandle; 5],
    card_collider: ColliderHandle,
}

impl PhysicsChain {
    pub fn new(physics: &PhysicsConfig, card: &CardConfig) -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let mut impulse_joints = ImpulseJointSet::new();

        let anchor = physics.anchor();
        let segment = |x: f32| {
            RigidBodyBuilder::dynamic()
                .translation(vector![anchor.x + x, anchor.y, anchor.z])
                .linear_damping(physics.linear_damping)
                .angular_damping(physics.angular_damping)
                .can_sleep(true)
        };

        let fixed = bodies.insert(
            RigidBodyBuilder::fixed()
                .translation(anchor.coords)
                .build(),
        );
        let [x1, x2, x3, x_card] = physics.spawn_offsets;
        let mut joints = [fixed; 3];
        for (slot, x) in joints.iter_mut().zip([x1, x2, x3]) {
            let handle = bodies.insert(segment(x).build());
            colliders.insert_with_parent(
                ColliderBuilder::ball(physics.joint_radius).build(),
                handle,
                &mut bodies,
            );
            *slot = handle;
        }
        let card_body = bodies.insert(segment(x_card).build());
        let [hx, hy, hz] = card.half_extents;
        let card_collider = colliders.insert_with_parent(
            ColliderBuilder::cuboid(hx, hy, hz).build(),
            card_body,
            &mut bodies,
        );

        let handles = [fixed, joints[0], joints[1], joints[2], card_body];
        for pair in handles[..4].windows(2) {
            let rope = RopeJointBuilder::new(physics.segment_length)
                .local_anchor1(point![0.0, 0.0, 0.0])
                .local_anchor2(point![0.0, 0.0, 0.0])
                .build();
            impulse_joints.insert(pair[0], pair[1], rope, true);
        }
        let ball = SphericalJointBuilder::new()
            .local_anchor1(point![0.0, 0.0, 0.0])
            .local_anchor2(Point3::from(card.pivot))
            .build();
        impulse_joints.insert(handles[3], handles[4], ball, true);

        log::debug!(
            "lanyard chain built: anchor at {:?}, segment length {}",
            physics.anchor,
            physics.segment_length
        );

        Self {
            physics: physics.clone(),
            card: card.clone(),
            gravity: physics.gravity(),
            integration_parameters: IntegrationParameters {
                dt: physics.timestep,
                ..IntegrationParameters::default()
            },
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            impulse_joints,
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            handles,
            card_collider,
        }
    }

    /// Throw away all solver state and rebuild the chain at its spawn pose.
    pub fn reinitialize(&mut self) {
        *self = Self::new(&self.physics, &self.card);
    }

    /// Advance every body through the solver once.
    pub fn step(&mut self, dt: f32) -> Result<(), LanyardError> {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
        self.check_finite()
    }

    /// Error on the first body whose transform or velocity is NaN or infinite.
    pub fn check_finite(&self) -> Result<(), LanyardError> {
        for id in SegmentId::ALL {
            let rb = self.body(id)?;
            let finite = rb.translation().iter().all(|v| v.is_finite())
                && rb.rotation().coords.iter().all(|v| v.is_finite())
                && rb.linvel().iter().all(|v| v.is_finite())
                && rb.angvel().iter().all(|v| v.is_finite());
            if !finite {
                return Err(LanyardError::NonFiniteState { segment: id });
            }
        }
        Ok(())
    }

    pub fn body(&self, id: SegmentId) -> Result<&RigidBody, LanyardError> {
        self.bodies
            .get(self.handles[id.index()])
            .ok_or(LanyardError::MissingBody(id))
    }

    fn body_mut(&mut self, id: SegmentId) -> Result<&mut RigidBody, LanyardError> {
        self.bodies
            .get_mut(self.handles[id.index()])
            .ok_or(LanyardError::MissingBody(id))
    }

    pub fn handle(&self, id: SegmentId) -> RigidBodyHandle {
        self.handles[id.index()]
    }

    pub fn position(&self, id: SegmentId) -> Point3<f32> {
        self.body(id)
            .map(|rb| Point3::from(*rb.translation()))
            .unwrap_or_else(|_| Point3::origin())
    }

    pub fn rotation(&self, id: SegmentId) -> UnitQuaternion<f32> {
        self.body(id)
            .map(|rb| *rb.rotation())
            .unwrap_or_else(|_| UnitQuaternion::identity())
    }

    pub fn linvel(&self, id: SegmentId) -> Vector3<f32> {
        self.body(id)
            .map(|rb| *rb.linvel())
            .unwrap_or_else(|_| Vector3::zeros())
    }

    pub fn angvel(&self, id: SegmentId) -> Vector3<f32> {
        self.body(id)
            .map(|rb| *rb.angvel())
            .unwrap_or_else(|_| Vector3::zeros())
    }

    pub fn is_sleeping(&self, id: SegmentId) -> bool {
        self.body(id).map(|rb| rb.is_sleeping()).unwrap_or(false)
    }

    pub fn motion(&self, id: SegmentId) -> MotionMode {
        match self.body(id).map(|rb| rb.body_type()) {
            Ok(RigidBodyType::KinematicPositionBased | RigidBodyType::KinematicVelocityBased) => {
                MotionMode::Kinematic
            }
            _ => MotionMode::Dynamic,
        }
    }

    /// Force a sleeping body active. Sleeping bodies ignore transform writes.
    pub fn wake(&mut self, id: SegmentId) -> Result<(), LanyardError> {
        self.body_mut(id)?.wake_up(true);
        Ok(())
    }

    pub fn sleep(&mut self, id: SegmentId) -> Result<(), LanyardError> {
        self.body_mut(id)?.sleep();
        Ok(())
    }

    pub fn wake_all(&mut self) -> Result<(), LanyardError> {
        for id in SegmentId::ALL {
            self.wake(id)?;
        }
        Ok(())
    }

    /// Switch a body between force integration and scripted positioning.
    /// The anchor stays fixed whatever is asked.
    pub fn set_motion(&mut self, id: SegmentId, mode: MotionMode) -> Result<(), LanyardError> {
        if id == SegmentId::Anchor {
            return Ok(());
        }
        let body_type = match mode {
            MotionMode::Dynamic => RigidBodyType::Dynamic,
            MotionMode::Kinematic => RigidBodyType::KinematicPositionBased,
        };
        self.body_mut(id)?.set_body_type(body_type, true);
        Ok(())
    }

    /// Target the next step moves a kinematic body to.
    pub fn set_next_kinematic_translation(
        &mut self,
        id: SegmentId,
        translation: Vector3<f32>,
    ) -> Result<(), LanyardError> {
        self.body_mut(id)?.set_next_kinematic_translation(translation);
        Ok(())
    }

    /// Teleport a body, bypassing the solver.
    pub fn set_translation(
        &mut self,
        id: SegmentId,
        translation: Vector3<f32>,
    ) -> Result<(), LanyardError> {
        self.body_mut(id)?.set_translation(translation, true);
        Ok(())
    }

    pub fn set_rotation(
        &mut self,
        id: SegmentId,
        rotation: UnitQuaternion<f32>,
    ) -> Result<(), LanyardError> {
        self.body_mut(id)?.set_rotation(rotation, true);
        Ok(())
    }

    pub fn set_linvel(&mut self, id: SegmentId, linvel: Vector3<f32>) -> Result<(), LanyardError> {
        self.body_mut(id)?.set_linvel(linvel, true);
        Ok(())
    }

    pub fn set_angvel(&mut self, id: SegmentId, angvel: Vector3<f32>) -> Result<(), LanyardError> {
        self.body_mut(id)?.set_angvel(angvel, true);
        Ok(())
    }

    /// Cast a world-space ray against the card and return the first contact
    /// point. `scale` shrinks the face extents (not the thickness) to match a
    /// card that is drawn smaller than its collider.
    pub fn pick(&self, origin: Point3<f32>, dir: Vector3<f32>, scale: f32) -> Option<Point3<f32>> {
        if scale.is_nan() || scale <= 0.0 {
            return None;
        }
        let collider = self.colliders.get(self.card_collider)?;
        let body = self.body(SegmentId::Card).ok()?;
        // collider poses only sync during a step; go through the body so a
        // teleport is seen immediately
        let pose = match collider.position_wrt_parent() {
            Some(rel) => body.position() * rel,
            None => *body.position(),
        };
        let half = collider.shape().as_cuboid()?.half_extents;
        let face = Cuboid::new(Vector3::new(half.x * scale, half.y * scale, half.z));
        let ray = Ray::new(origin, dir);
        let toi = face.cast_ray(&pose, &ray, Real::MAX, true)?;
        Some(ray.point_at(toi))
    }

    /// World position of the card's ball-joint pivot.
    pub fn card_pivot(&self) -> Point3<f32> {
        let rot = self.rotation(SegmentId::Card);
        self.position(SegmentId::Card) + rot * Vector3::from(self.card.pivot)
    }

    /// How far each link exceeds its configured length, anchor side first.
    /// The last entry is the card centre's distance past the pivot distance.
    pub fn link_stretch(&self) -> [f32; 4] {
        let mut out = [0.0; 4];
        for (i, id) in [SegmentId::J1, SegmentId::J2, SegmentId::J3, SegmentId::Card]
            .into_iter()
            .enumerate()
        {
            let Some(parent) = id.parent() else { continue };
            let limit = if id == SegmentId::Card {
                self.card.pivot_distance()
            } else {
                self.physics.segment_length
            };
            let d = (self.position(id) - self.position(parent)).norm();
            out[i] = d - limit;
        }
        out
    }

    pub fn physics_config(&self) -> &PhysicsConfig {
        &self.physics
    }

    pub fn card_config(&self) -> &CardConfig {
        &self.card
    }
}

/// Twist of a rotation about world Y, in (-pi, pi].
pub fn yaw_of(rotation: &UnitQuaternion<f32>) -> f32 {
    let (j, w) = if rotation.w < 0.0 {
        (-rotation.j, -rotation.w)
    } else {
        (rotation.j, rotation.w)
    };
    2.0 * j.atan2(w)
}
