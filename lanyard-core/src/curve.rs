//! Rope curve built from the chain each frame.
//!
//! The two internal joints are not drawn where the solver puts them but at a
//! smoothed position that chases the real one. The chase speed grows with the
//! gap, so small jitter is damped heavily and large swings are tracked quickly.

use rapier3d::na::{Point3, Vector3};

use crate::chain::{PhysicsChain, yaw_of};
use crate::config::SmoothingConfig;
use crate::error::LanyardError;
use crate::segment::SegmentId;
use crate::spline::ChordalSpline;

/// Gaps below this snap straight to the target.
const SNAP_DISTANCE: f32 = 1e-6;

/// Move `smoothed` toward `actual` for one frame of length `dt`.
///
/// `rate = dt * (min + clamp(gap, 0.1, 1) * (max - min))`, capped at 1 so a
/// long frame lands on the target instead of overshooting it.
pub fn smooth_toward(
    smoothed: Point3<f32>,
    actual: Point3<f32>,
    dt: f32,
    cfg: &SmoothingConfig,
) -> Point3<f32> {
    let gap = (actual - smoothed).norm();
    if gap <= SNAP_DISTANCE {
        return actual;
    }
    let clamped = gap.clamp(0.1, 1.0);
    let rate = (dt * (cfg.min_speed + clamped * (cfg.max_speed - cfg.min_speed))).clamp(0.0, 1.0);
    smoothed + (actual - smoothed) * rate
}

pub struct CurveRenderer {
    config: SmoothingConfig,
    /// Smoothed j1 and j2. `None` until the joint is first observed; the first
    /// observation copies the actual position.
    smoothed: [Option<Point3<f32>>; 2],
    points: Vec<Point3<f32>>,
}

impl CurveRenderer {
    pub fn new(config: &SmoothingConfig) -> Self {
        Self {
            config: config.clone(),
            smoothed: [None; 2],
            points: Vec::with_capacity(config.curve_samples),
        }
    }

    pub fn smoothed(&self, id: SegmentId) -> Option<Point3<f32>> {
        SegmentId::SMOOTHED
            .iter()
            .position(|s| *s == id)
            .and_then(|slot| self.smoothed[slot])
    }

    /// Feed one joint observation and return the smoothed position.
    pub fn observe(&mut self, id: SegmentId, actual: Point3<f32>, dt: f32) -> Point3<f32> {
        let Some(slot) = SegmentId::SMOOTHED.iter().position(|s| *s == id) else {
            return actual;
        };
        let next = match self.smoothed[slot] {
            None => actual,
            Some(prev) => smooth_toward(prev, actual, dt, &self.config),
        };
        self.smoothed[slot] = Some(next);
        next
    }

    /// Smooth the internal joints and rebuild the rope polyline from
    /// `[j3, j2~, j1~, anchor]`.
    pub fn update(&mut self, chain: &PhysicsChain, dt: f32) -> &[Point3<f32>] {
        let j1 = self.observe(SegmentId::J1, chain.position(SegmentId::J1), dt);
        let j2 = self.observe(SegmentId::J2, chain.position(SegmentId::J2), dt);
        let controls = vec![
            chain.position(SegmentId::J3),
            j2,
            j1,
            chain.position(SegmentId::Anchor),
        ];
        if let Some(spline) = ChordalSpline::new(controls) {
            self.points = spline.sample(self.config.curve_samples);
        }
        &self.points
    }

    pub fn points(&self) -> &[Point3<f32>] {
        &self.points
    }

    /// Forget the smoothed positions; the next update starts from scratch.
    pub fn reset(&mut self) {
        self.smoothed = [None; 2];
        self.points.clear();
    }

    /// Pull the card's yaw rate back toward facing front:
    /// `angvel.y -= gain * yaw`. Returns the new yaw rate.
    pub fn apply_torsion(&self, chain: &mut PhysicsChain) -> Result<f32, LanyardError> {
        let yaw = yaw_of(&chain.rotation(SegmentId::Card));
        let ang = chain.angvel(SegmentId::Card);
        let corrected = Vector3::new(ang.x, ang.y - yaw * self.config.torsion_gain, ang.z);
        chain.set_angvel(SegmentId::Card, corrected)?;
        Ok(corrected.y)
    }
}
