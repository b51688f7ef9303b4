//! Pointer drag of the card.
//!
//! While a drag is active the card body is kinematic and follows the pointer;
//! the rest of the chain stays dynamic and is pulled along by its joints.

use rapier3d::na::{Point3, Vector3};

use crate::camera::Camera;
use crate::chain::PhysicsChain;
use crate::error::LanyardError;
use crate::segment::{MotionMode, SegmentId};

#[derive(Clone, Debug, PartialEq)]
pub enum DragState {
    Idle,
    Dragging {
        pointer_id: i32,
        /// Contact point minus card position at grab time.
        grab_offset: Vector3<f32>,
    },
}

/// Single drag slot: one pointer owns the card until it is released.
#[derive(Debug)]
pub struct DragController {
    state: DragState,
    last_translation: Option<Vector3<f32>>,
    velocity: Vector3<f32>,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new()
    }
}

impl DragController {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
            last_translation: None,
            velocity: Vector3::zeros(),
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn grab_offset(&self) -> Option<Vector3<f32>> {
        match self.state {
            DragState::Dragging { grab_offset, .. } => Some(grab_offset),
            DragState::Idle => None,
        }
    }

    /// Velocity implied by the last two drag frames.
    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    /// Grab the card at `hit`. Returns `false` when another pointer already
    /// owns the drag.
    pub fn begin(
        &mut self,
        chain: &mut PhysicsChain,
        pointer_id: i32,
        hit: Point3<f32>,
    ) -> Result<bool, LanyardError> {
        if self.is_dragging() {
            return Ok(false);
        }
        let card = chain.position(SegmentId::Card);
        chain.wake_all()?;
        chain.set_motion(SegmentId::Card, MotionMode::Kinematic)?;
        self.state = DragState::Dragging {
            pointer_id,
            grab_offset: hit - card,
        };
        self.last_translation = None;
        self.velocity = Vector3::zeros();
        log::debug!("drag start: pointer {pointer_id}, offset {:?}", hit - card);
        Ok(true)
    }

    /// World-space point the pointer is dragging toward.
    ///
    /// The pointer is unprojected at NDC depth 0.5 and pushed further along
    /// the eye ray by the camera's distance from the world origin. This is an
    /// approximation of a ray/plane hit, not an exact one; drag feel depends
    /// on it, so it is kept as is.
    pub fn drag_target(camera: &Camera, ndc: [f32; 2]) -> Result<Point3<f32>, LanyardError> {
        if !ndc.iter().all(|v| v.is_finite()) {
            return Err(LanyardError::DegenerateRay("non-finite pointer coordinates"));
        }
        let p = camera.unproject(Point3::new(ndc[0], ndc[1], 0.5));
        let dir = (p - camera.position)
            .try_normalize(f32::EPSILON)
            .ok_or(LanyardError::DegenerateRay("zero-length pointer direction"))?;
        let target = p + dir * camera.position.coords.norm();
        if !target.iter().all(|v| v.is_finite()) {
            return Err(LanyardError::DegenerateRay("non-finite drag target"));
        }
        Ok(target)
    }

    /// Drive the card toward the pointer for this frame. Returns the card
    /// translation that was requested, or `None` when idle.
    pub fn update(
        &mut self,
        chain: &mut PhysicsChain,
        camera: &Camera,
        ndc: [f32; 2],
        dt: f32,
    ) -> Result<Option<Vector3<f32>>, LanyardError> {
        let DragState::Dragging { grab_offset, .. } = self.state else {
            return Ok(None);
        };
        let target = Self::drag_target(camera, ndc)?;
        let translation = target.coords - grab_offset;
        chain.wake_all()?;
        chain.set_next_kinematic_translation(SegmentId::Card, translation)?;
        if let Some(prev) = self.last_translation
            && dt > 0.0
        {
            self.velocity = (translation - prev) / dt;
        }
        self.last_translation = Some(translation);
        Ok(Some(translation))
    }

    /// Release the drag held by `pointer_id`. The card goes back to force
    /// integration starting from the drag velocity. Returns the pointer whose
    /// capture should be released.
    pub fn end(
        &mut self,
        chain: &mut PhysicsChain,
        pointer_id: i32,
    ) -> Result<Option<i32>, LanyardError> {
        match self.state {
            DragState::Dragging { pointer_id: owner, .. } if owner == pointer_id => {
                self.state = DragState::Idle;
                self.last_translation = None;
                chain.set_motion(SegmentId::Card, MotionMode::Dynamic)?;
                chain.set_linvel(SegmentId::Card, self.velocity)?;
                chain.wake_all()?;
                log::debug!("drag end: pointer {pointer_id}, velocity {:?}", self.velocity);
                Ok(Some(pointer_id))
            }
            _ => Ok(None),
        }
    }

    /// Drop any drag without touching the chain, e.g. after the chain was
    /// rebuilt. Returns the pointer that held the drag.
    pub fn reset(&mut self) -> Option<i32> {
        let owner = match self.state {
            DragState::Dragging { pointer_id, .. } => Some(pointer_id),
            DragState::Idle => None,
        };
        self.state = DragState::Idle;
        self.last_translation = None;
        self.velocity = Vector3::zeros();
        owner
    }
}
