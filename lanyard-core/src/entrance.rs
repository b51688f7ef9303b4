//! One-shot drop-in of the card when the scene starts.

use std::f32::consts::PI;

use rapier3d::na::{UnitQuaternion, Vector3};

use crate::chain::PhysicsChain;
use crate::config::EntranceConfig;
use crate::error::LanyardError;
use crate::segment::SegmentId;

/// Bounce-out easing on [0, 1].
pub fn ease_out_bounce(t: f32) -> f32 {
    const N: f32 = 7.5625;
    const D: f32 = 2.75;
    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnimationState {
    Running {
        start_ms: f64,
        duration_ms: f64,
        /// Linear progress in [0, 1], before easing.
        progress: f32,
    },
    Complete,
}

/// Values the entrance overrides for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntranceFrame {
    pub ease: f32,
    pub card_position: Vector3<f32>,
    /// Roll about X in radians.
    pub roll: f32,
    pub mesh_scale: f32,
    pub rope_opacity: f32,
    pub connector_scale: f32,
}

impl EntranceFrame {
    /// Overrides for an already eased value.
    pub fn from_ease(ease: f32, cfg: &EntranceConfig, mesh_scale: f32) -> Self {
        let [x, z] = cfg.track_xz;
        Self {
            ease,
            card_position: Vector3::new(x, cfg.start_y + (cfg.target_y - cfg.start_y) * ease, z),
            roll: (ease * PI).sin() * cfg.roll_amplitude,
            mesh_scale: mesh_scale * ease,
            rope_opacity: ease * cfg.rope_opacity,
            connector_scale: ease,
        }
    }

    /// Overrides for linear progress in [0, 1].
    pub fn at_progress(progress: f32, cfg: &EntranceConfig, mesh_scale: f32) -> Self {
        Self::from_ease(ease_out_bounce(progress.clamp(0.0, 1.0)), cfg, mesh_scale)
    }
}

pub struct EntranceAnimator {
    config: EntranceConfig,
    mesh_scale: f32,
    state: AnimationState,
    last: Option<EntranceFrame>,
}

impl EntranceAnimator {
    /// Starts running at `now_ms`, or already complete when disabled.
    pub fn new(cfg: &EntranceConfig, mesh_scale: f32, now_ms: f64) -> Self {
        let state = if cfg.enabled && cfg.duration_ms > 0.0 {
            AnimationState::Running {
                start_ms: now_ms,
                duration_ms: cfg.duration_ms,
                progress: 0.0,
            }
        } else {
            AnimationState::Complete
        };
        Self {
            config: cfg.clone(),
            mesh_scale,
            state,
            last: None,
        }
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, AnimationState::Running { .. })
    }

    /// Advance to `now_ms` and return this frame's overrides. Returns `None`
    /// once complete. Progress never moves backwards, even if the clock does.
    pub fn advance(&mut self, now_ms: f64) -> Option<EntranceFrame> {
        let AnimationState::Running {
            start_ms,
            duration_ms,
            progress,
        } = self.state
        else {
            return None;
        };
        let elapsed = ((now_ms - start_ms) / duration_ms).clamp(0.0, 1.0) as f32;
        let progress = elapsed.max(progress);
        let frame = EntranceFrame::at_progress(progress, &self.config, self.mesh_scale);
        self.state = if progress >= 1.0 {
            log::debug!("entrance complete");
            AnimationState::Complete
        } else {
            AnimationState::Running {
                start_ms,
                duration_ms,
                progress,
            }
        };
        Some(frame)
    }

    /// Advance and write the card override into the chain. The whole chain
    /// is woken first so the joints react to the scripted motion.
    ///
    /// The card's velocity is set to the motion of the scripted path since the
    /// previous frame and its spin is cleared, so when the animation finishes
    /// the solver continues from the last animated velocity.
    pub fn apply(
        &mut self,
        chain: &mut PhysicsChain,
        now_ms: f64,
        dt: f32,
    ) -> Result<Option<EntranceFrame>, LanyardError> {
        let Some(frame) = self.advance(now_ms) else {
            return Ok(None);
        };
        let velocity = match self.last {
            Some(prev) if dt > 0.0 => (frame.card_position - prev.card_position) / dt,
            _ => Vector3::zeros(),
        };
        chain.wake_all()?;
        chain.set_translation(SegmentId::Card, frame.card_position)?;
        chain.set_rotation(
            SegmentId::Card,
            UnitQuaternion::from_euler_angles(frame.roll, 0.0, 0.0),
        )?;
        chain.set_linvel(SegmentId::Card, velocity)?;
        chain.set_angvel(SegmentId::Card, Vector3::zeros())?;
        self.last = Some(frame);
        Ok(Some(frame))
    }
}
