//! Per-frame orchestration of the lanyard.
//!
//! Frame order is fixed: drag override, entrance override, solver steps,
//! rope curve, torsion correction. The first failing step ends the frame and
//! is handed to the observer; the next frame starts clean.

use rapier3d::na::{Point3, UnitQuaternion, Vector3};
use serde::Serialize;

use crate::assets::{AssetKind, Assets};
use crate::camera::Camera;
use crate::chain::PhysicsChain;
use crate::config::LanyardConfig;
use crate::curve::CurveRenderer;
use crate::drag::DragController;
use crate::entrance::{EntranceAnimator, EntranceFrame};
use crate::error::LanyardError;
use crate::segment::SegmentId;

/// Longest frame the scene will simulate; longer gaps (e.g. a hidden tab) are
/// cut short.
pub const MAX_FRAME_DT: f32 = 0.1;

/// Fraction of the resting card scale below which the card cannot be picked.
pub const MIN_PICK_SCALE: f32 = 0.1;

/// Hooks called by [`Scene::frame`]. All methods default to no-ops.
pub trait FrameObserver {
    /// A frame step failed; the rest of that frame was skipped.
    fn on_error(&mut self, _error: &LanyardError) {}

    /// The chain was rebuilt after a corrupt state.
    fn on_reinitialize(&mut self) {}

    fn on_frame_complete(&mut self, _output: &FrameOutput) {}
}

/// Observer that ignores everything.
pub struct NoOpObserver;

impl FrameObserver for NoOpObserver {}

/// Observer that forwards failures to the `log` facade.
pub struct LogObserver;

impl FrameObserver for LogObserver {
    fn on_error(&mut self, error: &LanyardError) {
        log::warn!("lanyard frame skipped: {error}");
    }

    fn on_reinitialize(&mut self) {
        log::error!("lanyard chain state corrupt, rebuilt from config");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CursorHint {
    Default,
    Grab,
    Grabbing,
}

impl CursorHint {
    pub fn as_css(self) -> &'static str {
        match self {
            CursorHint::Default => "auto",
            CursorHint::Grab => "grab",
            CursorHint::Grabbing => "grabbing",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CardTransform {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
    /// Visual scale of the card face.
    pub scale: f32,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug)]
pub struct FrameOutput {
    pub rope: Vec<Point3<f32>>,
    pub rope_opacity: f32,
    pub card: CardTransform,
    /// Connector at j3 and above the card centre.
    pub connectors: [Point3<f32>; 2],
    pub connector_scale: f32,
    pub cursor: CursorHint,
    pub line_resolution: [f32; 2],
    pub entrance_running: bool,
}

/// Visual values that the entrance overrides.
#[derive(Clone, Copy, Debug)]
struct Visuals {
    mesh_scale: f32,
    rope_opacity: f32,
    connector_scale: f32,
}

pub struct Scene {
    config: LanyardConfig,
    chain: PhysicsChain,
    drag: DragController,
    curve: CurveRenderer,
    entrance: EntranceAnimator,
    assets: Assets,
    camera: Camera,
    pointer: Option<[f32; 2]>,
    hovered: bool,
    accumulator: f32,
    visuals: Visuals,
    line_resolution: [f32; 2],
    released_pointer: Option<i32>,
    torn_down: bool,
}

impl Scene {
    /// Validate `config`, build the chain and start the entrance at `now_ms`.
    pub fn new(config: LanyardConfig, now_ms: f64, aspect: f32) -> Result<Self, LanyardError> {
        config.validate()?;
        let chain = PhysicsChain::new(&config.physics, &config.card);
        let curve = CurveRenderer::new(&config.smoothing);
        let entrance = EntranceAnimator::new(&config.entrance, config.card.mesh_scale, now_ms);
        let camera = Camera::from_config(&config.camera, aspect);
        let visuals = if entrance.is_running() {
            Visuals {
                mesh_scale: 0.0,
                rope_opacity: 0.0,
                connector_scale: 0.0,
            }
        } else {
            Self::resting_visuals(&config)
        };
        let line_resolution = config.viewport.large_resolution;
        Ok(Self {
            config,
            chain,
            drag: DragController::new(),
            curve,
            entrance,
            assets: Assets::new(),
            camera,
            pointer: None,
            hovered: false,
            accumulator: 0.0,
            visuals,
            line_resolution,
            released_pointer: None,
            torn_down: false,
        })
    }

    fn resting_visuals(config: &LanyardConfig) -> Visuals {
        Visuals {
            mesh_scale: config.card.mesh_scale,
            rope_opacity: 1.0,
            connector_scale: 1.0,
        }
    }

    pub fn config(&self) -> &LanyardConfig {
        &self.config
    }

    pub fn chain(&self) -> &PhysicsChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut PhysicsChain {
        &mut self.chain
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn curve(&self) -> &CurveRenderer {
        &self.curve
    }

    pub fn entrance(&self) -> &EntranceAnimator {
        &self.entrance
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Viewport changed: update the camera aspect and line resolution preset.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.camera.set_aspect(width, height);
        self.line_resolution = self.config.viewport.resolution_for(width);
    }

    pub fn cursor(&self) -> CursorHint {
        if self.drag.is_dragging() {
            CursorHint::Grabbing
        } else if self.hovered {
            CursorHint::Grab
        } else {
            CursorHint::Default
        }
    }

    fn pick(&self, ndc: [f32; 2]) -> Result<Option<Point3<f32>>, LanyardError> {
        let (origin, dir) = self
            .camera
            .ray(ndc)
            .ok_or(LanyardError::DegenerateRay("zero-length pointer direction"))?;
        // the pick face shrinks with the card while the entrance scales it up
        let scale = self.visuals.mesh_scale / self.config.card.mesh_scale;
        if scale < MIN_PICK_SCALE {
            return Ok(None);
        }
        Ok(self.chain.pick(origin, dir, scale))
    }

    /// Pointer moved to `ndc`. Updates hover and returns the cursor to show.
    pub fn pointer_move(&mut self, ndc: [f32; 2]) -> CursorHint {
        if self.torn_down {
            self.hovered = false;
            return CursorHint::Default;
        }
        self.pointer = Some(ndc);
        self.hovered = matches!(self.pick(ndc), Ok(Some(_)));
        self.cursor()
    }

    pub fn pointer_leave(&mut self) {
        self.hovered = false;
    }

    /// Pointer pressed at `ndc`. Returns `true` when this pointer now owns a
    /// drag of the card and the host should capture it.
    pub fn pointer_down(&mut self, pointer_id: i32, ndc: [f32; 2]) -> Result<bool, LanyardError> {
        if self.torn_down {
            return Ok(false);
        }
        if self.drag.is_dragging() {
            return Ok(false);
        }
        self.pointer = Some(ndc);
        let Some(hit) = self.pick(ndc)? else {
            return Ok(false);
        };
        self.hovered = true;
        self.drag.begin(&mut self.chain, pointer_id, hit)
    }

    /// Pointer released. Returns the pointer whose capture should be released.
    pub fn pointer_up(&mut self, pointer_id: i32) -> Result<Option<i32>, LanyardError> {
        self.drag.end(&mut self.chain, pointer_id)
    }

    /// Pointer that lost its drag outside of `pointer_up` (chain rebuild),
    /// whose capture the host still has to release.
    pub fn take_released_pointer(&mut self) -> Option<i32> {
        self.released_pointer.take()
    }

    pub fn asset_loaded(&mut self, kind: AssetKind) {
        self.assets.mark_loaded(kind);
    }

    /// Record a failed texture load and report it. Drawing falls back to
    /// untextured fills.
    pub fn asset_failed<O: FrameObserver>(
        &mut self,
        kind: AssetKind,
        reason: impl Into<String>,
        observer: &mut O,
    ) {
        let err = self.assets.mark_failed(kind, reason);
        observer.on_error(&err);
    }

    /// Run one frame. `now_ms` is the host clock, `dt` the seconds since the
    /// previous frame.
    pub fn frame<O: FrameObserver>(&mut self, now_ms: f64, dt: f32, observer: &mut O) -> FrameOutput {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        if !self.torn_down
            && let Err(err) = self.run_steps(now_ms, dt)
        {
            observer.on_error(&err);
            if err.is_corruption() {
                self.recover();
                observer.on_reinitialize();
            }
        }
        let output = self.output();
        observer.on_frame_complete(&output);
        output
    }

    fn run_steps(&mut self, now_ms: f64, dt: f32) -> Result<(), LanyardError> {
        let mut drag_target = None;
        if self.drag.is_dragging()
            && let Some(ndc) = self.pointer
        {
            drag_target = self.drag.update(&mut self.chain, &self.camera, ndc, dt)?;
        }

        if self.entrance.is_running() {
            match self.entrance.apply(&mut self.chain, now_ms, dt)? {
                Some(frame) if self.entrance.is_running() => self.visuals = Self::entrance_visuals(&frame),
                _ => self.visuals = Self::resting_visuals(&self.config),
            }
        }

        // a corrupt body must not reach the solver
        self.chain.check_finite()?;
        self.accumulator += dt;
        let timestep = self.config.physics.timestep;
        let max_substeps = self.config.physics.max_substeps.max(1);
        let mut substeps = 0;
        while self.accumulator >= timestep && substeps < max_substeps {
            self.accumulator -= timestep;
            substeps += 1;
            self.chain.step(timestep)?;
        }
        if substeps == max_substeps {
            // drop the backlog rather than spiral
            self.accumulator = self.accumulator.min(timestep);
        }
        if substeps == 0
            && let Some(target) = drag_target
        {
            // kinematic targets only land during a step
            self.chain.set_translation(SegmentId::Card, target)?;
        }

        self.curve.update(&self.chain, dt);
        self.curve.apply_torsion(&mut self.chain)?;
        Ok(())
    }

    fn entrance_visuals(frame: &EntranceFrame) -> Visuals {
        Visuals {
            mesh_scale: frame.mesh_scale,
            rope_opacity: frame.rope_opacity,
            connector_scale: frame.connector_scale,
        }
    }

    /// Rebuild the chain from config after corruption. Any drag is dropped.
    fn recover(&mut self) {
        self.chain.reinitialize();
        self.curve.reset();
        self.accumulator = 0.0;
        if let Some(pointer_id) = self.drag.reset() {
            self.released_pointer = Some(pointer_id);
        }
    }

    /// Stop the scene. Returns a pointer whose capture must be released.
    pub fn teardown(&mut self) -> Option<i32> {
        self.torn_down = true;
        self.hovered = false;
        self.drag.reset().or(self.released_pointer.take())
    }

    pub fn output(&self) -> FrameOutput {
        let card = self.chain.position(SegmentId::Card);
        FrameOutput {
            rope: self.curve.points().to_vec(),
            rope_opacity: self.visuals.rope_opacity,
            card: CardTransform {
                position: card,
                rotation: self.chain.rotation(SegmentId::Card),
                scale: self.visuals.mesh_scale,
            },
            connectors: [
                self.chain.position(SegmentId::J3),
                card + Vector3::from(self.config.card.connector_offset),
            ],
            connector_scale: self.visuals.connector_scale,
            cursor: self.cursor(),
            line_resolution: self.line_resolution,
            entrance_running: self.entrance.is_running(),
        }
    }
}
