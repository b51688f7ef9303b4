//! Tuning values for the lanyard scene.
//! Lengths are in world units, times in seconds unless noted otherwise.

use rapier3d::na::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::LanyardError;

/// Full scene configuration. Every section falls back to its defaults, so a
/// JSON override only needs the fields it changes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanyardConfig {
    pub physics: PhysicsConfig,
    pub smoothing: SmoothingConfig,
    pub card: CardConfig,
    pub entrance: EntranceConfig,
    pub camera: CameraConfig,
    pub viewport: ViewportConfig,
}

impl LanyardConfig {
    /// Parse a (possibly partial) JSON override and validate it.
    pub fn from_json(text: &str) -> Result<Self, LanyardError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the solver or the camera cannot work with.
    pub fn validate(&self) -> Result<(), LanyardError> {
        let p = &self.physics;
        check(p.gravity.iter().all(|v| v.is_finite()), "physics.gravity", "must be finite")?;
        check(p.timestep.is_finite() && p.timestep > 0.0, "physics.timestep", "must be positive")?;
        check(p.max_substeps >= 1, "physics.max_substeps", "must be at least 1")?;
        check(p.anchor.iter().all(|v| v.is_finite()), "physics.anchor", "must be finite")?;
        check(
            p.spawn_offsets.iter().all(|v| v.is_finite()),
            "physics.spawn_offsets",
            "must be finite",
        )?;
        check(positive(p.segment_length), "physics.segment_length", "must be positive")?;
        check(positive(p.joint_radius), "physics.joint_radius", "must be positive")?;
        check(
            p.linear_damping.is_finite() && p.linear_damping >= 0.0,
            "physics.linear_damping",
            "must be finite and non-negative",
        )?;
        check(
            p.angular_damping.is_finite() && p.angular_damping >= 0.0,
            "physics.angular_damping",
            "must be finite and non-negative",
        )?;

        let sm = &self.smoothing;
        check(
            sm.min_speed.is_finite() && sm.min_speed >= 0.0 && sm.max_speed.is_finite(),
            "smoothing.min_speed",
            "speeds must be finite and non-negative",
        )?;
        check(sm.max_speed >= sm.min_speed, "smoothing.max_speed", "must not be below min_speed")?;
        check(
            (2..=MAX_CURVE_SAMPLES).contains(&sm.curve_samples),
            "smoothing.curve_samples",
            "must be between 2 and 1024",
        )?;
        check(sm.torsion_gain.is_finite(), "smoothing.torsion_gain", "must be finite")?;

        let c = &self.card;
        check(c.half_extents.iter().all(|v| positive(*v)), "card.half_extents", "must be positive")?;
        check(c.pivot.iter().all(|v| v.is_finite()), "card.pivot", "must be finite")?;
        check(c.face_size.iter().all(|v| positive(*v)), "card.face_size", "must be positive")?;
        check(positive(c.mesh_scale), "card.mesh_scale", "must be positive")?;
        check(
            c.connector_offset.iter().all(|v| v.is_finite()),
            "card.connector_offset",
            "must be finite",
        )?;

        let e = &self.entrance;
        check(
            e.duration_ms.is_finite() && e.duration_ms >= 0.0,
            "entrance.duration_ms",
            "must be finite and non-negative",
        )?;
        check(
            [e.start_y, e.target_y, e.track_xz[0], e.track_xz[1], e.roll_amplitude, e.rope_opacity]
                .iter()
                .all(|v| v.is_finite()),
            "entrance",
            "values must be finite",
        )?;

        let cam = &self.camera;
        check(
            cam.position.iter().chain(cam.target.iter()).all(|v| v.is_finite()),
            "camera.position",
            "position and target must be finite",
        )?;
        check(cam.position != cam.target, "camera.target", "must differ from position")?;
        check(
            cam.fov_deg.is_finite() && cam.fov_deg > 0.0 && cam.fov_deg < 180.0,
            "camera.fov_deg",
            "must be in (0, 180)",
        )?;
        check(positive(cam.near), "camera.near", "must be positive")?;
        check(cam.far.is_finite() && cam.far > cam.near, "camera.far", "must be beyond near")?;

        let vp = &self.viewport;
        check(
            vp.small_resolution.iter().chain(vp.large_resolution.iter()).all(|v| positive(*v)),
            "viewport",
            "resolutions must be positive",
        )?;
        Ok(())
    }

    pub fn with_gravity(mut self, gravity: [f32; 3]) -> Self {
        self.physics.gravity = gravity;
        self
    }

    pub fn with_timestep(mut self, timestep: f32) -> Self {
        self.physics.timestep = timestep;
        self
    }

    pub fn with_entrance_duration_ms(mut self, duration_ms: f64) -> Self {
        self.entrance.duration_ms = duration_ms;
        self
    }

    pub fn without_entrance(mut self) -> Self {
        self.entrance.enabled = false;
        self
    }
}

/// Upper bound on rope polyline points.
pub const MAX_CURVE_SAMPLES: usize = 1024;

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

fn check(ok: bool, field: &'static str, reason: &'static str) -> Result<(), LanyardError> {
    if ok {
        Ok(())
    } else {
        Err(LanyardError::InvalidConfig { field, reason })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: [f32; 3],
    /// Fixed solver timestep.
    pub timestep: f32,
    /// Upper bound on solver steps taken in one rendered frame.
    pub max_substeps: u32,
    /// World position of the fixed anchor.
    pub anchor: [f32; 3],
    /// Initial x offsets from the anchor for j1, j2, j3 and the card.
    pub spawn_offsets: [f32; 4],
    /// Maximum length of each rope joint.
    pub segment_length: f32,
    pub joint_radius: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -40.0, 0.0],
            timestep: 1.0 / 60.0,
            max_substeps: 4,
            anchor: [0.0, 4.0, 0.0],
            spawn_offsets: [0.5, 1.0, 1.5, 2.0],
            segment_length: 1.0,
            joint_radius: 0.1,
            linear_damping: 4.0,
            angular_damping: 4.0,
        }
    }
}

impl PhysicsConfig {
    pub fn gravity(&self) -> Vector3<f32> {
        Vector3::from(self.gravity)
    }

    pub fn anchor(&self) -> Point3<f32> {
        Point3::from(self.anchor)
    }
}

/// Motion-dependent smoothing of the internal rope joints.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub min_speed: f32,
    pub max_speed: f32,
    /// Number of points in the emitted rope polyline.
    pub curve_samples: usize,
    /// Proportional gain of the yaw self-centering correction.
    pub torsion_gain: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            min_speed: 0.0,
            max_speed: 50.0,
            curve_samples: 32,
            torsion_gain: 0.25,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Half extents of the card collider, which is also its pick shape.
    pub half_extents: [f32; 3],
    /// Pivot of the j3 ball joint in card-local space.
    pub pivot: [f32; 3],
    /// Face size before the visual scale is applied.
    pub face_size: [f32; 2],
    /// Resting visual scale.
    pub mesh_scale: f32,
    /// World-space offset of the upper connector from the card centre.
    pub connector_offset: [f32; 3],
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            half_extents: [1.2, 2.0, 0.01],
            pivot: [0.0, 1.5, 0.0],
            face_size: [0.8, 4.0 / 3.0],
            mesh_scale: 3.0,
            connector_offset: [0.0, 1.4, 0.0],
        }
    }
}

impl CardConfig {
    /// Distance between the card's centre and its pivot.
    pub fn pivot_distance(&self) -> f32 {
        Vector3::from(self.pivot).norm()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EntranceConfig {
    pub enabled: bool,
    pub duration_ms: f64,
    pub start_y: f32,
    pub target_y: f32,
    /// Fixed x and z of the card while the entrance runs.
    pub track_xz: [f32; 2],
    /// Peak roll (radians) reached halfway through the bounce.
    pub roll_amplitude: f32,
    /// Rope opacity at the end of the entrance.
    pub rope_opacity: f32,
}

impl Default for EntranceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: 2000.0,
            start_y: 10.0,
            target_y: 0.0,
            track_xz: [2.0, 0.0],
            roll_amplitude: 0.3,
            rope_opacity: 0.8,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 20.0],
            target: [0.0, 0.0, 0.0],
            fov_deg: 30.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Line resolution presets switched on viewport width.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub small_width: f64,
    pub small_resolution: [f32; 2],
    pub large_resolution: [f32; 2],
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            small_width: 1024.0,
            small_resolution: [1000.0, 2000.0],
            large_resolution: [1000.0, 1000.0],
        }
    }
}

impl ViewportConfig {
    pub fn resolution_for(&self, width: f64) -> [f32; 2] {
        if width < self.small_width {
            self.small_resolution
        } else {
            self.large_resolution
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = LanyardConfig::from_json(r#"{ "physics": { "gravity": [0, -9.81, 0] } }"#)
            .unwrap();
        assert_eq!(cfg.physics.gravity, [0.0, -9.81, 0.0]);
        assert_eq!(cfg.physics.segment_length, 1.0);
        assert_eq!(cfg.smoothing.curve_samples, 32);
        assert_eq!(cfg.entrance.duration_ms, 2000.0);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = LanyardConfig::from_json("{ physics: ").unwrap_err();
        assert!(matches!(err, LanyardError::Config(_)));
    }

    #[test]
    fn defaults_are_valid() {
        LanyardConfig::default().validate().unwrap();
    }

    fn rejected_field(json: &str) -> &'static str {
        match LanyardConfig::from_json(json) {
            Err(LanyardError::InvalidConfig { field, .. }) => field,
            other => panic!("expected InvalidConfig for {json}, got {other:?}"),
        }
    }

    #[test]
    fn camera_planes_must_be_ordered() {
        assert_eq!(rejected_field(r#"{ "camera": { "near": 5, "far": 5 } }"#), "camera.far");
        assert_eq!(rejected_field(r#"{ "camera": { "near": 0 } }"#), "camera.near");
        assert_eq!(rejected_field(r#"{ "camera": { "fov_deg": 180 } }"#), "camera.fov_deg");
        assert_eq!(
            rejected_field(r#"{ "camera": { "position": [0, 0, 0] } }"#),
            "camera.target"
        );
    }

    #[test]
    fn solver_values_are_checked() {
        assert_eq!(rejected_field(r#"{ "physics": { "timestep": 0 } }"#), "physics.timestep");
        assert_eq!(
            rejected_field(r#"{ "physics": { "max_substeps": 0 } }"#),
            "physics.max_substeps"
        );
        assert_eq!(
            rejected_field(r#"{ "smoothing": { "curve_samples": 1 } }"#),
            "smoothing.curve_samples"
        );
        assert_eq!(
            rejected_field(r#"{ "smoothing": { "curve_samples": 100000 } }"#),
            "smoothing.curve_samples"
        );
        let err = LanyardConfig::default()
            .with_gravity([0.0, f32::NAN, 0.0])
            .validate()
            .unwrap_err();
        assert!(matches!(err, LanyardError::InvalidConfig { field: "physics.gravity", .. }));
        assert!(!err.is_corruption());
    }

    #[test]
    fn resolution_switches_at_threshold() {
        let vp = ViewportConfig::default();
        assert_eq!(vp.resolution_for(800.0), [1000.0, 2000.0]);
        assert_eq!(vp.resolution_for(1023.9), [1000.0, 2000.0]);
        assert_eq!(vp.resolution_for(1024.0), [1000.0, 1000.0]);
    }

    #[test]
    fn card_face_matches_collider_at_rest() {
        let card = CardConfig::default();
        let w = card.face_size[0] * card.mesh_scale;
        let h = card.face_size[1] * card.mesh_scale;
        assert!((w - 2.0 * card.half_extents[0]).abs() < 1e-5);
        assert!((h - 2.0 * card.half_extents[1]).abs() < 1e-5);
        assert!((card.pivot_distance() - 1.5).abs() < 1e-6);
    }
}
