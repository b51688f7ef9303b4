use rapier3d::na::{Isometry3, Matrix4, Perspective3, Point3, Vector3};

use crate::config::CameraConfig;

/// Perspective camera looking at a fixed target with +Y up. NDC follows the
/// OpenGL convention: x and y in [-1, 1] with +y up, depth in [-1, 1].
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn from_config(cfg: &CameraConfig, aspect: f32) -> Self {
        Self {
            position: Point3::from(cfg.position),
            target: Point3::from(cfg.target),
            fov_y: cfg.fov_deg.to_radians(),
            aspect: if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 },
            near: cfg.near,
            far: cfg.far,
        }
    }

    pub fn set_aspect(&mut self, width: f64, height: f64) {
        if width > 0.0 && height > 0.0 {
            self.aspect = (width / height) as f32;
        }
    }

    fn view(&self) -> Isometry3<f32> {
        Isometry3::look_at_rh(&self.position, &self.target, &Vector3::y())
    }

    fn projection(&self) -> Perspective3<f32> {
        Perspective3::new(self.aspect, self.fov_y, self.near, self.far)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection().as_matrix() * self.view().to_homogeneous()
    }

    /// NDC point back to world space.
    pub fn unproject(&self, ndc: Point3<f32>) -> Point3<f32> {
        let view_point = self.projection().unproject_point(&ndc);
        self.view().inverse_transform_point(&view_point)
    }

    /// World point to NDC. `None` when the point is at or behind the eye.
    pub fn project(&self, world: &Point3<f32>) -> Option<Point3<f32>> {
        let clip = self.view_projection() * world.to_homogeneous();
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(Point3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w))
    }

    /// Ray from the eye through an NDC position, direction normalized.
    /// `None` for a degenerate direction.
    pub fn ray(&self, ndc: [f32; 2]) -> Option<(Point3<f32>, Vector3<f32>)> {
        let p = self.unproject(Point3::new(ndc[0], ndc[1], 0.5));
        let dir = (p - self.position).try_normalize(f32::EPSILON)?;
        Some((self.position, dir))
    }
}
