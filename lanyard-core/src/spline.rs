//! Open Catmull-Rom spline with chordal parametrization.
//!
//! Knot spacing follows the chord length between control points, which keeps
//! the curve from looping or forming cusps when the points bunch up.
//! End segments use a mirrored phantom point.

use rapier3d::na::Point3;

/// Chords shorter than this are treated as degenerate.
const MIN_CHORD: f32 = 1e-4;

/// Cubic coefficients for one axis of one span.
#[derive(Clone, Copy, Debug, Default)]
struct Cubic {
    c0: f32,
    c1: f32,
    c2: f32,
    c3: f32,
}

impl Cubic {
    fn hermite(x0: f32, x1: f32, t0: f32, t1: f32) -> Self {
        Self {
            c0: x0,
            c1: t0,
            c2: -3.0 * x0 + 3.0 * x1 - 2.0 * t0 - t1,
            c3: 2.0 * x0 - 2.0 * x1 + t0 + t1,
        }
    }

    /// Non-uniform Catmull-Rom tangents rescaled to the [0, 1] span.
    fn nonuniform(x: [f32; 4], dt0: f32, dt1: f32, dt2: f32) -> Self {
        let [x0, x1, x2, x3] = x;
        let t1 = (x1 - x0) / dt0 - (x2 - x0) / (dt0 + dt1) + (x2 - x1) / dt1;
        let t2 = (x2 - x1) / dt1 - (x3 - x1) / (dt1 + dt2) + (x3 - x2) / dt2;
        Self::hermite(x1, x2, t1 * dt1, t2 * dt1)
    }

    fn at(&self, t: f32) -> f32 {
        let t2 = t * t;
        self.c0 + self.c1 * t + self.c2 * t2 + self.c3 * t2 * t
    }
}

#[derive(Clone, Debug)]
pub struct ChordalSpline {
    points: Vec<Point3<f32>>,
}

impl ChordalSpline {
    /// Needs at least two control points.
    pub fn new(points: Vec<Point3<f32>>) -> Option<Self> {
        (points.len() >= 2).then_some(Self { points })
    }

    pub fn control_points(&self) -> &[Point3<f32>] {
        &self.points
    }

    /// Point at global parameter `t` in [0, 1]; every span covers an equal
    /// share of `t`.
    pub fn point_at(&self, t: f32) -> Point3<f32> {
        let pts = &self.points;
        let l = pts.len();
        let p = (l - 1) as f32 * t.clamp(0.0, 1.0);
        let mut seg = p.floor() as usize;
        let mut weight = p - seg as f32;
        if seg >= l - 1 {
            seg = l - 2;
            weight = 1.0;
        }

        let p1 = pts[seg];
        let p2 = pts[seg + 1];
        let p0 = if seg > 0 {
            pts[seg - 1]
        } else {
            p1 + (p1 - p2)
        };
        let p3 = if seg + 2 < l {
            pts[seg + 2]
        } else {
            p2 + (p2 - p1)
        };

        let mut dt1 = (p2 - p1).norm();
        if dt1 < MIN_CHORD {
            dt1 = 1.0;
        }
        let mut dt0 = (p1 - p0).norm();
        if dt0 < MIN_CHORD {
            dt0 = dt1;
        }
        let mut dt2 = (p3 - p2).norm();
        if dt2 < MIN_CHORD {
            dt2 = dt1;
        }

        let axis = |i: usize| Cubic::nonuniform([p0[i], p1[i], p2[i], p3[i]], dt0, dt1, dt2);
        Point3::new(axis(0).at(weight), axis(1).at(weight), axis(2).at(weight))
    }

    /// `count` points at evenly spaced parameter values from 0 to 1 inclusive.
    pub fn sample(&self, count: usize) -> Vec<Point3<f32>> {
        match count {
            0 => Vec::new(),
            1 => vec![self.point_at(0.0)],
            n => (0..n)
                .map(|i| self.point_at(i as f32 / (n - 1) as f32))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point3<f32>, b: Point3<f32>) -> bool {
        (a - b).norm() < 1e-5
    }

    #[test]
    fn passes_through_control_points() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(3.0, 2.5, 1.0),
            Point3::new(4.0, 0.0, 0.0),
        ];
        let spline = ChordalSpline::new(pts.clone()).unwrap();
        for (i, p) in pts.iter().enumerate() {
            assert!(close(spline.point_at(i as f32 / 3.0), *p), "knot {i}");
        }
    }

    #[test]
    fn collinear_points_stay_on_line() {
        let spline = ChordalSpline::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.2, 0.0, 0.0),
        ])
        .unwrap();
        for p in spline.sample(32) {
            assert!(p.y.abs() < 1e-6 && p.z.abs() < 1e-6);
            assert!(p.x >= -1e-5 && p.x <= 2.2 + 1e-5, "{p:?}");
        }
    }

    #[test]
    fn coincident_points_do_not_produce_nan() {
        let p = Point3::new(1.0, 1.0, 1.0);
        let spline = ChordalSpline::new(vec![p, p, p, p]).unwrap();
        for s in spline.sample(32) {
            assert!(close(s, p));
        }
    }

    #[test]
    fn sample_count_and_endpoints() {
        let a = Point3::new(0.0, 4.0, 0.0);
        let b = Point3::new(2.0, 1.0, 0.0);
        let spline =
            ChordalSpline::new(vec![a, Point3::new(0.5, 3.0, 0.0), Point3::new(1.5, 2.0, 0.0), b])
                .unwrap();
        let pts = spline.sample(32);
        assert_eq!(pts.len(), 32);
        assert!(close(pts[0], a));
        assert!(close(pts[31], b));
    }

    #[test]
    fn needs_two_points() {
        assert!(ChordalSpline::new(vec![Point3::origin()]).is_none());
    }
}
