use bevy_math::cubic_splines::{CubicCardinalSpline, CubicCurve, CubicGenerator};

use crate::math::Vec3;

const ARC_LENGTH_DIVISIONS: usize = 200;
const CATMULL_ROM_TENSION: f32 = 0.5;

/// Catmull-Rom spline through its control points, open at both ends (end
/// tangents come from mirrored phantom points).
///
/// [`CatmullRomCurve::point`] takes the spline parameter; [`point_at`]
/// takes a fraction of arc length and is what travel sampling uses, so equal
/// steps of progress cover equal distance.
///
/// [`point_at`]: CatmullRomCurve::point_at
#[derive(Debug, Clone)]
pub struct CatmullRomCurve {
    points: Vec<Vec3>,
    spline: CubicCurve<bevy_math::Vec3>,
    arc_lengths: Vec<f32>,
}

impl CatmullRomCurve {
    /// Needs at least two points.
    pub fn new(points: Vec<Vec3>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        Some(Self::from_checked_points(points))
    }

    /// Four-point curve used for travel paths.
    pub fn through(points: [Vec3; 4]) -> Self {
        Self::from_checked_points(points.to_vec())
    }

    fn from_checked_points(points: Vec<Vec3>) -> Self {
        let last = points.len() - 1;
        let mut padded = Vec::with_capacity(points.len() + 2);
        padded.push(to_spline_point(points[0] + (points[0] - points[1])));
        padded.extend(points.iter().copied().map(to_spline_point));
        padded.push(to_spline_point(
            points[last] + (points[last] - points[last - 1]),
        ));

        let spline = CubicCardinalSpline::new(CATMULL_ROM_TENSION, padded).to_curve();
        let mut curve = Self {
            points,
            spline,
            arc_lengths: Vec::new(),
        };
        curve.arc_lengths = curve.compute_arc_lengths();
        curve
    }

    pub fn control_points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn length(&self) -> f32 {
        self.arc_lengths.last().copied().unwrap_or(0.0)
    }

    /// `t` in `[0, 1]` spans every segment; control point `i` sits at
    /// `i / (n - 1)`.
    pub fn point(&self, t: f32) -> Vec3 {
        let segments = (self.points.len() - 1) as f32;
        let point = self.spline.position(t.clamp(0.0, 1.0) * segments);
        Vec3::new(point.x, point.y, point.z)
    }

    pub fn point_at(&self, u: f32) -> Vec3 {
        self.point(self.arc_fraction_to_t(u))
    }

    fn arc_fraction_to_t(&self, u: f32) -> f32 {
        let u = u.clamp(0.0, 1.0);
        let total = self.length();
        if total <= f32::EPSILON {
            return u;
        }
        let last = self.arc_lengths.len() - 1;
        let target = u * total;

        let upper = self
            .arc_lengths
            .partition_point(|length| *length < target)
            .min(last);
        if upper == 0 {
            return 0.0;
        }
        if self.arc_lengths[upper] == target {
            return upper as f32 / last as f32;
        }

        let lower = upper - 1;
        let before = self.arc_lengths[lower];
        let span = self.arc_lengths[upper] - before;
        let fraction = if span > 0.0 {
            (target - before) / span
        } else {
            0.0
        };
        ((lower as f32 + fraction) / last as f32).clamp(0.0, 1.0)
    }

    fn compute_arc_lengths(&self) -> Vec<f32> {
        let mut lengths = Vec::with_capacity(ARC_LENGTH_DIVISIONS + 1);
        let mut previous = self.point(0.0);
        let mut total = 0.0;
        lengths.push(0.0);
        for step in 1..=ARC_LENGTH_DIVISIONS {
            let current = self.point(step as f32 / ARC_LENGTH_DIVISIONS as f32);
            total += current.distance(previous);
            lengths.push(total);
            previous = current;
        }
        lengths
    }
}

fn to_spline_point(point: Vec3) -> bevy_math::Vec3 {
    bevy_math::Vec3::new(point.x, point.y, point.z)
}
