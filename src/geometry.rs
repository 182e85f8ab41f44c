//! Pure intersection math. Beams travel in 3D but cross-beam overlap is
//! decided on the horizontal plane, so the segment test drops the vertical
//! axis while the intersection estimate works on the full 3D lines.

use glam::{Vec2, Vec3, vec2};

const PARALLEL_EPSILON: f32 = 1e-4;
const ORIENTATION_EPSILON: f32 = 1e-6;

fn project(point: Vec3) -> Vec2 {
    vec2(point.x, point.z)
}

fn orientation(a: Vec2, b: Vec2, c: Vec2) -> i8 {
    let value = (b.y - a.y) * (c.x - b.x) - (b.x - a.x) * (c.y - b.y);
    if value.abs() < ORIENTATION_EPSILON {
        0
    } else if value > 0.0 {
        1
    } else {
        2
    }
}

/// True when the horizontal projections of the two segments cross: both
/// orientation pairs must straddle, i.e. differ.
pub fn segments_intersect(p1: Vec3, p2: Vec3, q1: Vec3, q2: Vec3) -> bool {
    let a = project(p1);
    let b = project(p2);
    let c = project(q1);
    let d = project(q2);

    let o1 = orientation(a, b, c);
    let o2 = orientation(a, b, d);
    let o3 = orientation(c, d, a);
    let o4 = orientation(c, d, b);

    o1 != o2 && o3 != o4
}

/// Closest points between two infinite 3D lines. `None` when the direction
/// determinant is near zero (parallel lines have no single closest pair).
pub fn closest_points_on_lines(
    point1: Vec3,
    dir1: Vec3,
    point2: Vec3,
    dir2: Vec3,
) -> Option<(Vec3, Vec3)> {
    let a = dir1.dot(dir1);
    let b = dir1.dot(dir2);
    let e = dir2.dot(dir2);

    let det = a * e - b * b;
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }

    let r = point1 - point2;
    let c = dir1.dot(r);
    let f = dir2.dot(r);

    let s = (b * f - c * e) / det;
    let t = (a * f - c * b) / det;

    Some((point1 + dir1 * s, point2 + dir2 * t))
}

/// Intersection estimate for two beams: midpoint of the closest points of
/// their carrier lines. Tolerates skew lines; degenerates to `None` for
/// near-parallel directions.
pub fn intersection_point(p1: Vec3, p2: Vec3, q1: Vec3, q2: Vec3) -> Option<Vec3> {
    let dir1 = (p2 - p1).normalize_or_zero();
    let dir2 = (q2 - q1).normalize_or_zero();
    let (c1, c2) = closest_points_on_lines(p1, dir1, q1, dir2)?;
    Some((c1 + c2) * 0.5)
}
