use cue_core::Vector2;

use crate::solve_quadratic;

/// Finds the intersection point of two lines.
///
/// Each line is defined by a point and a direction vector. Returns None if the lines
/// are parallel.
pub fn find_intersection(
    point1: Vector2,
    direction1: Vector2,
    point2: Vector2,
    direction2: Vector2,
) -> Option<Vector2> {
    line_parameters(point1, direction1, point2, direction2).map(|(t, _)| point1 + t * direction1)
}

/// Parameters `(t, u)` such that `point1 + t·direction1 == point2 + u·direction2`.
fn line_parameters(
    point1: Vector2,
    direction1: Vector2,
    point2: Vector2,
    direction2: Vector2,
) -> Option<(f64, f64)> {
    let det = direction1.x * direction2.y - direction1.y * direction2.x;
    if det.abs() < 1e-10 {
        return None;
    }

    let dp = point2 - point1;
    let t = (dp.x * direction2.y - dp.y * direction2.x) / det;
    let u = (dp.x * direction1.y - dp.y * direction1.x) / det;
    Some((t, u))
}

/// Where a half-line starting at `origin` crosses the segment `start..end`.
///
/// Returns the parameter along the half-line (in units of `direction`) and the
/// fraction along the segment in `[0, 1]`.
pub fn half_line_intersects_segment(
    origin: Vector2,
    direction: Vector2,
    start: Vector2,
    end: Vector2,
) -> Option<(f64, f64)> {
    let (t, u) = line_parameters(origin, direction, start, end - start)?;
    if t >= 0.0 && (0.0..=1.0).contains(&u) {
        Some((t, u))
    } else {
        None
    }
}

/// Parameters `t` at which the line `point + t·direction` meets the circle,
/// ascending. `direction` must be normalized so that `t` is a distance.
///
/// Two values if the line pierces the circle, one if it is tangent, none if
/// it misses.
pub fn line_intersects_circle(
    center: Vector2,
    radius: f64,
    point: Vector2,
    direction: Vector2,
) -> Vec<f64> {
    // |P + t·V - C|² = r² with |V| = 1
    let delta = point - center;
    let b = 2.0 * direction.dot(&delta);
    let c = delta.norm_squared() - radius * radius;
    solve_quadratic(1.0, b, c)
}

/// Like [`line_intersects_circle`], restricted to the forward half of the line.
pub fn ray_intersects_circle(
    center: Vector2,
    radius: f64,
    origin: Vector2,
    direction: Vector2,
) -> Vec<f64> {
    line_intersects_circle(center, radius, origin, direction)
        .into_iter()
        .filter(|t| *t >= 0.0)
        .collect()
}

/// Unit vector in the direction of `v`, or `None` for the zero vector.
pub fn try_normalize(v: Vector2) -> Option<Vector2> {
    v.try_normalize(f64::EPSILON)
}

/// Where the center of a ball must be at impact so that a ball at `target`
/// leaves in `direction` (the "ghost ball" position).
pub fn ghost_ball_position(target: Vector2, direction: Vector2, radius: f64) -> Option<Vector2> {
    try_normalize(direction).map(|dir| target - 2.0 * radius * dir)
}
