use cue_core::Vector2;

use crate::{ray_intersects_circle, try_normalize, GeometryError};

/// Outcome of a contact query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionResult {
    /// Center of the incoming ball at first touch
    pub contact_point: Vector2,
    /// `false` if the incoming path never reaches the target circle
    pub valid: bool,
    /// Angle in radians between the ideal and the achieved contact, seen from
    /// the struck ball. Never negative.
    pub error_bound: f64,
    /// How far the struck ball misses its target because of `error_bound`,
    /// measured at the target distance.
    pub lateral_error: f64,
}

impl CollisionResult {
    /// The result for a path that never touches the target circle.
    pub fn no_contact() -> Self {
        Self {
            contact_point: Vector2::zeros(),
            valid: false,
            error_bound: 0.0,
            lateral_error: 0.0,
        }
    }
}

/// Estimates how an aiming offset changes the contact on a ball.
///
/// * `m`: center of the ball to be struck
/// * `t`: where the struck ball should go
/// * `k`: position the incoming ball starts from
/// * `f`: offset applied to `m` (eg. the measurement uncertainty)
/// * `r`: ball radius
///
/// The ideal contact places the incoming ball at `m + 2r·(k - m)/|k - m|`. The
/// incoming ball is aimed instead at the ghost position computed for the
/// offset ball `m + f`, and the first point where that path comes within `2r`
/// of `m` is the actual contact. Paths that never reach the circle (or start
/// past it) give an invalid result rather than an error.
///
/// # Errors
///
/// [`GeometryError::InvalidRadius`] if `r` is not a positive number.
pub fn compute_contact(
    m: Vector2,
    t: Vector2,
    k: Vector2,
    f: Vector2,
    r: f64,
) -> Result<CollisionResult, GeometryError> {
    if !(r > 0.0 && r.is_finite()) {
        return Err(GeometryError::InvalidRadius {
            operation: "compute_contact",
            radius: r,
        });
    }
    let diameter = 2.0 * r;

    let Some(to_start) = try_normalize(k - m) else {
        log::debug!("compute_contact: start position coincides with the ball");
        return Ok(CollisionResult::no_contact());
    };
    let ideal = m + diameter * to_start;

    let offset_ball = m + f;
    let Some(away_from_target) = try_normalize(offset_ball - t) else {
        log::debug!("compute_contact: target coincides with the offset ball");
        return Ok(CollisionResult::no_contact());
    };
    let aim = offset_ball + diameter * away_from_target;

    let Some(direction) = try_normalize(aim - k) else {
        return Ok(CollisionResult::no_contact());
    };

    // The nearer non-negative intersection is the first touch
    let Some(&distance) = ray_intersects_circle(m, diameter, k, direction).first() else {
        log::debug!("compute_contact: path from {k:?} misses the ball at {m:?}");
        return Ok(CollisionResult::no_contact());
    };
    let contact_point = k + distance * direction;

    let error_bound = angle_between(contact_point - m, ideal - m);
    let lateral_error = (t - m).norm() * error_bound.tan();

    Ok(CollisionResult {
        contact_point,
        valid: true,
        error_bound,
        lateral_error,
    })
}

/// Unsigned angle between two vectors in `[0, π]`.
fn angle_between(a: Vector2, b: Vector2) -> f64 {
    match (try_normalize(a), try_normalize(b)) {
        (Some(a), Some(b)) => a.dot(&b).clamp(-1.0, 1.0).acos(),
        _ => 0.0,
    }
}
