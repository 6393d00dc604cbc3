use cue_core::Vector2;

use crate::try_normalize;

/// Velocities of two equal balls right after they collide.
///
/// The velocity components along the line between the centers are exchanged
/// and the tangential components are kept. Both velocities are first divided
/// by `1 + energy_loss`. Returns `None` if the centers coincide.
pub fn elastic_collision(
    position1: Vector2,
    velocity1: Vector2,
    position2: Vector2,
    velocity2: Vector2,
    energy_loss: f64,
) -> Option<(Vector2, Vector2)> {
    let z = try_normalize(position2 - position1)?;
    let velocity1 = velocity1 / (1.0 + energy_loss);
    let velocity2 = velocity2 / (1.0 + energy_loss);

    let v1z = velocity1.dot(&z) * z;
    let v2z = velocity2.dot(&z) * z;
    let v1t = velocity1 - v1z;
    let v2t = velocity2 - v2z;
    Some((v2z + v1t, v1z + v2t))
}

/// Velocity of a ball after bouncing off a cushion with the given normal.
pub fn rail_collision(velocity: Vector2, normal: Vector2, energy_loss: f64) -> Option<Vector2> {
    let normal = try_normalize(normal)?;
    let reflected = velocity - 2.0 * velocity.dot(&normal) * normal;
    Some(reflected / (1.0 + energy_loss))
}
