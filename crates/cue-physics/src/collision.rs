use cue_core::{RailSegment, TableGeometry, Vector2};

use crate::{
    half_line_intersects_segment, real_roots, solve_quadratic, solve_quartic, try_normalize,
    GeometryError,
};

/// Imaginary parts below this are treated as real collision times.
const REAL_ROOT_EPS: f64 = 1e-6;
/// Below this the relative acceleration term is dropped and the motion is
/// treated as uniform.
const UNIFORM_MOTION_EPS: f64 = 1e-12;
/// How close to antiparallel velocity and acceleration must be for the
/// acceleration to count as braking.
const BRAKING_EPS: f64 = 1e-6;

/// Kinematic state of a ball under constant acceleration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Motion {
    /// Position in mm
    pub position: Vector2,
    /// Velocity in mm/s
    pub velocity: Vector2,
    /// Acceleration in mm/s²
    pub acceleration: Vector2,
}

impl Motion {
    pub fn new(position: Vector2, velocity: Vector2, acceleration: Vector2) -> Self {
        Self {
            position,
            velocity,
            acceleration,
        }
    }

    pub fn stationary(position: Vector2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// A ball rolling with `velocity` and slowed down by `deceleration`
    /// (mm/s²) until it stops.
    pub fn rolling(position: Vector2, velocity: Vector2, deceleration: f64) -> Self {
        let acceleration = match try_normalize(velocity) {
            Some(direction) => -deceleration * direction,
            None => Vector2::zeros(),
        };
        Self::new(position, velocity, acceleration)
    }

    /// Position after `dt` seconds.
    pub fn position_at(&self, dt: f64) -> Vector2 {
        self.position + self.velocity * dt + 0.5 * self.acceleration * dt * dt
    }

    /// Seconds until the ball comes to rest, or `None` if its acceleration
    /// never brings it to a standstill.
    pub fn stop_time(&self) -> Option<f64> {
        let speed = self.velocity.norm();
        let deceleration = self.acceleration.norm();
        if speed == 0.0 || deceleration == 0.0 {
            return None;
        }
        let braking = -self.velocity.dot(&self.acceleration) / (speed * deceleration);
        (braking >= 1.0 - BRAKING_EPS).then(|| speed / deceleration)
    }

    /// The motion `dt` seconds later. A ball that stops on the way stays at
    /// rest where it stopped.
    pub fn advance(&self, dt: f64) -> Self {
        match self.stop_time() {
            Some(stop) if dt >= stop => Self::stationary(self.position_at(stop)),
            _ => Self::new(
                self.position_at(dt),
                self.velocity + self.acceleration * dt,
                self.acceleration,
            ),
        }
    }
}

/// Time in seconds until two balls first touch, if they ever do.
///
/// The balls touch when their centers are `diameter` apart:
/// `|Δp + Δv·t + ½Δa·t²| = D`. Squaring gives a quartic in `t`; lengths are
/// divided by `D` first so that the coefficients stay close to one. Without
/// relative acceleration the equation is only quadratic and is solved as such.
/// Balls that already overlap touch at `t = 0`.
///
/// A braking ball stops once its velocity vanishes and does not roll back.
/// The motion is therefore split at every stop and each piece is solved on
/// its own.
pub fn time_to_collision(
    a: &Motion,
    b: &Motion,
    diameter: f64,
) -> Result<Option<f64>, GeometryError> {
    if !(diameter > 0.0 && diameter.is_finite()) {
        return Err(GeometryError::InvalidRadius {
            operation: "time_to_collision",
            radius: diameter / 2.0,
        });
    }

    let (mut a, mut b) = (*a, *b);
    let mut elapsed = 0.0;
    // Every piece but the last ends with one more ball at rest
    for _ in 0..3 {
        let horizon = match (a.stop_time(), b.stop_time()) {
            (Some(ta), Some(tb)) => Some(ta.min(tb)),
            (ta, tb) => ta.or(tb),
        };
        let touch = first_touch(&a, &b, diameter)?
            .filter(|t| horizon.map_or(true, |horizon| *t <= horizon));
        if let Some(t) = touch {
            log::trace!("time_to_collision: {:?}", elapsed + t);
            return Ok(Some(elapsed + t));
        }

        let Some(horizon) = horizon else {
            break;
        };
        a = a.advance(horizon);
        b = b.advance(horizon);
        elapsed += horizon;
    }
    log::trace!("time_to_collision: None");
    Ok(None)
}

/// First non-negative touch time of two balls whose accelerations never
/// change.
fn first_touch(a: &Motion, b: &Motion, diameter: f64) -> Result<Option<f64>, GeometryError> {
    let dp = (a.position - b.position) / diameter;
    let dv = (a.velocity - b.velocity) / diameter;
    let da = (a.acceleration - b.acceleration) / diameter;

    let e = dp.norm_squared() - 1.0;
    if e <= 0.0 {
        return Ok(Some(0.0));
    }

    let qa = 0.25 * da.norm_squared();
    let times = if qa < UNIFORM_MOTION_EPS {
        solve_quadratic(dv.norm_squared(), 2.0 * dv.dot(&dp), e)
    } else {
        let qb = da.dot(&dv);
        let qc = da.dot(&dp) + dv.norm_squared();
        let qd = 2.0 * dv.dot(&dp);
        let roots = solve_quartic(qa, qb, qc, qd, e)?;
        real_roots(&roots, REAL_ROOT_EPS)
    };
    Ok(times.into_iter().find(|t| *t >= 0.0))
}

/// Seconds a ball needs to travel `distance` along its path.
///
/// Only the part of the acceleration along the velocity is taken into
/// account. Returns `None` if the ball stops before it gets there.
pub fn time_to_travel(motion: &Motion, distance: f64) -> Option<f64> {
    if distance <= 0.0 {
        return Some(0.0);
    }
    let speed = motion.velocity.norm();
    let direction = try_normalize(motion.velocity)?;
    let along = motion.acceleration.dot(&direction);
    solve_quadratic(0.5 * along, speed, -distance)
        .into_iter()
        .find(|t| *t >= 0.0)
}

/// Seconds until a ball reaches the cushion `rail`, if it does before
/// stopping.
pub fn time_to_cushion(motion: &Motion, rail: &RailSegment, radius: f64) -> Option<f64> {
    let contact = cushion_contact(motion.position, motion.velocity, rail, radius)?;
    time_to_travel(motion, contact.distance)
}

/// First touch of a ball with a cushion.
#[derive(Clone, Debug, PartialEq)]
pub struct CushionContact {
    /// Name of the cushion segment
    pub rail: String,
    /// Center of the ball at impact
    pub point: Vector2,
    /// Distance travelled to the impact, in mm
    pub distance: f64,
    /// Unit normal of the cushion, pointing back onto the table
    pub normal: Vector2,
    /// Unit direction after a mirror reflection on the cushion
    pub reflected: Vector2,
}

/// Where a ball moving along `direction` first touches the cushion `rail`.
///
/// The ball touches when its center reaches the segment shifted by `radius`
/// towards the ball. Returns `None` if the path misses the segment or moves
/// away from it.
pub fn cushion_contact(
    position: Vector2,
    direction: Vector2,
    rail: &RailSegment,
    radius: f64,
) -> Option<CushionContact> {
    let direction = try_normalize(direction)?;
    let along = try_normalize(rail.direction())?;

    // Normal pointing from the cushion towards the ball
    let mut normal = Vector2::new(-along.y, along.x);
    let signed_distance = (position - rail.start).dot(&normal);
    if signed_distance < 0.0 {
        normal = -normal;
    }
    let reflected = direction - 2.0 * direction.dot(&normal) * normal;

    if direction.dot(&normal) >= 0.0 {
        return None;
    }

    if signed_distance.abs() <= radius {
        // Already touching, check that the ball is alongside the segment
        let u = (position - rail.start).dot(&along) / rail.length();
        return (0.0..=1.0).contains(&u).then(|| CushionContact {
            rail: rail.name.clone(),
            point: position,
            distance: 0.0,
            normal,
            reflected,
        });
    }

    let shift = radius * normal;
    let (distance, _) =
        half_line_intersects_segment(position, direction, rail.start + shift, rail.end + shift)?;
    Some(CushionContact {
        rail: rail.name.clone(),
        point: position + distance * direction,
        distance,
        normal,
        reflected,
    })
}

/// The first cushion a ball reaches on the given table.
pub fn first_cushion_contact(
    position: Vector2,
    direction: Vector2,
    table: &TableGeometry,
) -> Option<CushionContact> {
    table
        .rails()
        .iter()
        .filter_map(|rail| cushion_contact(position, direction, rail, table.ball_radius))
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const D: f64 = 52.3;

    #[test]
    fn test_head_on_uniform() {
        let a = Motion::new(Vector2::zeros(), Vector2::new(1000.0, 0.0), Vector2::zeros());
        let b = Motion::stationary(Vector2::new(500.0, 0.0));
        let t = time_to_collision(&a, &b, D).unwrap().unwrap();
        assert_relative_eq!(t, (500.0 - D) / 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_head_on_decelerating() {
        let a = Motion::new(
            Vector2::zeros(),
            Vector2::new(1000.0, 0.0),
            Vector2::new(-200.0, 0.0),
        );
        let b = Motion::stationary(Vector2::new(500.0, 0.0));
        let t = time_to_collision(&a, &b, D).unwrap().unwrap();
        // 1000·t - 100·t² = 500 - D
        let expected = (1000.0 - (1e6 - 400.0 * (500.0 - D)).sqrt()) / 200.0;
        assert_relative_eq!(t, expected, epsilon = 1e-6);
        assert_relative_eq!(
            (a.position_at(t) - b.position_at(t)).norm(),
            D,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_recorded_shot() {
        let a = Motion::new(
            Vector2::new(-868.681, 365.701),
            Vector2::new(-67.7881, 122.751),
            Vector2::new(94.7511, -171.576),
        );
        let b = Motion::stationary(Vector2::new(-899.492, 425.088));
        let t = time_to_collision(&a, &b, 2.0 * 26.15).unwrap().unwrap();
        assert_relative_eq!(t, 0.11314, epsilon = 1e-4);
    }

    #[test]
    fn test_passing_balls_never_touch() {
        let a = Motion::new(Vector2::zeros(), Vector2::new(1000.0, 0.0), Vector2::zeros());
        let b = Motion::stationary(Vector2::new(500.0, 200.0));
        assert_eq!(time_to_collision(&a, &b, D).unwrap(), None);

        // Moving apart
        let a = Motion::new(Vector2::zeros(), Vector2::new(-1000.0, 0.0), Vector2::zeros());
        let b = Motion::stationary(Vector2::new(500.0, 0.0));
        assert_eq!(time_to_collision(&a, &b, D).unwrap(), None);

        // Both at rest
        let a = Motion::stationary(Vector2::zeros());
        assert_eq!(time_to_collision(&a, &b, D).unwrap(), None);
    }

    #[test]
    fn test_overlapping_balls_touch_now() {
        let a = Motion::stationary(Vector2::zeros());
        let b = Motion::stationary(Vector2::new(40.0, 0.0));
        assert_eq!(time_to_collision(&a, &b, D).unwrap(), Some(0.0));
    }

    #[test]
    fn test_invalid_diameter() {
        let a = Motion::stationary(Vector2::zeros());
        assert!(matches!(
            time_to_collision(&a, &a, 0.0),
            Err(GeometryError::InvalidRadius { .. })
        ));
    }

    #[test]
    fn test_cushion_contact() {
        let rail = RailSegment::new(
            "Right",
            Vector2::new(1000.0, -1000.0),
            Vector2::new(1000.0, 1000.0),
        );
        let contact =
            cushion_contact(Vector2::zeros(), Vector2::new(1.0, 1.0), &rail, 25.0).unwrap();
        assert_eq!(contact.rail, "Right");
        assert_relative_eq!(contact.point.x, 975.0, epsilon = 1e-9);
        assert_relative_eq!(contact.point.y, 975.0, epsilon = 1e-9);
        assert_relative_eq!(contact.distance, 975.0 * 2f64.sqrt(), epsilon = 1e-9);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(contact.reflected.x, -h, epsilon = 1e-9);
        assert_relative_eq!(contact.reflected.y, h, epsilon = 1e-9);

        // Moving away
        assert!(cushion_contact(Vector2::zeros(), Vector2::new(-1.0, 0.0), &rail, 25.0).is_none());

        // The segment ends at y = 500, before the path reaches it
        let short = RailSegment::new(
            "Right",
            Vector2::new(1000.0, -500.0),
            Vector2::new(1000.0, 500.0),
        );
        assert!(cushion_contact(Vector2::zeros(), Vector2::new(1.0, 1.0), &short, 25.0).is_none());
    }

    #[test]
    fn test_first_cushion_on_table() {
        let table = TableGeometry::rectangular(2000.0, 1000.0, 25.0);
        let contact =
            first_cushion_contact(Vector2::zeros(), Vector2::new(0.0, 1.0), &table).unwrap();
        assert_eq!(contact.rail, "Top");
        assert_relative_eq!(contact.distance, 475.0, epsilon = 1e-9);
        assert_relative_eq!(contact.reflected.y, -1.0, epsilon = 1e-9);
        assert_relative_eq!(contact.normal.y, -1.0, epsilon = 1e-9);

        // Ball resting against the left cushion, pushed into it
        let contact =
            first_cushion_contact(Vector2::new(-980.0, 0.0), Vector2::new(-1.0, 0.0), &table)
                .unwrap();
        assert_eq!(contact.rail, "Left");
        assert_eq!(contact.distance, 0.0);
    }

    #[test]
    fn test_ball_rolling_away_stops() {
        // Braked to a standstill at x = -250, it never comes back
        let a = Motion::new(
            Vector2::zeros(),
            Vector2::new(-1000.0, 0.0),
            Vector2::new(2000.0, 0.0),
        );
        let b = Motion::stationary(Vector2::new(500.0, 0.0));
        assert_eq!(a.stop_time(), Some(0.5));
        assert_eq!(time_to_collision(&a, &b, D).unwrap(), None);
    }

    #[test]
    fn test_collision_with_stopped_ball() {
        // The first ball stops at x = 250 after 0.5 s, the second rolls into it
        let a = Motion::new(
            Vector2::zeros(),
            Vector2::new(1000.0, 0.0),
            Vector2::new(-2000.0, 0.0),
        );
        let b = Motion::new(
            Vector2::new(1000.0, 0.0),
            Vector2::new(-400.0, 0.0),
            Vector2::zeros(),
        );
        let t = time_to_collision(&a, &b, D).unwrap().unwrap();
        assert_relative_eq!(t, 0.5 + (550.0 - D) / 400.0, epsilon = 1e-6);
    }

    #[test]
    fn test_advance_past_stop() {
        let motion = Motion::rolling(Vector2::zeros(), Vector2::new(0.0, 600.0), 300.0);
        assert_relative_eq!(motion.stop_time().unwrap(), 2.0, epsilon = 1e-12);

        let later = motion.advance(1.0);
        assert_relative_eq!(later.position.y, 450.0, epsilon = 1e-9);
        assert_relative_eq!(later.velocity.y, 300.0, epsilon = 1e-9);

        let stopped = motion.advance(5.0);
        assert_relative_eq!(stopped.position.y, 600.0, epsilon = 1e-9);
        assert_eq!(stopped.velocity, Vector2::zeros());
        assert_eq!(stopped.stop_time(), None);

        // Accelerating balls never stop
        let pushed = Motion::new(Vector2::zeros(), Vector2::new(1.0, 0.0), Vector2::new(1.0, 0.0));
        assert_eq!(pushed.stop_time(), None);
    }

    #[test]
    fn test_time_to_cushion() {
        let table = TableGeometry::rectangular(2000.0, 1000.0, 25.0);
        let rails = table.rails();
        let top = &rails[2];
        assert_eq!(top.name, "Top");

        // 1000·t - 100·t² = 475
        let motion = Motion::rolling(Vector2::zeros(), Vector2::new(0.0, 1000.0), 200.0);
        assert_relative_eq!(time_to_cushion(&motion, top, 25.0).unwrap(), 0.5, epsilon = 1e-9);

        let uniform = Motion::new(Vector2::zeros(), Vector2::new(0.0, 950.0), Vector2::zeros());
        assert_relative_eq!(time_to_cushion(&uniform, top, 25.0).unwrap(), 0.5, epsilon = 1e-9);

        // Stops after 250 mm
        let slow = Motion::rolling(Vector2::zeros(), Vector2::new(0.0, 1000.0), 2000.0);
        assert_eq!(time_to_cushion(&slow, top, 25.0), None);

        let resting = Motion::stationary(Vector2::zeros());
        assert_eq!(time_to_cushion(&resting, top, 25.0), None);
    }
}
