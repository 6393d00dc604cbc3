use approx::assert_relative_eq;
use cue_core::{Ball, BallId, BallType, PhysicsSettings, State, TableGeometry, Vector2};
use cue_physics::{
    compute_contact, elastic_collision, first_cushion_contact, ghost_ball_position,
    rail_collision, time_to_collision, time_to_travel, Motion,
};

fn table_state() -> State {
    State::from_balls([
        Ball::new(BallId::new(0), Vector2::new(-600.0, 0.0), BallType::Cue),
        Ball::new(BallId::new(3), Vector2::new(200.0, 100.0), BallType::Solid),
    ])
    .unwrap()
}

/// Aiming the cue ball at the ghost position makes it touch the object ball
/// exactly there, at the time predicted for a rolling ball.
#[test]
fn cue_ball_reaches_ghost_position() {
    let table = TableGeometry::default();
    let state = table_state();
    let cue = state.find_type(BallType::Cue).unwrap().position;
    let object = state.get(BallId::new(3)).unwrap().position;
    let pocket = Vector2::new(1270.0, 635.0);

    let ghost = ghost_ball_position(object, pocket - object, table.ball_radius).unwrap();
    let result = compute_contact(object, pocket, cue, Vector2::zeros(), table.ball_radius).unwrap();
    assert!(result.valid);
    assert_relative_eq!(result.contact_point.x, ghost.x, epsilon = 1e-9);
    assert_relative_eq!(result.contact_point.y, ghost.y, epsilon = 1e-9);

    let direction = (ghost - cue).normalize();
    let speed = 1500.0;
    let cue_motion = Motion::new(cue, direction * speed, -direction * 300.0);
    let t = time_to_collision(&cue_motion, &Motion::stationary(object), table.ball_diameter())
        .unwrap()
        .unwrap();

    let at_contact = cue_motion.position_at(t);
    assert_relative_eq!(at_contact.x, ghost.x, epsilon = 1e-2);
    assert_relative_eq!(at_contact.y, ghost.y, epsilon = 1e-2);
}

#[test]
fn object_ball_rebounds_from_cushion() {
    let table = TableGeometry::default();
    let object = Vector2::new(200.0, 100.0);

    let contact = first_cushion_contact(object, Vector2::new(1.0, 0.0), &table).unwrap();
    assert_eq!(contact.rail, "Right");
    assert_relative_eq!(
        contact.point.x,
        table.length / 2.0 - table.ball_radius,
        epsilon = 1e-9
    );
    assert_relative_eq!(contact.reflected.x, -1.0, epsilon = 1e-12);
}

/// A straight shot: the cue ball stops dead, the object ball rolls into the
/// right cushion and comes back slower.
#[test]
fn straight_shot_into_cushion() {
    let table = TableGeometry::default();
    let physics = PhysicsSettings::default();
    let deceleration = physics.rolling_deceleration();

    let cue = Motion::rolling(
        Vector2::new(-600.0, 0.0),
        Vector2::new(2000.0, 0.0),
        deceleration,
    );
    let object = Motion::stationary(Vector2::new(0.0, 0.0));
    let t = time_to_collision(&cue, &object, table.ball_diameter())
        .unwrap()
        .unwrap();
    let cue = cue.advance(t);
    assert_relative_eq!(cue.position.x, -table.ball_diameter(), epsilon = 1e-4);

    let (cue_after, object_after) = elastic_collision(
        cue.position,
        cue.velocity,
        object.position,
        object.velocity,
        physics.energy_loss_by_ball,
    )
    .unwrap();
    assert_relative_eq!(cue_after.norm(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(
        object_after.x,
        cue.velocity.x / (1.0 + physics.energy_loss_by_ball),
        epsilon = 1e-9
    );

    let contact = first_cushion_contact(object.position, object_after, &table).unwrap();
    assert_eq!(contact.rail, "Right");
    let rolling = Motion::rolling(object.position, object_after, deceleration);
    let t = time_to_travel(&rolling, contact.distance).unwrap();
    let before = rolling.advance(t).velocity;
    let after = rail_collision(before, contact.normal, physics.energy_loss_by_rail).unwrap();
    assert!(after.x < 0.0);
    assert_relative_eq!(
        after.norm(),
        before.norm() / (1.0 + physics.energy_loss_by_rail),
        epsilon = 1e-9
    );
}
