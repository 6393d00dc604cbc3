use anyhow::{Context, Result};
use cue_core::{PhysicsSettings, TableGeometry, Vector2};
use cue_physics::{
    compute_contact, elastic_collision, first_cushion_contact, rail_collision, time_to_collision,
    time_to_travel, Motion,
};

pub fn contact(
    ball: Vector2,
    target: Vector2,
    start: Vector2,
    offset: Vector2,
    radius: f64,
) -> Result<()> {
    let result = compute_contact(ball, target, start, offset, radius)
        .context("Failed to compute the contact")?;
    if !result.valid {
        println!("The incoming ball does not reach the struck ball");
        return Ok(());
    }
    println!(
        "contact point:  ({:.3}, {:.3})",
        result.contact_point.x, result.contact_point.y
    );
    println!(
        "angular error:  {:.6} rad ({:.3}°)",
        result.error_bound,
        result.error_bound.to_degrees()
    );
    println!("lateral error:  {:.3} mm", result.lateral_error);
    Ok(())
}

pub fn predict(a: &Motion, b: &Motion, diameter: f64, physics: &PhysicsSettings) -> Result<()> {
    match time_to_collision(a, b, diameter).context("Failed to predict the collision")? {
        Some(t) => {
            let (a, b) = (a.advance(t), b.advance(t));
            println!("first contact after {:.4} s", t);
            println!("ball 1 at ({:.3}, {:.3})", a.position.x, a.position.y);
            println!("ball 2 at ({:.3}, {:.3})", b.position.x, b.position.y);
            if let Some((v1, v2)) = elastic_collision(
                a.position,
                a.velocity,
                b.position,
                b.velocity,
                physics.energy_loss_by_ball,
            ) {
                println!("ball 1 leaves with ({:.3}, {:.3}) mm/s", v1.x, v1.y);
                println!("ball 2 leaves with ({:.3}, {:.3}) mm/s", v2.x, v2.y);
            }
        }
        None => println!("The balls do not touch"),
    }
    Ok(())
}

/// Prints where a ball first hits a cushion. With a `speed` the ball rolls
/// with friction and the impact time and rebound velocity are printed too.
pub fn cushion(
    position: Vector2,
    direction: Vector2,
    speed: Option<f64>,
    table: &TableGeometry,
    physics: &PhysicsSettings,
) -> Result<()> {
    if !table.contains_ball(position) {
        log::warn!("Ball at ({}, {}) is not on the table", position.x, position.y);
    }
    match first_cushion_contact(position, direction, table) {
        Some(contact) => {
            println!("cushion:    {}", contact.rail);
            println!("impact at:  ({:.3}, {:.3})", contact.point.x, contact.point.y);
            println!("distance:   {:.3} mm", contact.distance);
            println!(
                "rebound:    ({:.4}, {:.4})",
                contact.reflected.x, contact.reflected.y
            );
            let Some(speed) = speed else {
                return Ok(());
            };
            let velocity = direction.normalize() * speed;
            let motion = Motion::rolling(position, velocity, physics.rolling_deceleration());
            match time_to_travel(&motion, contact.distance) {
                Some(t) => {
                    let before = motion.advance(t).velocity;
                    println!("impact after {:.4} s", t);
                    if let Some(after) =
                        rail_collision(before, contact.normal, physics.energy_loss_by_rail)
                    {
                        println!("leaves with ({:.3}, {:.3}) mm/s", after.x, after.y);
                    }
                }
                None => println!("The ball stops before the cushion"),
            }
        }
        None => println!("The ball does not reach a cushion"),
    }
    Ok(())
}
