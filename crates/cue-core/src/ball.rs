use serde::{Deserialize, Serialize};

use crate::Vector2;

/// Identifier of a tracked ball, stable across frames while the ball is tracked.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct BallId(u32);

impl BallId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification of a ball as reported by the detector.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BallType {
    Cue,
    Solid,
    Stripe,
    Eight,
    #[default]
    Unknown,
}

impl std::fmt::Display for BallType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BallType::Cue => "cue",
            BallType::Solid => "solid",
            BallType::Stripe => "stripe",
            BallType::Eight => "eight",
            BallType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A single detected ball.
///
/// Equality is exact: two balls are equal only if id, position and type match
/// bit for bit. The radius is shared by all balls and lives in
/// [`TableGeometry`](crate::TableGeometry).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub id: BallId,
    /// Center of the ball in table coordinates, in mm
    pub position: Vector2,
    pub ball_type: BallType,
}

impl Ball {
    pub fn new(id: BallId, position: Vector2, ball_type: BallType) -> Self {
        Self {
            id,
            position,
            ball_type,
        }
    }
}
