use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Ball, BallId, BallType, Vector2};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Failed to build state: ball id {0} appears more than once")]
    DuplicateBallId(BallId),
}

/// The detection result of a single frame: an immutable set of balls.
///
/// A `State` never contains two balls with the same id. Equality is set
/// equality, independent of the order in which the balls were supplied. There
/// are no mutating methods; a tracking update produces a new `State`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Ball>", into = "Vec<Ball>")]
pub struct State {
    balls: BTreeMap<BallId, Ball>,
}

impl TryFrom<Vec<Ball>> for State {
    type Error = StateError;

    fn try_from(balls: Vec<Ball>) -> Result<Self, Self::Error> {
        Self::from_balls(balls)
    }
}

impl From<State> for Vec<Ball> {
    fn from(state: State) -> Self {
        state.balls.into_values().collect()
    }
}

impl State {
    /// Create a state from a mapping of ball id to position and type.
    pub fn new(mapping: HashMap<BallId, (Vector2, BallType)>) -> Self {
        let balls = mapping
            .into_iter()
            .map(|(id, (position, ball_type))| (id, Ball::new(id, position, ball_type)))
            .collect();
        Self { balls }
    }

    /// Create a state from a list of balls.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DuplicateBallId`] if two balls share an id.
    pub fn from_balls(balls: impl IntoIterator<Item = Ball>) -> Result<Self, StateError> {
        let mut map = BTreeMap::new();
        for ball in balls {
            if map.insert(ball.id, ball).is_some() {
                return Err(StateError::DuplicateBallId(ball.id));
            }
        }
        Ok(Self { balls: map })
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    pub fn get(&self, id: BallId) -> Option<&Ball> {
        self.balls.get(&id)
    }

    pub fn contains(&self, id: BallId) -> bool {
        self.balls.contains_key(&id)
    }

    /// Iterate over the balls in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Ball> {
        self.balls.values()
    }

    /// Find the first ball of the given type, eg. the cue ball.
    pub fn find_type(&self, ball_type: BallType) -> Option<&Ball> {
        self.balls.values().find(|b| b.ball_type == ball_type)
    }

    /// Compute what changed between `self` and a newer state. Positions are
    /// compared exactly.
    pub fn diff(&self, next: &State) -> StateDiff {
        self.diff_with_tolerance(next, 0.0)
    }

    /// Like [`State::diff`], but a ball only counts as moved if its center
    /// moved further than `tolerance`.
    pub fn diff_with_tolerance(&self, next: &State, tolerance: f64) -> StateDiff {
        let mut diff = StateDiff::default();
        for (id, ball) in &self.balls {
            match next.balls.get(id) {
                None => diff.removed.push(*id),
                Some(other) => {
                    let moved = if tolerance > 0.0 {
                        (other.position - ball.position).norm() > tolerance
                    } else {
                        other.position != ball.position
                    };
                    if moved {
                        diff.moved.push(*id);
                    }
                    if other.ball_type != ball.ball_type {
                        diff.retyped.push(*id);
                    }
                }
            }
        }
        diff.added = next
            .balls
            .keys()
            .filter(|id| !self.balls.contains_key(id))
            .copied()
            .collect();
        diff
    }
}

impl<'a> IntoIterator for &'a State {
    type Item = &'a Ball;
    type IntoIter = std::collections::btree_map::Values<'a, BallId, Ball>;

    fn into_iter(self) -> Self::IntoIter {
        self.balls.values()
    }
}

/// Difference between two consecutive states. All id lists are in ascending
/// order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDiff {
    /// Balls present only in the newer state
    pub added: Vec<BallId>,
    /// Balls present only in the older state
    pub removed: Vec<BallId>,
    /// Balls whose position changed
    pub moved: Vec<BallId>,
    /// Balls whose classification changed
    pub retyped: Vec<BallId>,
}

impl StateDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.moved.is_empty()
            && self.retyped.is_empty()
    }
}
