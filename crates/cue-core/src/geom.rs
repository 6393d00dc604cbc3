use serde::{Deserialize, Serialize};

use crate::Vector2;

/// A straight cushion segment, in table coordinates.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RailSegment {
    /// Readable name of the segment
    pub name: String,
    /// Start point of the segment, in mm
    pub start: Vector2,
    /// End point of the segment, in mm
    pub end: Vector2,
}

impl RailSegment {
    pub fn new(name: impl Into<String>, start: Vector2, end: Vector2) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    pub fn direction(&self) -> Vector2 {
        self.end - self.start
    }

    pub fn length(&self) -> f64 {
        self.direction().norm()
    }
}

/// The table geometry. The origin is the center of the playing surface.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TableGeometry {
    /// Length of the playing surface (cushion nose to cushion nose) in mm
    pub length: f64,
    /// Width of the playing surface in mm
    pub width: f64,
    /// Radius shared by all balls, in mm
    pub ball_radius: f64,
    /// Cushion segments. Generated from `length` and `width` if empty.
    #[serde(default)]
    pub rails: Vec<RailSegment>,
}

impl TableGeometry {
    /// Create a rectangular table with four cushions.
    pub fn rectangular(length: f64, width: f64, ball_radius: f64) -> Self {
        let mut table = Self {
            length,
            width,
            ball_radius,
            rails: Vec::new(),
        };
        table.rails = table.default_rails();
        table
    }

    pub fn ball_diameter(&self) -> f64 {
        2.0 * self.ball_radius
    }

    /// The cushions of a plain rectangle, counter-clockwise.
    pub fn default_rails(&self) -> Vec<RailSegment> {
        let hx = self.length / 2.0;
        let hy = self.width / 2.0;
        vec![
            RailSegment::new("Bottom", Vector2::new(-hx, -hy), Vector2::new(hx, -hy)),
            RailSegment::new("Right", Vector2::new(hx, -hy), Vector2::new(hx, hy)),
            RailSegment::new("Top", Vector2::new(hx, hy), Vector2::new(-hx, hy)),
            RailSegment::new("Left", Vector2::new(-hx, hy), Vector2::new(-hx, -hy)),
        ]
    }

    /// Cushion segments, falling back to the rectangle if none are configured.
    pub fn rails(&self) -> Vec<RailSegment> {
        if self.rails.is_empty() {
            self.default_rails()
        } else {
            self.rails.clone()
        }
    }

    /// Whether a ball centered at `position` lies fully on the playing surface.
    pub fn contains_ball(&self, position: Vector2) -> bool {
        let hx = self.length / 2.0 - self.ball_radius;
        let hy = self.width / 2.0 - self.ball_radius;
        position.x.abs() <= hx && position.y.abs() <= hy
    }
}

impl Default for TableGeometry {
    fn default() -> Self {
        // 9ft pool table with 52.3 mm balls
        Self::rectangular(2540.0, 1270.0, 26.15)
    }
}
