mod ball;
mod geom;
mod settings;
mod state;

pub use ball::*;
pub use geom::*;
pub use settings::*;
pub use state::*;

/// 2D vector in table coordinates, in mm.
pub type Vector2 = nalgebra::Vector2<f64>;
