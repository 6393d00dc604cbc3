mod collision;
mod contact;
mod impact;
mod intersection;
mod roots;

pub use collision::*;
pub use contact::*;
pub use impact::*;
pub use intersection::*;
pub use roots::*;

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum GeometryError {
    #[error("{operation}: ball radius must be positive, got {radius}")]
    InvalidRadius {
        operation: &'static str,
        radius: f64,
    },
    #[error("{0}")]
    Solver(#[from] SolverError),
}
