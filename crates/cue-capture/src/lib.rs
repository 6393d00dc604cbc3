//! Frame acquisition: camera devices, the freshest-frame pipeline and the
//! state tracker built on top of it.

mod device;
mod error;
mod frame;
mod pipeline;
mod synthetic;
mod tracker;

pub use device::*;
pub use error::*;
pub use frame::*;
pub use pipeline::*;
pub use synthetic::*;
pub use tracker::*;
