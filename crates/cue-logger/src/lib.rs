mod log_file;
mod logger;
mod record;
mod sink;

pub use log_file::*;
pub use logger::*;
pub use record::*;
pub use sink::*;
