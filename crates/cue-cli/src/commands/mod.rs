pub mod capture;
pub mod geometry;
pub mod logs;
pub mod solve;
