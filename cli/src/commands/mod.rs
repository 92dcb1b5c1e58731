pub mod backup;
pub mod engines;
pub mod rotate;
