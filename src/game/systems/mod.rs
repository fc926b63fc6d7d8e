pub mod physics;
pub mod combat;
pub mod ai;
pub mod pickup;
