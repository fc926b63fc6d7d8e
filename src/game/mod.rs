pub mod constants;
pub mod events;
pub mod input;
pub mod match_result;
pub mod session;
pub mod state;
pub mod systems;
