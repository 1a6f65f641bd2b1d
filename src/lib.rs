pub mod constants;
pub mod env;
pub mod ghost;
pub mod map;
pub mod pacman;
pub mod rng;
pub mod types;
