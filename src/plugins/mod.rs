pub mod core;
pub mod player;
pub mod saveload;
pub mod sim;
pub mod worldgen;
