pub mod config;
pub mod frame;
pub mod game;
pub mod robot;
