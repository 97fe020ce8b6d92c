pub mod camera;
pub mod client;
pub mod config;
pub mod types;
pub mod utils;
