pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod game_timer;
pub mod graphics;
pub mod input;
pub mod logging;
pub mod renderer;
pub mod scene;

pub use error::{Error, Result};
