//! Air drawing: draw on a webcam feed with your index finger, then have the drawing read back
//! as letters, digits or a sketch label and search for it.

pub mod app;
pub mod camera;
pub mod canvas;
pub mod config;
pub mod error;
pub mod gesture;
pub mod hand;
pub mod nn;
pub mod recognition;
pub mod search;
pub mod ui;

pub use config::Config;
pub use error::{Error, Result};
