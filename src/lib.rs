//! Dropview - drop-in glTF scene viewer core

pub mod core;
pub mod math;
pub mod scene;
pub mod assets;
pub mod viewer;
pub mod render;
