// Engine module - reusable viewer building blocks
// Nothing in here knows about assemblies or parts.

pub mod camera;
pub mod components;
pub mod input;
pub mod mesh;
pub mod overlay;
pub mod smoothing;

// Re-export commonly used items
pub use components::*;
