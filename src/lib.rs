//! Interactive exploded-view assembly viewer.
//!
//! `assembly` is the headless core: part catalogs, procedural solids and the
//! per-frame transform blender. `engine` holds the window-side building blocks
//! the viewer binary is assembled from.

pub mod assembly;
pub mod engine;
