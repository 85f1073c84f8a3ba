// Exploded-assembly core: catalogs, procedural solids and per-frame blending.
// Everything here is pure computation; the binary owns the window and GPU.

pub mod blend;
pub mod composer;
pub mod error;
pub mod extrude;
pub(crate) mod outline;
pub mod profile;
pub mod registry;
pub mod view;
pub mod wear;

pub use blend::{FrameTime, PartRuntimeState};
pub use composer::{Composer, ComposerOptions, DrawRecord, PartGeometry};
pub use error::{ConfigError, GeometryError};
pub use registry::{PartKind, PartSpec, Registry, Variant};
pub use view::{SelectionChange, ViewState};
