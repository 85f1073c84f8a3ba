// Error types for profile building, solid synthesis and catalog loading.

use thiserror::Error;

/// Result type for profile and solid operations.
pub type GeometryResult<T> = Result<T, GeometryError>;

/// Errors raised while building a profile or sweeping it into a solid.
///
/// Parameters are checked before any geometry is produced; the requesting
/// part is then left out of the draw list rather than drawn with clamped values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A numeric parameter is outside its domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The profile (or its bevel inset) cannot form a valid solid.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(#[from] GeometryFault),
}

impl GeometryError {
    pub(crate) fn param(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { name, reason: reason.into() }
    }
}

/// Specific reason a profile failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryFault {
    #[error("contour {contour} has fewer than 3 distinct points")]
    TooFewPoints { contour: usize },

    #[error("contour {contour} encloses zero area")]
    ZeroArea { contour: usize },

    #[error("contour {contour} intersects itself")]
    SelfIntersection { contour: usize },

    #[error("contours {a} and {b} intersect")]
    ContourOverlap { a: usize, b: usize },

    #[error("hole contour {contour} is not inside the outer boundary")]
    HoleOutside { contour: usize },

    #[error("bevel inset collapses contour {contour}")]
    BevelCollapse { contour: usize },

    #[error("cap tessellation failed: {0}")]
    Tessellation(String),

    #[error("swept solid is not a closed manifold")]
    NotManifold,
}

/// Fatal problems in an assembly catalog, raised at load time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse assembly catalog: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("catalog `{0}` declares no parts")]
    Empty(String),

    #[error("duplicate part id `{0}`")]
    DuplicateId(String),

    #[error("part `{id}` ({kind}) is missing parameter `{param}`")]
    MissingParam {
        id: String,
        kind: &'static str,
        param: &'static str,
    },

    #[error("part `{id}`: invalid `{param}`: {reason}")]
    InvalidParam {
        id: String,
        param: &'static str,
        reason: String,
    },

    #[error("part `{id}` has invalid color `{color}`")]
    InvalidColor { id: String, color: String },
}
