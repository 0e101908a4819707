use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while building cameras and frames, or while projecting through them.
///
/// Every failure is reported as its own variant. Projections never fall back to a sentinel pixel
/// or coordinate.
#[derive(Debug, Error)]
pub enum Error {
    /// The camera intrinsics cannot describe a physical pinhole camera.
    ///
    /// This is fatal to the camera being constructed; the inputs have to be fixed.
    #[error("invalid camera configuration: {0}")]
    InvalidCameraConfig(String),

    /// The ray through the given pixel points at or above the horizon, so it never meets the
    /// ground plane.
    #[error(
        "ray through pixel ({x}, {y}) does not intersect the ground ({polar_angle_deg}° off nadir)"
    )]
    NoGroundIntersection {
        x: f64,
        y: f64,
        polar_angle_deg: f64,
    },

    /// The inverse projection is undefined for the requested coordinate, eg because it lies
    /// directly below the sensor and so has no bearing.
    #[error("degenerate projection: {0}")]
    DegenerateProjection(String),

    /// An input lies outside the domain where the flat-ground model is meaningful.
    #[error("input out of range: {0}")]
    OutOfRangeInput(String),

    /// The image handed to a frame does not have the resolution of the camera that took it.
    #[error("image is {}x{} pixels but the camera resolution is {}x{}", image.0, image.1, camera.0, camera.1)]
    ResolutionMismatch { image: (u32, u32), camera: (u32, u32) },

    /// The image collaborator failed to produce an image.
    #[error("failed to load image from {}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
