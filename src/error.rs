use thiserror::Error;

/// Scene contents that cannot be traced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("sphere {sphere} uses material {index}, but the scene only has {materials} materials")]
    MaterialIndexOutOfRange {
        sphere: usize,
        index: usize,
        materials: usize,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Camera viewport is {camera:?} but the renderer holds {renderer:?}")]
    ViewportMismatch {
        renderer: (u32, u32),
        camera: (u32, u32),
    },

    #[error("Image data holds {actual} pixels but the viewport needs {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
