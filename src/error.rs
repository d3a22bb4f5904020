//! Error types for lustre.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can stop a lustre application from starting or rendering.
///
/// Texture loading failures are not represented here at the app level:
/// the cubemap loader logs them and substitutes black faces.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    WindowCreation(#[from] winit::error::OsError),
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("failed to load image '{}': {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_error_names_the_path() {
        let source = image::open("does/not/exist.jpg").unwrap_err();
        let err = Error::Image {
            path: PathBuf::from("does/not/exist.jpg"),
            source,
        };
        assert!(err.to_string().starts_with("failed to load image 'does/not/exist.jpg'"));
    }

    #[test]
    fn surface_error_display() {
        let err = Error::from(wgpu::SurfaceError::OutOfMemory);
        assert!(err.to_string().starts_with("surface error:"));
    }
}
