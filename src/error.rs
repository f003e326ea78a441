//! Error types for the gallery.
//!
//! This module provides error types for GPU initialization, probability
//! pyramid construction, configuration loading and running a demo.

use thiserror::Error;

/// Errors that can occur during GPU initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found ({0}); ensure your system has Vulkan/Metal/DX12 support")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The surface reported no usable formats for this adapter.
    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,
}

/// Errors that can occur while building a probability pyramid.
#[derive(Debug, Error)]
pub enum PyramidError {
    /// Level 0 must be a non-empty power-of-two square.
    #[error("pyramid level 0 must be a power-of-two square, got {width}x{height}")]
    NotPowerOfTwo { width: u32, height: u32 },
    /// Input slice does not match `size * size` (times channel count).
    #[error("pyramid data length mismatch: expected {expected}, got {actual}")]
    DataLength { expected: usize, actual: usize },
    /// Failed to load or decode the source image.
    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),
}

/// Errors that can occur when loading a demo configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON for [`DemoConfig`](crate::config::DemoConfig).
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value parsed fine but is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that can occur when running a demo.
#[derive(Debug, Error)]
pub enum DemoError {
    /// Failed to create event loop.
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// GPU initialization failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    /// The spawn pyramid could not be built.
    #[error("probability pyramid error: {0}")]
    Pyramid(#[from] PyramidError),
    /// The configuration was rejected.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pyramid_error_display() {
        let err = PyramidError::NotPowerOfTwo { width: 3, height: 5 };
        assert_eq!(
            err.to_string(),
            "pyramid level 0 must be a power-of-two square, got 3x5"
        );
    }

    #[test]
    fn test_demo_error_wraps_config() {
        let err: DemoError = ConfigError::Invalid("particle_count must be > 0".into()).into();
        assert!(err.to_string().contains("particle_count"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
