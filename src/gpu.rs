//! Core GPU context and device management.
//!
//! This module provides [`GpuContext`], the struct that owns the wgpu surface,
//! device and queue, and [`Viewport`], the plain size bookkeeping the context
//! uses to track the window's drawable area.
//!
//! # Initialization
//!
//! A `GpuContext` is created from a winit [`Window`]. It performs the usual
//! wgpu boilerplate (instance, surface, adapter, device, surface configuration)
//! and reports any failure as an [`Error`] instead of panicking, so the caller
//! decides how to surface a missing GPU.
//!
//! # Example
//!
//! ```ignore
//! let gpu = GpuContext::new(window.clone(), 4, true)?;
//! println!("{}x{} (aspect {})", gpu.width(), gpu.height(), gpu.aspect());
//! ```
//!
//! [`Window`]: winit::window::Window

use std::sync::Arc;
use winit::window::Window;

use crate::error::{Error, Result};

/// Size of the drawable area in physical pixels.
///
/// Kept separate from the wgpu configuration so resize handling can be
/// reasoned about (and tested) without a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Apply a resize event.
    ///
    /// Returns `false` and leaves the viewport untouched for zero-sized
    /// dimensions (a minimized window) or when nothing changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Core GPU context holding wgpu resources.
///
/// All wgpu fields are public to allow direct access to wgpu APIs when needed.
/// The context is created once at startup and passed by reference to every
/// rendering pass.
pub struct GpuContext {
    /// The surface for presenting rendered frames to the window.
    pub surface: wgpu::Surface<'static>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current surface configuration (format, size, present mode).
    pub config: wgpu::SurfaceConfiguration,
    /// MSAA sample count used by the scene pass (1 disables multisampling).
    pub sample_count: u32,
    viewport: Viewport,
}

impl GpuContext {
    /// Create a new GPU context from a winit window.
    ///
    /// `sample_count` is the requested MSAA sample count. It falls back to 1
    /// when the surface format does not support it. `vsync` selects `Fifo`
    /// over `AutoNoVsync` presentation.
    pub fn new(window: Arc<Window>, sample_count: u32, vsync: bool) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        let info = adapter.get_info();
        log::info!("Selected GPU: {} ({:?} backend)", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Lustre Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            return Err(Error::NoSurfaceFormat);
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(first_format);

        let format_features = adapter.get_texture_format_features(surface_format);
        let sample_count = if sample_count > 1
            && format_features
                .flags
                .sample_count_supported(sample_count)
        {
            sample_count
        } else {
            if sample_count > 1 {
                log::warn!("{sample_count}x MSAA unsupported for {surface_format:?}, disabling");
            }
            1
        };

        let present_mode = if vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let viewport = Viewport::new(size.width.max(1), size.height.max(1));
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: viewport.width,
            height: viewport.height,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        log::debug!(
            "Surface configured: {}x{} {:?}, {}x MSAA",
            viewport.width,
            viewport.height,
            surface_format,
            sample_count
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            sample_count,
            viewport,
        })
    }

    /// Reconfigure the surface at the viewport's size.
    ///
    /// Called after the viewport changed and after `Lost`/`Outdated`.
    pub fn reconfigure(&mut self) {
        self.config.width = self.viewport.width;
        self.config.height = self.viewport.height;
        self.surface.configure(&self.device, &self.config);
    }

    pub(crate) fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Returns the current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.viewport.width
    }

    /// Returns the current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.viewport.height
    }

    /// Returns the current aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.viewport.aspect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_tracks_resize_exactly() {
        let mut viewport = Viewport::new(800, 600);
        assert!(viewport.resize(1920, 1080));
        assert_eq!(viewport, Viewport::new(1920, 1080));
        assert!(viewport.resize(333, 777));
        assert_eq!((viewport.width, viewport.height), (333, 777));
    }

    #[test]
    fn viewport_ignores_zero_sizes() {
        let mut viewport = Viewport::new(800, 600);
        assert!(!viewport.resize(0, 600));
        assert!(!viewport.resize(800, 0));
        assert_eq!(viewport, Viewport::new(800, 600));
    }

    #[test]
    fn viewport_same_size_is_not_a_change() {
        let mut viewport = Viewport::new(640, 480);
        assert!(!viewport.resize(640, 480));
    }

    #[test]
    fn viewport_aspect() {
        let viewport = Viewport::new(1600, 900);
        assert!((viewport.aspect() - 16.0 / 9.0).abs() < 1e-6);
        assert!(!viewport.is_empty());
    }
}
