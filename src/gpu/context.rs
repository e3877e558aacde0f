//! wgpu device setup for the overlay renderer.

use std::sync::Arc;
use wgpu::{Adapter, Device, Instance, Queue};

/// Errors from GPU setup, pipeline validation, readback and snapshot export.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
    #[error("Failed to map readback buffer: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),
    #[error("Device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("Note pipeline creation failed: {0}")]
    Pipeline(String),
    #[error("Readback callback dropped before completion")]
    ReadbackAborted,
    #[error("Failed to write snapshot: {0}")]
    Snapshot(#[from] image::ImageError),
}

/// Adapter selection knobs.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    /// Use a software adapter, e.g. for CI without a GPU.
    pub force_fallback_adapter: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY | wgpu::Backends::GL,
            power_preference: wgpu::PowerPreference::LowPower,
            force_fallback_adapter: false,
        }
    }
}

/// Device and queue shared by everything the renderer creates.
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
}

impl GpuContext {
    /// Open a device with [`ContextOptions::default`].
    pub async fn new() -> Result<Self, GpuError> {
        Self::with_options(&ContextOptions::default()).await
    }

    pub async fn with_options(options: &ContextOptions) -> Result<Self, GpuError> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: options.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference,
                force_fallback_adapter: options.force_fallback_adapter,
                compatible_surface: None,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!(
            "Using GPU adapter {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        // Default limits allow 8192px targets, enough for 4K canvases at 2x.
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("notefall"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        Ok(Self {
            instance,
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Largest width or height a render target may have on this device.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Clamp a requested target size to `1..=max_texture_dimension`.
    pub fn clamp_extent(&self, width: u32, height: u32) -> (u32, u32) {
        let max = self.max_texture_dimension();
        if width > max || height > max {
            log::warn!(
                "Overlay {}x{} exceeds device limit {}, clamping",
                width,
                height,
                max
            );
        }
        (width.clamp(1, max), height.clamp(1, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gpu_context_creation() {
        // Absent on most CI machines; only check we don't panic.
        let Ok(ctx) = GpuContext::new().await else {
            return;
        };
        assert!(!ctx.adapter_info().name.is_empty());
        assert!(ctx.max_texture_dimension() >= 2048);
    }

    #[tokio::test]
    async fn test_clamp_extent_respects_device_limit() {
        let Ok(ctx) = GpuContext::new().await else {
            return;
        };
        let max = ctx.max_texture_dimension();
        assert_eq!(ctx.clamp_extent(0, 10), (1, 10));
        assert_eq!(ctx.clamp_extent(max + 100, 10), (max, 10));
    }
}
