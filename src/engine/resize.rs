//! Canvas size and device-pixel-ratio tracking.
//!
//! Draw space is the logical (CSS) canvas, so note coordinates supplied by the
//! host line up with the DOM exactly; the pixel ratio is applied separately
//! when sizing the physical target and when the fragment stage maps
//! framebuffer rows back to logical Y.

use glam::Mat4;

use crate::render::{NoteRenderer, ViewportConstants};

/// Canvas dimensions reported by the host display layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Logical width in CSS pixels.
    pub width: f32,
    /// Logical height in CSS pixels.
    pub height: f32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    /// Device pixel ratio, with non-positive or non-finite values read as 1.
    pub fn pixel_ratio(&self) -> f32 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }

    /// Backing store size in device pixels, at least 1x1.
    pub fn physical_size(&self) -> (u32, u32) {
        let ratio = self.pixel_ratio();
        let width = (self.width * ratio).round().max(1.0) as u32;
        let height = (self.height * ratio).round().max(1.0) as u32;
        (width, height)
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Orthographic projection with the origin at the top-left and Y down.
    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh(0.0, self.width, self.height, 0.0, -1.0, 1.0)
    }

    pub fn constants(&self) -> ViewportConstants {
        let (physical_width, physical_height) = self.physical_size();
        ViewportConstants {
            projection: self.projection().to_cols_array_2d(),
            logical_width: self.width,
            logical_height: self.height,
            pixel_ratio: self.pixel_ratio(),
            physical_width,
            physical_height,
        }
    }
}

/// Holds the latest requested viewport until it can be applied between draws.
#[derive(Debug, Clone, Default)]
pub struct ResizeCoordinator {
    applied: Option<Viewport>,
    pending: Option<Viewport>,
}

impl ResizeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a size change. Returns `false` when it was ignored.
    pub fn request(&mut self, viewport: Viewport) -> bool {
        if !viewport.is_valid() {
            log::warn!(
                "Ignoring invalid viewport {}x{}",
                viewport.width,
                viewport.height
            );
            return false;
        }
        if self.pending.is_none() && self.applied == Some(viewport) {
            return false;
        }
        self.pending = Some(viewport);
        true
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The viewport the renderer currently uses.
    pub fn current(&self) -> Option<Viewport> {
        self.applied
    }

    /// Push the pending viewport, if any, to the renderer.
    pub fn apply_pending<R: NoteRenderer + ?Sized>(&mut self, renderer: &mut R) -> bool {
        let Some(viewport) = self.pending.take() else {
            return false;
        };
        let constants = viewport.constants();
        log::debug!(
            "Viewport {}x{} @{}x -> {}x{} physical",
            viewport.width,
            viewport.height,
            constants.pixel_ratio,
            constants.physical_width,
            constants.physical_height
        );
        renderer.resize(&constants);
        self.applied = Some(viewport);
        true
    }
}
