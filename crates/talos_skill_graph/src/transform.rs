// SPDX-License-Identifier: MIT OR Apache-2.0
//! Screen/world coordinate transform for the canvas.
//!
//! `screen = world * scale + pan`. Screen coordinates are relative to the
//! canvas origin (top-left of the viewport), in pixels.

use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest zoom factor
pub const MIN_SCALE: f32 = 0.2;
/// Largest zoom factor
pub const MAX_SCALE: f32 = 2.0;
/// Scale change per unit of wheel delta
pub const ZOOM_SENSITIVITY: f32 = 0.001;
/// Scale change of the zoom in/out buttons
pub const ZOOM_STEP: f32 = 0.1;

/// Zoom limits and sensitivity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomSettings {
    /// Smallest zoom factor
    pub min_scale: f32,
    /// Largest zoom factor
    pub max_scale: f32,
    /// Scale change per unit of wheel delta
    pub sensitivity: f32,
    /// Scale change of one zoom button press
    pub step: f32,
}

impl Default for ZoomSettings {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            sensitivity: ZOOM_SENSITIVITY,
            step: ZOOM_STEP,
        }
    }
}

impl ZoomSettings {
    /// Whether the limits form a usable, positive range and the rates are finite
    pub fn is_valid(&self) -> bool {
        self.min_scale.is_finite()
            && self.max_scale.is_finite()
            && self.min_scale > 0.0
            && self.min_scale <= self.max_scale
            && self.sensitivity.is_finite()
            && self.step.is_finite()
    }
}

/// Pan offset and zoom scale of the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Translation in screen pixels
    pan: Vec2,
    /// Zoom factor
    scale: f32,
    /// Limits
    settings: ZoomSettings,
}

impl ViewTransform {
    /// Create an identity transform with default zoom limits
    pub fn new() -> Self {
        Self::with_settings(ZoomSettings::default())
    }

    /// Create an identity transform with custom zoom limits
    pub fn with_settings(settings: ZoomSettings) -> Self {
        Self {
            pan: Vec2::ZERO,
            scale: 1.0,
            settings,
        }
    }

    /// Current pan offset
    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    /// Current zoom factor
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Zoom limits in use
    pub fn settings(&self) -> &ZoomSettings {
        &self.settings
    }

    /// Zoom as a whole percentage, for display
    pub fn zoom_percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }

    /// Convert screen position to world position
    pub fn to_world(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.pan) / self.scale).to_pos2()
    }

    /// Convert world position to screen position
    pub fn to_screen(&self, world: Pos2) -> Pos2 {
        (world.to_vec2() * self.scale + self.pan).to_pos2()
    }

    /// Convert a screen-space distance to world units
    pub fn screen_delta_to_world(&self, delta: Vec2) -> Vec2 {
        delta / self.scale
    }

    /// Move the viewport by a screen-space delta
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Change the scale by `-delta_scale`, keeping the world point under
    /// `screen` fixed on screen.
    pub fn zoom_at(&mut self, screen: Pos2, delta_scale: f32) {
        let world = self.to_world(screen);
        self.scale = self.clamp(self.scale - delta_scale);
        self.pan = screen.to_vec2() - world.to_vec2() * self.scale;
    }

    /// Zoom from a mouse wheel event at `screen`
    pub fn zoom_wheel(&mut self, screen: Pos2, wheel_delta_y: f32) {
        self.zoom_at(screen, wheel_delta_y * self.settings.sensitivity);
    }

    /// Zoom button: step the scale in (`steps > 0`) or out, without a pivot
    pub fn zoom_step(&mut self, steps: i32) {
        self.scale = self.clamp(self.scale + steps as f32 * self.settings.step);
    }

    /// Back to no pan and unit zoom, or the nearest allowed zoom
    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.scale = self.clamp(1.0);
    }

    // min/max rather than f32::clamp, which panics on an inverted range
    fn clamp(&self, scale: f32) -> f32 {
        scale.min(self.settings.max_scale).max(self.settings.min_scale)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new()
    }
}
