//! Zoom and pan of the current slide
//!
//! Coordinates are relative to the viewport centre. An image point `p`
//! (offset from the image centre, in fitted pixels) appears on screen at
//! `pan + p * scale`.

use crate::animation::{AnimPhase, Animation, Easing};
use crate::config::ViewerConfig;
use crate::geometry::{Size, Vec2};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct ResetAnimation {
    scale: Animation<f32>,
    pan: Animation<Vec2>,
}

/// Scale and pan state for one slide
#[derive(Debug, Clone)]
pub struct ZoomPanController {
    scale: f32,
    pan: Vec2,
    /// Image size at scale 1 (fitted into the viewport)
    fitted: Size,
    viewport: Size,
    max_zoom: f32,
    reset_duration: Duration,
    reset: Option<ResetAnimation>,
    phase: AnimPhase,
}

impl ZoomPanController {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            scale: 1.0,
            pan: Vec2::ZERO,
            fitted: Size::default(),
            viewport: Size::default(),
            max_zoom: config.max_zoom.max(1.0),
            reset_duration: config.zoom_reset_duration(),
            reset: None,
            phase: AnimPhase::Idle,
        }
    }

    /// Update image and viewport sizes; pan is re-clamped
    pub fn set_geometry(&mut self, fitted: Size, viewport: Size) {
        self.fitted = fitted;
        self.viewport = viewport;
        self.pan = self.clamp_pan(self.pan, self.scale);
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    pub fn phase(&self) -> AnimPhase {
        self.phase
    }

    pub fn is_zoomed(&self) -> bool {
        self.scale > 1.0 + f32::EPSILON
    }

    /// Scale 1, no pan, nothing animating
    pub fn is_at_rest(&self) -> bool {
        self.reset.is_none() && self.scale == 1.0 && self.pan == Vec2::ZERO
    }

    /// Zoom to `scale` keeping the image point under `anchor` fixed
    pub fn zoom_to(&mut self, scale: f32, anchor: Vec2) {
        self.stop_reset();

        let target = scale.clamp(1.0, self.max_zoom);
        let factor = target / self.scale;
        let pan = anchor - (anchor - self.pan) * factor;

        self.scale = target;
        self.pan = self.clamp_pan(pan, target);
    }

    /// Multiply the current scale (keyboard zoom)
    pub fn zoom_by(&mut self, factor: f32, anchor: Vec2) {
        self.zoom_to(self.scale * factor, anchor);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        if !self.is_zoomed() {
            return;
        }
        self.stop_reset();
        self.pan = self.clamp_pan(self.pan + Vec2::new(dx, dy), self.scale);
    }

    /// Animate back to scale 1. Returns false when already at rest or resetting.
    pub fn reset(&mut self, now: Instant) -> bool {
        if self.reset.is_some() || self.is_at_rest() {
            return false;
        }

        self.reset = Some(ResetAnimation {
            scale: Animation::new(self.scale, 1.0, self.reset_duration, Easing::EaseOut, now),
            pan: Animation::new(self.pan, Vec2::ZERO, self.reset_duration, Easing::EaseOut, now),
        });
        self.phase = AnimPhase::Animating;
        tracing::debug!("Zoom reset from {:.2}", self.scale);
        true
    }

    /// Jump to rest without animating
    pub fn reset_immediately(&mut self) {
        self.reset = None;
        self.phase = AnimPhase::Idle;
        self.scale = 1.0;
        self.pan = Vec2::ZERO;
    }

    /// Advance the reset animation; returns true while it is still running
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(anim) = &self.reset else {
            return false;
        };

        if anim.scale.is_complete(now) {
            self.reset_immediately();
            return false;
        }

        self.scale = anim.scale.value(now);
        self.pan = anim.pan.value(now);
        true
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.reset.as_ref().map(|a| a.scale.deadline())
    }

    /// Image-space point -> viewport-centre-relative screen point
    pub fn project(&self, image_point: Vec2) -> Vec2 {
        self.pan + image_point * self.scale
    }

    /// Screen point -> image-space point
    pub fn unproject(&self, screen_point: Vec2) -> Vec2 {
        (screen_point - self.pan) * (1.0 / self.scale)
    }

    fn stop_reset(&mut self) {
        if self.reset.take().is_some() {
            self.phase = AnimPhase::Idle;
        }
    }

    fn clamp_pan(&self, pan: Vec2, scale: f32) -> Vec2 {
        if scale <= 1.0 {
            return Vec2::ZERO;
        }
        let limit_x = ((self.fitted.width * scale - self.viewport.width) / 2.0).max(0.0);
        let limit_y = ((self.fitted.height * scale - self.viewport.height) / 2.0).max(0.0);
        Vec2::new(pan.x.clamp(-limit_x, limit_x), pan.y.clamp(-limit_y, limit_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ZoomPanController {
        let mut zoom = ZoomPanController::new(&ViewerConfig::default());
        zoom.set_geometry(Size::new(1000.0, 800.0), Size::new(1000.0, 800.0));
        zoom
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        a.distance(b) < 1e-3
    }

    #[test]
    fn test_anchor_stays_fixed() {
        for scale in [1.5, 2.5, 4.0] {
            let mut zoom = controller();
            let anchor = Vec2::new(100.0, 50.0);
            let image_point = zoom.unproject(anchor);

            zoom.zoom_to(scale, anchor);
            assert_eq!(zoom.scale(), scale);
            assert!(close(zoom.project(image_point), anchor), "scale {}", scale);
        }
    }

    #[test]
    fn test_anchor_fixed_when_already_zoomed() {
        let mut zoom = controller();
        zoom.zoom_to(2.0, Vec2::new(-200.0, 100.0));
        let anchor = Vec2::new(150.0, -120.0);
        let image_point = zoom.unproject(anchor);

        zoom.zoom_to(3.0, anchor);
        assert!(close(zoom.project(image_point), anchor));
    }

    #[test]
    fn test_scale_clamped() {
        let mut zoom = controller();
        zoom.zoom_to(10.0, Vec2::ZERO);
        assert_eq!(zoom.scale(), 4.0);
        zoom.zoom_to(0.2, Vec2::new(300.0, 300.0));
        assert_eq!(zoom.scale(), 1.0);
        assert_eq!(zoom.pan(), Vec2::ZERO);
    }

    #[test]
    fn test_pan_clamped_to_image_bounds() {
        let mut zoom = controller();
        zoom.zoom_to(2.0, Vec2::ZERO);
        zoom.pan_by(10_000.0, -10_000.0);
        // (1000 * 2 - 1000) / 2, (800 * 2 - 800) / 2
        assert_eq!(zoom.pan(), Vec2::new(500.0, -400.0));
    }

    #[test]
    fn test_narrow_image_does_not_pan_sideways() {
        let mut zoom = ZoomPanController::new(&ViewerConfig::default());
        zoom.set_geometry(Size::new(400.0, 800.0), Size::new(1000.0, 800.0));
        zoom.zoom_to(2.0, Vec2::ZERO);
        zoom.pan_by(300.0, 300.0);
        assert_eq!(zoom.pan(), Vec2::new(0.0, 300.0));
    }

    #[test]
    fn test_pan_ignored_at_scale_one() {
        let mut zoom = controller();
        zoom.pan_by(50.0, 50.0);
        assert_eq!(zoom.pan(), Vec2::ZERO);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut zoom = controller();
        let t0 = Instant::now();
        zoom.zoom_to(3.0, Vec2::new(80.0, 40.0));

        assert!(zoom.reset(t0));
        assert_eq!(zoom.phase(), AnimPhase::Animating);
        // A second reset while animating does not restart it
        assert!(!zoom.reset(t0 + Duration::from_millis(50)));

        assert!(zoom.tick(t0 + Duration::from_millis(100)));
        assert!(zoom.scale() > 1.0 && zoom.scale() < 3.0);

        let end = zoom.deadline().unwrap();
        assert!(!zoom.tick(end));
        assert_eq!(zoom.scale(), 1.0);
        assert_eq!(zoom.pan(), Vec2::ZERO);
        assert!(zoom.is_at_rest());

        assert!(!zoom.reset(end));
        assert_eq!(zoom.scale(), 1.0);
        assert_eq!(zoom.pan(), Vec2::ZERO);
    }

    #[test]
    fn test_zoom_interrupts_reset() {
        let mut zoom = controller();
        let t0 = Instant::now();
        zoom.zoom_to(3.0, Vec2::ZERO);
        zoom.reset(t0);
        zoom.zoom_to(2.0, Vec2::ZERO);
        assert_eq!(zoom.phase(), AnimPhase::Idle);
        assert!(zoom.deadline().is_none());
        assert_eq!(zoom.scale(), 2.0);
    }
}
