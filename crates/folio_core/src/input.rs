//! Raw input events as delivered by the host
//!
//! A mouse pointer is treated as a single touch: dragging it swipes, and a
//! double click toggles zoom just like a double tap.

use crate::geometry::Vec2;

/// Raw input event in viewport coordinates (origin top-left)
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Trackpad or mouse wheel deltas
    Wheel { delta_x: f32, delta_y: f32 },
    /// Active touches after a finger went down
    TouchStart { touches: Vec<Vec2> },
    /// Active touches after movement
    TouchMove { touches: Vec<Vec2> },
    /// Touches still down after a finger lifted
    TouchEnd { remaining: Vec<Vec2> },
    PointerDown { position: Vec2 },
    PointerMove { position: Vec2 },
    PointerUp { position: Vec2 },
    /// Named key (`"Escape"`, `"Left"`, `"Plus"`, ...)
    Key { name: String },
}

impl InputEvent {
    pub fn wheel(delta_x: f32, delta_y: f32) -> Self {
        InputEvent::Wheel { delta_x, delta_y }
    }

    pub fn touch_start(points: &[(f32, f32)]) -> Self {
        InputEvent::TouchStart { touches: to_points(points) }
    }

    pub fn touch_move(points: &[(f32, f32)]) -> Self {
        InputEvent::TouchMove { touches: to_points(points) }
    }

    pub fn touch_end(remaining: &[(f32, f32)]) -> Self {
        InputEvent::TouchEnd { remaining: to_points(remaining) }
    }
}

fn to_points(points: &[(f32, f32)]) -> Vec<Vec2> {
    points.iter().map(|&(x, y)| Vec2::new(x, y)).collect()
}
