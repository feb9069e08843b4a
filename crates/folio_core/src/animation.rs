//! Animation primitives
//!
//! Every animated subsystem (carousel track, zoom reset, morph proxy) is
//! driven by the host's paint cycle: it owns an `Animation`, samples it with
//! the frame timestamp, and moves through `AnimPhase` explicitly.

use crate::geometry::{Rect, Vec2};
use std::time::{Duration, Instant};

/// Lifecycle of an animated subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimPhase {
    #[default]
    Idle,
    /// A tween is running
    Animating,
    /// Tween finished; post-animation bookkeeping pending (e.g. recentering)
    Settling,
}

/// Easing curve type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    /// Cubic ease-out: 1 - (1 - t)^3
    EaseOut,
    /// CSS `cubic-bezier(x1, y1, x2, y2)`
    Bezier(f32, f32, f32, f32),
}

impl Easing {
    /// Slide transitions
    pub const SLIDE: Easing = Easing::Bezier(0.25, 0.46, 0.45, 0.94);
    /// Snap-back with a slight overshoot
    pub const SNAP_BACK: Easing = Easing::Bezier(0.175, 0.885, 0.32, 1.275);

    /// Apply the easing function to a value t in [0, 1]
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match *self {
            Easing::Linear => t,
            Easing::EaseOut => 1.0 - (1.0 - t).powi(3),
            Easing::Bezier(x1, y1, x2, y2) => {
                if t == 0.0 || t == 1.0 {
                    return t;
                }
                let s = solve_bezier_x(t, x1, x2);
                bezier(s, y1, y2)
            }
        }
    }
}

/// One coordinate of a cubic bezier with endpoints fixed at 0 and 1
fn bezier(s: f32, p1: f32, p2: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s
}

fn bezier_slope(s: f32, p1: f32, p2: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * p1 + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

/// Find the curve parameter whose x equals `x`
fn solve_bezier_x(x: f32, x1: f32, x2: f32) -> f32 {
    // Newton first, bisection if the slope flattens out
    let mut s = x;
    for _ in 0..8 {
        let err = bezier(s, x1, x2) - x;
        if err.abs() < 1e-5 {
            return s;
        }
        let slope = bezier_slope(s, x1, x2);
        if slope.abs() < 1e-6 {
            break;
        }
        s -= err / slope;
    }

    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    s = x;
    for _ in 0..32 {
        let v = bezier(s, x1, x2);
        if (v - x).abs() < 1e-5 {
            break;
        }
        if v < x {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) / 2.0;
    }
    s
}

/// Values that can be tweened
pub trait Lerp: Copy {
    fn lerp(&self, to: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Vec2 {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        Vec2::lerp(*self, *to, t)
    }
}

impl Lerp for Rect {
    fn lerp(&self, to: &Self, t: f32) -> Self {
        Rect::lerp(self, to, t)
    }
}

/// A single animation instance
#[derive(Debug, Clone)]
pub struct Animation<T: Lerp> {
    pub start: T,
    pub end: T,
    pub duration: Duration,
    pub start_time: Instant,
    pub easing: Easing,
}

impl<T: Lerp> Animation<T> {
    pub fn new(start: T, end: T, duration: Duration, easing: Easing, now: Instant) -> Self {
        Self {
            start,
            end,
            duration,
            start_time: now,
            easing,
        }
    }

    /// Linear progress in [0, 1]
    pub fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.start_time);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    /// Get the animated value at `now`
    pub fn value(&self, now: Instant) -> T {
        let t = self.progress(now);
        if t >= 1.0 {
            return self.end;
        }
        self.start.lerp(&self.end, self.easing.apply(t))
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    /// When the animation ends
    pub fn deadline(&self) -> Instant {
        self.start_time + self.duration
    }
}
