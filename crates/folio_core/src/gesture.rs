//! Gesture arbitration
//!
//! Turns raw wheel / touch / pointer streams into viewer intents. A gesture
//! locks onto one axis after a small sample and keeps it until it ends, so
//! noisy diagonal input never flips between navigating and dismissing.
//!
//! Wheel bursts have no explicit end event. The arbiter exposes the burst's
//! quiet-period deadline; the host wakes at `deadline()` and calls
//! `fire_timers`.

use crate::config::{GestureConfig, ScrollSign};
use crate::geometry::{Size, Vec2};
use crate::input::InputEvent;
use std::time::{Duration, Instant};

/// Locked gesture direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Navigation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next,
    Prev,
}

/// What the viewer should do in response to input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureIntent {
    /// Live feedback: horizontal track displacement and downward dismiss pull
    Track { dx: f32, dy: f32 },
    Navigate(Step),
    Dismiss,
    /// Gesture released below thresholds; return to rest
    SnapBack,
    /// Absolute zoom around a viewport point
    ZoomTo { scale: f32, anchor: Vec2 },
    /// Double tap / double click at a viewport point
    ToggleZoom { anchor: Vec2 },
    PanBy { dx: f32, dy: f32 },
}

/// Viewer facts the arbiter needs to interpret input
#[derive(Debug, Clone, Copy)]
pub struct GestureContext {
    pub viewport: Size,
    pub zoom_scale: f32,
    pub max_zoom: f32,
    pub at_first: bool,
    pub at_last: bool,
}

impl GestureContext {
    pub fn zoomed(&self) -> bool {
        self.zoom_scale > 1.0 + f32::EPSILON
    }
}

#[derive(Debug)]
struct WheelBurst {
    axis: Option<Axis>,
    sample_x: f32,
    sample_y: f32,
    samples: u32,
    /// Accumulated horizontal travel (positive = toward next)
    delta_x: f32,
    /// Accumulated dismiss pull (always >= 0)
    pull: f32,
    velocity: f32,
    deadline: Instant,
}

#[derive(Debug)]
struct TouchTrack {
    start: Vec2,
    current: Vec2,
    last: Vec2,
    started_at: Instant,
    axis: Option<Axis>,
}

#[derive(Debug)]
struct Pinch {
    initial_distance: f32,
    initial_scale: f32,
}

#[derive(Debug)]
enum TouchGesture {
    None,
    Single(TouchTrack),
    Pinch(Pinch),
}

/// Classifies input streams into intents
#[derive(Debug)]
pub struct GestureArbiter {
    config: GestureConfig,
    wheel: Option<WheelBurst>,
    last_wheel_at: Option<Instant>,
    touch: TouchGesture,
    last_tap: Option<(Instant, Vec2)>,
    cooldown_until: Option<Instant>,
}

impl GestureArbiter {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            wheel: None,
            last_wheel_at: None,
            touch: TouchGesture::None,
            last_tap: None,
            cooldown_until: None,
        }
    }

    /// Feed one event
    pub fn handle(&mut self, event: &InputEvent, ctx: &GestureContext, now: Instant) -> Option<GestureIntent> {
        match event {
            InputEvent::Wheel { delta_x, delta_y } => self.on_wheel(*delta_x, *delta_y, ctx, now),
            InputEvent::TouchStart { touches } => self.on_touch_start(touches, ctx, now),
            InputEvent::TouchMove { touches } => self.on_touch_move(touches, ctx),
            InputEvent::TouchEnd { remaining } => self.on_touch_end(remaining, None, ctx, now),
            InputEvent::PointerDown { position } => self.on_touch_start(&[*position], ctx, now),
            InputEvent::PointerMove { position } => match self.touch {
                TouchGesture::Single(_) => self.on_touch_move(&[*position], ctx),
                _ => None,
            },
            InputEvent::PointerUp { position } => self.on_touch_end(&[], Some(*position), ctx, now),
            InputEvent::Key { .. } => None,
        }
    }

    /// Earliest pending timer
    pub fn deadline(&self) -> Option<Instant> {
        self.wheel.as_ref().map(|b| b.deadline)
    }

    /// Resolve timers that are due at `now`
    pub fn fire_timers(&mut self, ctx: &GestureContext, now: Instant) -> Option<GestureIntent> {
        match &self.wheel {
            Some(burst) if burst.deadline <= now => {}
            _ => return None,
        }
        let burst = self.wheel.take()?;
        self.finish_wheel(burst, ctx)
    }

    /// Drop every in-flight gesture and timer
    pub fn cancel(&mut self) {
        self.wheel = None;
        self.touch = TouchGesture::None;
        self.last_tap = None;
        self.cooldown_until = None;
    }

    /// Is any gesture in progress?
    pub fn is_active(&self) -> bool {
        self.wheel.is_some() || !matches!(self.touch, TouchGesture::None)
    }

    // ===== Wheel =====

    fn on_wheel(&mut self, dx: f32, dy: f32, ctx: &GestureContext, now: Instant) -> Option<GestureIntent> {
        let elapsed_ms = self
            .last_wheel_at
            .map(|t| ms_between(t, now))
            .unwrap_or(0.0);
        self.last_wheel_at = Some(now);

        if ctx.zoomed() {
            // Zoomed images scroll instead of swiping
            self.wheel = None;
            return Some(GestureIntent::PanBy { dx: -dx, dy: -dy });
        }

        let config = &self.config;
        let burst = self.wheel.get_or_insert_with(|| WheelBurst {
            axis: None,
            sample_x: 0.0,
            sample_y: 0.0,
            samples: 0,
            delta_x: 0.0,
            pull: 0.0,
            velocity: 0.0,
            deadline: now,
        });

        if burst.axis.is_none() {
            burst.sample_x += dx.abs();
            burst.sample_y += dy.abs();
            burst.samples += 1;

            let total = burst.sample_x + burst.sample_y;
            if total > config.wheel_lock_delta || burst.samples >= config.wheel_lock_samples {
                burst.axis = Some(if burst.sample_y > burst.sample_x {
                    Axis::Vertical
                } else {
                    Axis::Horizontal
                });
                tracing::debug!("Wheel burst locked {:?}", burst.axis);
            }
        }

        match burst.axis {
            None => {
                burst.deadline = now + ms(config.wheel_quiet_horizontal_ms);
                None
            }
            Some(Axis::Vertical) => {
                let toward_dismiss = match config.dismiss_scroll_sign {
                    ScrollSign::Natural => -dy,
                    ScrollSign::Classic => dy,
                };
                if toward_dismiss > 0.0 {
                    burst.pull += toward_dismiss;
                } else if burst.pull > 0.0 {
                    burst.pull = (burst.pull + toward_dismiss).max(0.0);
                }
                burst.deadline = now + ms(config.wheel_quiet_vertical_ms);

                (burst.pull > 0.0).then_some(GestureIntent::Track { dx: 0.0, dy: burst.pull })
            }
            Some(Axis::Horizontal) => {
                let blocked = (ctx.at_first && dx < 0.0) || (ctx.at_last && dx > 0.0);
                if !blocked {
                    burst.delta_x += dx;
                }
                if elapsed_ms > 0.0 {
                    burst.velocity = dx / elapsed_ms;
                }
                burst.deadline = now + ms(config.wheel_quiet_horizontal_ms);

                Some(GestureIntent::Track { dx: -burst.delta_x, dy: 0.0 })
            }
        }
    }

    fn finish_wheel(&mut self, burst: WheelBurst, ctx: &GestureContext) -> Option<GestureIntent> {
        match burst.axis {
            None => None,
            Some(Axis::Vertical) => {
                if burst.pull > self.config.wheel_dismiss_distance {
                    tracing::debug!("Wheel dismiss (pull {:.0})", burst.pull);
                    Some(GestureIntent::Dismiss)
                } else {
                    Some(GestureIntent::SnapBack)
                }
            }
            Some(Axis::Horizontal) => {
                let threshold = ctx.viewport.width * self.config.wheel_distance_ratio;
                let commit = burst.delta_x.abs() > threshold
                    || burst.velocity.abs() > self.config.wheel_velocity;

                if commit && burst.delta_x > 0.0 {
                    Some(GestureIntent::Navigate(Step::Next))
                } else if commit && burst.delta_x < 0.0 {
                    Some(GestureIntent::Navigate(Step::Prev))
                } else {
                    Some(GestureIntent::SnapBack)
                }
            }
        }
    }

    // ===== Touch / pointer =====

    fn on_touch_start(&mut self, touches: &[Vec2], ctx: &GestureContext, now: Instant) -> Option<GestureIntent> {
        if touches.len() >= 2 {
            let was_tracking = matches!(&self.touch, TouchGesture::Single(t) if t.axis.is_some());
            let initial_distance = touches[0].distance(touches[1]).max(1.0);
            self.touch = TouchGesture::Pinch(Pinch {
                initial_distance,
                initial_scale: ctx.zoom_scale,
            });
            self.last_tap = None;
            tracing::debug!("Pinch started at scale {:.2}", ctx.zoom_scale);
            return was_tracking.then_some(GestureIntent::SnapBack);
        }

        let Some(&point) = touches.first() else {
            return None;
        };

        if self.cooldown_until.is_some_and(|until| now < until) {
            tracing::debug!("Touch ignored during pinch cooldown");
            return None;
        }
        self.cooldown_until = None;

        self.touch = TouchGesture::Single(TouchTrack {
            start: point,
            current: point,
            last: point,
            started_at: now,
            axis: None,
        });
        None
    }

    fn on_touch_move(&mut self, touches: &[Vec2], ctx: &GestureContext) -> Option<GestureIntent> {
        let lock = self.config.direction_lock_px;

        match &mut self.touch {
            TouchGesture::None => None,
            TouchGesture::Pinch(pinch) => {
                if touches.len() < 2 {
                    return None;
                }
                let distance = touches[0].distance(touches[1]);
                let scale = (pinch.initial_scale * distance / pinch.initial_distance)
                    .clamp(1.0, ctx.max_zoom);
                Some(GestureIntent::ZoomTo {
                    scale,
                    anchor: touches[0].midpoint(touches[1]),
                })
            }
            TouchGesture::Single(track) => {
                let point = *touches.first()?;
                track.last = track.current;
                track.current = point;

                let delta = track.current - track.start;
                if track.axis.is_none() {
                    if delta.x.abs() > lock || delta.y.abs() > lock {
                        track.axis = Some(if delta.x.abs() > delta.y.abs() {
                            Axis::Horizontal
                        } else {
                            Axis::Vertical
                        });
                        tracing::debug!("Touch locked {:?}", track.axis);
                    } else {
                        return None;
                    }
                }

                if ctx.zoomed() {
                    let step = track.current - track.last;
                    return Some(GestureIntent::PanBy { dx: step.x, dy: step.y });
                }

                match track.axis {
                    Some(Axis::Horizontal) => Some(GestureIntent::Track { dx: delta.x, dy: 0.0 }),
                    Some(Axis::Vertical) if delta.y > 0.0 => {
                        Some(GestureIntent::Track { dx: 0.0, dy: delta.y })
                    }
                    _ => None,
                }
            }
        }
    }

    fn on_touch_end(
        &mut self,
        remaining: &[Vec2],
        release_at: Option<Vec2>,
        ctx: &GestureContext,
        now: Instant,
    ) -> Option<GestureIntent> {
        match std::mem::replace(&mut self.touch, TouchGesture::None) {
            TouchGesture::None => None,
            TouchGesture::Pinch(pinch) => {
                if remaining.len() >= 2 {
                    self.touch = TouchGesture::Pinch(pinch);
                    return None;
                }
                self.cooldown_until = Some(now + ms(self.config.pinch_cooldown_ms));
                tracing::debug!("Pinch ended");
                None
            }
            TouchGesture::Single(mut track) => {
                if !remaining.is_empty() {
                    self.touch = TouchGesture::Single(track);
                    return None;
                }
                if let Some(point) = release_at {
                    track.current = point;
                }
                self.finish_touch(track, ctx, now)
            }
        }
    }

    fn finish_touch(&mut self, track: TouchTrack, ctx: &GestureContext, now: Instant) -> Option<GestureIntent> {
        let delta = track.current - track.start;
        let elapsed_ms = ms_between(track.started_at, now).max(1.0);

        let Some(axis) = track.axis else {
            if delta.length() <= self.config.tap_slop_px {
                return self.on_tap(track.current, now);
            }
            return None;
        };
        self.last_tap = None;

        if ctx.zoomed() {
            return None;
        }

        match axis {
            Axis::Horizontal => {
                let velocity = delta.x.abs() / elapsed_ms;
                let threshold = ctx.viewport.width * self.config.touch_distance_ratio;
                let commit = delta.x.abs() > threshold || velocity > self.config.touch_velocity;

                if commit && delta.x < 0.0 {
                    Some(GestureIntent::Navigate(Step::Next))
                } else if commit && delta.x > 0.0 {
                    Some(GestureIntent::Navigate(Step::Prev))
                } else {
                    Some(GestureIntent::SnapBack)
                }
            }
            Axis::Vertical => {
                if delta.y <= 0.0 {
                    return Some(GestureIntent::SnapBack);
                }
                let velocity = delta.y / elapsed_ms;
                if delta.y > self.config.touch_dismiss_distance || velocity > self.config.touch_velocity {
                    Some(GestureIntent::Dismiss)
                } else {
                    Some(GestureIntent::SnapBack)
                }
            }
        }
    }

    fn on_tap(&mut self, point: Vec2, now: Instant) -> Option<GestureIntent> {
        let window = ms(self.config.double_tap_ms);
        let slop = self.config.tap_slop_px * 3.0;

        match self.last_tap.take() {
            Some((at, prev)) if now.saturating_duration_since(at) <= window && prev.distance(point) <= slop => {
                tracing::debug!("Double tap at ({:.0}, {:.0})", point.x, point.y);
                Some(GestureIntent::ToggleZoom { anchor: point })
            }
            _ => {
                self.last_tap = Some((now, point));
                None
            }
        }
    }
}

/// Album view response to a touch swipe
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlbumSwipeIntent {
    /// Slide the album view right by `dx` and fade it to `opacity`
    Track { dx: f32, opacity: f32 },
    /// Slide out and close the album view
    Close,
    SnapBack,
}

/// Rightward swipe-to-close for the album view on narrow screens.
///
/// Locks an axis like the viewer does; only a horizontal, rightward swipe
/// is tracked, everything else is left to normal scrolling.
#[derive(Debug)]
pub struct AlbumSwipe {
    config: GestureConfig,
    track: Option<TouchTrack>,
    width: f32,
}

impl AlbumSwipe {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            track: None,
            width: 0.0,
        }
    }

    pub fn handle(&mut self, event: &InputEvent, viewport: Size, now: Instant) -> Option<AlbumSwipeIntent> {
        match event {
            InputEvent::TouchStart { touches } => {
                self.track = None;
                if viewport.width > self.config.album_swipe_max_width || touches.len() != 1 {
                    return None;
                }
                self.width = viewport.width;
                self.track = Some(TouchTrack {
                    start: touches[0],
                    current: touches[0],
                    last: touches[0],
                    started_at: now,
                    axis: None,
                });
                None
            }
            InputEvent::TouchMove { touches } => {
                let track = self.track.as_mut()?;
                let point = *touches.first()?;
                track.last = track.current;
                track.current = point;

                let delta = point - track.start;
                let lock = self.config.direction_lock_px;
                if track.axis.is_none() && (delta.x.abs() > lock || delta.y.abs() > lock) {
                    track.axis = Some(if delta.x.abs() > delta.y.abs() {
                        Axis::Horizontal
                    } else {
                        Axis::Vertical
                    });
                }

                (track.axis == Some(Axis::Horizontal) && delta.x > 0.0).then(|| {
                    let dx = delta.x.min(self.width);
                    AlbumSwipeIntent::Track {
                        dx,
                        opacity: 1.0 - dx / self.width * 0.3,
                    }
                })
            }
            InputEvent::TouchEnd { remaining } if remaining.is_empty() => {
                let track = self.track.take()?;
                if track.axis != Some(Axis::Horizontal) {
                    return None;
                }
                let dx = track.current.x - track.start.x;
                let velocity = dx.abs() / ms_between(track.started_at, now).max(1.0);
                let close = dx > 0.0
                    && (dx > self.width * self.config.album_dismiss_ratio
                        || velocity > self.config.album_dismiss_velocity);

                if close {
                    tracing::debug!("Album swipe close (dx {:.0})", dx);
                    Some(AlbumSwipeIntent::Close)
                } else {
                    Some(AlbumSwipeIntent::SnapBack)
                }
            }
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.track.is_some()
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn ms_between(earlier: Instant, later: Instant) -> f32 {
    later.saturating_duration_since(earlier).as_secs_f32() * 1000.0
}
