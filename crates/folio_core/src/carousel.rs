//! Three-slot virtual carousel
//!
//! However long the album, only three slots exist. Slot `k` sits at track
//! position `(k - 1) * width` and shows logical index `current + k - 1`.
//! Navigating fills the slot in the direction of travel, slides the track one
//! width, then recenters: slot contents shift and the track jumps back to 0
//! in the same frame.

use crate::animation::{AnimPhase, Animation, Easing};
use crate::catalog::Photo;
use crate::config::ViewerConfig;
use crate::preload::{ImageLoader, PreloadCache};
use std::time::{Duration, Instant};

/// One of the three slide positions
#[derive(Debug, Clone, PartialEq)]
pub struct Slot<H> {
    /// Logical photo index shown, `None` past either end
    pub index: Option<usize>,
    pub handle: Option<H>,
}

impl<H> Default for Slot<H> {
    fn default() -> Self {
        Self { index: None, handle: None }
    }
}

/// Which navigation buttons to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavVisibility {
    pub prev: bool,
    pub next: bool,
}

/// Per-photo position dots under the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageIndicator {
    pub count: usize,
    /// Active dot; follows a slide as soon as it starts
    pub current: usize,
}

impl PageIndicator {
    /// One flag per dot, set on the active one
    pub fn dots(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.count).map(move |i| i == self.current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackMotion {
    /// Sliding toward a new index
    Slide { target: usize },
    /// Returning to 0 after a released drag
    SnapBack,
}

#[derive(Debug, Clone)]
struct TrackAnimation {
    offset: Animation<f32>,
    motion: TrackMotion,
}

/// Virtual window over an album's photos
pub struct VirtualCarousel<L: ImageLoader> {
    loader: L,
    photos: Vec<Photo>,
    cache: PreloadCache<L::Handle>,
    slots: [Slot<L::Handle>; 3],
    current: usize,
    is_open: bool,
    /// Slide width (viewport width)
    width: f32,
    offset: f32,
    animation: Option<TrackAnimation>,
    phase: AnimPhase,
    slide_duration: Duration,
    snap_back_duration: Duration,
    rubber_band: f32,
}

impl<L: ImageLoader> VirtualCarousel<L> {
    pub fn new(loader: L, config: &ViewerConfig) -> Self {
        Self {
            loader,
            photos: Vec::new(),
            cache: PreloadCache::new(config.preload_radius, config.evict_radius),
            slots: Default::default(),
            current: 0,
            is_open: false,
            width: 0.0,
            offset: 0.0,
            animation: None,
            phase: AnimPhase::Idle,
            slide_duration: config.slide_duration(),
            snap_back_duration: config.snap_back_duration(),
            rubber_band: config.rubber_band,
        }
    }

    /// Replace the photo list; cached handles are dropped
    pub fn set_photos(&mut self, photos: Vec<Photo>) {
        self.photos = photos;
        self.cache.clear();
        self.slots = Default::default();
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width;
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn current_photo(&self) -> Option<&Photo> {
        self.is_open.then(|| self.photos.get(self.current)).flatten()
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    pub fn cache(&self) -> &PreloadCache<L::Handle> {
        &self.cache
    }

    /// Show `index` with no animation
    pub fn open(&mut self, index: usize) -> bool {
        if index >= self.photos.len() {
            tracing::warn!("Carousel open at {} past end ({} photos)", index, self.photos.len());
            return false;
        }
        self.is_open = true;
        self.animation = None;
        self.phase = AnimPhase::Idle;
        self.offset = 0.0;
        self.recenter(index, true);
        tracing::debug!("Carousel opened at {}", index);
        true
    }

    /// Drop every slot, cached handle and animation
    pub fn close(&mut self) {
        self.is_open = false;
        self.animation = None;
        self.phase = AnimPhase::Idle;
        self.offset = 0.0;
        self.slots = Default::default();
        self.cache.clear();
        tracing::debug!("Carousel closed");
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn index(&self) -> usize {
        self.current
    }

    /// Index the carousel is at, or sliding toward
    pub fn target_index(&self) -> usize {
        match &self.animation {
            Some(TrackAnimation { motion: TrackMotion::Slide { target }, .. }) => *target,
            _ => self.current,
        }
    }

    pub fn phase(&self) -> AnimPhase {
        self.phase
    }

    /// Navigate to `target`. Out-of-range targets and the current index are
    /// no-ops; returns whether navigation happened.
    pub fn go_to(&mut self, target: usize, animate: bool, now: Instant) -> bool {
        if !self.is_open || target >= self.photos.len() {
            return false;
        }

        // Supersede an in-flight slide: land on its target without loading
        self.settle_slide(false);

        if target == self.current {
            return false;
        }

        if !animate || self.width <= 0.0 {
            self.animation = None;
            self.offset = 0.0;
            self.phase = AnimPhase::Idle;
            self.recenter(target, true);
            return true;
        }

        let forward = target > self.current;
        let slot = if forward { 2 } else { 0 };
        if self.slots[slot].index != Some(target) {
            let handle = self.cache.get_or_load(target, &self.photos, &mut self.loader);
            self.slots[slot] = Slot { index: Some(target), handle };
        }

        let start = self.track_offset(now);
        let end = if forward { -self.width } else { self.width };
        self.animation = Some(TrackAnimation {
            offset: Animation::new(start, end, self.slide_duration, Easing::SLIDE, now),
            motion: TrackMotion::Slide { target },
        });
        self.phase = AnimPhase::Animating;
        tracing::debug!("Slide {} -> {}", self.current, target);
        true
    }

    pub fn next(&mut self, now: Instant) -> bool {
        self.go_to(self.target_index() + 1, true, now)
    }

    pub fn prev(&mut self, now: Instant) -> bool {
        match self.target_index().checked_sub(1) {
            Some(target) => self.go_to(target, true, now),
            None => false,
        }
    }

    /// Live drag feedback; resisted past the first and last photo
    pub fn drag(&mut self, dx: f32) {
        if !self.is_open {
            return;
        }
        // A finger on the track ends any motion; a slide lands first
        if !self.settle_slide(true) && self.animation.take().is_some() {
            self.phase = AnimPhase::Idle;
        }

        let resisted = (self.is_at_first() && dx > 0.0) || (self.is_at_last() && dx < 0.0);
        self.offset = if resisted { dx * self.rubber_band } else { dx };
    }

    /// Animate a released drag back to rest
    pub fn snap_back(&mut self, now: Instant) {
        if self.offset == 0.0 || self.animation.is_some() {
            return;
        }
        self.animation = Some(TrackAnimation {
            offset: Animation::new(self.offset, 0.0, self.snap_back_duration, Easing::SNAP_BACK, now),
            motion: TrackMotion::SnapBack,
        });
        self.phase = AnimPhase::Animating;
    }

    /// Paint-cycle step; returns true while animating
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(animation) = &self.animation else {
            return false;
        };

        if !animation.offset.is_complete(now) {
            self.offset = animation.offset.value(now);
            return true;
        }

        let motion = animation.motion;
        self.animation = None;
        self.phase = AnimPhase::Settling;
        self.offset = 0.0;
        if let TrackMotion::Slide { target } = motion {
            self.recenter(target, true);
        }
        self.phase = AnimPhase::Idle;
        false
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.animation.as_ref().map(|a| a.offset.deadline())
    }

    /// Track translation at `now`
    pub fn track_offset(&self, now: Instant) -> f32 {
        match &self.animation {
            Some(animation) => animation.offset.value(now),
            None => self.offset,
        }
    }

    pub fn slots(&self) -> &[Slot<L::Handle>; 3] {
        &self.slots
    }

    pub fn nav_visibility(&self) -> NavVisibility {
        if !self.is_open {
            return NavVisibility::default();
        }
        NavVisibility {
            prev: !self.is_at_first(),
            next: !self.is_at_last(),
        }
    }

    pub fn page_indicator(&self) -> PageIndicator {
        if !self.is_open {
            return PageIndicator::default();
        }
        PageIndicator {
            count: self.photos.len(),
            current: self.target_index(),
        }
    }

    pub fn is_at_first(&self) -> bool {
        self.target_index() == 0
    }

    pub fn is_at_last(&self) -> bool {
        self.target_index() + 1 >= self.photos.len()
    }

    /// Cut an in-flight slide short and recenter on its target. Returns
    /// false, leaving any other animation alone, when no slide is running.
    fn settle_slide(&mut self, load: bool) -> bool {
        match self.animation.take() {
            Some(TrackAnimation { motion: TrackMotion::Slide { target }, .. }) => {
                tracing::debug!("Slide to {} interrupted", target);
                self.offset = 0.0;
                self.phase = AnimPhase::Idle;
                self.recenter(target, load);
                true
            }
            other => {
                self.animation = other;
                false
            }
        }
    }

    /// Reassign slots to `{center - 1, center, center + 1}`.
    ///
    /// With `load` unset only already-available handles are reused.
    fn recenter(&mut self, center: usize, load: bool) {
        let previous = std::mem::take(&mut self.slots);
        self.current = center;

        for (k, slot) in self.slots.iter_mut().enumerate() {
            let Some(index) = (center + k).checked_sub(1).filter(|&i| i < self.photos.len()) else {
                continue;
            };

            let reused = previous
                .iter()
                .find(|s| s.index == Some(index))
                .and_then(|s| s.handle.clone())
                .or_else(|| self.cache.get(index).cloned());

            let handle = match reused {
                Some(handle) => Some(handle),
                None if load => self.cache.get_or_load(index, &self.photos, &mut self.loader),
                None => None,
            };
            *slot = Slot { index: Some(index), handle };
        }

        if load {
            self.cache.refresh(center, &self.photos, &mut self.loader);
        }
    }
}
