//! Full-screen viewer
//!
//! Wires the gesture arbiter, the virtual carousel, zoom/pan and the morph
//! transition together over one album's photos. The host forwards input,
//! calls `tick` every paint, and wakes at `deadline()` to call `fire_timers`.

use crate::carousel::{NavVisibility, PageIndicator, VirtualCarousel};
use crate::catalog::Album;
use crate::command::{KeyMap, ViewerCommand};
use crate::config::{FolioConfig, ViewerConfig};
use crate::geometry::{Rect, Size, Vec2};
use crate::gesture::{GestureArbiter, GestureContext, GestureIntent, Step};
use crate::input::InputEvent;
use crate::morph::MorphTransition;
use crate::overlay::OverlayHost;
use crate::preload::ImageLoader;
use crate::zoom::ZoomPanController;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Viewer state; exists only while the viewer is open
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub current_index: usize,
    pub zoom_scale: f32,
    pub pan_offset: Vec2,
    pub active_album: String,
}

/// Something the host has to react to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerAction {
    /// A slide transition toward `index` started
    Navigated { index: usize },
    /// Navigation past the first/last photo was refused
    BoundaryReached,
    /// The user asked to leave; the host re-measures the thumbnail and calls `close`
    DismissRequested,
}

pub struct Viewer<L: ImageLoader> {
    config: ViewerConfig,
    arbiter: GestureArbiter,
    carousel: VirtualCarousel<L>,
    zoom: ZoomPanController,
    morph: MorphTransition,
    keymap: KeyMap,
    viewport: Size,
    /// Live downward pull of a dismiss gesture
    pull: f32,
    state: Option<ViewerState>,
}

impl<L: ImageLoader> Viewer<L> {
    pub fn new(loader: L, config: &FolioConfig) -> Self {
        Self {
            config: config.viewer.clone(),
            arbiter: GestureArbiter::new(config.gesture.clone()),
            carousel: VirtualCarousel::new(loader, &config.viewer),
            zoom: ZoomPanController::new(&config.viewer),
            morph: MorphTransition::new(&config.viewer),
            keymap: KeyMap::new(&config.keybindings),
            viewport: Size::default(),
            pull: 0.0,
            state: None,
        }
    }

    /// Open `album` at `index`.
    ///
    /// With a `source_rect` the morph plays from the thumbnail; the returned
    /// token is what the host passes to `MorphTransition::wait_for_reveal`
    /// before calling `reveal`.
    pub fn open(
        &mut self,
        album: &Album,
        index: usize,
        viewport: Size,
        host: &mut dyn OverlayHost,
        source_rect: Option<Rect>,
        now: Instant,
    ) -> Option<CancellationToken> {
        if self.state.is_some() {
            self.teardown();
        }

        self.viewport = viewport;
        self.carousel.set_width(viewport.width);
        self.carousel.set_photos(album.photos.clone());
        if !self.carousel.open(index) {
            return None;
        }

        self.state = Some(ViewerState {
            current_index: index,
            zoom_scale: 1.0,
            pan_offset: Vec2::ZERO,
            active_album: album.slug.clone(),
        });
        self.reset_zoom_geometry();
        tracing::info!("Viewer opened: {} #{}", album.slug, index);

        let photo = &album.photos[index];
        source_rect.map(|rect| self.morph.play_open(host, rect, photo, viewport, now))
    }

    /// Remove the morph proxy and show the real image
    pub fn reveal(&mut self) {
        self.morph.reveal();
    }

    /// Close, tearing down timers, animations and proxies. With a
    /// `target_rect` (the thumbnail's current on-screen rect) the proxy
    /// shrinks back into the grid.
    pub fn close(&mut self, host: &mut dyn OverlayHost, target_rect: Option<Rect>, now: Instant) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let photo = self.carousel.photos().get(state.current_index).cloned();
        tracing::info!("Viewer closed at #{}", state.current_index);

        self.teardown();

        if let (Some(photo), Some(rect)) = (photo, target_rect) {
            self.morph.play_close(host, &photo, self.viewport, rect, now);
        }
    }

    fn teardown(&mut self) {
        self.arbiter.cancel();
        self.morph.cancel();
        self.zoom.reset_immediately();
        self.carousel.close();
        self.pull = 0.0;
        self.state = None;
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&ViewerState> {
        self.state.as_ref()
    }

    pub fn carousel(&self) -> &VirtualCarousel<L> {
        &self.carousel
    }

    pub fn zoom(&self) -> &ZoomPanController {
        &self.zoom
    }

    pub fn morph(&self) -> &MorphTransition {
        &self.morph
    }

    pub fn nav_visibility(&self) -> NavVisibility {
        self.carousel.nav_visibility()
    }

    pub fn page_indicator(&self) -> PageIndicator {
        self.carousel.page_indicator()
    }

    /// Downward dismiss pull to render
    pub fn pull(&self) -> f32 {
        self.pull
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.carousel.set_width(viewport.width);
        self.update_zoom_geometry();
    }

    pub fn handle_input(&mut self, event: &InputEvent, now: Instant) -> Option<ViewerAction> {
        if !self.is_open() {
            return None;
        }

        if let InputEvent::Key { name } = event {
            let command = self.keymap.resolve(name)?;
            return self.run_command(command, now);
        }

        let ctx = self.gesture_context();
        let intent = self.arbiter.handle(event, &ctx, now)?;
        self.apply_intent(intent, now)
    }

    /// Resolve due gesture timers
    pub fn fire_timers(&mut self, now: Instant) -> Option<ViewerAction> {
        if !self.is_open() {
            return None;
        }
        let ctx = self.gesture_context();
        let intent = self.arbiter.fire_timers(&ctx, now)?;
        self.apply_intent(intent, now)
    }

    /// Paint-cycle step; returns true while anything is animating
    pub fn tick(&mut self, now: Instant) -> bool {
        let morphing = self.morph.frame(now).is_some();
        if !self.is_open() {
            return morphing;
        }

        let before = self.carousel.index();
        let sliding = self.carousel.tick(now);
        if self.carousel.index() != before {
            self.reset_zoom_geometry();
        }
        let zooming = self.zoom.tick(now);
        self.sync_state();

        morphing || sliding || zooming
    }

    /// Earliest moment the host must wake up
    pub fn deadline(&self) -> Option<Instant> {
        [
            self.arbiter.deadline(),
            self.carousel.deadline(),
            self.zoom.deadline(),
            self.morph.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn run_command(&mut self, command: ViewerCommand, now: Instant) -> Option<ViewerAction> {
        match command {
            ViewerCommand::Next => self.navigate(Step::Next, now),
            ViewerCommand::Prev => self.navigate(Step::Prev, now),
            ViewerCommand::Close => Some(ViewerAction::DismissRequested),
            ViewerCommand::ZoomIn => {
                self.zoom.zoom_by(self.config.zoom_step, Vec2::ZERO);
                self.sync_state();
                None
            }
            ViewerCommand::ZoomOut => {
                self.zoom.zoom_by(1.0 / self.config.zoom_step, Vec2::ZERO);
                self.sync_state();
                None
            }
            ViewerCommand::ZoomReset => {
                self.zoom.reset(now);
                None
            }
        }
    }

    fn apply_intent(&mut self, intent: GestureIntent, now: Instant) -> Option<ViewerAction> {
        match intent {
            GestureIntent::Track { dx, dy } => {
                if dx != 0.0 {
                    let before = self.carousel.index();
                    self.carousel.drag(dx);
                    if self.carousel.index() != before {
                        self.reset_zoom_geometry();
                    }
                }
                self.pull = dy.max(0.0);
                None
            }
            GestureIntent::Navigate(step) => self.navigate(step, now),
            GestureIntent::Dismiss => Some(ViewerAction::DismissRequested),
            GestureIntent::SnapBack => {
                self.pull = 0.0;
                self.carousel.snap_back(now);
                None
            }
            GestureIntent::ZoomTo { scale, anchor } => {
                let anchor = self.from_viewport(anchor);
                self.zoom.zoom_to(scale, anchor);
                self.sync_state();
                None
            }
            GestureIntent::ToggleZoom { anchor } => {
                if self.zoom.is_zoomed() {
                    self.zoom.reset(now);
                } else {
                    let anchor = self.from_viewport(anchor);
                    self.zoom.zoom_to(self.config.double_tap_zoom, anchor);
                }
                self.sync_state();
                None
            }
            GestureIntent::PanBy { dx, dy } => {
                self.zoom.pan_by(dx, dy);
                self.sync_state();
                None
            }
        }
    }

    fn navigate(&mut self, step: Step, now: Instant) -> Option<ViewerAction> {
        self.pull = 0.0;
        let moved = match step {
            Step::Next => self.carousel.next(now),
            Step::Prev => self.carousel.prev(now),
        };

        if !moved {
            self.carousel.snap_back(now);
            return Some(ViewerAction::BoundaryReached);
        }

        // Zoom never carries over to another photo
        self.zoom.reset_immediately();
        self.sync_state();

        let target = self.carousel.target_index();
        tracing::debug!("Navigate {:?} -> {}", step, target);
        Some(ViewerAction::Navigated { index: target })
    }

    fn gesture_context(&self) -> GestureContext {
        GestureContext {
            viewport: self.viewport,
            zoom_scale: self.zoom.scale(),
            max_zoom: self.config.max_zoom,
            at_first: self.carousel.is_at_first(),
            at_last: self.carousel.is_at_last(),
        }
    }

    /// Viewport coordinates -> relative to the viewport centre
    fn from_viewport(&self, point: Vec2) -> Vec2 {
        point - Vec2::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }

    fn reset_zoom_geometry(&mut self) {
        self.zoom.reset_immediately();
        self.update_zoom_geometry();
        self.sync_state();
    }

    fn update_zoom_geometry(&mut self) {
        let fitted = self
            .carousel
            .current_photo()
            .map(|p| self.viewport.fit_aspect(p.aspect_ratio()))
            .unwrap_or_default();
        self.zoom.set_geometry(fitted, self.viewport);
    }

    fn sync_state(&mut self) {
        if let Some(state) = &mut self.state {
            state.current_index = self.carousel.index();
            state.zoom_scale = self.zoom.scale();
            state.pan_offset = self.zoom.pan();
        }
    }
}
