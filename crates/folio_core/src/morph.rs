//! Grid <-> viewer morph transition
//!
//! A proxy showing the thumbnail is tweened between its grid rect and the
//! centred viewer rect while the real viewer content stays hidden. Opening
//! reveals only once the tween has run *and* the full image has loaded (or
//! the safety timeout passed).

use crate::animation::{AnimPhase, Animation, Easing};
use crate::catalog::Photo;
use crate::config::ViewerConfig;
use crate::geometry::{Rect, Size, Vec2};
use crate::overlay::{OverlayHost, TransientOverlay};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Which way the proxy travels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphDirection {
    Open,
    Close,
}

/// How a reveal wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Tween finished and the image is ready
    Revealed,
    /// Image did not load in time; revealed anyway
    TimedOut,
    /// Superseded (viewer closed, another morph started)
    Cancelled,
}

/// Rect of `photo` centred in `viewport`, keeping `margin` on every side
pub fn viewer_rect(photo: &Photo, viewport: Size, margin: f32) -> Rect {
    let inner = Size::new(
        (viewport.width - margin * 2.0).max(0.0),
        (viewport.height - margin * 2.0).max(0.0),
    );
    let fitted = inner.fit_aspect(photo.aspect_ratio());
    Rect::from_center_size(Vec2::new(viewport.width / 2.0, viewport.height / 2.0), fitted)
}

/// Position/size tween of a transient proxy
#[derive(Debug)]
pub struct MorphTransition {
    overlay: Option<TransientOverlay>,
    tween: Option<Animation<Rect>>,
    direction: MorphDirection,
    token: CancellationToken,
    phase: AnimPhase,
    duration: Duration,
    safety_timeout: Duration,
    margin: f32,
}

impl MorphTransition {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            overlay: None,
            tween: None,
            direction: MorphDirection::Open,
            token: CancellationToken::new(),
            phase: AnimPhase::Idle,
            duration: config.morph_duration(),
            safety_timeout: config.morph_safety_timeout(),
            margin: config.morph_margin,
        }
    }

    pub fn phase(&self) -> AnimPhase {
        self.phase
    }

    pub fn direction(&self) -> MorphDirection {
        self.direction
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn safety_timeout(&self) -> Duration {
        self.safety_timeout
    }

    /// Real viewer content must stay hidden while this is true
    pub fn hides_content(&self) -> bool {
        self.direction == MorphDirection::Open && self.overlay.as_ref().is_some_and(|o| o.is_live())
    }

    /// Grow a proxy from the thumbnail at `source_rect` to the viewer position
    pub fn play_open(
        &mut self,
        host: &mut dyn OverlayHost,
        source_rect: Rect,
        photo: &Photo,
        viewport: Size,
        now: Instant,
    ) -> CancellationToken {
        let target = viewer_rect(photo, viewport, self.margin);
        self.start(host, MorphDirection::Open, &photo.grid_path, source_rect, target, now)
    }

    /// Shrink a proxy from the viewer position to the thumbnail's current rect
    pub fn play_close(
        &mut self,
        host: &mut dyn OverlayHost,
        photo: &Photo,
        viewport: Size,
        target_rect: Rect,
        now: Instant,
    ) -> CancellationToken {
        let source = viewer_rect(photo, viewport, self.margin);
        self.start(host, MorphDirection::Close, &photo.grid_path, source, target_rect, now)
    }

    fn start(
        &mut self,
        host: &mut dyn OverlayHost,
        direction: MorphDirection,
        image: &str,
        from: Rect,
        to: Rect,
        now: Instant,
    ) -> CancellationToken {
        self.cancel();

        self.token = CancellationToken::new();
        self.direction = direction;
        self.overlay = Some(TransientOverlay::acquire(host, "morph", image, from));
        self.tween = Some(Animation::new(from, to, self.duration, Easing::EaseOut, now));
        self.phase = AnimPhase::Animating;

        tracing::debug!("Morph {:?} started for {}", direction, image);
        self.token.clone()
    }

    /// Move the proxy for this frame; returns its rect while one exists
    pub fn frame(&mut self, now: Instant) -> Option<Rect> {
        let tween = self.tween.as_ref()?;
        let rect = tween.value(now);
        let complete = tween.is_complete(now);

        if let Some(overlay) = &mut self.overlay {
            overlay.set_rect(rect);
        }

        if complete {
            self.tween = None;
            match self.direction {
                // Proxy stays until the full image is revealed
                MorphDirection::Open => self.phase = AnimPhase::Settling,
                MorphDirection::Close => self.finish(),
            }
        }
        Some(rect)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.tween.as_ref().map(|t| t.deadline())
    }

    /// Remove the proxy and show the real content
    pub fn reveal(&mut self) {
        if self.phase == AnimPhase::Idle {
            return;
        }
        tracing::debug!("Morph revealed");
        self.finish();
    }

    /// Abort: the token fires and the proxy is disposed
    pub fn cancel(&mut self) {
        if self.phase != AnimPhase::Idle {
            tracing::debug!("Morph {:?} cancelled", self.direction);
        }
        self.token.cancel();
        self.finish();
    }

    fn finish(&mut self) {
        self.tween = None;
        if let Some(mut overlay) = self.overlay.take() {
            overlay.dispose();
        }
        self.phase = AnimPhase::Idle;
    }

    /// Wait until the tween duration elapsed and `image_loaded` resolved.
    ///
    /// The image wait is bounded by `safety_timeout`; cancellation wins over
    /// everything else.
    pub async fn wait_for_reveal<F>(
        token: CancellationToken,
        tween_duration: Duration,
        image_loaded: F,
        safety_timeout: Duration,
    ) -> RevealOutcome
    where
        F: Future<Output = ()>,
    {
        let ready = async {
            let (_, loaded) = tokio::join!(
                tokio::time::sleep(tween_duration),
                tokio::time::timeout(safety_timeout, image_loaded),
            );
            loaded.is_ok()
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => RevealOutcome::Cancelled,
            loaded = ready => {
                if loaded {
                    RevealOutcome::Revealed
                } else {
                    tracing::warn!("Full image not loaded within {:?}, revealing anyway", safety_timeout);
                    RevealOutcome::TimedOut
                }
            }
        }
    }
}

impl Drop for MorphTransition {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::tests::RecordingHost;

    fn photo() -> Photo {
        Photo::new("p/001.jpg", "p/grid/001.jpg", 1600, 900)
    }

    #[test]
    fn test_viewer_rect_preserves_aspect_and_margin() {
        let rect = viewer_rect(&photo(), Size::new(1000.0, 800.0), 40.0);
        // 920 wide fits: 920 / (16/9) = 517.5 tall
        assert!((rect.width - 920.0).abs() < 1e-3);
        assert!((rect.height - 517.5).abs() < 1e-3);
        assert_eq!(rect.center(), Vec2::new(500.0, 400.0));

        let tall = Photo::new("t.jpg", "t.jpg", 500, 1000);
        let rect = viewer_rect(&tall, Size::new(1000.0, 800.0), 40.0);
        assert!((rect.height - 720.0).abs() < 1e-3);
        assert!((rect.width - 360.0).abs() < 1e-3);
    }

    #[test]
    fn test_open_keeps_proxy_until_reveal() {
        let mut host = RecordingHost::default();
        let mut morph = MorphTransition::new(&ViewerConfig::default());
        let t0 = Instant::now();
        let source = Rect::new(10.0, 10.0, 100.0, 60.0);

        let token = morph.play_open(&mut host, source, &photo(), Size::new(1000.0, 800.0), t0);
        assert!(morph.hides_content());
        assert_eq!(morph.frame(t0), Some(source));

        let end = morph.deadline().unwrap();
        let rect = morph.frame(end).unwrap();
        assert_eq!(rect, viewer_rect(&photo(), Size::new(1000.0, 800.0), 40.0));
        assert_eq!(morph.phase(), AnimPhase::Settling);
        assert!(morph.hides_content());
        assert_eq!(host.live_count(), 1);

        morph.reveal();
        assert!(!morph.hides_content());
        assert_eq!(host.live_count(), 0);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_close_removes_proxy_when_done() {
        let mut host = RecordingHost::default();
        let mut morph = MorphTransition::new(&ViewerConfig::default());
        let t0 = Instant::now();
        let target = Rect::new(300.0, 900.0, 120.0, 80.0);

        morph.play_close(&mut host, &photo(), Size::new(1000.0, 800.0), target, t0);
        assert!(!morph.hides_content());
        let end = morph.deadline().unwrap();
        assert_eq!(morph.frame(end), Some(target));
        assert_eq!(morph.phase(), AnimPhase::Idle);
        assert_eq!(host.live_count(), 0);
    }

    #[test]
    fn test_cancel_mid_open_cleans_up() {
        let mut host = RecordingHost::default();
        let mut morph = MorphTransition::new(&ViewerConfig::default());
        let t0 = Instant::now();

        let token = morph.play_open(&mut host, Rect::default(), &photo(), Size::new(1000.0, 800.0), t0);
        morph.frame(t0 + Duration::from_millis(100));
        morph.cancel();

        assert!(token.is_cancelled());
        assert_eq!(host.live_count(), 0);
        assert!(morph.deadline().is_none());
        assert_eq!(morph.frame(t0 + Duration::from_millis(200)), None);
    }

    #[test]
    fn test_new_morph_supersedes_old() {
        let mut host = RecordingHost::default();
        let mut morph = MorphTransition::new(&ViewerConfig::default());
        let t0 = Instant::now();

        let first = morph.play_open(&mut host, Rect::default(), &photo(), Size::new(1000.0, 800.0), t0);
        let second = morph.play_close(&mut host, &photo(), Size::new(1000.0, 800.0), Rect::default(), t0);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(host.live_count(), 1);

        drop(morph);
        assert!(second.is_cancelled());
        assert_eq!(host.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_waits_for_tween_and_image() {
        let start = tokio::time::Instant::now();
        let image = tokio::time::sleep(Duration::from_millis(100));

        let outcome = MorphTransition::wait_for_reveal(
            CancellationToken::new(),
            Duration::from_millis(350),
            image,
            Duration::from_millis(2500),
        )
        .await;

        assert_eq!(outcome, RevealOutcome::Revealed);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(350) && elapsed < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_image_waits_past_tween() {
        let start = tokio::time::Instant::now();
        let image = tokio::time::sleep(Duration::from_millis(900));

        let outcome = MorphTransition::wait_for_reveal(
            CancellationToken::new(),
            Duration::from_millis(350),
            image,
            Duration::from_millis(2500),
        )
        .await;

        assert_eq!(outcome, RevealOutcome::Revealed);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(900) && elapsed < Duration::from_millis(950));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_times_out() {
        let outcome = MorphTransition::wait_for_reveal(
            CancellationToken::new(),
            Duration::from_millis(350),
            futures::future::pending::<()>(),
            Duration::from_millis(2500),
        )
        .await;

        assert_eq!(outcome, RevealOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveal_cancelled() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let outcome = MorphTransition::wait_for_reveal(
            token,
            Duration::from_millis(350),
            futures::future::pending::<()>(),
            Duration::from_millis(2500),
        )
        .await;

        assert_eq!(outcome, RevealOutcome::Cancelled);
    }
}
