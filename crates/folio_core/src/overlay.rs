//! Transient visual proxies (morph clone, drag clone)
//!
//! A `TransientOverlay` owns its proxy handle. The proxy is removed exactly
//! once: on `dispose()` or when the overlay is dropped, whichever happens
//! first, so no exit path can leave an orphaned proxy on screen.

use crate::geometry::Rect;

/// A proxy element living in the host's overlay layer
pub trait OverlayHandle: Send {
    fn set_rect(&mut self, rect: Rect);
    fn remove(&mut self);
}

/// Creates overlay proxies
pub trait OverlayHost {
    /// Create a proxy showing `image` at `rect`
    fn create(&mut self, image: &str, rect: Rect) -> Box<dyn OverlayHandle>;
}

/// Scoped ownership of one proxy
pub struct TransientOverlay {
    owner: &'static str,
    handle: Option<Box<dyn OverlayHandle>>,
    rect: Rect,
}

impl TransientOverlay {
    pub fn acquire(host: &mut dyn OverlayHost, owner: &'static str, image: &str, rect: Rect) -> Self {
        tracing::debug!("{} overlay created for {}", owner, image);
        Self {
            owner,
            handle: Some(host.create(image, rect)),
            rect,
        }
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
        if let Some(handle) = &mut self.handle {
            handle.set_rect(rect);
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    pub fn dispose(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.remove();
            tracing::debug!("{} overlay disposed", self.owner);
        }
    }
}

impl Drop for TransientOverlay {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for TransientOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransientOverlay")
            .field("owner", &self.owner)
            .field("live", &self.is_live())
            .field("rect", &self.rect)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Host that logs proxy lifecycle events
    #[derive(Debug, Default, Clone)]
    pub(crate) struct RecordingHost {
        pub events: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingHost {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().clone()
        }

        pub fn live_count(&self) -> usize {
            let events = self.events.lock();
            let created = events.iter().filter(|e| e.starts_with("create")).count();
            let removed = events.iter().filter(|e| e.starts_with("remove")).count();
            created - removed
        }
    }

    struct RecordingHandle {
        image: String,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl OverlayHandle for RecordingHandle {
        fn set_rect(&mut self, _rect: Rect) {
            self.events.lock().push(format!("move {}", self.image));
        }

        fn remove(&mut self) {
            self.events.lock().push(format!("remove {}", self.image));
        }
    }

    impl OverlayHost for RecordingHost {
        fn create(&mut self, image: &str, _rect: Rect) -> Box<dyn OverlayHandle> {
            self.events.lock().push(format!("create {}", image));
            Box::new(RecordingHandle {
                image: image.to_string(),
                events: self.events.clone(),
            })
        }
    }

    #[test]
    fn test_dispose_once() {
        let mut host = RecordingHost::default();
        let mut overlay = TransientOverlay::acquire(&mut host, "test", "a.jpg", Rect::default());
        overlay.set_rect(Rect::new(1.0, 2.0, 3.0, 4.0));
        overlay.dispose();
        overlay.dispose();
        drop(overlay);

        assert_eq!(host.events(), ["create a.jpg", "move a.jpg", "remove a.jpg"]);
    }

    #[test]
    fn test_drop_disposes() {
        let mut host = RecordingHost::default();
        {
            let _overlay = TransientOverlay::acquire(&mut host, "test", "b.jpg", Rect::default());
            assert_eq!(host.live_count(), 1);
        }
        assert_eq!(host.live_count(), 0);
    }
}
