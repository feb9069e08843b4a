//! Justified grid layout
//!
//! Photos are packed into rows at a target height; once a row is wider than
//! the container it is scaled down so it fills the width exactly.

use crate::catalog::Photo;
use crate::geometry::{Rect, Vec2};

pub const ROW_HEIGHT: f32 = 320.0;
pub const GAP: f32 = 6.0;

/// Computed thumbnail rects in content coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridLayout {
    rects: Vec<Rect>,
    content_height: f32,
}

impl GridLayout {
    pub fn new(photos: &[Photo], container_width: f32) -> Self {
        Self::with_metrics(photos, container_width, ROW_HEIGHT, GAP)
    }

    pub fn with_metrics(photos: &[Photo], container_width: f32, row_height: f32, gap: f32) -> Self {
        let mut layout = Self::default();
        if container_width <= 0.0 || photos.is_empty() {
            return layout;
        }

        let mut y = 0.0;
        let mut row: Vec<f32> = Vec::new();

        for (i, photo) in photos.iter().enumerate() {
            row.push(photo.aspect_ratio());

            let natural_width = row.iter().sum::<f32>() * row_height + gap * (row.len() - 1) as f32;
            let is_last = i + 1 == photos.len();
            if natural_width >= container_width || is_last {
                y += layout.place_row(&row, container_width, gap, y);
                y += gap;
                row.clear();
            }
        }

        layout.content_height = (y - gap).max(0.0);
        layout
    }

    /// Lay out one row at `y`; returns its height
    fn place_row(&mut self, aspects: &[f32], container_width: f32, gap: f32, y: f32) -> f32 {
        let gaps = gap * (aspects.len() - 1) as f32;
        let height = (container_width - gaps).max(0.0) / aspects.iter().sum::<f32>();

        let mut x = 0.0;
        for aspect in aspects {
            let width = aspect * height;
            self.rects.push(Rect::new(x, y, width, height));
            x += width + gap;
        }
        height
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    /// Rect in content coordinates
    pub fn rect(&self, index: usize) -> Option<Rect> {
        self.rects.get(index).copied()
    }

    /// On-screen rect for the current scroll position
    pub fn rect_of(&self, index: usize, scroll_y: f32) -> Option<Rect> {
        self.rect(index).map(|r| r.translate(Vec2::new(0.0, -scroll_y)))
    }

    /// Thumbnail under a screen point
    pub fn hit_test(&self, point: Vec2, scroll_y: f32) -> Option<usize> {
        let p = Vec2::new(point.x, point.y + scroll_y);
        self.rects
            .iter()
            .position(|r| p.x >= r.x && p.x < r.x + r.width && p.y >= r.y && p.y < r.y + r.height)
    }

    /// Indices intersecting the viewport
    pub fn visible(&self, scroll_y: f32, viewport_height: f32) -> Vec<usize> {
        let view = Rect::new(f32::MIN / 2.0, scroll_y, f32::MAX, viewport_height);
        self.rects
            .iter()
            .enumerate()
            .filter(|(_, r)| r.intersects(&view))
            .map(|(i, _)| i)
            .collect()
    }
}
