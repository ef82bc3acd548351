use ruled_core::geometry::{
  Point,
  Rect,
};

use crate::{
  buffer::StyledTextBuffer,
  layout::LayoutEngine,
  paragraph::{
    Paragraph,
    ParagraphGeometry,
  },
};

/// Per-paragraph visual bounds, indexed by position in the current paragraph
/// list.
///
/// Besides writing each paragraph's [`ParagraphGeometry`], the cache derives
/// *overlay bounds*: the full container width, from a paragraph's top down to
/// the next paragraph's top. Overlay bounds tile the content without gaps, so
/// every touch inside the text lands on exactly one paragraph.
#[derive(Debug, Default, Clone)]
pub struct GeometryCache {
  overlay_bounds: Vec<Rect>,
  content_height: f32,
  /// Buffer version and container width the cache was computed for.
  computed_for:   Option<(u64, f32)>,
}

impl GeometryCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn recompute(
    &mut self,
    paragraphs: &mut [Paragraph],
    buffer: &StyledTextBuffer,
    layout: &dyn LayoutEngine,
  ) {
    let ranges: Vec<_> = paragraphs.iter().map(|p| p.range.clone()).collect();
    let rects = layout.bounding_boxes(buffer, &ranges);
    for (paragraph, rect) in paragraphs.iter_mut().zip(rects) {
      let style = if paragraph.range.is_empty() {
        buffer.typing_style()
      } else {
        buffer.style_at(paragraph.range.start)
      };
      let line_height = layout.line_height(&style);
      let line_count = if line_height > 0.0 {
        (rect.height / line_height).round() as usize
      } else {
        0
      };
      paragraph.geometry = ParagraphGeometry {
        height:     rect.height,
        line_count: line_count.max(1),
        origin:     rect.origin(),
      };
    }

    let width = layout.container_width();
    self.overlay_bounds = paragraphs
      .iter()
      .enumerate()
      .map(|(idx, paragraph)| {
        let top = paragraph.geometry.top();
        let bottom = paragraphs
          .get(idx + 1)
          .map_or(paragraph.geometry.bottom() + paragraph.spacing, |next| {
            next.geometry.top()
          });
        Rect::new(0.0, top, width, (bottom - top).max(0.0))
      })
      .collect();
    self.content_height = self.overlay_bounds.last().map_or(0.0, Rect::max_y);
    self.computed_for = Some((buffer.version(), width));
  }

  /// Whether the cache still describes `buffer` at `width`.
  pub fn is_current(&self, buffer: &StyledTextBuffer, width: f32) -> bool {
    self.computed_for == Some((buffer.version(), width))
  }

  pub fn invalidate(&mut self) {
    self.computed_for = None;
  }

  pub fn overlay_bounds(&self) -> &[Rect] {
    &self.overlay_bounds
  }

  pub fn bounds(&self, idx: usize) -> Option<Rect> {
    self.overlay_bounds.get(idx).copied()
  }

  pub fn content_height(&self) -> f32 {
    self.content_height
  }

  /// Paragraph whose overlay bounds contain `point` (content coordinates).
  pub fn hit_test(&self, point: Point) -> Option<usize> {
    self
      .overlay_bounds
      .iter()
      .position(|rect| rect.contains(point))
  }
}
