//! What the overlay renderer gets to see.
//!
//! The renderer never holds on to engine state. After every re-parse and
//! every animation tick that changed something, the session assembles a
//! read-only [`OverlayFrame`] and hands it to the [`OverlaySink`].

use std::{
  cell::RefCell,
  rc::Rc,
};

use ruled_core::geometry::{
  Point,
  Rect,
};

use crate::{
  document::Document,
  paragraph::ParagraphId,
  swipe::SwipeDirection,
};

/// How a paragraph's highlight should stand out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emphasis {
  #[default]
  None,
  /// Upper paragraph of a pinch, or one whose spacing is animating.
  Spacing,
  /// Lifted by a reorder drag.
  Lifted,
  /// Under a swipe.
  Swiped,
  /// Sitting on the scroll snap reference line.
  Centered,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParagraphHighlight {
  pub id:       ParagraphId,
  pub index:    usize,
  /// Overlay bounds, in content coordinates.
  pub bounds:   Rect,
  pub spacing:  f32,
  pub emphasis: Emphasis,
}

/// The lifted copy of a dragged paragraph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ghost {
  pub id:           ParagraphId,
  /// Where the drag touch sits, in viewport coordinates.
  pub touch:        Point,
  /// Touch position relative to the paragraph's top left corner at pickup.
  pub touch_offset: Point,
}

impl Ghost {
  /// Viewport position of the ghost's top left corner.
  pub fn origin(&self) -> Point {
    self.touch.offset(-self.touch_offset.x, -self.touch_offset.y)
  }
}

/// The translated snapshot and revealed icon of a swipe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeVisual {
  pub id:            ParagraphId,
  pub direction:     Option<SwipeDirection>,
  /// Horizontal translation of the snapshot.
  pub offset:        f32,
  /// Icon opacity and scale, `|offset| / threshold`.
  pub icon_progress: f32,
  /// Fill of the delete confirmation ring.
  pub ring_progress: f32,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct OverlayFrame {
  pub highlights:    Vec<ParagraphHighlight>,
  pub ghost:         Option<Ghost>,
  pub swipe:         Option<SwipeVisual>,
  pub scroll_offset: f32,
}

impl OverlayFrame {
  /// Frame for `document`, with `emphasis` picking out paragraphs that take
  /// part in a gesture.
  pub fn capture(document: &Document, mut emphasis: impl FnMut(usize, ParagraphId) -> Emphasis) -> Self {
    let bounds = document.geometry().overlay_bounds();
    let highlights = document
      .paragraphs()
      .iter()
      .enumerate()
      .map(|(index, paragraph)| {
        ParagraphHighlight {
          id: paragraph.id,
          index,
          bounds: bounds.get(index).copied().unwrap_or_default(),
          spacing: paragraph.spacing,
          emphasis: emphasis(index, paragraph.id),
        }
      })
      .collect();
    Self {
      highlights,
      ghost: None,
      swipe: None,
      scroll_offset: document.scroll().offset,
    }
  }

  pub fn highlight(&self, id: ParagraphId) -> Option<&ParagraphHighlight> {
    self.highlights.iter().find(|h| h.id == id)
  }
}

pub trait OverlaySink {
  fn redraw(&mut self, frame: &OverlayFrame);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverlay;

impl OverlaySink for NoOverlay {
  fn redraw(&mut self, _frame: &OverlayFrame) {}
}

/// Keeps every frame in a shared log.
#[derive(Debug, Default, Clone)]
pub struct RecordedOverlay {
  frames: Rc<RefCell<Vec<OverlayFrame>>>,
}

impl RecordedOverlay {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.frames.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.frames.borrow().is_empty()
  }

  pub fn last(&self) -> Option<OverlayFrame> {
    self.frames.borrow().last().cloned()
  }

  pub fn clear(&self) {
    self.frames.borrow_mut().clear();
  }
}

impl OverlaySink for RecordedOverlay {
  fn redraw(&mut self, frame: &OverlayFrame) {
    self.frames.borrow_mut().push(frame.clone());
  }
}
