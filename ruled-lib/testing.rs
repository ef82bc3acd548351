//! Fixtures shared by the controller tests.

use quickcheck::{
  Arbitrary,
  Gen,
};
use ruled_core::geometry::Point;

use crate::{
  animation::DisplayLink,
  buffer::StyledTextBuffer,
  document::Document,
  gesture::{
    GestureContext,
    GestureGate,
  },
  haptics::RecordedHaptics,
  layout::FixedLineLayout,
  style::StyleAttributes,
};

pub(crate) struct Harness {
  pub document: Document,
  pub gate:     GestureGate,
  pub layout:   FixedLineLayout,
  pub haptics:  RecordedHaptics,
  pub display:  DisplayLink,
}

impl Harness {
  pub fn new(text: &str) -> Self {
    let layout = FixedLineLayout::default();
    let buffer = StyledTextBuffer::plain(text, StyleAttributes::default());
    Self {
      document: Document::new(buffer, &layout),
      gate: GestureGate::new(),
      layout,
      haptics: RecordedHaptics::new(),
      display: DisplayLink::new(),
    }
  }

  pub fn cx(&mut self) -> GestureContext<'_> {
    GestureContext {
      document: &mut self.document,
      gate:     &mut self.gate,
      layout:   &self.layout,
      haptics:  &mut self.haptics,
      display:  &mut self.display,
    }
  }

  pub fn texts(&self) -> Vec<String> {
    self
      .document
      .paragraphs()
      .iter()
      .map(|p| p.content.text().to_string())
      .collect()
  }

  /// Viewport point in the middle of paragraph `index`'s overlay bounds.
  pub fn point_in(&self, index: usize) -> Point {
    let bounds = self
      .document
      .geometry()
      .bounds(index)
      .unwrap_or_default();
    Point::new(10.0, bounds.mid_y() - self.document.scroll().offset)
  }
}

/// Short note text with plenty of empty paragraphs.
#[derive(Debug, Clone)]
pub(crate) struct Note(pub String);

impl Arbitrary for Note {
  fn arbitrary(g: &mut Gen) -> Self {
    let alphabet = ['a', 'b', 'é', ' ', '\n', '\n'];
    let len = usize::arbitrary(g) % 24;
    Note(
      (0..len)
        .map(|_| *g.choose(&alphabet).unwrap_or(&'a'))
        .collect(),
    )
  }
}
