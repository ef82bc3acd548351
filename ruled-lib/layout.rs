//! The layout engine capability and a deterministic reference engine.
//!
//! Real hosts back [`LayoutEngine`] with their text system. [`FixedLineLayout`]
//! lays text out with a fixed advance per char and greedy wrapping, which is
//! enough for the command line front end and for tests to reason about
//! positions exactly.

use std::ops::Range;

use ruled_core::{
  geometry::Rect,
  line_ending::paragraph_breaks,
};

use crate::{
  buffer::StyledTextBuffer,
  style::StyleAttributes,
};

/// Maps text ranges to their laid out bounds, in content coordinates.
pub trait LayoutEngine {
  /// Bounding box of the text in `range`. Only called with in-bounds ranges.
  /// An empty range answers with the box of the line it sits on.
  fn bounding_box(&self, buffer: &StyledTextBuffer, range: Range<usize>) -> Rect;

  /// Bounding boxes of many ranges, in the order given. Engines that lay
  /// out the whole buffer to answer one range should answer these in a
  /// single pass.
  fn bounding_boxes(&self, buffer: &StyledTextBuffer, ranges: &[Range<usize>]) -> Vec<Rect> {
    ranges
      .iter()
      .map(|range| self.bounding_box(buffer, range.clone()))
      .collect()
  }

  fn line_height(&self, style: &StyleAttributes) -> f32;

  fn container_width(&self) -> f32;

  fn set_container_width(&mut self, width: f32);

  /// Scale applied on top of each font role's point size.
  fn set_font_scale(&mut self, scale: f32);
}

/// Line height as a multiple of the point size.
const LINE_HEIGHT_MULTIPLE: f32 = 1.3;

/// Glyph advance as a fraction of the point size.
const ADVANCE_RATIO: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct FixedLineLayout {
  container_width: f32,
  font_scale:      f32,
}

impl Default for FixedLineLayout {
  fn default() -> Self {
    Self::new(375.0)
  }
}

impl FixedLineLayout {
  pub fn new(container_width: f32) -> Self {
    Self {
      container_width,
      font_scale: 1.0,
    }
  }

  pub fn font_scale(&self) -> f32 {
    self.font_scale
  }

  fn point_size(&self, style: &StyleAttributes) -> f32 {
    style.font.point_size() * self.font_scale
  }

  /// How many chars of `style` fit on one line.
  pub fn chars_per_line(&self, style: &StyleAttributes) -> usize {
    let advance = self.point_size(style) * ADVANCE_RATIO;
    ((self.container_width / advance).floor() as usize).max(1)
  }

  /// Height of a paragraph holding `visible` chars (separator excluded).
  fn paragraph_height(&self, visible: usize, style: &StyleAttributes) -> f32 {
    let lines = visible.div_ceil(self.chars_per_line(style)).max(1);
    lines as f32 * self.line_height(style)
  }
}

impl FixedLineLayout {
  /// Lay out every paragraph of `buffer` top to bottom.
  fn blocks(&self, buffer: &StyledTextBuffer) -> Vec<Block> {
    let len = buffer.len_chars();
    let mut starts = vec![0];
    starts.extend(paragraph_breaks(buffer.text().slice(..)));
    let last = starts.len() - 1;

    let mut y = 0.0;
    let mut blocks = Vec::with_capacity(starts.len());
    for (idx, &start) in starts.iter().enumerate() {
      let end = starts.get(idx + 1).copied().unwrap_or(len);
      let terminated = idx != last;
      let style = if start < end {
        buffer.style_at(start)
      } else {
        buffer.typing_style()
      };
      let visible = end - start - usize::from(terminated);
      let height = self.paragraph_height(visible, &style);
      blocks.push(Block {
        range:   start..end,
        rect:    Rect::new(0.0, y, self.container_width, height),
        spacing: style.paragraph_spacing,
      });
      y += height + style.paragraph_spacing;
    }
    blocks
  }

  /// Union of the blocks `range` touches. `blocks` must be in text order.
  fn cover(&self, blocks: &[Block], range: &Range<usize>) -> Rect {
    let Some(last) = blocks.last() else {
      return Rect::new(0.0, 0.0, self.container_width, 0.0);
    };
    let first = blocks.partition_point(|block| block.range.end <= range.start);
    if range.is_empty() {
      // a caret past every separator sits on the last line
      return blocks.get(first).unwrap_or(last).rect;
    }
    blocks[first..]
      .iter()
      .take_while(|block| block.range.start < range.end)
      .map(|block| block.rect)
      .reduce(|acc, rect| acc.union(&rect))
      .unwrap_or(Rect::new(
        0.0,
        last.rect.max_y() + last.spacing,
        self.container_width,
        0.0,
      ))
  }
}

/// One laid out paragraph.
#[derive(Debug, Clone)]
struct Block {
  range:   Range<usize>,
  rect:    Rect,
  spacing: f32,
}

impl LayoutEngine for FixedLineLayout {
  fn bounding_box(&self, buffer: &StyledTextBuffer, range: Range<usize>) -> Rect {
    self.cover(&self.blocks(buffer), &range)
  }

  fn bounding_boxes(&self, buffer: &StyledTextBuffer, ranges: &[Range<usize>]) -> Vec<Rect> {
    let blocks = self.blocks(buffer);
    ranges
      .iter()
      .map(|range| self.cover(&blocks, range))
      .collect()
  }

  fn line_height(&self, style: &StyleAttributes) -> f32 {
    self.point_size(style) * LINE_HEIGHT_MULTIPLE
  }

  fn container_width(&self) -> f32 {
    self.container_width
  }

  fn set_container_width(&mut self, width: f32) {
    self.container_width = width.max(1.0);
  }

  fn set_font_scale(&mut self, scale: f32) {
    self.font_scale = scale.max(0.1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    buffer::StyledText,
    style::{
      FontRole,
      RELATED_SPACING,
    },
  };

  #[test]
  fn stacks_paragraphs_with_spacing() {
    let layout = FixedLineLayout::new(300.0);
    let style = StyleAttributes::default();
    let buffer = StyledTextBuffer::plain("Hello\nWorld", style);
    let line = layout.line_height(&style);

    let first = layout.bounding_box(&buffer, 0..6);
    let second = layout.bounding_box(&buffer, 6..11);
    assert_eq!(first, Rect::new(0.0, 0.0, 300.0, line));
    assert_eq!(second.y, line + RELATED_SPACING);
    assert_eq!(layout.bounding_box(&buffer, 0..11).height, second.max_y());
  }

  #[test]
  fn wraps_long_paragraphs() {
    let layout = FixedLineLayout::new(85.0);
    let style = StyleAttributes::default();
    // 17pt body, 8.5pt advance: ten chars per line
    assert_eq!(layout.chars_per_line(&style), 10);
    let buffer = StyledTextBuffer::plain(&"x".repeat(25), style);
    let rect = layout.bounding_box(&buffer, 0..25);
    assert_eq!(rect.height, 3.0 * layout.line_height(&style));
  }

  #[test]
  fn empty_trailing_paragraph_has_a_line() {
    let layout = FixedLineLayout::default();
    let style = StyleAttributes::default().with_font(FontRole::Title1);
    let buffer = StyledTextBuffer::plain("T\n", style);
    let rect = layout.bounding_box(&buffer, 2..2);
    assert_eq!(rect.height, layout.line_height(&style));
    assert_eq!(rect.y, layout.line_height(&style) + RELATED_SPACING);
  }

  #[test]
  fn batched_boxes_match_single_lookups() {
    let layout = FixedLineLayout::new(85.0);
    let title = StyleAttributes::default().with_font(FontRole::Title1);
    let mut buffer = StyledTextBuffer::plain("Title\n", title);
    let body = StyledText::plain("a much longer body paragraph\nend\n", StyleAttributes::default());
    buffer.replace_range(6..6, &body).unwrap();

    let ranges = [0..6, 6..35, 35..39, 39..39, 2..2, 3..37];
    let batched = layout.bounding_boxes(&buffer, &ranges);
    let single: Vec<Rect> = ranges
      .iter()
      .map(|range| layout.bounding_box(&buffer, range.clone()))
      .collect();
    assert_eq!(batched, single);
    assert_eq!(batched[0].height, layout.line_height(&title));
    assert_eq!(batched[3].y, batched[2].max_y() + RELATED_SPACING);
  }

  #[test]
  fn font_scale_grows_lines() {
    let mut layout = FixedLineLayout::default();
    let style = StyleAttributes::default();
    let before = layout.line_height(&style);
    layout.set_font_scale(2.0);
    assert_eq!(layout.line_height(&style), before * 2.0);
  }
}
