//! The mutable state of one open note.
//!
//! A [`Document`] keeps the buffer, its paragraph model, the geometry cache,
//! the cursor and the scroll position consistent with each other. Every
//! mutation that changes the text ends with a re-parse followed by a geometry
//! recompute, in that order; spacing-only writes patch paragraphs in place so
//! their identities survive.

use std::ops::Range;

use ruled_core::{
  geometry::Point,
  line_ending::PARAGRAPH_SEPARATOR_STR,
};
use thiserror::Error;

use crate::{
  buffer::{
    BufferError,
    StyledText,
    StyledTextBuffer,
  },
  config::SpacingConfig,
  geometry::GeometryCache,
  layout::LayoutEngine,
  paragraph::{
    Paragraph,
    ParagraphId,
    ParagraphModel,
  },
  style::Detent,
};

pub type Result<T> = std::result::Result<T, DocumentError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DocumentError {
  #[error(transparent)]
  Buffer(#[from] BufferError),
  #[error("paragraph {index} does not exist, the note has {len}")]
  NoSuchParagraph { index: usize, len: usize },
  #[error("range {start}..{end} no longer matches a paragraph")]
  StaleRange { start: usize, end: usize },
}

/// Vertical scroll position of the viewport over the content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollState {
  pub offset:          f32,
  pub viewport_height: f32,
}

impl Default for ScrollState {
  fn default() -> Self {
    Self {
      offset:          0.0,
      viewport_height: 640.0,
    }
  }
}

impl ScrollState {
  pub fn max_offset(&self, content_height: f32) -> f32 {
    (content_height - self.viewport_height).max(0.0)
  }

  pub fn clamp(&self, offset: f32, content_height: f32) -> f32 {
    offset.clamp(0.0, self.max_offset(content_height))
  }

  /// Map a viewport point into content coordinates.
  pub fn to_content(&self, point: Point) -> Point {
    point.offset(0.0, self.offset)
  }
}

/// Caret position relative to its paragraph, stable across restructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CursorAnchor {
  paragraph: ParagraphId,
  offset:    usize,
}

#[derive(Debug, Clone)]
pub struct Document {
  buffer:   StyledTextBuffer,
  model:    ParagraphModel,
  geometry: GeometryCache,
  cursor:   usize,
  scroll:   ScrollState,
}

impl Document {
  pub fn new(buffer: StyledTextBuffer, layout: &dyn LayoutEngine) -> Self {
    let mut document = Self {
      model: ParagraphModel::parse(&buffer),
      buffer,
      geometry: GeometryCache::new(),
      cursor: 0,
      scroll: ScrollState::default(),
    };
    document.refresh_geometry(layout);
    document
  }

  pub fn buffer(&self) -> &StyledTextBuffer {
    &self.buffer
  }

  pub fn model(&self) -> &ParagraphModel {
    &self.model
  }

  pub fn paragraphs(&self) -> &[Paragraph] {
    self.model.paragraphs()
  }

  pub fn paragraph(&self, index: usize) -> Result<&Paragraph> {
    self.model.get(index).ok_or(DocumentError::NoSuchParagraph {
      index,
      len: self.model.len(),
    })
  }

  pub fn geometry(&self) -> &GeometryCache {
    &self.geometry
  }

  pub fn text(&self) -> String {
    self.buffer.text().to_string()
  }

  pub fn cursor(&self) -> usize {
    self.cursor
  }

  pub fn set_cursor(&mut self, pos: usize) {
    self.cursor = pos.min(self.buffer.len_chars());
  }

  pub fn scroll(&self) -> &ScrollState {
    &self.scroll
  }

  /// Scroll to `offset`, clamped to the content. Returns the applied offset.
  pub fn set_scroll_offset(&mut self, offset: f32) -> f32 {
    self.scroll.offset = self.scroll.clamp(offset, self.geometry.content_height());
    self.scroll.offset
  }

  pub fn set_viewport_height(&mut self, height: f32) {
    self.scroll.viewport_height = height.max(0.0);
    self.set_scroll_offset(self.scroll.offset);
  }

  pub fn to_content(&self, point: Point) -> Point {
    self.scroll.to_content(point)
  }

  /// Paragraph under a viewport point, by overlay bounds.
  pub fn paragraph_at(&self, point: Point) -> Option<usize> {
    self.geometry.hit_test(self.to_content(point))
  }

  pub fn refresh_geometry(&mut self, layout: &dyn LayoutEngine) {
    self
      .geometry
      .recompute(self.model.paragraphs_mut(), &self.buffer, layout);
    self.set_scroll_offset(self.scroll.offset);
  }

  /// Re-segment after a text change, then recompute geometry.
  pub fn reparse(&mut self, layout: &dyn LayoutEngine) {
    self.model.reparse(&self.buffer);
    self.cursor = self.cursor.min(self.buffer.len_chars());
    self.refresh_geometry(layout);
  }

  /// Replace `range` with `text` typed at the cursor, then re-parse.
  pub fn edit(&mut self, range: Range<usize>, text: &str, layout: &dyn LayoutEngine) -> Result<()> {
    let style = self.buffer.insertion_style(range.start);
    let content = StyledText::plain(text, style);
    self.buffer.replace_range(range.clone(), &content)?;
    self.cursor = range.start + content.len_chars();
    self.reparse(layout);
    Ok(())
  }

  /// Whole-buffer replacement.
  pub fn replace_all(&mut self, content: &StyledText, layout: &dyn LayoutEngine) {
    self.buffer.replace_all(content);
    self.reparse(layout);
  }

  /// Write `spacing` to the paragraph spanning exactly `range` without
  /// re-parsing. Returns the paragraph's index.
  pub fn apply_spacing(
    &mut self,
    range: &Range<usize>,
    spacing: f32,
    layout: &dyn LayoutEngine,
  ) -> Result<usize> {
    let index = self
      .buffer
      .contains_range(range)
      .then(|| self.model.index_of_range(range))
      .flatten()
      .ok_or(DocumentError::StaleRange {
        start: range.start,
        end:   range.end,
      })?;
    self.write_spacing(index, spacing)?;
    self.refresh_geometry(layout);
    Ok(index)
  }

  pub fn set_paragraph_spacing(
    &mut self,
    index: usize,
    spacing: f32,
    layout: &dyn LayoutEngine,
  ) -> Result<()> {
    self.paragraph(index)?;
    self.write_spacing(index, spacing)?;
    self.refresh_geometry(layout);
    Ok(())
  }

  /// Snap spacing values left between detents (by pasted text or an
  /// interrupted animation) to the nearest detent, skipping the `protected`
  /// paragraphs. Returns whether anything changed.
  pub fn normalize_spacing(
    &mut self,
    config: &SpacingConfig,
    protected: &[ParagraphId],
    layout: &dyn LayoutEngine,
  ) -> bool {
    let stray: Vec<(usize, f32)> = self
      .paragraphs()
      .iter()
      .enumerate()
      .filter(|(_, p)| !protected.contains(&p.id))
      .filter(|(_, p)| config.detent_of(p.spacing).is_none())
      .map(|(idx, p)| (idx, config.value(config.nearest(p.spacing))))
      .collect();
    if stray.is_empty() {
      return false;
    }
    for (idx, spacing) in stray {
      if let Err(err) = self.write_spacing(idx, spacing) {
        tracing::trace!(idx, %err, "skipping spacing normalization");
      }
    }
    self.refresh_geometry(layout);
    true
  }

  /// Move the paragraph at `from` so it ends up at index `to`.
  pub fn move_paragraph(&mut self, from: usize, to: usize, layout: &dyn LayoutEngine) -> Result<()> {
    self.paragraph(from)?;
    self.paragraph(to)?;
    if from == to {
      return Ok(());
    }
    let mut contents = self.paragraph_contents();
    let mut ids = self.model.ids();
    let content = contents.remove(from);
    contents.insert(to, content);
    let id = ids.remove(from);
    ids.insert(to, id);
    self.restructure(&contents, &ids, layout);
    Ok(())
  }

  /// Remove the paragraph at `index`. The last remaining paragraph is
  /// cleared instead, so the note never ends up without paragraphs.
  pub fn delete_paragraph(&mut self, index: usize, layout: &dyn LayoutEngine) -> Result<()> {
    let paragraph = self.paragraph(index)?;
    let start = paragraph.range.start;
    if self.model.len() == 1 {
      if let Some(style) = paragraph.content.first_style() {
        self.buffer.set_typing_style(style);
      }
      self.buffer.replace_all(&StyledText::new());
      self.reparse(layout);
      self.cursor = 0;
      return Ok(());
    }

    let mut contents = self.paragraph_contents();
    let mut ids = self.model.ids();
    contents.remove(index);
    ids.remove(index);
    self.restructure(&contents, &ids, layout);
    self.set_cursor(start);
    Ok(())
  }

  /// Insert an empty paragraph after `index` in the source paragraph's style
  /// and put the cursor into it. Returns the new paragraph's index.
  ///
  /// The new paragraph is related to what follows, and an unrelated source
  /// is pulled in to related so the reply reads as a continuation.
  pub fn insert_reply(
    &mut self,
    index: usize,
    config: &SpacingConfig,
    layout: &dyn LayoutEngine,
  ) -> Result<usize> {
    let source = self.paragraph(index)?.clone();
    let base = source
      .content
      .first_style()
      .unwrap_or(self.buffer.typing_style());
    let source_spacing = if config.detent_of(source.spacing) == Some(Detent::Unrelated) {
      config.related
    } else {
      source.spacing
    };
    if source_spacing != source.spacing {
      self
        .buffer
        .set_paragraph_spacing(source.range.clone(), source_spacing)?;
    }

    let end = source.range.end;
    if source.is_terminated() {
      let separator = StyledText::plain(PARAGRAPH_SEPARATOR_STR, base.with_spacing(config.related));
      self.buffer.replace_range(end..end, &separator)?;
      self.cursor = end;
    } else {
      let style = source.content.last_style().unwrap_or(base);
      let separator = StyledText::plain(PARAGRAPH_SEPARATOR_STR, style.with_spacing(source_spacing));
      self.buffer.replace_range(end..end, &separator)?;
      self
        .buffer
        .set_typing_style(base.with_spacing(config.related));
      self.cursor = end + 1;
    }
    self.reparse(layout);
    Ok(index + 1)
  }

  /// Paragraph contents ready for [`ParagraphModel::rebuild`]. The empty
  /// trailing paragraph is given a separator in the typing style so it keeps
  /// its spacing if it moves away from the end.
  fn paragraph_contents(&self) -> Vec<StyledText> {
    self
      .paragraphs()
      .iter()
      .map(|p| {
        if p.content.is_empty() {
          StyledText::plain(PARAGRAPH_SEPARATOR_STR, self.buffer.typing_style())
        } else {
          p.content.clone()
        }
      })
      .collect()
  }

  fn restructure(&mut self, contents: &[StyledText], ids: &[ParagraphId], layout: &dyn LayoutEngine) {
    let anchor = self.cursor_anchor();
    let rebuilt = ParagraphModel::rebuild(contents);
    self.buffer.replace_all(&rebuilt);
    self.model.reparse(&self.buffer);
    self.model.adopt_ids(ids);
    self.restore_cursor(anchor);
    self.refresh_geometry(layout);
  }

  fn write_spacing(&mut self, index: usize, spacing: f32) -> Result<()> {
    let range = self.paragraph(index)?.range.clone();
    self.buffer.set_paragraph_spacing(range, spacing)?;
    if let Some(paragraph) = self.model.paragraphs_mut().get_mut(index) {
      paragraph.spacing = spacing;
      paragraph
        .content
        .restyle(|style| style.paragraph_spacing = spacing);
    }
    Ok(())
  }

  fn cursor_anchor(&self) -> Option<CursorAnchor> {
    let index = self.model.index_at_char(self.cursor)?;
    let paragraph = self.model.get(index)?;
    Some(CursorAnchor {
      paragraph: paragraph.id,
      offset:    self.cursor.saturating_sub(paragraph.range.start),
    })
  }

  fn restore_cursor(&mut self, anchor: Option<CursorAnchor>) {
    let restored = anchor.and_then(|anchor| {
      let paragraph = self.model.get(self.model.index_of(anchor.paragraph)?)?;
      let body = paragraph.range.len() - usize::from(paragraph.is_terminated());
      Some(paragraph.range.start + anchor.offset.min(body))
    });
    self.set_cursor(restored.unwrap_or(self.cursor));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    layout::FixedLineLayout,
    style::{
      FontRole,
      RELATED_SPACING,
      StyleAttributes,
      UNRELATED_SPACING,
    },
    testing::Note,
  };

  fn document(text: &str) -> (Document, FixedLineLayout) {
    let layout = FixedLineLayout::default();
    let buffer = StyledTextBuffer::plain(text, StyleAttributes::default());
    (Document::new(buffer, &layout), layout)
  }

  fn texts(doc: &Document) -> Vec<String> {
    doc
      .paragraphs()
      .iter()
      .map(|p| p.content.text().to_string())
      .collect()
  }

  #[test]
  fn edit_reparses_and_moves_the_cursor() {
    let (mut doc, layout) = document("Hello");
    doc.edit(5..5, "\nWorld", &layout).unwrap();
    assert_eq!(texts(&doc), vec!["Hello\n", "World"]);
    assert_eq!(doc.cursor(), 11);
    assert!(doc.geometry().is_current(doc.buffer(), layout.container_width()));
  }

  #[test]
  fn apply_spacing_keeps_identity() {
    let (mut doc, layout) = document("Hello\nWorld");
    let ids = doc.model().ids();
    let bottom = doc.paragraphs()[1].geometry.top();
    doc.apply_spacing(&(0..6), 20.0, &layout).unwrap();
    assert_eq!(doc.model().ids(), ids);
    assert_eq!(doc.paragraphs()[0].spacing, 20.0);
    assert_eq!(doc.buffer().style_at(0).paragraph_spacing, 20.0);
    assert_eq!(doc.paragraphs()[1].geometry.top(), bottom + 20.0 - RELATED_SPACING);
  }

  #[test]
  fn apply_spacing_rejects_stale_ranges() {
    let (mut doc, layout) = document("Hello\nWorld");
    assert_eq!(
      doc.apply_spacing(&(0..5), 20.0, &layout),
      Err(DocumentError::StaleRange { start: 0, end: 5 })
    );
    assert!(doc.apply_spacing(&(6..40), 20.0, &layout).is_err());
  }

  #[test]
  fn normalize_skips_protected_paragraphs() {
    let (mut doc, layout) = document("a\nb\nc");
    doc.apply_spacing(&(0..2), 12.0, &layout).unwrap();
    doc.apply_spacing(&(2..4), 25.0, &layout).unwrap();
    let config = SpacingConfig::default();
    let protected = [doc.paragraphs()[0].id];
    assert!(doc.normalize_spacing(&config, &protected, &layout));
    assert_eq!(doc.paragraphs()[0].spacing, 12.0);
    assert_eq!(doc.paragraphs()[1].spacing, UNRELATED_SPACING);
    assert!(!doc.normalize_spacing(&config, &protected, &layout));
  }

  #[test]
  fn protection_follows_a_paragraph_shifted_by_an_edit() {
    let (mut doc, layout) = document("a\nb\nc");
    doc.apply_spacing(&(2..4), 18.0, &layout).unwrap();
    let protected = [doc.paragraphs()[1].id];
    doc.edit(0..0, "x", &layout).unwrap();
    assert_eq!(doc.paragraphs()[1].range, 3..5);
    assert_eq!(doc.paragraphs()[1].id, protected[0]);

    let config = SpacingConfig::default();
    assert!(!doc.normalize_spacing(&config, &protected, &layout));
    assert_eq!(doc.paragraphs()[1].spacing, 18.0);
  }

  #[test]
  fn move_relocates_one_paragraph() {
    let (mut doc, layout) = document("X\nY\nZ");
    let ids = doc.model().ids();
    doc.move_paragraph(0, 2, &layout).unwrap();
    assert_eq!(texts(&doc), vec!["Y\n", "Z\n", "X"]);
    assert_eq!(doc.model().ids(), vec![ids[1], ids[2], ids[0]]);
    doc.move_paragraph(2, 0, &layout).unwrap();
    assert_eq!(doc.text(), "X\nY\nZ");
    assert!(doc.move_paragraph(0, 3, &layout).is_err());
  }

  #[test]
  fn move_keeps_the_cursor_in_its_paragraph() {
    let (mut doc, layout) = document("ab\ncd\nef");
    doc.set_cursor(4);
    doc.move_paragraph(1, 0, &layout).unwrap();
    assert_eq!(doc.text(), "cd\nab\nef");
    assert_eq!(doc.cursor(), 1);
  }

  #[test]
  fn moving_the_empty_tail_keeps_its_style() {
    let layout = FixedLineLayout::default();
    let unrelated = StyleAttributes::default().with_spacing(UNRELATED_SPACING);
    let mut buffer = StyledTextBuffer::plain("A\n", StyleAttributes::default());
    buffer.set_typing_style(unrelated);
    let mut doc = Document::new(buffer, &layout);
    doc.move_paragraph(1, 0, &layout).unwrap();
    assert_eq!(texts(&doc), vec!["\n", "A"]);
    assert_eq!(doc.paragraphs()[0].spacing, UNRELATED_SPACING);
  }

  #[test]
  fn deleting_the_only_paragraph_clears_it() {
    let (mut doc, layout) = document("A");
    doc.delete_paragraph(0, &layout).unwrap();
    assert_eq!(doc.text(), "");
    assert_eq!(doc.paragraphs().len(), 1);
    assert_eq!(doc.cursor(), 0);
  }

  #[test]
  fn delete_rebuilds_and_clamps_the_cursor() {
    let (mut doc, layout) = document("one\ntwo\nthree");
    let ids = doc.model().ids();
    doc.delete_paragraph(1, &layout).unwrap();
    assert_eq!(doc.text(), "one\nthree");
    assert_eq!(doc.model().ids(), vec![ids[0], ids[2]]);
    assert_eq!(doc.cursor(), 4);

    doc.delete_paragraph(1, &layout).unwrap();
    assert_eq!(doc.text(), "one");
    assert_eq!(doc.cursor(), 3);
  }

  #[test]
  fn reply_inserts_after_a_terminated_paragraph() {
    let (mut doc, layout) = document("Hello\nWorld");
    let config = SpacingConfig::default();
    let new = doc.insert_reply(0, &config, &layout).unwrap();
    assert_eq!(new, 1);
    assert_eq!(texts(&doc), vec!["Hello\n", "\n", "World"]);
    assert_eq!(doc.cursor(), 6);
    assert_eq!(doc.paragraphs()[1].spacing, RELATED_SPACING);
  }

  #[test]
  fn reply_to_an_unrelated_paragraph_pulls_it_in() {
    let layout = FixedLineLayout::default();
    let title = StyleAttributes::default()
      .with_font(FontRole::Title1)
      .with_spacing(UNRELATED_SPACING);
    let mut doc = Document::new(StyledTextBuffer::plain("Title", title), &layout);
    let config = SpacingConfig::default();
    doc.insert_reply(0, &config, &layout).unwrap();

    assert_eq!(texts(&doc), vec!["Title\n", ""]);
    assert_eq!(doc.cursor(), 6);
    assert_eq!(doc.paragraphs()[0].spacing, RELATED_SPACING);
    assert_eq!(doc.paragraphs()[1].spacing, RELATED_SPACING);
    assert_eq!(doc.buffer().typing_style().font, FontRole::Title1);
  }

  #[test]
  fn scroll_offset_is_clamped_to_content() {
    let (mut doc, _) = document("short");
    assert_eq!(doc.set_scroll_offset(50.0), 0.0);
    doc.set_viewport_height(10.0);
    let max = doc.geometry().content_height() - 10.0;
    assert_eq!(doc.set_scroll_offset(500.0), max);
    assert_eq!(doc.to_content(Point::new(1.0, 1.0)).y, 1.0 + max);
  }

  quickcheck::quickcheck! {
    fn move_relocates_only_the_moved_paragraph(note: Note, from: usize, to: usize) -> bool {
      let (mut doc, layout) = document(&note.0);
      let count = doc.paragraphs().len();
      let (from, to) = (from % count, to % count);
      let bodies = |doc: &Document| -> Vec<(ParagraphId, String)> {
        doc
          .paragraphs()
          .iter()
          .map(|p| (p.id, p.body().text().to_string()))
          .collect()
      };
      let mut expected = bodies(&doc);
      let moved = expected.remove(from);
      expected.insert(to, moved);

      doc.move_paragraph(from, to, &layout).is_ok()
        && bodies(&doc) == expected
        && doc.buffer().len_chars() == note.0.chars().count()
    }
  }
}
