//! Paragraph segmentation of a [`StyledTextBuffer`].
//!
//! A paragraph is the text between separators, including its own trailing
//! `\n`. Only the final paragraph lacks one; a buffer that ends with `\n`
//! therefore ends with an empty paragraph, and an empty buffer has exactly one
//! empty paragraph.
//!
//! ```text
//! "Hello\nWorld"  -> [0..6 "Hello\n"] [6..11 "World"]
//! "Hello\n"       -> [0..6 "Hello\n"] [6..6 ""]
//! ""              -> [0..0 ""]
//! ```
//!
//! # Identity
//!
//! Paragraph records are rebuilt wholesale on every [`ParagraphModel::reparse`].
//! Each new record takes the [`ParagraphId`] of the first unconsumed record of
//! the previous list with equal content and spacing, so consumers keyed by id
//! don't see churn for paragraphs an edit didn't touch. Which id two
//! byte-identical paragraphs end up with is unspecified.

use std::{
  num::NonZeroU64,
  ops::Range,
  sync::atomic::{
    AtomicU64,
    Ordering,
  },
};

use ruled_core::{
  geometry::Point,
  line_ending::{
    PARAGRAPH_SEPARATOR_STR,
    paragraph_breaks,
  },
};

use crate::buffer::{
  StyledText,
  StyledTextBuffer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParagraphId(NonZeroU64);

impl ParagraphId {
  pub fn new(id: NonZeroU64) -> Self {
    Self(id)
  }

  pub fn fresh() -> Self {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed).max(1);
    Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
  }

  pub fn get(self) -> u64 {
    self.0.get()
  }
}

/// Derived visual metrics of a paragraph, in content coordinates.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ParagraphGeometry {
  pub height:     f32,
  pub line_count: usize,
  pub origin:     Point,
}

impl ParagraphGeometry {
  pub fn top(&self) -> f32 {
    self.origin.y
  }

  pub fn bottom(&self) -> f32 {
    self.origin.y + self.height
  }

  pub fn mid_y(&self) -> f32 {
    self.origin.y + self.height / 2.0
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
  pub id:       ParagraphId,
  pub range:    Range<usize>,
  pub content:  StyledText,
  pub spacing:  f32,
  pub geometry: ParagraphGeometry,
}

impl Paragraph {
  pub fn is_empty(&self) -> bool {
    self.range.is_empty()
  }

  /// Whether this paragraph ends with its own separator.
  pub fn is_terminated(&self) -> bool {
    self.content.ends_with_separator()
  }

  /// Content without the trailing separator.
  pub fn body(&self) -> StyledText {
    let mut body = self.content.clone();
    body.trim_trailing_separator();
    body
  }

  fn same_content(&self, other: &Paragraph) -> bool {
    self.spacing == other.spacing && self.content == other.content
  }
}

/// The authoritative paragraph list of a buffer.
#[derive(Debug, Default, Clone)]
pub struct ParagraphModel {
  paragraphs: Vec<Paragraph>,
}

impl ParagraphModel {
  pub fn new() -> Self {
    Self::default()
  }

  /// Model of `buffer` with fresh ids.
  pub fn parse(buffer: &StyledTextBuffer) -> Self {
    let mut model = Self::new();
    model.reparse(buffer);
    model
  }

  pub fn paragraphs(&self) -> &[Paragraph] {
    &self.paragraphs
  }

  pub fn paragraphs_mut(&mut self) -> &mut [Paragraph] {
    &mut self.paragraphs
  }

  pub fn len(&self) -> usize {
    self.paragraphs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paragraphs.is_empty()
  }

  pub fn get(&self, idx: usize) -> Option<&Paragraph> {
    self.paragraphs.get(idx)
  }

  pub fn ids(&self) -> Vec<ParagraphId> {
    self.paragraphs.iter().map(|p| p.id).collect()
  }

  pub fn index_of(&self, id: ParagraphId) -> Option<usize> {
    self.paragraphs.iter().position(|p| p.id == id)
  }

  /// Index of the paragraph a caret at `pos` belongs to. A caret right after
  /// a separator belongs to the next paragraph.
  pub fn index_at_char(&self, pos: usize) -> Option<usize> {
    let last = self.paragraphs.len().checked_sub(1)?;
    Some(
      self
        .paragraphs
        .iter()
        .position(|p| pos < p.range.end)
        .unwrap_or(last),
    )
  }

  /// Index of the paragraph whose range is exactly `range`.
  pub fn index_of_range(&self, range: &Range<usize>) -> Option<usize> {
    self.paragraphs.iter().position(|p| p.range == *range)
  }

  /// Re-segment `buffer`, carrying ids over from the current list.
  pub fn reparse(&mut self, buffer: &StyledTextBuffer) -> &[Paragraph] {
    let len = buffer.len_chars();
    let mut starts = vec![0];
    starts.extend(paragraph_breaks(buffer.text().slice(..)));

    let mut next = Vec::with_capacity(starts.len());
    for (idx, &start) in starts.iter().enumerate() {
      let end = starts.get(idx + 1).copied().unwrap_or(len);
      let range = start..end;
      let Ok(content) = buffer.slice(range.clone()) else {
        tracing::trace!(?range, len, "skipping paragraph outside the buffer");
        continue;
      };
      let spacing = if range.is_empty() {
        buffer.typing_style().paragraph_spacing
      } else {
        buffer.style_at(range.start).paragraph_spacing
      };
      next.push(Paragraph {
        id: ParagraphId::fresh(),
        range,
        content,
        spacing,
        geometry: ParagraphGeometry::default(),
      });
    }

    let mut consumed = vec![false; self.paragraphs.len()];
    for paragraph in &mut next {
      let matched = self
        .paragraphs
        .iter()
        .enumerate()
        .find(|(idx, old)| !consumed[*idx] && old.same_content(paragraph));
      if let Some((idx, old)) = matched {
        consumed[idx] = true;
        paragraph.id = old.id;
        paragraph.geometry = old.geometry;
      }
    }

    self.paragraphs = next;
    &self.paragraphs
  }

  /// Give the paragraphs `ids` in order. Used after a structural edit whose
  /// permutation is known, so moved paragraphs keep their identity even
  /// though their separator changed. Ignored on length mismatch.
  pub fn adopt_ids(&mut self, ids: &[ParagraphId]) {
    if ids.len() != self.paragraphs.len() {
      tracing::trace!(
        expected = self.paragraphs.len(),
        got = ids.len(),
        "paragraph id permutation does not fit"
      );
      return;
    }
    for (paragraph, id) in self.paragraphs.iter_mut().zip(ids) {
      paragraph.id = *id;
    }
  }

  /// Join paragraph bodies into buffer content, with exactly one separator
  /// after every paragraph but the last and none after the last.
  ///
  /// A body without a separator of its own gets one in the style of its last
  /// character, so spacing travels with the paragraph.
  pub fn rebuild<'a>(contents: impl IntoIterator<Item = &'a StyledText>) -> StyledText {
    let mut out = StyledText::new();
    let mut pending: Option<StyledText> = None;
    for content in contents {
      if let Some(mut previous) = pending.take() {
        if !previous.ends_with_separator() {
          let style = previous.last_style().unwrap_or_default();
          previous.push_str(PARAGRAPH_SEPARATOR_STR, style);
        }
        out.push(&previous);
      }
      pending = Some(content.clone());
    }
    if let Some(mut last) = pending {
      last.trim_trailing_separator();
      out.push(&last);
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    style::{
      StyleAttributes,
      UNRELATED_SPACING,
    },
    testing::Note,
  };

  fn parse(text: &str) -> ParagraphModel {
    ParagraphModel::parse(&StyledTextBuffer::plain(text, StyleAttributes::default()))
  }

  fn texts(model: &ParagraphModel) -> Vec<String> {
    model
      .paragraphs()
      .iter()
      .map(|p| p.content.text().to_string())
      .collect()
  }

  fn check_invariants(model: &ParagraphModel, len: usize) -> bool {
    let paragraphs = model.paragraphs();
    if paragraphs.is_empty() || paragraphs[0].range.start != 0 {
      return false;
    }
    let last = paragraphs.len() - 1;
    paragraphs.iter().enumerate().all(|(idx, p)| {
      let contiguous = idx == last || p.range.end == paragraphs[idx + 1].range.start;
      let terminated = if idx == last {
        !p.is_terminated() && p.range.end == len
      } else {
        p.is_terminated()
      };
      contiguous && terminated && p.content.len_chars() == p.range.len()
    })
  }

  #[test]
  fn empty_buffer_has_one_empty_paragraph() {
    let style = StyleAttributes::default().with_spacing(UNRELATED_SPACING);
    let model = ParagraphModel::parse(&StyledTextBuffer::new(style));
    assert_eq!(model.len(), 1);
    assert_eq!(model.paragraphs()[0].range, 0..0);
    assert_eq!(model.paragraphs()[0].spacing, UNRELATED_SPACING);
  }

  #[test]
  fn splits_on_separators() {
    let model = parse("Hello\nWorld");
    assert_eq!(texts(&model), vec!["Hello\n", "World"]);
    assert_eq!(model.paragraphs()[1].range, 6..11);

    let model = parse("Hello\n");
    assert_eq!(texts(&model), vec!["Hello\n", ""]);
    assert_eq!(model.paragraphs()[1].range, 6..6);

    let model = parse("\n\n");
    assert_eq!(texts(&model), vec!["\n", "\n", ""]);
  }

  #[test]
  fn index_at_char_assigns_carets_after_separators_forward() {
    let model = parse("ab\ncd");
    assert_eq!(model.index_at_char(0), Some(0));
    assert_eq!(model.index_at_char(2), Some(0));
    assert_eq!(model.index_at_char(3), Some(1));
    assert_eq!(model.index_at_char(5), Some(1));
    assert_eq!(model.index_at_char(99), Some(1));
  }

  #[test]
  fn reparse_keeps_ids_of_untouched_paragraphs() {
    let mut buffer = StyledTextBuffer::plain("one\ntwo\nthree", StyleAttributes::default());
    let mut model = ParagraphModel::parse(&buffer);
    let before = model.ids();

    buffer.insert_str(5, "w").unwrap();
    model.reparse(&buffer);
    let after = model.ids();

    assert_eq!(texts(&model), vec!["one\n", "twwo\n", "three"]);
    assert_eq!(after[0], before[0]);
    assert_ne!(after[1], before[1]);
    assert_eq!(after[2], before[2]);
  }

  #[test]
  fn spacing_change_refreshes_identity() {
    let mut buffer = StyledTextBuffer::plain("one\ntwo", StyleAttributes::default());
    let mut model = ParagraphModel::parse(&buffer);
    let before = model.ids();
    buffer
      .set_paragraph_spacing(0..4, UNRELATED_SPACING)
      .unwrap();
    model.reparse(&buffer);
    assert_eq!(model.paragraphs()[0].spacing, UNRELATED_SPACING);
    assert_ne!(model.ids()[0], before[0]);
    assert_eq!(model.ids()[1], before[1]);
  }

  #[test]
  fn rebuild_normalizes_separators() {
    let style = StyleAttributes::default();
    let x = StyledText::plain("X", style);
    let y = StyledText::plain("Y\n", style);
    let z = StyledText::plain("Z\n", style);
    let rebuilt = ParagraphModel::rebuild([&y, &z, &x]);
    assert_eq!(rebuilt.text(), "Y\nZ\nX");
    let rebuilt = ParagraphModel::rebuild([&x, &y, &z]);
    assert_eq!(rebuilt.text(), "X\nY\nZ");
    assert_eq!(ParagraphModel::rebuild([]).text(), "");
  }

  #[test]
  fn rebuild_gives_new_separator_the_paragraph_spacing() {
    let style = StyleAttributes::default();
    let x = StyledText::plain("X", style.with_spacing(UNRELATED_SPACING));
    let y = StyledText::plain("Y\n", style);
    let rebuilt = ParagraphModel::rebuild([&x, &y]);
    let model = ParagraphModel::parse(&StyledTextBuffer::from_styled(&rebuilt, style));
    assert_eq!(texts(&model), vec!["X\n", "Y"]);
    assert_eq!(model.paragraphs()[0].spacing, UNRELATED_SPACING);
    assert_eq!(
      model.paragraphs()[0].content.runs().len(),
      1,
      "separator shares the paragraph's run"
    );
  }

  quickcheck::quickcheck! {
    fn ranges_cover_the_buffer(note: Note) -> bool {
      let len = note.0.chars().count();
      check_invariants(&parse(&note.0), len)
    }

    fn rebuild_then_reparse_is_idempotent(note: Note) -> bool {
      let model = parse(&note.0);
      let rebuilt = ParagraphModel::rebuild(model.paragraphs().iter().map(|p| &p.content));
      let again = ParagraphModel::parse(&StyledTextBuffer::from_styled(
        &rebuilt,
        StyleAttributes::default(),
      ));
      texts(&again) == texts(&model)
        && again
          .paragraphs()
          .iter()
          .zip(model.paragraphs())
          .all(|(a, b)| a.spacing == b.spacing)
    }

    fn reparse_of_same_text_keeps_every_id(note: Note) -> bool {
      let buffer = StyledTextBuffer::plain(&note.0, StyleAttributes::default());
      let mut model = ParagraphModel::parse(&buffer);
      let before = model.ids();
      model.reparse(&buffer);
      model.ids() == before
    }
  }
}
