//! Styled text storage.
//!
//! [`StyledTextBuffer`] is the single mutable text store of an editor session:
//! a [`Rope`] for the characters plus an ordered list of style [`Run`]s whose
//! lengths add up to the text length. [`StyledText`] is the owned, immutable
//! counterpart used for paragraph snapshots and replacement payloads.
//!
//! All positions are char indices. Runs are kept coalesced: no empty runs and
//! no two neighbours with equal styles. Mutations only ever change run
//! boundaries at the edited range, so styles outside of it survive untouched.
//!
//! # Error Handling
//!
//! Fallible operations return [`Result<T, BufferError>`]:
//!
//! - **InvalidRange** - Range has start > end
//! - **RangeOutOfBounds** - Range extends past the end of the buffer

use std::ops::Range;

use ropey::Rope;
use ruled_core::line_ending::{
  PARAGRAPH_SEPARATOR,
  normalize_line_endings,
  rope_ends_with_separator,
};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
  Tendril,
  style::StyleAttributes,
};

pub type Result<T> = std::result::Result<T, BufferError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum BufferError {
  #[error("invalid range: start {from} is after end {to}")]
  InvalidRange { from: usize, to: usize },
  #[error("range {from}..{to} is out of bounds for buffer length {len}")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
}

/// `len` chars sharing one style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Run {
  pub len:   usize,
  pub style: StyleAttributes,
}

impl Run {
  pub fn new(len: usize, style: StyleAttributes) -> Self {
    Self { len, style }
  }
}

/// Owned styled text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyledText {
  text: Tendril,
  runs: SmallVec<[Run; 2]>,
}

impl StyledText {
  pub fn new() -> Self {
    Self::default()
  }

  /// Single-style text. Line endings are normalized.
  pub fn plain(text: &str, style: StyleAttributes) -> Self {
    let mut styled = Self::new();
    styled.push_str(text, style);
    styled
  }

  pub fn from_spans<'a>(spans: impl IntoIterator<Item = (&'a str, StyleAttributes)>) -> Self {
    let mut styled = Self::new();
    for (text, style) in spans {
      styled.push_str(text, style);
    }
    styled
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn runs(&self) -> &[Run] {
    &self.runs
  }

  pub fn len_chars(&self) -> usize {
    self.runs.iter().map(|run| run.len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }

  pub fn first_style(&self) -> Option<StyleAttributes> {
    self.runs.first().map(|run| run.style)
  }

  pub fn last_style(&self) -> Option<StyleAttributes> {
    self.runs.last().map(|run| run.style)
  }

  pub fn ends_with_separator(&self) -> bool {
    self.text.ends_with(PARAGRAPH_SEPARATOR)
  }

  /// Append `text` in `style`, folding foreign line endings.
  pub fn push_str(&mut self, text: &str, style: StyleAttributes) {
    let text = normalize_line_endings(text);
    let len = text.chars().count();
    if len == 0 {
      return;
    }
    self.text.push_str(&text);
    push_run(&mut self.runs, Run::new(len, style));
  }

  pub fn push(&mut self, other: &StyledText) {
    self.text.push_str(&other.text);
    for run in &other.runs {
      push_run(&mut self.runs, *run);
    }
  }

  /// Drop one trailing paragraph separator. Returns whether one was removed.
  pub fn trim_trailing_separator(&mut self) -> bool {
    if !self.ends_with_separator() {
      return false;
    }
    self.text.pop();
    if let Some(last) = self.runs.last_mut() {
      last.len -= 1;
      if last.len == 0 {
        self.runs.pop();
      }
    }
    true
  }

  /// Rewrite every run's style in place.
  pub fn restyle(&mut self, mut f: impl FnMut(&mut StyleAttributes)) {
    for run in &mut self.runs {
      f(&mut run.style);
    }
    coalesce(&mut self.runs);
  }

  /// Iterate `(text, style)` pairs, one per run.
  pub fn spans(&self) -> impl Iterator<Item = (&str, &StyleAttributes)> {
    let mut rest = self.text.as_str();
    self.runs.iter().map(move |run| {
      let split = byte_offset(rest, run.len);
      let (head, tail) = rest.split_at(split);
      rest = tail;
      (head, &run.style)
    })
  }
}

/// The mutable styled text of an editor session.
#[derive(Debug, Clone)]
pub struct StyledTextBuffer {
  text:         Rope,
  runs:         Vec<Run>,
  typing_style: StyleAttributes,
  version:      u64,
}

impl Default for StyledTextBuffer {
  fn default() -> Self {
    Self::new(StyleAttributes::default())
  }
}

impl StyledTextBuffer {
  pub fn new(typing_style: StyleAttributes) -> Self {
    Self {
      text: Rope::new(),
      runs: Vec::new(),
      typing_style,
      version: 0,
    }
  }

  pub fn from_styled(content: &StyledText, typing_style: StyleAttributes) -> Self {
    let mut buffer = Self::new(typing_style);
    buffer.text = Rope::from_str(content.text());
    buffer.runs = content.runs().to_vec();
    buffer
  }

  /// Single-style buffer whose typing style matches the text.
  pub fn plain(text: &str, style: StyleAttributes) -> Self {
    Self::from_styled(&StyledText::plain(text, style), style)
  }

  pub fn text(&self) -> &Rope {
    &self.text
  }

  pub fn runs(&self) -> &[Run] {
    &self.runs
  }

  pub fn len_chars(&self) -> usize {
    self.text.len_chars()
  }

  pub fn is_empty(&self) -> bool {
    self.text.len_chars() == 0
  }

  pub fn version(&self) -> u64 {
    self.version
  }

  /// Style applied to text typed where no neighbouring character provides
  /// one, and the style of the empty trailing paragraph.
  pub fn typing_style(&self) -> StyleAttributes {
    self.typing_style
  }

  pub fn set_typing_style(&mut self, style: StyleAttributes) {
    if self.typing_style != style {
      self.typing_style = style;
      self.bump();
    }
  }

  pub fn ends_with_separator(&self) -> bool {
    rope_ends_with_separator(self.text.slice(..))
  }

  /// Whether `range` lies within the buffer.
  pub fn contains_range(&self, range: &Range<usize>) -> bool {
    range.start <= range.end && range.end <= self.len_chars()
  }

  /// Style of the char at `pos`, or the typing style at the end.
  pub fn style_at(&self, pos: usize) -> StyleAttributes {
    let mut start = 0;
    for run in &self.runs {
      if pos < start + run.len {
        return run.style;
      }
      start += run.len;
    }
    self.typing_style
  }

  /// Style new text inserted at `pos` picks up: the char before it, the char
  /// after it at the start of the buffer, else the typing style.
  pub fn insertion_style(&self, pos: usize) -> StyleAttributes {
    if pos > 0 {
      self.style_at(pos - 1)
    } else {
      self.style_at(0)
    }
  }

  pub fn slice(&self, range: Range<usize>) -> Result<StyledText> {
    self.check_range(&range)?;
    let mut out = StyledText::new();
    let mut start = 0;
    for run in &self.runs {
      let end = start + run.len;
      let from = start.max(range.start);
      let to = end.min(range.end);
      if from < to {
        let text = self.text.slice(from..to);
        out.push_str(&text.to_string(), run.style);
      }
      if end >= range.end {
        break;
      }
      start = end;
    }
    Ok(out)
  }

  /// The whole buffer as an owned snapshot.
  pub fn to_styled(&self) -> StyledText {
    let mut out = StyledText::new();
    let mut start = 0;
    for run in &self.runs {
      let end = start + run.len;
      out.push_str(&self.text.slice(start..end).to_string(), run.style);
      start = end;
    }
    out
  }

  /// Whole-buffer replace. The typing style is kept.
  pub fn replace_all(&mut self, content: &StyledText) {
    self.text = Rope::from_str(content.text());
    self.runs = content.runs().to_vec();
    self.bump();
  }

  /// Replace `range` with `content`, keeping runs outside of it.
  pub fn replace_range(&mut self, range: Range<usize>, content: &StyledText) -> Result<()> {
    self.check_range(&range)?;
    let first = split_runs_at(&mut self.runs, range.start);
    let last = split_runs_at(&mut self.runs, range.end);
    self
      .runs
      .splice(first..last, content.runs().iter().copied());
    coalesce(&mut self.runs);

    self.text.remove(range.clone());
    self.text.insert(range.start, content.text());
    self.bump();
    debug_assert_eq!(self.runs_len(), self.len_chars());
    Ok(())
  }

  /// Insert `text` at `pos` in the style that position would type with.
  pub fn insert_str(&mut self, pos: usize, text: &str) -> Result<()> {
    let style = self.insertion_style(pos);
    self.replace_range(pos..pos, &StyledText::plain(text, style))
  }

  pub fn remove(&mut self, range: Range<usize>) -> Result<()> {
    self.replace_range(range, &StyledText::new())
  }

  /// Rewrite the style of every run overlapping `range`, splitting runs at
  /// its edges.
  ///
  /// An empty range at the very end of the buffer addresses the empty
  /// trailing paragraph, whose style lives in the typing style.
  pub fn restyle_range(
    &mut self,
    range: Range<usize>,
    mut f: impl FnMut(&mut StyleAttributes),
  ) -> Result<()> {
    self.check_range(&range)?;
    if range.is_empty() {
      if range.start == self.len_chars() {
        let mut style = self.typing_style;
        f(&mut style);
        self.set_typing_style(style);
      }
      return Ok(());
    }

    let first = split_runs_at(&mut self.runs, range.start);
    let last = split_runs_at(&mut self.runs, range.end);
    for run in &mut self.runs[first..last] {
      f(&mut run.style);
    }
    coalesce(&mut self.runs);
    self.bump();
    Ok(())
  }

  /// Set the paragraph spacing attribute over `range`.
  pub fn set_paragraph_spacing(&mut self, range: Range<usize>, spacing: f32) -> Result<()> {
    self.restyle_range(range, |style| style.paragraph_spacing = spacing)
  }

  fn check_range(&self, range: &Range<usize>) -> Result<()> {
    if range.start > range.end {
      return Err(BufferError::InvalidRange {
        from: range.start,
        to:   range.end,
      });
    }
    let len = self.len_chars();
    if range.end > len {
      return Err(BufferError::RangeOutOfBounds {
        from: range.start,
        to: range.end,
        len,
      });
    }
    Ok(())
  }

  fn runs_len(&self) -> usize {
    self.runs.iter().map(|run| run.len).sum()
  }

  fn bump(&mut self) {
    self.version = self.version.wrapping_add(1);
  }
}

/// Byte offset of the char `chars` chars into `text`.
fn byte_offset(text: &str, chars: usize) -> usize {
  text
    .char_indices()
    .nth(chars)
    .map_or(text.len(), |(idx, _)| idx)
}

fn push_run(runs: &mut impl RunList, run: Run) {
  if run.len == 0 {
    return;
  }
  match runs.last_run_mut() {
    Some(last) if last.style == run.style => last.len += run.len,
    _ => runs.push_run(run),
  }
}

fn coalesce<R: RunList + Default + IntoIterator<Item = Run>>(runs: &mut R) {
  for run in std::mem::take(runs) {
    push_run(runs, run);
  }
}

/// The two run containers: inline for snapshots, heap for the buffer.
trait RunList {
  fn last_run_mut(&mut self) -> Option<&mut Run>;
  fn push_run(&mut self, run: Run);
}

impl RunList for Vec<Run> {
  fn last_run_mut(&mut self) -> Option<&mut Run> {
    self.last_mut()
  }

  fn push_run(&mut self, run: Run) {
    self.push(run);
  }
}

impl<A: smallvec::Array<Item = Run>> RunList for SmallVec<A> {
  fn last_run_mut(&mut self) -> Option<&mut Run> {
    self.last_mut()
  }

  fn push_run(&mut self, run: Run) {
    self.push(run);
  }
}

/// Ensure a run boundary at `pos` and return the index of the run starting
/// there (`runs.len()` at the end).
fn split_runs_at(runs: &mut Vec<Run>, pos: usize) -> usize {
  let mut start = 0;
  for idx in 0..runs.len() {
    if start == pos {
      return idx;
    }
    let run = runs[idx];
    let end = start + run.len;
    if pos < end {
      runs[idx].len = pos - start;
      runs.insert(idx + 1, Run::new(end - pos, run.style));
      return idx + 1;
    }
    start = end;
  }
  runs.len()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::style::FontRole;

  fn bold() -> StyleAttributes {
    StyleAttributes {
      bold: true,
      ..StyleAttributes::default()
    }
  }

  fn buffer(spans: &[(&str, StyleAttributes)]) -> StyledTextBuffer {
    StyledTextBuffer::from_styled(
      &StyledText::from_spans(spans.iter().map(|(t, s)| (*t, *s))),
      StyleAttributes::default(),
    )
  }

  #[test]
  fn from_spans_coalesces_equal_neighbours() {
    let plain = StyleAttributes::default();
    let text = StyledText::from_spans([("ab", plain), ("cd", plain), ("", bold()), ("e", bold())]);
    assert_eq!(text.runs(), &[Run::new(4, plain), Run::new(1, bold())]);
    assert_eq!(text.len_chars(), 5);
  }

  #[test]
  fn replace_range_keeps_runs_outside_the_edit() {
    let plain = StyleAttributes::default();
    let mut buf = buffer(&[("hello ", plain), ("bold", bold()), (" world", plain)]);
    buf
      .replace_range(8..10, &StyledText::plain("LD", plain))
      .unwrap();
    assert_eq!(buf.text().to_string(), "hello boLD world");
    assert_eq!(buf.runs(), &[
      Run::new(6, plain),
      Run::new(2, bold()),
      Run::new(8, plain)
    ]);
  }

  #[test]
  fn replace_range_rejects_out_of_bounds() {
    let mut buf = StyledTextBuffer::plain("abc", StyleAttributes::default());
    assert_eq!(
      buf.replace_range(2..9, &StyledText::new()),
      Err(BufferError::RangeOutOfBounds {
        from: 2,
        to:   9,
        len:  3,
      })
    );
    #[allow(clippy::reversed_empty_ranges)]
    let reversed = 2..1;
    assert_eq!(
      buf.remove(reversed),
      Err(BufferError::InvalidRange { from: 2, to: 1 })
    );
    assert_eq!(buf.version(), 0);
  }

  #[test]
  fn insert_inherits_preceding_style() {
    let mut buf = buffer(&[("ab", bold())]);
    buf.insert_str(2, "c").unwrap();
    assert_eq!(buf.runs(), &[Run::new(3, bold())]);
    buf.insert_str(0, "z").unwrap();
    assert_eq!(buf.runs(), &[Run::new(4, bold())]);
  }

  #[test]
  fn insert_normalizes_line_endings() {
    let mut buf = StyledTextBuffer::default();
    buf.insert_str(0, "a\r\nb").unwrap();
    assert_eq!(buf.text().to_string(), "a\nb");
  }

  #[test]
  fn set_spacing_splits_and_merges_runs() {
    let plain = StyleAttributes::default();
    let mut buf = StyledTextBuffer::plain("one\ntwo", plain);
    buf.set_paragraph_spacing(0..4, 20.0).unwrap();
    assert_eq!(buf.runs(), &[
      Run::new(4, plain.with_spacing(20.0)),
      Run::new(3, plain)
    ]);
    assert_eq!(buf.style_at(3).paragraph_spacing, 20.0);
    assert_eq!(buf.style_at(4).paragraph_spacing, plain.paragraph_spacing);

    buf
      .set_paragraph_spacing(0..4, plain.paragraph_spacing)
      .unwrap();
    assert_eq!(buf.runs(), &[Run::new(7, plain)]);
  }

  #[test]
  fn empty_range_at_end_restyles_typing_style() {
    let mut buf = StyledTextBuffer::plain("a\n", StyleAttributes::default());
    buf.set_paragraph_spacing(2..2, 30.0).unwrap();
    assert_eq!(buf.typing_style().paragraph_spacing, 30.0);
    assert_eq!(buf.style_at(0).paragraph_spacing, StyleAttributes::default().paragraph_spacing);
  }

  #[test]
  fn slice_and_spans() {
    let plain = StyleAttributes::default();
    let title = plain.with_font(FontRole::Title1);
    let buf = buffer(&[("Tïtle\n", title), ("bödy", plain)]);
    let slice = buf.slice(3..8).unwrap();
    assert_eq!(slice.text(), "le\nbö");
    let spans: Vec<_> = slice.spans().map(|(t, s)| (t.to_string(), s.font)).collect();
    assert_eq!(spans, vec![
      ("le\n".to_string(), FontRole::Title1),
      ("bö".to_string(), FontRole::Body),
    ]);
    assert_eq!(buf.to_styled().text(), "Tïtle\nbödy");
  }

  #[test]
  fn trim_trailing_separator_drops_empty_run() {
    let mut text = StyledText::from_spans([("a", StyleAttributes::default()), ("\n", bold())]);
    assert!(text.trim_trailing_separator());
    assert_eq!(text.text(), "a");
    assert_eq!(text.runs().len(), 1);
    assert!(!text.trim_trailing_separator());
  }
}
