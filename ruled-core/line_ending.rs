use std::borrow::Cow;

use ropey::RopeSlice;

/// The only paragraph separator stored in a buffer. Other line endings are
/// folded into it on the way in, see [`normalize_line_endings`].
pub const PARAGRAPH_SEPARATOR: char = '\u{000A}';

pub const PARAGRAPH_SEPARATOR_STR: &str = "\u{000A}";

#[inline]
pub fn char_is_paragraph_separator(ch: char) -> bool {
  ch == PARAGRAPH_SEPARATOR
}

/// Characters that terminate a paragraph in text coming from outside the
/// engine: CR, LF, CRLF and U+2029.
#[inline]
fn char_is_foreign_separator(ch: char) -> bool {
  matches!(ch, '\u{000D}' | '\u{2029}')
}

/// Fold CRLF, lone CR and U+2029 into [`PARAGRAPH_SEPARATOR`].
///
/// Borrows when the input is already normalized. The result never has more
/// chars than the input; each CRLF pair shrinks by one.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
  if !text.chars().any(char_is_foreign_separator) {
    return Cow::Borrowed(text);
  }

  let mut out = String::with_capacity(text.len());
  let mut chars = text.chars().peekable();
  while let Some(ch) = chars.next() {
    match ch {
      '\u{000D}' => {
        if chars.peek() == Some(&'\u{000A}') {
          chars.next();
        }
        out.push(PARAGRAPH_SEPARATOR);
      },
      '\u{2029}' => out.push(PARAGRAPH_SEPARATOR),
      ch => out.push(ch),
    }
  }
  Cow::Owned(out)
}

#[inline]
pub fn str_ends_with_separator(text: &str) -> bool {
  text.ends_with(PARAGRAPH_SEPARATOR)
}

#[inline]
pub fn rope_ends_with_separator(slice: RopeSlice) -> bool {
  slice
    .len_chars()
    .checked_sub(1)
    .is_some_and(|last| slice.char(last) == PARAGRAPH_SEPARATOR)
}

/// Char offsets one past every separator in `slice`, i.e. the start of each
/// paragraph after the first.
pub fn paragraph_breaks(slice: RopeSlice<'_>) -> impl Iterator<Item = usize> + '_ {
  slice
    .chars()
    .enumerate()
    .filter(|(_, ch)| char_is_paragraph_separator(*ch))
    .map(|(idx, _)| idx + 1)
}
