use serde::{
  Deserialize,
  Serialize,
};

/// Default trailing spacing of a paragraph tied to the next one.
pub const RELATED_SPACING: f32 = 8.0;

/// Default trailing spacing of a paragraph that starts a new thought.
pub const UNRELATED_SPACING: f32 = 28.0;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontRole {
  #[default]
  Body,
  Title1,
  Title2,
}

impl FontRole {
  /// Nominal point size at the default content size category.
  pub fn point_size(self) -> f32 {
    match self {
      FontRole::Body => 17.0,
      FontRole::Title1 => 28.0,
      FontRole::Title2 => 22.0,
    }
  }
}

/// Attributes attached to a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct StyleAttributes {
  pub font:              FontRole,
  pub bold:              bool,
  pub italic:            bool,
  pub underline:         bool,
  pub paragraph_spacing: f32,
}

impl Default for StyleAttributes {
  fn default() -> Self {
    Self {
      font:              FontRole::Body,
      bold:              false,
      italic:            false,
      underline:         false,
      paragraph_spacing: RELATED_SPACING,
    }
  }
}

impl StyleAttributes {
  #[must_use]
  pub fn with_spacing(mut self, spacing: f32) -> Self {
    self.paragraph_spacing = spacing;
    self
  }

  #[must_use]
  pub fn with_font(mut self, font: FontRole) -> Self {
    self.font = font;
    self
  }
}

/// The two canonical spacing values a paragraph rests at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Detent {
  Related,
  Unrelated,
}

impl Detent {
  pub fn opposite(self) -> Self {
    match self {
      Detent::Related => Detent::Unrelated,
      Detent::Unrelated => Detent::Related,
    }
  }
}
