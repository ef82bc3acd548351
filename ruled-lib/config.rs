//! Editor configuration.
//!
//! One [`EditorConfig`] is read at session construction and handed to each
//! controller as its own section. Every table accepts partial input; missing
//! keys fall back to [`Default`]. Example `ruled.toml`:
//!
//! ```toml
//! reorder-enabled = true
//! magnetic-scroll-enabled = false
//!
//! [spacing]
//! related = 6.0
//! unrelated = 30.0
//!
//! [swipe]
//! hold-duration-ms = 600
//! ```

use std::{
  fs,
  path::{
    Path,
    PathBuf,
  },
  time::Duration,
};

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::style::{
  Detent,
  FontRole,
  RELATED_SPACING,
  StyleAttributes,
  UNRELATED_SPACING,
};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Io {
    path:   PathBuf,
    source: std::io::Error,
  },
  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("invalid config: {0}")]
  Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EditorConfig {
  pub reorder_enabled:            bool,
  pub magnetic_scroll_enabled:    bool,
  pub default_spacing_is_related: bool,
  pub new_note_uses_large_font:   bool,
  pub spacing:                    SpacingConfig,
  pub reorder:                    ReorderConfig,
  pub swipe:                      SwipeConfig,
  pub scroll_snap:                ScrollSnapConfig,
}

impl Default for EditorConfig {
  fn default() -> Self {
    Self {
      reorder_enabled:            true,
      magnetic_scroll_enabled:    true,
      default_spacing_is_related: true,
      new_note_uses_large_font:   false,
      spacing:                    SpacingConfig::default(),
      reorder:                    ReorderConfig::default(),
      swipe:                      SwipeConfig::default(),
      scroll_snap:                ScrollSnapConfig::default(),
    }
  }
}

impl EditorConfig {
  pub fn from_toml_str(source: &str) -> Result<Self> {
    let config: Self = toml::from_str(source)?;
    config.validate()?;
    Ok(config)
  }

  pub fn load(path: &Path) -> Result<Self> {
    let source = fs::read_to_string(path).map_err(|source| {
      ConfigError::Io {
        path: path.to_path_buf(),
        source,
      }
    })?;
    Self::from_toml_str(&source)
  }

  pub fn validate(&self) -> Result<()> {
    let spacing = &self.spacing;
    if !(spacing.related >= 0.0 && spacing.related < spacing.unrelated) {
      return Err(ConfigError::Invalid(format!(
        "spacing.related ({}) must be non-negative and below spacing.unrelated ({})",
        spacing.related, spacing.unrelated
      )));
    }
    if spacing.activation_threshold <= 0.0 || spacing.tolerance < 0.0 {
      return Err(ConfigError::Invalid(
        "spacing thresholds must be positive".to_string(),
      ));
    }
    if self.reorder.min_scroll_speed > self.reorder.max_scroll_speed {
      return Err(ConfigError::Invalid(
        "reorder.min-scroll-speed exceeds reorder.max-scroll-speed".to_string(),
      ));
    }
    if self.swipe.threshold <= 0.0 {
      return Err(ConfigError::Invalid(
        "swipe.threshold must be positive".to_string(),
      ));
    }
    Ok(())
  }

  /// Typing style of a freshly created note.
  pub fn new_note_style(&self) -> StyleAttributes {
    let detent = if self.default_spacing_is_related {
      Detent::Related
    } else {
      Detent::Unrelated
    };
    let font = if self.new_note_uses_large_font {
      FontRole::Title1
    } else {
      FontRole::Body
    };
    StyleAttributes::default()
      .with_font(font)
      .with_spacing(self.spacing.value(detent))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SpacingConfig {
  pub related:              f32,
  pub unrelated:            f32,
  /// Distance from the opposite detent at which a pinch primes.
  pub activation_threshold: f32,
  /// Distance from a detent that counts as resting on it.
  pub tolerance:            f32,
  pub settle_duration_ms:   u64,
}

impl Default for SpacingConfig {
  fn default() -> Self {
    Self {
      related:              RELATED_SPACING,
      unrelated:            UNRELATED_SPACING,
      activation_threshold: 6.0,
      tolerance:            0.5,
      settle_duration_ms:   500,
    }
  }
}

impl SpacingConfig {
  pub fn value(&self, detent: Detent) -> f32 {
    match detent {
      Detent::Related => self.related,
      Detent::Unrelated => self.unrelated,
    }
  }

  /// Detent closest to `spacing`; ties go to `Related`.
  pub fn nearest(&self, spacing: f32) -> Detent {
    if (spacing - self.related).abs() <= (spacing - self.unrelated).abs() {
      Detent::Related
    } else {
      Detent::Unrelated
    }
  }

  /// The detent `spacing` rests on, within tolerance.
  pub fn detent_of(&self, spacing: f32) -> Option<Detent> {
    [Detent::Related, Detent::Unrelated]
      .into_iter()
      .find(|detent| (spacing - self.value(*detent)).abs() <= self.tolerance)
  }

  pub fn clamp(&self, spacing: f32) -> f32 {
    spacing.clamp(self.related, self.unrelated)
  }

  pub fn settle_duration(&self) -> Duration {
    Duration::from_millis(self.settle_duration_ms)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ReorderConfig {
  /// Distance from a viewport edge within which dragging auto-scrolls.
  pub scroll_edge_threshold: f32,
  /// Points per second at the threshold boundary.
  pub min_scroll_speed:      f32,
  /// Points per second at the very edge.
  pub max_scroll_speed:      f32,
}

impl Default for ReorderConfig {
  fn default() -> Self {
    Self {
      scroll_edge_threshold: 60.0,
      min_scroll_speed:      120.0,
      max_scroll_speed:      900.0,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SwipeConfig {
  /// Horizontal travel that arms reply or starts the delete hold.
  pub threshold:               f32,
  pub hold_duration_ms:        u64,
  pub spring_back_duration_ms: u64,
}

impl Default for SwipeConfig {
  fn default() -> Self {
    Self {
      threshold:               80.0,
      hold_duration_ms:        800,
      spring_back_duration_ms: 350,
    }
  }
}

impl SwipeConfig {
  pub fn hold_duration(&self) -> Duration {
    Duration::from_millis(self.hold_duration_ms)
  }

  pub fn spring_back_duration(&self) -> Duration {
    Duration::from_millis(self.spring_back_duration_ms)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ScrollSnapConfig {
  /// Distance of the reference line from the top of the viewport.
  pub reference_line:    f32,
  /// How far below the reference line a snapped paragraph's top rests.
  pub snap_offset:       f32,
  /// Paragraph tops within this distance of the reference line snap.
  pub activation_window: f32,
  /// Paragraph tops within this distance count as centered while dragging.
  pub center_threshold:  f32,
  pub damping:           f32,
  pub duration_ms:       u64,
}

impl Default for ScrollSnapConfig {
  fn default() -> Self {
    Self {
      reference_line:    120.0,
      snap_offset:       8.0,
      activation_window: 80.0,
      center_threshold:  12.0,
      damping:           0.5,
      duration_ms:       600,
    }
  }
}

impl ScrollSnapConfig {
  pub fn duration(&self) -> Duration {
    Duration::from_millis(self.duration_ms)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_source_is_default() {
    assert_eq!(EditorConfig::from_toml_str("").unwrap(), EditorConfig::default());
  }

  #[test]
  fn partial_tables_keep_defaults() {
    let config = EditorConfig::from_toml_str(
      "magnetic-scroll-enabled = false\n[spacing]\nunrelated = 40.0\n[swipe]\nhold-duration-ms = 600\n",
    )
    .unwrap();
    assert!(!config.magnetic_scroll_enabled);
    assert!(config.reorder_enabled);
    assert_eq!(config.spacing.unrelated, 40.0);
    assert_eq!(config.spacing.related, RELATED_SPACING);
    assert_eq!(config.swipe.hold_duration(), Duration::from_millis(600));
  }

  #[test]
  fn unknown_keys_are_rejected() {
    assert!(matches!(
      EditorConfig::from_toml_str("[spacing]\nwobble = 1.0\n"),
      Err(ConfigError::Parse(_))
    ));
  }

  #[test]
  fn inverted_detents_are_invalid() {
    assert!(matches!(
      EditorConfig::from_toml_str("[spacing]\nrelated = 30.0\nunrelated = 10.0\n"),
      Err(ConfigError::Invalid(_))
    ));
  }

  #[test]
  fn new_note_style_follows_flags() {
    let mut config = EditorConfig::default();
    assert_eq!(config.new_note_style().paragraph_spacing, RELATED_SPACING);
    assert_eq!(config.new_note_style().font, FontRole::Body);

    config.default_spacing_is_related = false;
    config.new_note_uses_large_font = true;
    let style = config.new_note_style();
    assert_eq!(style.paragraph_spacing, UNRELATED_SPACING);
    assert_eq!(style.font, FontRole::Title1);
  }

  #[test]
  fn detent_helpers() {
    let spacing = SpacingConfig::default();
    assert_eq!(spacing.nearest(10.0), Detent::Related);
    assert_eq!(spacing.nearest(25.0), Detent::Unrelated);
    assert_eq!(spacing.detent_of(RELATED_SPACING + 0.25), Some(Detent::Related));
    assert_eq!(spacing.detent_of(15.0), None);
    assert_eq!(spacing.clamp(500.0), UNRELATED_SPACING);
  }

  #[test]
  fn load_reports_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let err = EditorConfig::load(&dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
  }
}
