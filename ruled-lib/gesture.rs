//! Mutual exclusion between gesture controllers.
//!
//! At most one gesture owns the [`GestureGate`] at a time. Spacing settle
//! animations do not own the gate, but they mark it as *settling*, which keeps
//! structural gestures (reorder, swipe) from rearranging paragraphs under a
//! running spacing animation.

use thiserror::Error;

use crate::{
  animation::DisplayLink,
  document::Document,
  haptics::HapticFeedback,
  layout::LayoutEngine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
  SpacingPinch,
  ReorderDrag,
  ReplySwipe,
  DeleteSwipe,
}

impl GestureKind {
  /// Whether the gesture changes which paragraphs exist or where they sit.
  pub fn is_structural(self) -> bool {
    !matches!(self, GestureKind::SpacingPinch)
  }
}

pub type Result<T> = std::result::Result<T, GestureError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GestureError {
  #[error("another gesture is active: {active:?}")]
  Busy { active: GestureKind },
  #[error("spacing animations are still settling")]
  Settling,
  #[error("touches do not map to two adjacent paragraphs")]
  AmbiguousGeometry,
  #[error("no paragraph under the touch")]
  NoParagraph,
  #[error("{0:?} is disabled by configuration")]
  Disabled(GestureKind),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GestureGate {
  active:   Option<GestureKind>,
  settling: bool,
}

impl GestureGate {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn active(&self) -> Option<GestureKind> {
    self.active
  }

  pub fn is_settling(&self) -> bool {
    self.settling
  }

  /// No gesture and no settling animation.
  pub fn is_idle(&self) -> bool {
    self.active.is_none() && !self.settling
  }

  /// Whether `kind` could claim the gate right now.
  pub fn check(&self, kind: GestureKind) -> Result<()> {
    if let Some(active) = self.active {
      return Err(GestureError::Busy { active });
    }
    if self.settling && kind.is_structural() {
      return Err(GestureError::Settling);
    }
    Ok(())
  }

  pub fn try_begin(&mut self, kind: GestureKind) -> Result<()> {
    self.check(kind)?;
    tracing::debug!(?kind, "gesture began");
    self.active = Some(kind);
    Ok(())
  }

  /// Release the gate if `kind` holds it.
  pub fn release(&mut self, kind: GestureKind) {
    if self.active == Some(kind) {
      tracing::debug!(?kind, "gesture ended");
      self.active = None;
    }
  }

  pub fn set_settling(&mut self, settling: bool) {
    self.settling = settling;
  }
}

/// Everything a controller may touch while handling one event.
pub struct GestureContext<'a> {
  pub document: &'a mut Document,
  pub gate:     &'a mut GestureGate,
  pub layout:   &'a dyn LayoutEngine,
  pub haptics:  &'a mut dyn HapticFeedback,
  pub display:  &'a mut DisplayLink,
}
