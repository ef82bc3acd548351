//! Magnetic scrolling: when a scroll settles, the paragraph boundary closest
//! to a reference line near the top of the viewport is pulled onto it.
//!
//! The first and last paragraphs never snap, so the very top and bottom of a
//! note stay reachable. While the user drags, a selection tick marks every
//! change of the paragraph sitting on the reference line.

use std::time::Instant;

use ruled_core::easing::Easing;

use crate::{
  animation::{
    FrameClient,
    FrameHandle,
    Tween,
  },
  config::ScrollSnapConfig,
  document::Document,
  gesture::GestureContext,
  haptics::HapticStrength,
  paragraph::ParagraphId,
};

#[derive(Debug, Clone)]
struct Snap {
  target: ParagraphId,
  tween:  Tween<f32>,
}

#[derive(Debug)]
pub struct ScrollSnapController {
  config:   ScrollSnapConfig,
  enabled:  bool,
  dragging: bool,
  centered: Option<ParagraphId>,
  snap:     Option<Snap>,
  frame:    Option<FrameHandle>,
}

impl ScrollSnapController {
  pub fn new(config: ScrollSnapConfig, enabled: bool) -> Self {
    Self {
      config,
      enabled,
      dragging: false,
      centered: None,
      snap: None,
      frame: None,
    }
  }

  pub fn set_config(&mut self, config: ScrollSnapConfig, enabled: bool) {
    self.config = config;
    self.enabled = enabled;
  }

  pub fn is_dragging(&self) -> bool {
    self.dragging
  }

  pub fn is_snapping(&self) -> bool {
    self.snap.is_some()
  }

  pub fn snap_target(&self) -> Option<ParagraphId> {
    self.snap.as_ref().map(|snap| snap.target)
  }

  /// Paragraph currently on the reference line while dragging.
  pub fn centered(&self) -> Option<ParagraphId> {
    self.centered
  }

  /// Finger down on the scroll view. Interrupts a running snap.
  pub fn begin_drag(&mut self, cx: &mut GestureContext<'_>) {
    self.dragging = true;
    if self.snap.take().is_some() {
      tracing::trace!("scroll snap interrupted");
    }
    cx.display.release(&mut self.frame);
    self.centered = self.centered_paragraph(cx.document);
  }

  /// Scroll to `offset`. Returns the offset actually applied.
  pub fn drag(&mut self, cx: &mut GestureContext<'_>, offset: f32) -> f32 {
    let applied = cx.document.set_scroll_offset(offset);
    if self.dragging && self.is_active(cx.document) {
      let centered = self.centered_paragraph(cx.document);
      if centered != self.centered {
        tracing::trace!(?centered, "centered paragraph changed");
        self.centered = centered;
        cx.haptics.pulse(HapticStrength::Selection);
      }
    }
    applied
  }

  /// Finger up. Snaps right away; hosts with momentum scrolling call
  /// [`Self::settle`] again when deceleration ends.
  pub fn end_drag(&mut self, cx: &mut GestureContext<'_>, now: Instant) -> Option<ParagraphId> {
    self.dragging = false;
    self.centered = None;
    self.settle(cx, now)
  }

  /// Start snapping towards the nearest candidate, if one is in reach.
  pub fn settle(&mut self, cx: &mut GestureContext<'_>, now: Instant) -> Option<ParagraphId> {
    if !self.is_active(cx.document) {
      return None;
    }
    let (target, offset) = self.snap_candidate(cx.document)?;
    let scroll = cx.document.scroll();
    let offset = scroll.clamp(offset, cx.document.geometry().content_height());
    tracing::debug!(?target, from = scroll.offset, to = offset, "scroll snap");
    self.snap = Some(Snap {
      target,
      tween: Tween::new(
        now,
        self.config.duration(),
        scroll.offset,
        offset,
        Easing::Spring {
          damping: self.config.damping,
        },
      ),
    });
    cx.display.ensure(&mut self.frame, FrameClient::ScrollSnap);
    Some(target)
  }

  pub fn tick(&mut self, cx: &mut GestureContext<'_>, now: Instant) -> bool {
    let Some(snap) = &self.snap else {
      return false;
    };
    cx.document.set_scroll_offset(snap.tween.value_at(now));
    if snap.tween.is_finished(now) {
      self.snap = None;
      cx.display.release(&mut self.frame);
    }
    true
  }

  fn is_active(&self, document: &Document) -> bool {
    self.enabled && document.paragraphs().len() >= 2
  }

  /// Snappable paragraphs with the distance of their top from the reference
  /// line, in viewport coordinates.
  fn candidates<'a>(&'a self, document: &'a Document) -> impl Iterator<Item = (ParagraphId, f32)> + 'a {
    let paragraphs = document.paragraphs();
    let inner = paragraphs.len().saturating_sub(1);
    let offset = document.scroll().offset;
    paragraphs
      .iter()
      .take(inner)
      .skip(1)
      .map(move |p| (p.id, p.geometry.top() - offset - self.config.reference_line))
  }

  fn centered_paragraph(&self, document: &Document) -> Option<ParagraphId> {
    self
      .candidates(document)
      .filter(|(_, distance)| distance.abs() <= self.config.center_threshold)
      .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
      .map(|(id, _)| id)
  }

  /// Nearest candidate within the activation window and the scroll offset
  /// that puts its top `snap_offset` below the reference line.
  fn snap_candidate(&self, document: &Document) -> Option<(ParagraphId, f32)> {
    let (id, distance) = self
      .candidates(document)
      .filter(|(_, distance)| distance.abs() <= self.config.activation_window)
      .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))?;
    Some((id, document.scroll().offset + distance - self.config.snap_offset))
  }
}
